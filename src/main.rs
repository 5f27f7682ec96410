// Copyright 2025 Cornell University
// released under MIT License

use anyhow::Context;
use clap::{ColorChoice, Parser, Subcommand};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use mona_stat::batch::{gather, run_batch, BatchOptions, Outcome};
use mona_stat::config::{Config, VariablePolicy};
use mona_stat::diagnostic::DiagnosticHandler;
use mona_stat::mona::MonaEnv;
use mona_stat::summary::summarize;
use std::path::PathBuf;

/// Provenance graphs and statistics of MONA automaton constructions
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Users can specify `-v` or `--verbose` to toggle logging
    #[command(flatten)]
    verbosity: Verbosity<WarnLevel>,

    /// Pass in `--color never` to suppress colored error messages.
    #[arg(long, value_name = "COLOR_CHOICE", default_value = "auto", global = true)]
    color: ColorChoice,
}

/// Options of the commands that run the compiler
#[derive(clap::Args, Debug)]
struct RunArgs {
    /// Seconds the compiler may spend on one formula
    #[arg(long, default_value_t = 10)]
    timeout: u64,

    /// Hide the unminimized result of products and projections
    #[arg(long)]
    hide_minimized: bool,

    /// Do not append the id -> name table to the operation logs
    #[arg(long)]
    hide_names: bool,

    /// Keep undeclared variable tokens instead of failing the formula
    #[arg(long)]
    lenient: bool,

    /// Process at most this many formulas per directory
    #[arg(long, default_value_t = 400)]
    formulas: usize,

    /// Also write each graph as JSON
    #[arg(long)]
    json: bool,
}

impl RunArgs {
    fn options(&self) -> BatchOptions {
        BatchOptions {
            config: Config {
                show_minimized_intermediate_nodes: !self.hide_minimized,
                show_all_automaton_names: !self.hide_names,
                timeout_seconds: self.timeout,
                variable_policy: if self.lenient {
                    VariablePolicy::Lenient
                } else {
                    VariablePolicy::Strict
                },
            },
            formula_limit: self.formulas,
            write_json: self.json,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyze every formula of one directory
    Run {
        mona: PathBuf,
        formula_dir: PathBuf,
        output_dir: PathBuf,
        #[command(flatten)]
        args: RunArgs,
    },
    /// Analyze every `[ws1s]` / `[wsks]` subdirectory of a benchmark directory
    Gather {
        mona: PathBuf,
        benchmark_dir: PathBuf,
        output_dir: PathBuf,
        #[command(flatten)]
        args: RunArgs,
    },
    /// Per-operator statistics over the operation logs of a results directory
    Summarize {
        results_dir: PathBuf,
        output_dir: PathBuf,
    },
}

fn report(outcomes: &[(PathBuf, Outcome)]) {
    let failed = outcomes
        .iter()
        .filter(|(_, outcome)| *outcome != Outcome::Done)
        .count();
    log::info!("{} formulas, {failed} not analyzed", outcomes.len());
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .format_timestamp(None)
        .filter_level(cli.verbosity.log_level_filter())
        .init();

    let handler = &mut DiagnosticHandler::new(cli.color);
    let stdout = &mut std::io::stdout().lock();

    match cli.command {
        Command::Run {
            mona,
            formula_dir,
            output_dir,
            args,
        } => {
            let options = args.options();
            let env = MonaEnv::with_timeout_seconds(mona, options.config.timeout_seconds);
            let outcomes = run_batch(&env, &formula_dir, &output_dir, &options, handler, stdout)
                .with_context(|| format!("failed to process {}", formula_dir.display()))?;
            report(&outcomes);
        }
        Command::Gather {
            mona,
            benchmark_dir,
            output_dir,
            args,
        } => {
            let options = args.options();
            let env = MonaEnv::with_timeout_seconds(mona, options.config.timeout_seconds);
            let outcomes = gather(&env, &benchmark_dir, &output_dir, &options, handler, stdout)
                .with_context(|| format!("failed to process {}", benchmark_dir.display()))?;
            report(&outcomes);
        }
        Command::Summarize {
            results_dir,
            output_dir,
        } => {
            summarize(&results_dir, &output_dir)
                .with_context(|| format!("failed to summarize {}", results_dir.display()))?;
        }
    }
    Ok(())
}
