// Copyright 2025 Cornell University
// released under MIT License

use crate::config::Config;
use crate::diagnostic::{DiagnosticHandler, Level};
use crate::dot::{write_dot, write_json};
use crate::errors::{ParseError, TraceError};
use crate::graph::build_graph;
use crate::mona::{run_mona, MonaEnv, MonaError};
use crate::scanner::parse_trace;
use crate::table::write_operations;
use log::{info, warn};
use std::fmt;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const FORMULA_EXTENSION: &str = "mona";
/// benchmark subdirectories picked up by `gather`
pub const BENCHMARK_PREFIXES: &[&str] = &["[ws1s]", "[wsks]"];

#[derive(Error, Debug)]
pub enum BatchError {
    #[error(transparent)]
    Mona(#[from] MonaError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Trace(#[from] TraceError),
    #[error("failed to write results: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to write json: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Done,
    Timeout,
    Error,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Outcome::Done => "DONE",
            Outcome::Timeout => "TO",
            Outcome::Error => "ERROR",
        })
    }
}

impl From<&BatchError> for Outcome {
    fn from(err: &BatchError) -> Self {
        match err {
            BatchError::Mona(MonaError::CompilerTimeout(_)) => Outcome::Timeout,
            _ => Outcome::Error,
        }
    }
}

/// Settings shared by every input of a batch.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub config: Config,
    /// at most this many formulas per directory
    pub formula_limit: usize,
    pub write_json: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            config: Config::default(),
            formula_limit: 400,
            write_json: false,
        }
    }
}

/// Regular files with the formula extension, sorted by name, at most `limit` of them.
pub fn collect_formulas(dir: &Path, limit: usize) -> std::io::Result<Vec<PathBuf>> {
    let mut formulas = vec![];
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == FORMULA_EXTENSION) {
            formulas.push(path);
        }
    }
    formulas.sort();
    formulas.truncate(limit);
    Ok(formulas)
}

fn create(path: PathBuf) -> std::io::Result<BufWriter<File>> {
    Ok(BufWriter::new(File::create(path)?))
}

fn try_process(
    env: &MonaEnv,
    formula: &Path,
    output_dir: &Path,
    options: &BatchOptions,
    handler: &mut DiagnosticHandler,
) -> Result<(), BatchError> {
    let trace = run_mona(env, formula)?;
    let stem = formula
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();

    let parsed = match parse_trace(&trace, options.config.variable_policy) {
        Ok(parsed) => parsed,
        Err(e) => {
            let fileid = handler.add_file(format!("{stem}.trace"), trace);
            handler.emit_parse_error(fileid, &e);
            return Err(e.into());
        }
    };
    let graph = build_graph(stem.as_str(), &parsed, &options.config)?;

    let mut csv = create(output_dir.join(format!("{stem}.csv")))?;
    write_operations(&mut csv, &parsed, &options.config)?;
    csv.flush()?;

    let mut dot = create(output_dir.join(format!("{stem}.dot")))?;
    write_dot(&mut dot, &graph)?;
    dot.flush()?;

    if options.write_json {
        let mut json = create(output_dir.join(format!("{stem}.json")))?;
        write_json(&mut json, &graph)?;
        json.flush()?;
    }
    Ok(())
}

/// Compiles and analyzes one formula. Nothing is written for a formula that fails.
pub fn process_formula(
    env: &MonaEnv,
    formula: &Path,
    output_dir: &Path,
    options: &BatchOptions,
    handler: &mut DiagnosticHandler,
) -> Outcome {
    info!("processing {}", formula.display());
    match try_process(env, formula, output_dir, options, handler) {
        Ok(()) => Outcome::Done,
        Err(e) => {
            let outcome = Outcome::from(&e);
            if outcome == Outcome::Error && !matches!(e, BatchError::Parse(_)) {
                handler.emit_general_message(&format!("{}: {e}", formula.display()), Level::Error);
            }
            warn!("{}: {e}", formula.display());
            outcome
        }
    }
}

/// Processes every formula of `formula_dir`, reporting one line per input to `out`.
pub fn run_batch(
    env: &MonaEnv,
    formula_dir: &Path,
    output_dir: &Path,
    options: &BatchOptions,
    handler: &mut DiagnosticHandler,
    out: &mut impl Write,
) -> std::io::Result<Vec<(PathBuf, Outcome)>> {
    let formulas = collect_formulas(formula_dir, options.formula_limit)?;
    fs::create_dir_all(output_dir)?;
    writeln!(out, "Timeout: {}", env.timeout().as_secs())?;
    writeln!(out, "Number of formulas: {}", formulas.len())?;

    let mut outcomes = Vec::with_capacity(formulas.len());
    for formula in formulas {
        let outcome = process_formula(env, &formula, output_dir, options, handler);
        writeln!(out, "{}\t{outcome}", formula.display())?;
        outcomes.push((formula, outcome));
    }
    Ok(outcomes)
}

/// Benchmark subdirectories of `dir`, sorted by name.
pub fn benchmark_dirs(dir: &Path) -> std::io::Result<Vec<String>> {
    let mut names = vec![];
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().to_string();
        if entry.path().is_dir() && BENCHMARK_PREFIXES.iter().any(|p| name.starts_with(p)) {
            names.push(name);
        }
    }
    names.sort();
    Ok(names)
}

/// Runs a batch for every benchmark subdirectory, mirroring the directory names under
/// `output_dir`.
pub fn gather(
    env: &MonaEnv,
    benchmark_dir: &Path,
    output_dir: &Path,
    options: &BatchOptions,
    handler: &mut DiagnosticHandler,
    out: &mut impl Write,
) -> std::io::Result<Vec<(PathBuf, Outcome)>> {
    let names = benchmark_dirs(benchmark_dir)?;
    let mut outcomes = vec![];
    for (ii, name) in names.iter().enumerate() {
        writeln!(out, "{}/{}\t{name}", ii + 1, names.len())?;
        outcomes.extend(run_batch(
            env,
            &benchmark_dir.join(name),
            &output_dir.join(name),
            options,
            handler,
            out,
        )?);
    }
    Ok(outcomes)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::mona::tests::fake_compiler;
    use std::time::Duration;

    /// Compiler stand-in that prints a fixture trace chosen by the formula's contents.
    fn echo_compiler(dir: &Path) -> PathBuf {
        fake_compiler(
            dir,
            "mona",
            "case \"$(cat \"$2\")\" in\n  slow) exec sleep 10 ;;\n  bad) exit 1 ;;\n  *) cat \"$(cat \"$2\")\" ;;\nesac",
        )
    }

    fn fixture(name: &str) -> String {
        std::fs::canonicalize(format!("tests/traces/{name}"))
            .unwrap()
            .to_string_lossy()
            .to_string()
    }

    #[test]
    fn formulas_are_sorted_and_limited() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.mona", "a.mona", "c.mona", "notes.txt"] {
            std::fs::write(dir.path().join(name), "").unwrap();
        }
        std::fs::create_dir(dir.path().join("d.mona")).unwrap();

        let all = collect_formulas(dir.path(), 400).unwrap();
        let names: Vec<_> = all
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.mona", "b.mona", "c.mona"]);
        assert_eq!(collect_formulas(dir.path(), 2).unwrap().len(), 2);
    }

    #[test]
    fn batch_continues_past_failures() {
        let dir = tempfile::tempdir().unwrap();
        let formulas = dir.path().join("formulas");
        let results = dir.path().join("results");
        std::fs::create_dir(&formulas).unwrap();
        std::fs::write(formulas.join("1_ok.mona"), fixture("construction.trace")).unwrap();
        std::fs::write(formulas.join("2_slow.mona"), "slow").unwrap();
        std::fs::write(formulas.join("3_bad.mona"), "bad").unwrap();
        std::fs::write(formulas.join("4_tree.mona"), fixture("tree.trace")).unwrap();

        let env = MonaEnv::new(echo_compiler(dir.path()), Duration::from_millis(300));
        let options = BatchOptions {
            write_json: true,
            ..BatchOptions::default()
        };
        let mut handler = DiagnosticHandler::default();
        let mut out = Vec::new();
        let outcomes =
            run_batch(&env, &formulas, &results, &options, &mut handler, &mut out).unwrap();

        let outcomes: Vec<Outcome> = outcomes.into_iter().map(|(_, o)| o).collect();
        assert_eq!(
            outcomes,
            vec![Outcome::Done, Outcome::Timeout, Outcome::Error, Outcome::Done]
        );

        let report = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = report.lines().collect();
        assert_eq!(lines[0], "Timeout: 0");
        assert_eq!(lines[1], "Number of formulas: 4");
        assert!(lines[3].ends_with("2_slow.mona\tTO"));
        assert!(lines[4].ends_with("3_bad.mona\tERROR"));

        assert!(results.join("1_ok.csv").exists());
        assert!(results.join("1_ok.dot").exists());
        assert!(results.join("1_ok.json").exists());
        assert!(results.join("4_tree.csv").exists());
        assert!(!results.join("2_slow.csv").exists());
        assert!(!results.join("3_bad.dot").exists());
    }

    #[test]
    fn gather_mirrors_benchmark_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let bench = dir.path().join("bench");
        let results = dir.path().join("results");
        for sub in ["[ws1s] small", "[wsks] trees", "other"] {
            std::fs::create_dir_all(bench.join(sub)).unwrap();
        }
        std::fs::write(bench.join("[ws1s] small/f.mona"), fixture("construction.trace")).unwrap();
        std::fs::write(bench.join("[wsks] trees/g.mona"), fixture("tree.trace")).unwrap();
        std::fs::write(bench.join("other/h.mona"), fixture("tree.trace")).unwrap();

        let env = MonaEnv::new(echo_compiler(dir.path()), Duration::from_secs(5));
        let mut handler = DiagnosticHandler::default();
        let mut out = Vec::new();
        let outcomes = gather(
            &env,
            &bench,
            &results,
            &BatchOptions::default(),
            &mut handler,
            &mut out,
        )
        .unwrap();

        assert_eq!(outcomes.len(), 2);
        let report = String::from_utf8(out).unwrap();
        assert!(report.starts_with("1/2\t[ws1s] small\n"));
        assert!(report.contains("2/2\t[wsks] trees\n"));
        assert!(results.join("[ws1s] small/f.csv").exists());
        assert!(results.join("[wsks] trees/g.dot").exists());
        assert!(!results.join("other").exists());
    }
}
