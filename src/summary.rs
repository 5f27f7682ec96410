// Copyright 2025 Cornell University
// released under MIT License

//! Per-operator statistics over a directory of operation logs.

use crate::ir::{AutomatonId, BinaryOp};
use crate::table::{parse_rows, Row, RowError};
use log::{debug, info};
use rustc_hash::FxHashMap;
use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const SUMMARY_HEADER: &str = "size1;fvcnt1;size2;fvcnt2;cmnfvcnt;size;minsize";
const LOG_EXTENSION: &str = "csv";

#[derive(Error, Debug)]
pub enum SummaryError {
    #[error("failed to perform i/o: {0}")]
    IoError(#[from] std::io::Error),
    #[error("{path}: {source}")]
    BadLog { path: PathBuf, source: RowError },
}

pub type Result<T> = std::result::Result<T, SummaryError>;

/// Name of the summary file for one operator.
pub fn summary_file_name(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::And => "and.csv",
        BinaryOp::Or => "or.csv",
        BinaryOp::Iff => "iff.csv",
        BinaryOp::Implies => "impl.csv",
    }
}

/// Sizes and free-variable counts around one binary operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BinarySample {
    pub size1: usize,
    pub fvcnt1: usize,
    pub size2: usize,
    pub fvcnt2: usize,
    /// free variables the operands share
    pub common: usize,
    pub size: usize,
    pub minsize: usize,
}

impl fmt::Display for BinarySample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{};{};{};{};{};{};{}",
            self.size1, self.fvcnt1, self.size2, self.fvcnt2, self.common, self.size, self.minsize
        )
    }
}

/// Samples of every binary operation in one log. An operand's free variables are those of
/// the latest earlier row that produced its id.
pub fn binary_samples(rows: &[Row]) -> Vec<(BinaryOp, BinarySample)> {
    let empty = BTreeSet::new();
    let mut produced: FxHashMap<&AutomatonId, &BTreeSet<String>> = FxHashMap::default();
    let mut samples = vec![];
    for row in rows {
        let op = BinaryOp::from_symbol(&row.operation);
        if let (Some(op), Some(lhs), Some(rhs), Some(result), Some(min)) = (
            op,
            &row.operand1,
            &row.operand2,
            &row.result,
            &row.minresult,
        ) {
            let fv1 = produced.get(&lhs.id).copied().unwrap_or(&empty);
            let fv2 = produced.get(&rhs.id).copied().unwrap_or(&empty);
            samples.push((
                op,
                BinarySample {
                    size1: lhs.size,
                    fvcnt1: fv1.len(),
                    size2: rhs.size,
                    fvcnt2: fv2.len(),
                    common: fv1.intersection(fv2).count(),
                    size: result.size,
                    minsize: min.size,
                },
            ));
        }
        for slot in [&row.result, &row.minresult].into_iter().flatten() {
            produced.insert(&slot.id, &row.free_vars);
        }
    }
    samples
}

/// Operation logs under `dir` and its subdirectories, sorted by path.
pub fn collect_logs(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut logs = vec![];
    let mut pending = vec![dir.to_path_buf()];
    while let Some(dir) = pending.pop() {
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.is_dir() {
                pending.push(path);
            } else if path.extension().is_some_and(|ext| ext == LOG_EXTENSION) {
                logs.push(path);
            }
        }
    }
    logs.sort();
    Ok(logs)
}

/// Samples of all logs, grouped by operator.
#[derive(Debug, Default)]
pub struct Summary {
    samples: FxHashMap<BinaryOp, Vec<BinarySample>>,
}

impl Summary {
    pub fn add_log(&mut self, text: &str) -> std::result::Result<(), RowError> {
        let rows = parse_rows(text)?;
        for (op, sample) in binary_samples(&rows) {
            self.samples.entry(op).or_default().push(sample);
        }
        Ok(())
    }

    pub fn samples(&self, op: BinaryOp) -> &[BinarySample] {
        self.samples.get(&op).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn write(&self, op: BinaryOp, out: &mut impl Write) -> std::io::Result<()> {
        writeln!(out, "{SUMMARY_HEADER}")?;
        for sample in self.samples(op) {
            writeln!(out, "{sample}")?;
        }
        Ok(())
    }
}

/// Reads every operation log under `results_dir` and writes one summary file per operator
/// into `output_dir`.
pub fn summarize(results_dir: &Path, output_dir: &Path) -> Result<Summary> {
    let mut summary = Summary::default();
    for path in collect_logs(results_dir)? {
        debug!("summarizing {}", path.display());
        let text = fs::read_to_string(&path)?;
        summary
            .add_log(&text)
            .map_err(|source| SummaryError::BadLog { path, source })?;
    }
    fs::create_dir_all(output_dir)?;
    for op in BinaryOp::ALL {
        let mut file = fs::File::create(output_dir.join(summary_file_name(op)))?;
        summary.write(op, &mut file)?;
        info!("{op}: {} samples", summary.samples(op).len());
    }
    Ok(summary)
}
