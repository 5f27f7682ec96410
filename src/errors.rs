// Copyright 2025 Cornell University
// released under MIT License

use crate::ir::AutomatonId;
use std::fmt;
use thiserror::Error;

/// Defects found while reconstructing a single trace.
/// Every variant is fatal to the trace it was found in and to nothing else.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TraceError {
    #[error("malformed trace: {0}")]
    MalformedTrace(String),
    #[error("unknown automaton id `{0}`")]
    UnknownAutomatonId(AutomatonId),
    #[error("variable token `{0}` does not appear in the symbol table")]
    UnresolvedVariable(String),
}

/// A `TraceError` together with the trace line (0-based) it was detected on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub line: Option<usize>,
    pub error: TraceError,
}

impl ParseError {
    pub fn at(line: usize, error: TraceError) -> Self {
        Self {
            line: Some(line),
            error,
        }
    }

    pub fn whole_trace(error: TraceError) -> Self {
        Self { line: None, error }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "line {}: {}", line + 1, self.error),
            None => write!(f, "{}", self.error),
        }
    }
}

impl std::error::Error for ParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

pub type Result<T> = std::result::Result<T, TraceError>;
