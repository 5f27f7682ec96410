// Copyright 2025 Cornell University
// released under MIT License

use crate::config::VariablePolicy;
use crate::errors::{Result, TraceError};
use log::warn;
use rustc_hash::FxHashMap;
use std::collections::BTreeSet;

const SYMBOL_TABLE_TITLE: &str = "Symbol table:";
/// column header lines between the title and the first entry
const SYMBOL_TABLE_HEADER_LINES: usize = 2;

/// Declared variable names, keyed by the internal token the compiler prints in labels.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariableTable {
    by_token: FxHashMap<String, String>,
}

impl VariableTable {
    /// Reads the last `Symbol table:` section of a trace. A trace without one yields an
    /// empty table.
    pub fn parse(lines: &[&str]) -> Self {
        let mut table = Self::default();
        let Some(title) = lines.iter().rposition(|l| l.starts_with(SYMBOL_TABLE_TITLE)) else {
            return table;
        };
        for line in lines.iter().skip(title + 1 + SYMBOL_TABLE_HEADER_LINES) {
            if line.is_empty() {
                break;
            }
            let mut columns = line.split_whitespace();
            match (columns.next(), columns.next()) {
                (Some(name), Some(token)) => table.insert(token, name),
                _ => break,
            }
        }
        table
    }

    pub fn insert(&mut self, token: impl Into<String>, name: impl Into<String>) {
        self.by_token.insert(token.into(), name.into());
    }

    pub fn name_of(&self, token: &str) -> Option<&str> {
        self.by_token.get(token).map(String::as_str)
    }

    pub fn resolve(&self, token: &str, policy: VariablePolicy) -> Result<String> {
        match (self.name_of(token), policy) {
            (Some(name), _) => Ok(name.to_string()),
            (None, VariablePolicy::Lenient) => {
                warn!("variable token `{token}` is not declared, keeping it as is");
                Ok(token.to_string())
            }
            (None, VariablePolicy::Strict) => Err(TraceError::UnresolvedVariable(token.to_string())),
        }
    }

    pub fn resolve_all<'t>(
        &self,
        tokens: impl IntoIterator<Item = &'t String>,
        policy: VariablePolicy,
    ) -> Result<BTreeSet<String>> {
        tokens
            .into_iter()
            .map(|token| self.resolve(token, policy))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.by_token.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_token.is_empty()
    }
}
