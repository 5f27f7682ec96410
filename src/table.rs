// Copyright 2025 Cornell University
// released under MIT License

//! Semicolon-separated operation log and id -> name table.

use crate::config::Config;
use crate::ir::{AutomatonId, Handle, Operation};
use crate::scanner::ParsedTrace;
use std::collections::BTreeSet;
use std::fmt;
use std::io::Write;
use thiserror::Error;

pub const HEADER: &str =
    "operation;operand1;size1;operand2;size2;result;resultsize;minresult;minsize;fv";
const NAMES_TITLE: &str = "Automata";
const NAMES_HEADER: &str = "id;name;";
const ABSENT_SIZE: &str = "-1";

/// `(id, size)` pair of one log column group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    pub id: AutomatonId,
    pub size: usize,
}

impl From<&Handle> for Slot {
    fn from(handle: &Handle) -> Self {
        Self {
            id: handle.id.clone(),
            size: handle.size,
        }
    }
}

/// One row of the operation log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub operation: String,
    pub operand1: Option<Slot>,
    pub operand2: Option<Slot>,
    pub result: Option<Slot>,
    pub minresult: Option<Slot>,
    pub free_vars: BTreeSet<String>,
}

impl From<&Operation> for Row {
    fn from(operation: &Operation) -> Self {
        let (operand1, operand2, result, minresult) = match operation {
            Operation::Init { result, .. } => (None, None, None, Some(result)),
            Operation::Copy { source, result, .. } => (Some(source), None, None, Some(result)),
            Operation::Replace { target, .. } => (Some(target), None, None, Some(target)),
            Operation::Minimize {
                operand, result, ..
            } => (Some(operand), None, None, Some(result)),
            Operation::Product {
                lhs,
                rhs,
                product,
                minimized,
                ..
            } => (Some(lhs), Some(rhs), Some(product), Some(minimized)),
            Operation::Project {
                operand,
                projected,
                minimized,
                ..
            } => (Some(operand), None, Some(projected), Some(minimized)),
        };
        Self {
            operation: operation.kind(),
            operand1: operand1.map(Slot::from),
            operand2: operand2.map(Slot::from),
            result: result.map(Slot::from),
            minresult: minresult.map(Slot::from),
            free_vars: operation.free_vars().clone(),
        }
    }
}

fn write_slot(f: &mut fmt::Formatter<'_>, slot: &Option<Slot>) -> fmt::Result {
    match slot {
        Some(slot) => write!(f, "{};{}", slot.id, slot.size),
        None => write!(f, "{};{}", AutomatonId::NONE, ABSENT_SIZE),
    }
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{};", self.operation)?;
        for slot in [&self.operand1, &self.operand2, &self.result, &self.minresult] {
            write_slot(f, slot)?;
            f.write_str(";")?;
        }
        let free_vars: Vec<&str> = self.free_vars.iter().map(String::as_str).collect();
        f.write_str(&free_vars.join(","))
    }
}

/// Writes the operation log of `parsed`, followed by the id -> name table when
/// `config.show_all_automaton_names` is set.
pub fn write_operations(
    out: &mut impl Write,
    parsed: &ParsedTrace,
    config: &Config,
) -> std::io::Result<()> {
    writeln!(out, "{HEADER}")?;
    for operation in &parsed.operations {
        writeln!(out, "{}", Row::from(operation))?;
    }
    if config.show_all_automaton_names {
        write_names(out, parsed)?;
    }
    Ok(())
}

/// One `id;name;` row per record, in creation order.
pub fn write_names(out: &mut impl Write, parsed: &ParsedTrace) -> std::io::Result<()> {
    writeln!(out)?;
    writeln!(out, "{NAMES_TITLE}")?;
    writeln!(out, "{NAMES_HEADER}")?;
    for (_, record) in parsed.registry.records() {
        writeln!(out, "{};{};", record.id, record.name)?;
    }
    Ok(())
}

pub fn operations_to_string(parsed: &ParsedTrace, config: &Config) -> String {
    let mut out = Vec::new();
    // writing into a Vec cannot fail
    let _ = write_operations(&mut out, parsed, config);
    String::from_utf8_lossy(&out).into_owned()
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RowError {
    #[error("line {line}: expected 10 columns, found {found}")]
    ColumnCount { line: usize, found: usize },
    #[error("line {line}: `{value}` is not a size")]
    Size { line: usize, value: String },
}

fn parse_slot(line: usize, id: &str, size: &str) -> Result<Option<Slot>, RowError> {
    if id == AutomatonId::NONE && size == ABSENT_SIZE {
        return Ok(None);
    }
    let size = size.parse().map_err(|_| RowError::Size {
        line,
        value: size.to_string(),
    })?;
    Ok(Some(Slot {
        id: AutomatonId::new(id),
        size,
    }))
}

/// Reads the rows of an operation log back. Stops at the first blank line, i.e. before the
/// name table.
pub fn parse_rows(text: &str) -> Result<Vec<Row>, RowError> {
    let mut rows = vec![];
    for (ii, line) in text.lines().enumerate() {
        if ii == 0 && line == HEADER {
            continue;
        }
        if line.is_empty() {
            break;
        }
        let line_no = ii + 1;
        let columns: Vec<&str> = line.split(';').collect();
        let [operation, id1, size1, id2, size2, id3, size3, id4, size4, fv] = columns.as_slice()
        else {
            return Err(RowError::ColumnCount {
                line: line_no,
                found: columns.len(),
            });
        };
        rows.push(Row {
            operation: operation.to_string(),
            operand1: parse_slot(line_no, id1, size1)?,
            operand2: parse_slot(line_no, id2, size2)?,
            result: parse_slot(line_no, id3, size3)?,
            minresult: parse_slot(line_no, id4, size4)?,
            free_vars: fv
                .split(',')
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .collect(),
        });
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VariablePolicy;
    use crate::scanner::parse_trace;

    fn parse(path: &str) -> ParsedTrace {
        let text = std::fs::read_to_string(path).expect("failed to load");
        parse_trace(&text, VariablePolicy::Strict).unwrap()
    }

    #[test]
    fn construction_log() {
        let parsed = parse("tests/traces/construction.trace");
        insta::assert_snapshot!(operations_to_string(&parsed, &Config::default()), @r"
        operation;operand1;size1;operand2;size2;result;resultsize;minresult;minsize;fv
        init;0x0;-1;0x0;-1;0x0;-1;0x1a;3;X,Y
        init;0x0;-1;0x0;-1;0x0;-1;0x2b;3;Y,z
        &;0x1a;3;0x2b;3;0x3c;9;0x4d;4;X,Y,z
        proj #2;0x4d;4;0x0;-1;0x5e;5;0x1a;3;X,z
        copy;0x1a;3;0x0;-1;0x0;-1;0x6f;3;X,z
        replace;0x6f;3;0x0;-1;0x0;-1;0x6f;3;V,w
        min;0x6f;3;0x0;-1;0x0;-1;0x70;2;V,w

        Automata
        id;name;
        0x1a;In(#1,#2);
        0x2b;Sub2(#2,#3);
        0x3c;In(#1,#2) & Sub2(#2,#3);
        0x4d;min(In(#1,#2) & Sub2(#2,#3));
        0x5e;proj #2(min(In(#1,#2) & Sub2(#2,#3)));
        0x1a;min(proj #2(min(In(#1,#2) & Sub2(#2,#3))));
        0x6f;min(proj #2(min(In(#4,#2) & Sub2(#2,#5))));
        0x70;min(min(proj #2(min(In(#4,#2) & Sub2(#2,#5)))));
        ");
    }

    #[test]
    fn names_can_be_hidden() {
        let parsed = parse("tests/traces/tree.trace");
        let config = Config {
            show_all_automaton_names: false,
            ..Config::default()
        };
        insta::assert_snapshot!(operations_to_string(&parsed, &config), @r"
        operation;operand1;size1;operand2;size2;result;resultsize;minresult;minsize;fv
        init;0x0;-1;0x0;-1;0x0;-1;11;2;p
        init;0x0;-1;0x0;-1;0x0;-1;12;2;q
        |;11;2;12;2;13;4;14;3;p,q
        proj #2;14;3;0x0;-1;15;3;11;2;p
        ");
    }

    #[test]
    fn rows_split_back_into_ids_and_sizes() {
        let parsed = parse("tests/traces/construction.trace");
        let text = operations_to_string(&parsed, &Config::default());
        let rows = parse_rows(&text).unwrap();
        assert_eq!(rows.len(), parsed.operations.len());
        for (row, operation) in rows.iter().zip(&parsed.operations) {
            assert_eq!(row, &Row::from(operation));
        }
        let product = &rows[2];
        assert_eq!(product.operand2.as_ref().unwrap().id, AutomatonId::new("0x2b"));
        assert_eq!(product.result.as_ref().unwrap().size, 9);
    }

    #[test]
    fn malformed_rows() {
        assert_eq!(
            parse_rows("min;0x1;3\n"),
            Err(RowError::ColumnCount { line: 1, found: 3 })
        );
        assert_eq!(
            parse_rows("min;0x1;three;0x0;-1;0x0;-1;0x2;2;\n"),
            Err(RowError::Size {
                line: 1,
                value: "three".to_string()
            })
        );
    }
}
