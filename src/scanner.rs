// Copyright 2025 Cornell University
// released under MIT License

use crate::config::VariablePolicy;
use crate::errors::{ParseError, TraceError};
use crate::ir::{BinaryOp, Operation};
use crate::registry::Registry;
use crate::symbols::VariableTable;
use log::debug;

/// Line opening the construction section of a trace.
pub const CONSTRUCTION_MARKER: &str = "AUTOMATON CONSTRUCTION";

/// Lines opening the sections that follow the construction section.
const LATER_SECTIONS: &[&str] = &["Symbol table:", "ANALYSIS"];

/// Prefixes of the lines that announce one of the compiler's basic automata.
const INITIAL_AUTOMATA: &[&str] = &[
    "True",
    "False",
    "Empty",
    "FirstOrder",
    "Const",
    "Singleton",
    "BoolVar",
    "In(",
    "Eq1",
    "Eq2",
    "Sub2",
    "Less1",
    "LessEq1",
    "EqPlus2",
    "EqMinus2",
    "EqMin",
    "EqMax",
    "EqPlus1",
    "EqMinus1",
    "Union",
    "Inter",
    "SetMinus",
    "EqPlusModulo",
    "EqMinusModulo",
    "PresbConst",
];

/// Kind of line that starts an operation block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Marker {
    Initial,
    Copy,
    Replace,
    Minimize,
    Product(BinaryOp),
    Projection,
}

impl Marker {
    /// Tests `line` against every marker in priority order.
    pub(crate) fn classify(line: &str) -> Option<Self> {
        if INITIAL_AUTOMATA.iter().any(|prefix| line.starts_with(prefix)) {
            return Some(Marker::Initial);
        }
        if line.starts_with("Copying") {
            return Some(Marker::Copy);
        }
        if line.starts_with("Replacing indices") {
            return Some(Marker::Replace);
        }
        if line.starts_with("  Minimizing") {
            return Some(Marker::Minimize);
        }
        if let Some(rest) = line.strip_prefix("Product ") {
            if let Some(op) = BinaryOp::ALL
                .into_iter()
                .find(|op| rest.starts_with(op.symbol()))
            {
                return Some(Marker::Product(op));
            }
        }
        if line.starts_with("Projecting") {
            return Some(Marker::Projection);
        }
        None
    }
}

/// Everything recovered from one trace.
#[derive(Debug, Clone)]
pub struct ParsedTrace {
    pub registry: Registry,
    /// operations in trace order
    pub operations: Vec<Operation>,
    pub variables: VariableTable,
    pub policy: VariablePolicy,
}

/// Walks the construction section of one trace. Owns the registry for the duration of
/// the parse; nothing is shared between traces.
pub(crate) struct Scanner<'t> {
    pub(crate) lines: Vec<&'t str>,
    pub(crate) registry: Registry,
    pub(crate) operations: Vec<Operation>,
    pub(crate) variables: VariableTable,
    pub(crate) policy: VariablePolicy,
}

impl<'t> Scanner<'t> {
    fn new(text: &'t str, policy: VariablePolicy) -> Self {
        let lines: Vec<&str> = text.lines().collect();
        let variables = VariableTable::parse(&lines);
        Self {
            lines,
            registry: Registry::new(),
            operations: vec![],
            variables,
            policy,
        }
    }

    fn run(mut self) -> Result<ParsedTrace, ParseError> {
        let start = self
            .lines
            .iter()
            .position(|line| *line == CONSTRUCTION_MARKER)
            .ok_or_else(|| {
                ParseError::whole_trace(TraceError::MalformedTrace(format!(
                    "no `{CONSTRUCTION_MARKER}` section"
                )))
            })?;

        let end = self.lines[start + 1..]
            .iter()
            .position(|line| LATER_SECTIONS.iter().any(|s| line.starts_with(s)))
            .map_or(self.lines.len(), |offset| start + 1 + offset);

        // lines already consumed by the previous multi-line handler
        let mut skip = 0;
        for ii in start + 1..end {
            if skip > 0 {
                skip -= 1;
                continue;
            }
            let Some(marker) = Marker::classify(self.lines[ii]) else {
                continue;
            };
            skip = self
                .dispatch(marker, ii)
                .map_err(|error| ParseError::at(ii, error))?;
        }

        debug!(
            "parsed {} operations over {} automata",
            self.operations.len(),
            self.registry.len()
        );
        Ok(ParsedTrace {
            registry: self.registry,
            operations: self.operations,
            variables: self.variables,
            policy: self.policy,
        })
    }

    /// Runs the handler for `marker` found on line `ii` and returns how many of the
    /// following lines it consumed.
    fn dispatch(&mut self, marker: Marker, ii: usize) -> crate::errors::Result<usize> {
        match marker {
            Marker::Initial => self.handle_init(ii),
            Marker::Copy => self.handle_copy(ii),
            Marker::Replace => self.handle_replace(ii),
            Marker::Minimize => self.handle_minimize(ii),
            Marker::Product(op) => self.handle_product(ii, op),
            Marker::Projection => self.handle_projection(ii),
        }
    }
}

/// Reconstructs the operation log of one trace.
pub fn parse_trace(text: &str, policy: VariablePolicy) -> Result<ParsedTrace, ParseError> {
    Scanner::new(text, policy).run()
}
