// Copyright 2025 Cornell University
// released under MIT License

use cranelift_entity::entity_impl;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

/// Address-like token the compiler uses to name an automaton.
/// The same token is reused for different automata over the course of one trace.
#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct AutomatonId(String);

impl AutomatonId {
    /// Placeholder written in the operation log for an absent operand.
    pub const NONE: &'static str = "0x0";

    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AutomatonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Internal variable token (`#3`) as printed in transition labels.
pub type VarToken = String;

/// Handle of one stored automaton record.
#[derive(Clone, Copy, Hash, PartialEq, Eq, Default, PartialOrd, Ord)]
pub struct RecordId(u32);
entity_impl!(RecordId, "rec");

/// `(size, generation, id)` header triplet as printed by the compiler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Triplet {
    pub size: usize,
    pub generation: usize,
    pub id: AutomatonId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutomatonRecord {
    pub id: AutomatonId,
    /// how many records were assigned to `id` before this one
    pub occurrence: u32,
    pub name: String,
    pub size: usize,
    pub free_vars: BTreeSet<VarToken>,
    pub is_initial: bool,
}

/// An automaton as referenced by one operation: the id and size printed in the trace,
/// together with the record the id denoted at that point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handle {
    pub id: AutomatonId,
    pub size: usize,
    pub record: RecordId,
}

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, Serialize)]
pub enum BinaryOp {
    And,
    Or,
    Iff,
    Implies,
}

impl BinaryOp {
    pub const ALL: [BinaryOp; 4] = [BinaryOp::And, BinaryOp::Or, BinaryOp::Iff, BinaryOp::Implies];

    /// operator symbol as it appears in the trace and in the operation log
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::And => "&",
            BinaryOp::Or => "|",
            BinaryOp::Iff => "<=>",
            BinaryOp::Implies => "=>",
        }
    }

    pub fn from_symbol(symbol: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.symbol() == symbol)
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// One construction step recovered from the trace.
/// `free_vars` always holds resolved variable names at the time the step was parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Init {
        result: Handle,
        free_vars: BTreeSet<String>,
    },
    Copy {
        source: Handle,
        result: Handle,
        free_vars: BTreeSet<String>,
    },
    Replace {
        target: Handle,
        /// renames in the order they were listed
        renames: Vec<(VarToken, VarToken)>,
        free_vars: BTreeSet<String>,
    },
    Minimize {
        operand: Handle,
        result: Handle,
        free_vars: BTreeSet<String>,
    },
    Product {
        op: BinaryOp,
        lhs: Handle,
        rhs: Handle,
        product: Handle,
        minimized: Handle,
        free_vars: BTreeSet<String>,
    },
    Project {
        var: VarToken,
        operand: Handle,
        projected: Handle,
        minimized: Handle,
        free_vars: BTreeSet<String>,
    },
}

impl Operation {
    /// token used in the first column of the operation log
    pub fn kind(&self) -> String {
        match self {
            Operation::Init { .. } => "init".to_string(),
            Operation::Copy { .. } => "copy".to_string(),
            Operation::Replace { .. } => "replace".to_string(),
            Operation::Minimize { .. } => "min".to_string(),
            Operation::Product { op, .. } => op.symbol().to_string(),
            Operation::Project { var, .. } => format!("proj {var}"),
        }
    }

    pub fn free_vars(&self) -> &BTreeSet<String> {
        match self {
            Operation::Init { free_vars, .. }
            | Operation::Copy { free_vars, .. }
            | Operation::Replace { free_vars, .. }
            | Operation::Minimize { free_vars, .. }
            | Operation::Product { free_vars, .. }
            | Operation::Project { free_vars, .. } => free_vars,
        }
    }

    /// the automaton this operation leaves behind, i.e. the minimized one where there is one
    pub fn final_result(&self) -> &Handle {
        match self {
            Operation::Init { result, .. }
            | Operation::Copy { result, .. }
            | Operation::Minimize { result, .. } => result,
            Operation::Replace { target, .. } => target,
            Operation::Product { minimized, .. } | Operation::Project { minimized, .. } => {
                minimized
            }
        }
    }
}
