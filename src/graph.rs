// Copyright 2025 Cornell University
// released under MIT License

use crate::config::Config;
use crate::errors::Result;
use crate::ir::{AutomatonId, Operation, RecordId};
use crate::scanner::ParsedTrace;
use rustc_hash::FxHashMap;
use serde::Serialize;
use std::fmt;

/// Identity of a graph node: the automaton id plus how many times the id had been
/// assigned before this automaton.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct NodeKey {
    pub id: AutomatonId,
    pub occurrence: u32,
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.id, self.occurrence)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// basic automaton built directly from an atomic formula
    Initial,
    Derived,
    Copy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Node {
    pub key: NodeKey,
    pub label: String,
    pub tooltip: String,
    pub kind: NodeKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
    Derivation,
    Copy,
}

/// Edge from a derived automaton to one of its operands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Edge {
    pub from: NodeKey,
    pub to: NodeKey,
    pub label: String,
    /// operand position for binary operations
    #[serde(skip_serializing_if = "Option::is_none")]
    pub side: Option<Side>,
    pub kind: EdgeKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProvenanceGraph {
    pub name: String,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl ProvenanceGraph {
    pub fn node(&self, key: &NodeKey) -> Option<&Node> {
        self.nodes.iter().find(|n| &n.key == key)
    }
}

struct GraphBuilder<'p> {
    parsed: &'p ParsedTrace,
    show_intermediate: bool,
    nodes: Vec<Node>,
    index: FxHashMap<RecordId, usize>,
    edges: Vec<Edge>,
}

impl<'p> GraphBuilder<'p> {
    fn key(&self, rid: RecordId) -> NodeKey {
        let record = &self.parsed.registry[rid];
        NodeKey {
            id: record.id.clone(),
            occurrence: record.occurrence,
        }
    }

    fn free_vars(&self, rid: RecordId) -> Result<String> {
        let record = &self.parsed.registry[rid];
        let names = self
            .parsed
            .variables
            .resolve_all(&record.free_vars, self.parsed.policy)?;
        Ok(names.into_iter().collect::<Vec<_>>().join(","))
    }

    fn add_node(&mut self, rid: RecordId, kind: NodeKind) -> Result<()> {
        if self.index.contains_key(&rid) {
            return Ok(());
        }
        let record = &self.parsed.registry[rid];
        let free_vars = self.free_vars(rid)?;
        let stats = format!("{} states\n{}\n{}", record.size, free_vars, record.id);
        let label = match kind {
            NodeKind::Initial => format!("{}\n{}", record.name, stats),
            NodeKind::Derived => stats,
            NodeKind::Copy => format!("{}\n{}", free_vars, record.id),
        };
        let node = Node {
            key: self.key(rid),
            label,
            tooltip: record.name.clone(),
            kind,
        };
        self.index.insert(rid, self.nodes.len());
        self.nodes.push(node);
        Ok(())
    }

    /// Operands normally have a node already; one that was hidden as an intermediate
    /// still gets a plain node once something refers to it.
    fn ensure_node(&mut self, rid: RecordId) -> Result<()> {
        let kind = if self.parsed.registry[rid].is_initial {
            NodeKind::Initial
        } else {
            NodeKind::Derived
        };
        self.add_node(rid, kind)
    }

    fn add_edge(
        &mut self,
        from: RecordId,
        to: RecordId,
        label: String,
        side: Option<Side>,
        kind: EdgeKind,
    ) -> Result<()> {
        self.ensure_node(to)?;
        self.edges.push(Edge {
            from: self.key(from),
            to: self.key(to),
            label,
            side,
            kind,
        });
        Ok(())
    }

    fn add_operation(&mut self, operation: &Operation) -> Result<()> {
        match operation {
            Operation::Init { result, .. } => self.add_node(result.record, NodeKind::Initial),
            Operation::Copy { source, result, .. } => {
                self.add_node(result.record, NodeKind::Copy)?;
                self.add_edge(
                    result.record,
                    source.record,
                    operation.kind(),
                    None,
                    EdgeKind::Copy,
                )
            }
            // renaming mutates the target in place
            Operation::Replace { .. } => Ok(()),
            Operation::Minimize {
                operand, result, ..
            } => {
                self.add_node(result.record, NodeKind::Derived)?;
                self.add_edge(
                    result.record,
                    operand.record,
                    operation.kind(),
                    None,
                    EdgeKind::Derivation,
                )
            }
            Operation::Product {
                lhs,
                rhs,
                product,
                minimized,
                ..
            } => {
                let kind = operation.kind();
                let (top, label) = if self.show_intermediate {
                    (product.record, kind)
                } else {
                    (minimized.record, format!("min + {kind}"))
                };
                self.add_node(top, NodeKind::Derived)?;
                self.add_edge(
                    top,
                    lhs.record,
                    label.clone(),
                    Some(Side::Left),
                    EdgeKind::Derivation,
                )?;
                self.add_edge(top, rhs.record, label, Some(Side::Right), EdgeKind::Derivation)?;
                self.add_minimization(product.record, minimized.record)
            }
            Operation::Project {
                operand,
                projected,
                minimized,
                ..
            } => {
                let kind = operation.kind();
                let (top, label) = if self.show_intermediate {
                    (projected.record, kind)
                } else {
                    (minimized.record, format!("min + {kind}"))
                };
                self.add_node(top, NodeKind::Derived)?;
                self.add_edge(top, operand.record, label, None, EdgeKind::Derivation)?;
                self.add_minimization(projected.record, minimized.record)
            }
        }
    }

    /// minimization step of a product or projection, when intermediates are shown
    fn add_minimization(&mut self, intermediate: RecordId, minimized: RecordId) -> Result<()> {
        if !self.show_intermediate {
            return Ok(());
        }
        self.add_node(minimized, NodeKind::Derived)?;
        self.add_edge(
            minimized,
            intermediate,
            "min".to_string(),
            None,
            EdgeKind::Derivation,
        )
    }
}

/// Assembles the provenance graph of a parsed trace. Node labels reflect the final
/// state of every record, i.e. after all renames in the trace.
pub fn build_graph(
    name: impl Into<String>,
    parsed: &ParsedTrace,
    config: &Config,
) -> Result<ProvenanceGraph> {
    let mut builder = GraphBuilder {
        parsed,
        show_intermediate: config.show_minimized_intermediate_nodes,
        nodes: vec![],
        index: FxHashMap::default(),
        edges: vec![],
    };
    for operation in &parsed.operations {
        builder.add_operation(operation)?;
    }
    Ok(ProvenanceGraph {
        name: name.into(),
        nodes: builder.nodes,
        edges: builder.edges,
    })
}
