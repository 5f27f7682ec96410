// Copyright 2025 Cornell University
// released under MIT License

use crate::graph::{EdgeKind, NodeKind, ProvenanceGraph, Side};
use std::io::Write;

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            c => out.push(c),
        }
    }
    out
}

/// Renders the graph in Graphviz DOT syntax.
pub fn write_dot(out: &mut impl Write, graph: &ProvenanceGraph) -> std::io::Result<()> {
    writeln!(out, "digraph \"{}\" {{", escape(&graph.name))?;
    for node in &graph.nodes {
        write!(
            out,
            "  \"{}\" [label=\"{}\", tooltip=\"{}\"",
            node.key,
            escape(&node.label),
            escape(&node.tooltip)
        )?;
        if node.kind == NodeKind::Initial {
            write!(out, ", shape=box")?;
        }
        writeln!(out, "];")?;
    }
    for edge in &graph.edges {
        write!(
            out,
            "  \"{}\" -> \"{}\" [label=\"{}\"",
            edge.from,
            edge.to,
            escape(&edge.label)
        )?;
        match edge.side {
            Some(Side::Left) => write!(out, ", tailport=sw")?,
            Some(Side::Right) => write!(out, ", tailport=se")?,
            None => {}
        }
        match edge.kind {
            EdgeKind::Derivation => write!(out, ", arrowhead=none")?,
            EdgeKind::Copy => write!(out, ", constraint=false, color=gray, fontcolor=gray")?,
        }
        writeln!(out, "];")?;
    }
    writeln!(out, "}}")
}

pub fn dot_to_string(graph: &ProvenanceGraph) -> String {
    let mut out = Vec::new();
    // writing into a Vec cannot fail
    let _ = write_dot(&mut out, graph);
    String::from_utf8_lossy(&out).into_owned()
}

/// Pretty-printed JSON description of the graph.
pub fn write_json(out: &mut impl Write, graph: &ProvenanceGraph) -> serde_json::Result<()> {
    serde_json::to_writer_pretty(&mut *out, graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, VariablePolicy};
    use crate::graph::build_graph;
    use crate::scanner::parse_trace;

    fn tree_graph(config: &Config) -> ProvenanceGraph {
        let text = std::fs::read_to_string("tests/traces/tree.trace").expect("failed to load");
        let parsed = parse_trace(&text, VariablePolicy::Strict).unwrap();
        build_graph("tree", &parsed, config).unwrap()
    }

    #[test]
    fn collapsed_tree_graph() {
        let config = Config {
            show_minimized_intermediate_nodes: false,
            ..Config::default()
        };
        insta::assert_snapshot!(dot_to_string(&tree_graph(&config)), @r#"
        digraph "tree" {
          "11_0" [label="Singleton(#1)\n2 states\np\n11", tooltip="Singleton(#1)", shape=box];
          "12_0" [label="Singleton(#2)\n2 states\nq\n12", tooltip="Singleton(#2)", shape=box];
          "14_0" [label="3 states\np,q\n14", tooltip="min(Singleton(#1) | Singleton(#2))"];
          "11_1" [label="2 states\np\n11", tooltip="min(proj #2(min(Singleton(#1) | Singleton(#2))))"];
          "14_0" -> "11_0" [label="min + |", tailport=sw, arrowhead=none];
          "14_0" -> "12_0" [label="min + |", tailport=se, arrowhead=none];
          "11_1" -> "14_0" [label="min + proj #2", arrowhead=none];
        }
        "#);
    }

    #[test]
    fn string_matches_writer_output() {
        let graph = tree_graph(&Config::default());
        let mut out = Vec::new();
        write_dot(&mut out, &graph).unwrap();
        assert_eq!(dot_to_string(&graph), String::from_utf8(out).unwrap());
    }

    #[test]
    fn escapes_quotes() {
        assert_eq!(escape("a \"b\"\\\nc"), "a \\\"b\\\"\\\\\\nc");
    }

    #[test]
    fn json_lists_nodes_and_edges() {
        let graph = tree_graph(&Config::default());
        let mut out = Vec::new();
        write_json(&mut out, &graph).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();

        assert_eq!(value["name"], "tree");
        assert_eq!(value["nodes"].as_array().unwrap().len(), 6);
        assert_eq!(value["nodes"][0]["key"]["id"], "11");
        assert_eq!(value["nodes"][0]["kind"], "initial");
        assert_eq!(value["edges"][0]["side"], "left");
        assert_eq!(value["edges"][0]["label"], "|");
        // unary edges carry no side
        assert!(value["edges"][2].get("side").is_none());
    }
}
