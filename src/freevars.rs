// Copyright 2025 Cornell University
// released under MIT License

use crate::ir::VarToken;
use crate::shapes;
use std::collections::BTreeSet;

/// Marker line announcing a block in DFA-transition form. Any other marker means the
/// block is in tree-transition form.
pub const DFA_MARKER: &str = "Resulting DFA:";

/// lines between a DFA marker and its first transition
const DFA_HEADER_LINES: usize = 5;
/// lines between a tree-automaton marker and the first line worth looking at
const TREE_HEADER_LINES: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockFormat {
    Dfa,
    Tree,
}

impl BlockFormat {
    pub fn from_marker(marker: &str) -> Self {
        if marker == DFA_MARKER {
            BlockFormat::Dfa
        } else {
            BlockFormat::Tree
        }
    }
}

/// Free-variable tokens of the transition block starting right after its marker line.
pub fn block_free_vars(block: &[&str], format: BlockFormat) -> BTreeSet<VarToken> {
    let mut free_vars = BTreeSet::new();
    match format {
        BlockFormat::Dfa => {
            for line in block.iter().skip(DFA_HEADER_LINES) {
                let Some(labels) = shapes::dfa_transition(line) else {
                    break;
                };
                free_vars.extend(label_vars(labels));
            }
        }
        BlockFormat::Tree => {
            for line in block.iter().skip(TREE_HEADER_LINES) {
                if is_tree_header(line) {
                    continue;
                }
                let Some(labels) = shapes::tree_transition(line) else {
                    break;
                };
                free_vars.extend(label_vars(labels));
            }
        }
    }
    free_vars
}

fn is_tree_header(line: &str) -> bool {
    line.is_empty()
        || line.starts_with("State space")
        || line.starts_with("Initial state:")
        || line.starts_with("Transitions:")
}

/// `#1=0, #2=1` -> `#1`, `#2`
fn label_vars(labels: &str) -> impl Iterator<Item = VarToken> + '_ {
    let labels = if labels.trim().is_empty() { "" } else { labels };
    labels
        .split(", ")
        .filter(|entry| !entry.is_empty())
        .map(|entry| entry.split('=').next().unwrap_or(entry).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(tokens: &[&str]) -> BTreeSet<VarToken> {
        tokens.iter().map(|t| t.to_string()).collect()
    }

    const DFA_BLOCK: &[&str] = &[
        "Initial state: 0",
        "Accepting states: 1",
        "Rejecting states: 0",
        "Don't-care states: 2",
        "",
        "State 0: #1=0 -> state 1",
        "State 0: #1=1, #2=0 -> state 2",
        "State 1:  -> state 1",
        "State 2: #3=1 -> state 2",
        "",
        "  Minimizing (3,0,0x1) -> (2,0,0x2)",
    ];

    #[test]
    fn dfa_block() {
        assert_eq!(
            block_free_vars(DFA_BLOCK, BlockFormat::Dfa),
            set(&["#1", "#2", "#3"])
        );
    }

    #[test]
    fn dfa_block_stops_at_first_other_line() {
        let mut block = DFA_BLOCK.to_vec();
        block.insert(7, "Copying (3,1,0x10) to (3,2,0x20)");
        assert_eq!(block_free_vars(&block, BlockFormat::Dfa), set(&["#1", "#2"]));
    }

    #[test]
    fn parsing_a_block_twice_agrees() {
        let first = block_free_vars(DFA_BLOCK, BlockFormat::Dfa);
        let second = block_free_vars(DFA_BLOCK, BlockFormat::Dfa);
        assert_eq!(first, second);
    }

    #[test]
    fn tree_block_skips_interleaved_headers() {
        let block = [
            "Guide:",
            "  0: 0 -> (0,0)",
            "Universes:",
            "State space 0 'Main' (size 3):",
            "Initial state: 0",
            "Transitions:",
            "(0,0,#1=0) -> 1",
            "(1,0,#1=1, #4=0) -> 2",
            "",
            "State space 1 'Right' (size 2):",
            "Initial state: 0",
            "Transitions:",
            "(0,0,) -> 1",
            "(1,1,#5=1) -> 1",
            "Copying (3,1,0x10) to (3,2,0x20)",
            "(0,0,#6=1) -> 1",
        ];
        assert_eq!(
            block_free_vars(&block, BlockFormat::Tree),
            set(&["#1", "#4", "#5"])
        );
    }

    #[test]
    fn format_follows_marker() {
        assert_eq!(BlockFormat::from_marker("Resulting DFA:"), BlockFormat::Dfa);
        assert_eq!(BlockFormat::from_marker("Resulting GTA:"), BlockFormat::Tree);
    }
}
