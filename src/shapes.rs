// Copyright 2025 Cornell University
// released under MIT License

//! Recognizers for the individual line shapes of a construction trace.
//! Every function returns `None` when the line does not have the shape.

use crate::ir::{AutomatonId, Triplet, VarToken};
use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;

#[derive(Parser)]
#[grammar = "trace.pest"]
struct TraceLineParser;

fn matching(rule: Rule, line: &str) -> Option<Pair<'_, Rule>> {
    TraceLineParser::parse(rule, line).ok()?.next()
}

fn to_triplet(pair: Pair<'_, Rule>) -> Option<Triplet> {
    let mut inner = pair.into_inner();
    let size = inner.next()?.as_str().parse().ok()?;
    let generation = inner.next()?.as_str().parse().ok()?;
    let id = AutomatonId::new(inner.next()?.as_str());
    Some(Triplet {
        size,
        generation,
        id,
    })
}

fn inner_triplets(pair: Pair<'_, Rule>) -> Option<Vec<Triplet>> {
    pair.into_inner()
        .filter(|p| p.as_rule() == Rule::triplet)
        .map(to_triplet)
        .collect()
}

fn inner_tokens(pair: Pair<'_, Rule>) -> Vec<VarToken> {
    pair.into_inner()
        .filter(|p| p.as_rule() == Rule::var_token)
        .map(|p| p.as_str().to_string())
        .collect()
}

fn pair_of(triplets: Vec<Triplet>) -> Option<(Triplet, Triplet)> {
    let [a, b] = <[Triplet; 2]>::try_from(triplets).ok()?;
    Some((a, b))
}

/// All `(size,generation,id)` triplets on a line, left to right.
pub fn triplets(line: &str) -> Vec<Triplet> {
    matching(Rule::triplets, line)
        .and_then(inner_triplets)
        .unwrap_or_default()
}

/// `Automaton (s,g,id)`
pub fn automaton_header(line: &str) -> Option<Triplet> {
    inner_triplets(matching(Rule::automaton_header, line)?)?
        .into_iter()
        .next()
}

/// `[#old->#new]`
pub fn rename(line: &str) -> Option<(VarToken, VarToken)> {
    let [old, new] = <[VarToken; 2]>::try_from(inner_tokens(matching(Rule::rename, line)?)).ok()?;
    Some((old, new))
}

/// Stand-alone minimization: `  Minimizing (..) -> (..)` at the start of the line.
pub fn minimize_line(line: &str) -> Option<(Triplet, Triplet)> {
    pair_of(inner_triplets(matching(Rule::minimize_line, line)?)?)
}

/// Minimization reported inside a product or projection block.
pub fn minimize_step(line: &str) -> Option<(Triplet, Triplet)> {
    pair_of(inner_triplets(matching(Rule::minimize_step, line)?)?)
}

/// `(..)x(..) -> (..)`: left operand, right operand, product.
pub fn product_step(line: &str) -> Option<(Triplet, Triplet, Triplet)> {
    let [lhs, rhs, product] =
        <[Triplet; 3]>::try_from(inner_triplets(matching(Rule::product_step, line)?)?).ok()?;
    Some((lhs, rhs, product))
}

/// `(..) -> (..)`: operand and projected automaton.
pub fn projection_step(line: &str) -> Option<(Triplet, Triplet)> {
    pair_of(inner_triplets(matching(Rule::projection_step, line)?)?)
}

/// `Projecting #n`
pub fn projection_marker(line: &str) -> Option<VarToken> {
    inner_tokens(matching(Rule::projection_marker, line)?)
        .into_iter()
        .next()
}

/// Label list of `State <n>: <labels> -> state <n>`.
pub fn dfa_transition(line: &str) -> Option<&str> {
    matching(Rule::dfa_transition, line)?
        .into_inner()
        .find(|p| p.as_rule() == Rule::dfa_labels)
        .map(|p| p.as_str())
}

/// Label list of `(<n>,<n>,<labels>) -> <n>`.
pub fn tree_transition(line: &str) -> Option<&str> {
    matching(Rule::tree_transition, line)?
        .into_inner()
        .find(|p| p.as_rule() == Rule::tree_labels)
        .map(|p| p.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(size: usize, generation: usize, id: &str) -> Triplet {
        Triplet {
            size,
            generation,
            id: AutomatonId::new(id),
        }
    }

    #[test]
    fn header_triplets() {
        assert_eq!(automaton_header("Automaton (5,0,1234)"), Some(t(5, 0, "1234")));
        assert_eq!(automaton_header("Automaton (5,0,0x55d0c8)"), Some(t(5, 0, "0x55d0c8")));
        assert_eq!(automaton_header("  Automaton (5,0,1234)"), None);
        assert_eq!(automaton_header("Resulting DFA:"), None);
    }

    #[test]
    fn all_triplets_on_a_line() {
        let line = "Copying (3,1,0x10) to (3,2,0x20)";
        assert_eq!(triplets(line), vec![t(3, 1, "0x10"), t(3, 2, "0x20")]);
        assert!(triplets("Replacing indices").is_empty());
    }

    #[test]
    fn minimizations() {
        let line = "  Minimizing (7,0,0x1f) -> (4,0,0x2a)";
        assert_eq!(minimize_line(line), Some((t(7, 0, "0x1f"), t(4, 0, "0x2a"))));
        assert_eq!(minimize_step(line), Some((t(7, 0, "0x1f"), t(4, 0, "0x2a"))));
        // inside a product block the step need not be indented by exactly two spaces
        let nested = "    Minimizing (7,0,0x1f) -> (4,0,0x2a)";
        assert_eq!(minimize_line(nested), None);
        assert!(minimize_step(nested).is_some());
    }

    #[test]
    fn product_and_projection_steps() {
        let line = "  (3,0,0xa)x(4,0,0xb) -> (12,0,0xc)";
        assert_eq!(
            product_step(line),
            Some((t(3, 0, "0xa"), t(4, 0, "0xb"), t(12, 0, "0xc")))
        );
        assert_eq!(product_step("  (3,0,0xa) -> (2,0,0xd)"), None);
        assert_eq!(
            projection_step("  (3,0,0xa) -> (2,0,0xd)"),
            Some((t(3, 0, "0xa"), t(2, 0, "0xd")))
        );
    }

    #[test]
    fn markers_and_renames() {
        assert_eq!(projection_marker("Projecting #3"), Some("#3".to_string()));
        assert_eq!(projection_marker("Projecting x"), None);
        assert_eq!(rename("[#2->#5]"), Some(("#2".to_string(), "#5".to_string())));
        assert_eq!(rename("Resulting DFA:"), None);
    }

    #[test]
    fn transition_labels() {
        assert_eq!(dfa_transition("State 0: #1=0 -> state 1"), Some("#1=0"));
        assert_eq!(dfa_transition("State 2: #1=0, #2=1 -> state 0"), Some("#1=0, #2=1"));
        assert_eq!(dfa_transition("State 2:  -> state 0"), Some(""));
        assert_eq!(dfa_transition("Transitions:"), None);

        assert_eq!(tree_transition("(0,1,#1=0, #2=1) -> 2"), Some("#1=0, #2=1"));
        assert_eq!(tree_transition("(0,0,) -> 1"), Some(""));
        assert_eq!(tree_transition("State space 0 'x':"), None);
    }
}
