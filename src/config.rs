// Copyright 2025 Cornell University
// released under MIT License

/// What to do with a variable token that the symbol table does not declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VariablePolicy {
    /// fail the trace with `UnresolvedVariable`
    #[default]
    Strict,
    /// keep the raw token as the variable name
    Lenient,
}

/// Options recognized while reconstructing and rendering one trace.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// keep the unminimized product / projection automaton as its own graph node
    pub show_minimized_intermediate_nodes: bool,
    /// append the id -> name table to the operation log
    pub show_all_automaton_names: bool,
    /// forwarded to the compiler runner, never enforced by the parser
    pub timeout_seconds: u64,
    pub variable_policy: VariablePolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            show_minimized_intermediate_nodes: true,
            show_all_automaton_names: true,
            timeout_seconds: 10,
            variable_policy: VariablePolicy::Strict,
        }
    }
}
