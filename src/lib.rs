// Copyright 2025 Cornell University
// released under MIT License

pub mod batch;
pub mod config;
pub mod diagnostic;
pub mod dot;
pub mod errors;
mod freevars;
pub mod graph;
mod handlers;
pub mod ir;
pub mod mona;
pub mod registry;
pub mod scanner;
mod shapes;
pub mod summary;
pub mod symbols;
pub mod table;
