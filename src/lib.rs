// ============================================================================
// HECS Performance Diagnostics - Library Interface
// ============================================================================
//
// Pipeline stages, leaves first:
// diagnostics → scanner/ast_engine → refactor (+ suggest) → benchmark
//
// The binary (main.rs) drives them through `cli`; integration tests use the
// library directly.

pub mod ast_engine;
pub mod benchmark;
pub mod cli;
pub mod config;
pub mod diagnostics;
pub mod pipeline;
pub mod refactor;
pub mod report;
pub mod scanner;
pub mod suggest;
