//! Formula surface syntax: tokenizer, parser and expression tree.
//!
//! Formulas are arithmetic over `:name[k]` (value of `name` at period `t + k`)
//! and bare `:name` (a parameter). They are parsed once, when a rule is
//! registered; evaluation never touches the text again.
pub mod ast;
pub mod lexer;
pub mod parser;

pub use ast::{BinaryOp, Expr, Reference};

use crate::compute::error::ComputationError;

/// A parse failure, positioned at a byte offset of the formula text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    pub position: usize,
    pub reason: String,
}

impl SyntaxError {
    pub fn new(position: usize, reason: impl Into<String>) -> Self {
        Self { position, reason: reason.into() }
    }

    pub fn into_error(self, formula: &str) -> ComputationError {
        ComputationError::MalformedFormula {
            formula: formula.to_string(),
            position: self.position,
            reason: self.reason,
        }
    }
}

/// Parses `formula`, reporting failures as `MalformedFormula`.
pub fn parse_formula(formula: &str) -> Result<Expr, ComputationError> {
    parser::parse(formula).map_err(|e| e.into_error(formula))
}
