//! Defines the error type shared by registration, linking and evaluation.
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ComputationError {
    #[error("Unknown name '{name}'")]
    UnknownName { name: String },
    #[error("'{name}' is not a variable")]
    NotAVariable { name: String },
    #[error("'{name}' is already registered as a {existing}")]
    NameConflict { name: String, existing: &'static str },
    #[error("Parameter '{name}' has {actual} values; expected 1 or {expected}")]
    LengthMismatch { name: String, expected: usize, actual: usize },
    #[error("Period {period} of '{name}' is out of range 1..={max}")]
    OutOfRange { name: String, period: i64, max: usize },
    #[error("Malformed formula '{formula}' at byte {position}: {reason}")]
    MalformedFormula { formula: String, position: usize, reason: String },
    #[error("A model needs at least one period, got {0}")]
    InvalidPeriodCount(usize),
    #[error("Rule #{index} for '{target}' could not be linked (formula: {formula})")]
    InvalidRule {
        index: usize,
        target: String,
        formula: String,
        #[source]
        source: Box<ComputationError>,
    },
    #[error("Rule #{index} for '{target}' failed at period {period} (formula: {formula})")]
    RuleFailed {
        index: usize,
        target: String,
        period: usize,
        formula: String,
        #[source]
        source: Box<ComputationError>,
    },
    #[error("Structural mismatch: {msg}")]
    Mismatch { msg: String },
    #[error("Cycle detected among rules for {0:?}")]
    CycleDetected(Vec<String>),
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl ComputationError {
    /// The innermost error, looking through rule context wrappers.
    pub fn root_cause(&self) -> &ComputationError {
        match self {
            ComputationError::InvalidRule { source, .. }
            | ComputationError::RuleFailed { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

impl From<serde_json::Error> for ComputationError {
    fn from(e: serde_json::Error) -> Self { ComputationError::Serialization(e.to_string()) }
}

impl From<std::io::Error> for ComputationError {
    fn from(e: std::io::Error) -> Self { ComputationError::Serialization(e.to_string()) }
}
