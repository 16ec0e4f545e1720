//! Links rules into bytecode and runs the per-period evaluation pass.
pub mod bytecode;
pub mod engine;
pub mod error;
pub mod kernel;

pub use engine::Engine;
pub use error::ComputationError;
