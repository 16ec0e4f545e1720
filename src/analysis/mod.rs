//! Optional static analysis over a model's rules.
pub mod topology;
