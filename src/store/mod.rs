//! Accounts, parameters and the namespace that binds them.
pub mod registry;
pub mod types;

pub use registry::Registry;
pub use types::{Account, AccountId, ParamId, Parameter, Symbol, Unit};
