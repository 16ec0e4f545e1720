//! Discrete-time simulation of accounting relationships.
//!
//! A [`Model`] holds accounts (one optional value per period), parameters and
//! an ordered list of rules. Each rule is a formula over `:name[k]` offset
//! references and bare `:name` parameter references; `calculate` evaluates
//! every rule, in declared order, for each period after the first.

pub mod analysis;
pub mod compute;
pub mod config;
pub mod display;
pub mod formula;
pub mod model;
pub mod scenario;
pub mod store;

#[cfg(feature = "python")]
pub mod bindings;

pub use compute::ComputationError;
pub use model::{Entry, Model, Rule};
pub use store::{Account, Parameter, Unit};

// FFI Facade: The main entry point for Python.
#[cfg(feature = "python")]
mod ffi {
    use crate::bindings::python::PyModel;
    use pyo3::prelude::*;

    /// The version of the compiled core, for sanity checks from Python.
    #[pyfunction]
    fn rust_core_version() -> &'static str {
        env!("CARGO_PKG_VERSION")
    }

    /// This function defines the `_core` Python module.
    /// The name `_core` is chosen to indicate it's an internal, compiled component.
    #[pymodule]
    fn _core(_py: Python, m: &Bound<'_, PyModule>) -> PyResult<()> {
        m.add_function(wrap_pyfunction!(rust_core_version, m)?)?;
        m.add_class::<PyModel>()?;
        Ok(())
    }
}
