use crate::compute::ComputationError;
use crate::config;
use crate::display::trace;
use crate::model::{Entry, Model};
use pyo3::exceptions::{PyKeyError, PyRuntimeError, PyValueError};
use pyo3::prelude::*;

fn to_py_err(e: ComputationError) -> PyErr {
    match e.root_cause() {
        ComputationError::UnknownName { .. } => PyKeyError::new_err(e.to_string()),
        ComputationError::OutOfRange { .. } | ComputationError::Mismatch { .. } => {
            PyRuntimeError::new_err(e.to_string())
        }
        _ => PyValueError::new_err(e.to_string()),
    }
}

#[pyclass(name = "_Model")]
#[derive(Debug, Clone)]
pub struct PyModel {
    inner: Model,
}

#[pymethods]
impl PyModel {
    #[new]
    pub fn new(n_periods: usize) -> PyResult<Self> {
        Ok(Self { inner: Model::new(n_periods).map_err(to_py_err)? })
    }

    #[staticmethod]
    pub fn from_json(json: &str) -> PyResult<Self> {
        Ok(Self { inner: config::from_json_str(json).map_err(to_py_err)? })
    }

    pub fn to_json(&self) -> PyResult<String> {
        config::to_json_string(&self.inner).map_err(to_py_err)
    }

    #[getter]
    pub fn n_periods(&self) -> usize { self.inner.n_periods() }

    pub fn add_variables(&mut self, names: Vec<String>) -> PyResult<()> {
        self.inner.add_variables(names).map_err(to_py_err)
    }

    pub fn set_unit(&mut self, name: &str, unit: String) -> PyResult<()> {
        self.inner.set_unit(name, unit).map_err(to_py_err)
    }

    pub fn set_initials(&mut self, pairs: Vec<(String, f64)>) -> PyResult<()> {
        self.inner.set_initials(pairs).map_err(to_py_err)
    }

    /// A one-element list is a scalar.
    pub fn set_parameters(&mut self, pairs: Vec<(String, Vec<f64>)>) -> PyResult<()> {
        self.inner.set_parameters(pairs).map_err(to_py_err)
    }

    pub fn set_rules(&mut self, pairs: Vec<(String, String)>) -> PyResult<()> {
        self.inner.set_rules(pairs).map_err(to_py_err)
    }

    pub fn sort_rules(&mut self) -> PyResult<()> {
        self.inner.sort_rules().map_err(to_py_err)
    }

    pub fn calculate(&mut self) -> PyResult<()> {
        self.inner.calculate().map_err(to_py_err)
    }

    /// All slots of a variable, or the raw values of a parameter.
    pub fn get(&self, name: &str) -> PyResult<Vec<Option<f64>>> {
        match self.inner.get(name).map_err(to_py_err)? {
            Entry::Variable(acc) => Ok(acc.values().to_vec()),
            Entry::Parameter(p) => Ok(p.to_vec().into_iter().map(Some).collect()),
        }
    }

    pub fn value_at(&self, name: &str, period: usize) -> PyResult<Option<f64>> {
        self.inner.value_at(name, period).map_err(to_py_err)
    }

    pub fn is_parameter(&self, name: &str) -> PyResult<bool> {
        Ok(matches!(self.inner.get(name).map_err(to_py_err)?, Entry::Parameter(_)))
    }

    #[pyo3(signature = (name, period, max_depth = 8))]
    pub fn trace(&self, name: &str, period: usize, max_depth: usize) -> PyResult<String> {
        trace::format_trace(&self.inner, name, period, max_depth).map_err(to_py_err)
    }

    pub fn rules(&self) -> Vec<(String, String)> {
        self.inner.rules().iter().map(|r| (r.target.clone(), r.formula.clone())).collect()
    }
}
