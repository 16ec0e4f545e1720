//! Parallel what-if runs over parameter overrides.
//!
//! Each scenario gets its own clone of the base model, so the single-threaded
//! engine is never shared between threads.

use crate::compute::error::ComputationError;
use crate::model::Model;
use crate::store::Parameter;
use rayon::prelude::*;
use std::collections::BTreeMap;

/// Named parameter overrides, laid over the base model's parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scenario {
    pub name: String,
    pub overrides: Vec<(String, Parameter)>,
}

impl Scenario {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), overrides: Vec::new() }
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Parameter>) -> Self {
        self.overrides.push((name.into(), value.into()));
        self
    }

    /// Clones `base`, applies the overrides and calculates.
    pub fn apply(&self, base: &Model) -> Result<Model, ComputationError> {
        let mut params: BTreeMap<String, Parameter> =
            base.parameters().map(|(k, v)| (k.to_string(), v.clone())).collect();
        for (name, value) in &self.overrides {
            params.insert(name.clone(), value.clone());
        }

        let mut model = base.clone();
        model.set_parameters(params)?;
        model.calculate()?;
        Ok(model)
    }
}

/// Outcome of one scenario.
#[derive(Debug, Clone)]
pub struct ScenarioResult {
    pub name: String,
    pub model: Result<Model, ComputationError>,
}

/// Runs every scenario in parallel. Results keep the input order.
pub fn run(base: &Model, scenarios: &[Scenario]) -> Vec<ScenarioResult> {
    tracing::info!(scenarios = scenarios.len(), "scenario sweep started");
    scenarios
        .par_iter()
        .map(|s| {
            let model = s.apply(base);
            if let Err(e) = &model {
                tracing::warn!(scenario = %s.name, error = %e, "scenario failed");
            }
            ScenarioResult { name: s.name.clone(), model }
        })
        .collect()
}
