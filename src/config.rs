//! Model documents: a serializable description of a whole model.
//!
//! ```json
//! {
//!   "n_periods": 12,
//!   "variables": [{ "name": "cash", "unit": "USD", "initial": 0.0 }],
//!   "parameters": { "price": 8, "volume": [10, 10, 11, 12, 12, 12, 13, 13, 13, 14, 14, 14, 15] },
//!   "rules": [{ "target": "cash", "formula": ":cash[-1] + :price * :volume" }]
//! }
//! ```
//!
//! Only inputs are stored. Computed slots are rebuilt with `Model::calculate`.

use crate::compute::error::ComputationError;
use crate::model::Model;
use crate::store::Parameter;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSpec {
    pub target: String,
    pub formula: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSpec {
    pub n_periods: usize,
    #[serde(default)]
    pub variables: Vec<VariableSpec>,
    #[serde(default)]
    pub parameters: BTreeMap<String, Parameter>,
    /// Evaluation order is list order.
    #[serde(default)]
    pub rules: Vec<RuleSpec>,
}

impl Model {
    /// Builds a model through the regular registration calls, so a document
    /// is held to the same checks as code.
    pub fn from_spec(spec: &ModelSpec) -> Result<Self, ComputationError> {
        let mut model = Model::new(spec.n_periods)?;
        model.add_variables(spec.variables.iter().map(|v| v.name.as_str()))?;
        for v in &spec.variables {
            if let Some(unit) = &v.unit {
                model.set_unit(&v.name, unit.clone())?;
            }
        }
        model.set_initials(spec.variables.iter().filter_map(|v| v.initial.map(|x| (v.name.as_str(), x))))?;
        model.set_parameters(spec.parameters.iter().map(|(k, v)| (k.clone(), v.clone())))?;
        model.set_rules(spec.rules.iter().map(|r| (r.target.clone(), r.formula.clone())))?;
        Ok(model)
    }

    pub fn to_spec(&self) -> ModelSpec {
        ModelSpec {
            n_periods: self.n_periods(),
            variables: self
                .variables()
                .map(|acc| VariableSpec {
                    name: acc.name.clone(),
                    unit: acc.unit.as_ref().map(|u| u.0.clone()),
                    initial: acc.initial(),
                })
                .collect(),
            parameters: self.parameters().map(|(k, v)| (k.to_string(), v.clone())).collect(),
            rules: self
                .rules()
                .iter()
                .map(|r| RuleSpec { target: r.target.clone(), formula: r.formula.clone() })
                .collect(),
        }
    }
}

pub fn from_json_str(json: &str) -> Result<Model, ComputationError> {
    let spec: ModelSpec = serde_json::from_str(json)?;
    Model::from_spec(&spec)
}

pub fn to_json_string(model: &Model) -> Result<String, ComputationError> {
    Ok(serde_json::to_string_pretty(&model.to_spec())?)
}

pub fn load(path: impl AsRef<Path>) -> Result<Model, ComputationError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)?;
    let model = from_json_str(&text)?;
    tracing::info!(path = %path.display(), n_periods = model.n_periods(), "model loaded");
    Ok(model)
}

pub fn save(model: &Model, path: impl AsRef<Path>) -> Result<(), ComputationError> {
    let path = path.as_ref();
    fs::write(path, to_json_string(model)?)?;
    tracing::info!(path = %path.display(), "model saved");
    Ok(())
}
