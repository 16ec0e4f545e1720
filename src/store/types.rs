use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct AccountId(pub u32);

impl AccountId {
    #[inline(always)]
    pub fn index(&self) -> usize { self.0 as usize }
    pub fn new(idx: usize) -> Self { Self(idx as u32) }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct ParamId(pub u32);

impl ParamId {
    #[inline(always)]
    pub fn index(&self) -> usize { self.0 as usize }
    pub fn new(idx: usize) -> Self { Self(idx as u32) }
}

/// What a name in the model's namespace resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Symbol {
    Variable(AccountId),
    Parameter(ParamId),
}

/// Unit of measurement for an account. Carried for display only; arithmetic never checks it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Unit(pub String);

/// One line item across all periods.
///
/// Slot 1 (index 0) holds the initial condition, slots 2..=n_periods+1 hold
/// values written by rules. `None` marks an unset slot.
#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    pub name: String,
    pub unit: Option<Unit>,
    values: Vec<Option<f64>>,
}

impl Account {
    pub fn new(name: impl Into<String>, n_periods: usize) -> Self {
        Self {
            name: name.into(),
            unit: None,
            values: vec![None; n_periods + 1],
        }
    }

    pub fn len(&self) -> usize { self.values.len() }

    pub fn is_empty(&self) -> bool { self.values.is_empty() }

    /// All slots, index 0 being period 1.
    pub fn values(&self) -> &[Option<f64>] { &self.values }

    /// Value at a 1-based period, `None` if unset or outside the series.
    #[inline(always)]
    pub fn get(&self, period: usize) -> Option<f64> {
        period.checked_sub(1).and_then(|i| self.values.get(i)).copied().flatten()
    }

    pub fn initial(&self) -> Option<f64> { self.get(1) }

    pub(crate) fn set(&mut self, period: usize, value: Option<f64>) {
        if let Some(slot) = period.checked_sub(1).and_then(|i| self.values.get_mut(i)) {
            *slot = value;
        }
    }

    /// Clears every computed slot, keeping the initial condition.
    pub(crate) fn reset_computed(&mut self) {
        for slot in self.values.iter_mut().skip(1) {
            *slot = None;
        }
    }
}

/// Exogenous input. A scalar is constant over all periods; a series has one value per period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Parameter {
    Scalar(f64),
    Series(Vec<f64>),
}

impl Parameter {
    pub fn len(&self) -> usize {
        match self { Parameter::Scalar(_) => 1, Parameter::Series(v) => v.len() }
    }

    pub fn is_empty(&self) -> bool { self.len() == 0 }

    /// Value at a 1-based period. Scalars ignore the period.
    #[inline(always)]
    pub fn get_at(&self, period: usize) -> Option<f64> {
        match self {
            Parameter::Scalar(s) => Some(*s),
            Parameter::Series(v) => period.checked_sub(1).and_then(|i| v.get(i)).copied(),
        }
    }

    pub fn to_vec(&self) -> Vec<f64> {
        match self { Parameter::Scalar(s) => vec![*s], Parameter::Series(v) => v.clone() }
    }
}

impl From<f64> for Parameter {
    fn from(value: f64) -> Self { Parameter::Scalar(value) }
}

impl From<Vec<f64>> for Parameter {
    /// A one-element vector collapses to a scalar.
    fn from(value: Vec<f64>) -> Self {
        if value.len() == 1 { Parameter::Scalar(value[0]) } else { Parameter::Series(value) }
    }
}

impl From<&[f64]> for Parameter {
    fn from(value: &[f64]) -> Self { Parameter::from(value.to_vec()) }
}
