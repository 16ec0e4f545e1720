use super::types::*;
use crate::compute::error::ComputationError;
use std::collections::HashMap;

/// The model's namespace: accounts and parameters under one name index.
///
/// A name maps to exactly one `Symbol`, so a lookup never has to probe two
/// tables. Ids are dense indices into the columnar arrays.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    n_periods: usize,
    pub accounts: Vec<Account>,
    pub parameters: Vec<(String, Parameter)>,
    index: HashMap<String, Symbol>,
}

impl Registry {
    pub fn new(n_periods: usize) -> Self {
        Self { n_periods, ..Default::default() }
    }

    pub fn n_periods(&self) -> usize { self.n_periods }

    /// Number of slots in every account and every series parameter.
    pub fn series_len(&self) -> usize { self.n_periods + 1 }

    pub fn resolve(&self, name: &str) -> Option<Symbol> {
        self.index.get(name).copied()
    }

    pub fn account(&self, id: AccountId) -> &Account { &self.accounts[id.index()] }

    pub fn account_mut(&mut self, id: AccountId) -> &mut Account { &mut self.accounts[id.index()] }

    pub fn parameter(&self, id: ParamId) -> &(String, Parameter) { &self.parameters[id.index()] }

    pub fn name_of(&self, symbol: Symbol) -> &str {
        match symbol {
            Symbol::Variable(id) => &self.accounts[id.index()].name,
            Symbol::Parameter(id) => &self.parameters[id.index()].0,
        }
    }

    pub fn variable_id(&self, name: &str) -> Result<AccountId, ComputationError> {
        match self.resolve(name) {
            Some(Symbol::Variable(id)) => Ok(id),
            Some(Symbol::Parameter(_)) => Err(ComputationError::NotAVariable { name: name.to_string() }),
            None => Err(ComputationError::UnknownName { name: name.to_string() }),
        }
    }

    /// Creates a fresh, fully unset account. Re-adding an existing variable wipes it in place.
    pub fn add_variable(&mut self, name: &str) -> Result<AccountId, ComputationError> {
        match self.resolve(name) {
            Some(Symbol::Variable(id)) => {
                self.accounts[id.index()] = Account::new(name, self.n_periods);
                Ok(id)
            }
            Some(Symbol::Parameter(_)) => Err(ComputationError::NameConflict {
                name: name.to_string(),
                existing: "parameter",
            }),
            None => {
                let id = AccountId::new(self.accounts.len());
                self.accounts.push(Account::new(name, self.n_periods));
                self.index.insert(name.to_string(), Symbol::Variable(id));
                Ok(id)
            }
        }
    }

    /// Checks a parameter against the namespace and the period count, normalizing
    /// one-element series to scalars.
    pub fn check_parameter(&self, name: &str, value: Parameter) -> Result<Parameter, ComputationError> {
        if let Some(Symbol::Variable(_)) = self.resolve(name) {
            return Err(ComputationError::NameConflict { name: name.to_string(), existing: "variable" });
        }
        match value {
            Parameter::Series(v) if v.len() == 1 => Ok(Parameter::Scalar(v[0])),
            Parameter::Series(v) if v.len() != self.series_len() => Err(ComputationError::LengthMismatch {
                name: name.to_string(),
                expected: self.series_len(),
                actual: v.len(),
            }),
            other => Ok(other),
        }
    }

    /// Drops every parameter and installs `params`, which must already be checked.
    pub fn replace_parameters(&mut self, params: Vec<(String, Parameter)>) {
        self.index.retain(|_, sym| matches!(sym, Symbol::Variable(_)));
        self.parameters.clear();
        for (name, value) in params {
            match self.index.get(&name) {
                // A repeated name keeps the last value.
                Some(Symbol::Parameter(id)) => self.parameters[id.index()].1 = value,
                _ => {
                    let id = ParamId::new(self.parameters.len());
                    self.index.insert(name.clone(), Symbol::Parameter(id));
                    self.parameters.push((name, value));
                }
            }
        }
    }
}
