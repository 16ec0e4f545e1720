//! The public model: namespace, initial values, parameters and ordered rules.
use crate::analysis::topology;
use crate::compute::bytecode::Compiler;
use crate::compute::engine::Engine;
use crate::compute::error::ComputationError;
use crate::formula::{parse_formula, Expr};
use crate::store::{Account, Parameter, Registry, Symbol, Unit};

/// A target account and the formula that produces it, parsed once.
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub target: String,
    pub formula: String,
    pub expr: Expr,
}

impl Rule {
    /// Parses the formula without checking names against a namespace.
    pub fn parse(target: impl Into<String>, formula: impl Into<String>) -> Result<Self, ComputationError> {
        let formula = formula.into();
        let expr = parse_formula(&formula)?;
        Ok(Self { target: target.into(), formula, expr })
    }
}

/// Result of a unified name lookup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Entry<'a> {
    Variable(&'a Account),
    Parameter(&'a Parameter),
}

/// A discrete-time model over periods `1..=n_periods+1`.
///
/// Period 1 holds initial values; `calculate` fills periods `2..` by
/// evaluating rules in exactly the order they were registered.
#[derive(Debug, Clone)]
pub struct Model {
    registry: Registry,
    rules: Vec<Rule>,
}

impl Model {
    pub fn new(n_periods: usize) -> Result<Self, ComputationError> {
        if n_periods == 0 {
            return Err(ComputationError::InvalidPeriodCount(n_periods));
        }
        Ok(Self { registry: Registry::new(n_periods), rules: Vec::new() })
    }

    pub fn n_periods(&self) -> usize { self.registry.n_periods() }

    /// Creates a fully unset account per name. Re-adding a name wipes its data.
    pub fn add_variables<I, S>(&mut self, names: I) -> Result<(), ComputationError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut count = 0;
        for name in names {
            self.registry.add_variable(name.as_ref())?;
            count += 1;
        }
        tracing::debug!(count, "variables added");
        Ok(())
    }

    /// Tags a variable with a unit. Units are carried, never checked.
    pub fn set_unit(&mut self, name: &str, unit: impl Into<String>) -> Result<(), ComputationError> {
        let id = self.registry.variable_id(name)?;
        self.registry.account_mut(id).unit = Some(Unit(unit.into()));
        Ok(())
    }

    /// Writes each value into slot 1 of its variable. No write happens unless every name is a variable.
    pub fn set_initials<I, S>(&mut self, pairs: I) -> Result<(), ComputationError>
    where
        I: IntoIterator<Item = (S, f64)>,
        S: AsRef<str>,
    {
        let resolved = pairs
            .into_iter()
            .map(|(name, value)| -> Result<_, ComputationError> {
                Ok((self.registry.variable_id(name.as_ref())?, value))
            })
            .collect::<Result<Vec<_>, ComputationError>>()?;
        for &(id, value) in &resolved {
            self.registry.account_mut(id).set(1, Some(value));
        }
        tracing::debug!(count = resolved.len(), "initial values set");
        Ok(())
    }

    /// Replaces the whole parameter set. Nothing changes unless every entry is valid.
    pub fn set_parameters<I, S, P>(&mut self, pairs: I) -> Result<(), ComputationError>
    where
        I: IntoIterator<Item = (S, P)>,
        S: Into<String>,
        P: Into<Parameter>,
    {
        let checked = pairs
            .into_iter()
            .map(|(name, value)| -> Result<_, ComputationError> {
                let name: String = name.into();
                let value = self.registry.check_parameter(&name, value.into())?;
                Ok((name, value))
            })
            .collect::<Result<Vec<_>, ComputationError>>()?;
        tracing::debug!(count = checked.len(), "parameters replaced");
        self.registry.replace_parameters(checked);
        Ok(())
    }

    /// Replaces the whole rule list, preserving input order.
    ///
    /// Each formula is parsed and linked against the current namespace so that
    /// syntax errors, unknown names and bare variable references fail here
    /// rather than during `calculate`.
    pub fn set_rules<I, S, F>(&mut self, pairs: I) -> Result<(), ComputationError>
    where
        I: IntoIterator<Item = (S, F)>,
        S: Into<String>,
        F: Into<String>,
    {
        let compiler = Compiler::new(&self.registry);
        let mut rules = Vec::new();
        for (target, formula) in pairs {
            let rule = Rule::parse(target, formula)?;
            self.registry.variable_id(&rule.target)?;
            compiler.compile(&rule.expr, &rule.formula)?;
            rules.push(rule);
        }
        tracing::debug!(count = rules.len(), "rules replaced");
        self.rules = rules;
        Ok(())
    }

    pub fn rules(&self) -> &[Rule] { &self.rules }

    /// Reorders the rules so that each one runs after the rules it reads at
    /// offset 0. Never called implicitly; `calculate` always honours the
    /// current order.
    pub fn sort_rules(&mut self) -> Result<(), ComputationError> {
        let order = topology::rule_order(self)?;
        let mut slots: Vec<Option<Rule>> = std::mem::take(&mut self.rules).into_iter().map(Some).collect();
        self.rules = order.into_iter().filter_map(|i| slots[i].take()).collect();
        tracing::debug!(rules = self.rules.len(), "rules sorted by same-period dependencies");
        Ok(())
    }

    /// Unified lookup across variables and parameters.
    pub fn get(&self, name: &str) -> Result<Entry<'_>, ComputationError> {
        match self.registry.resolve(name) {
            Some(Symbol::Variable(id)) => Ok(Entry::Variable(self.registry.account(id))),
            Some(Symbol::Parameter(id)) => Ok(Entry::Parameter(&self.registry.parameter(id).1)),
            None => Err(ComputationError::UnknownName { name: name.to_string() }),
        }
    }

    pub fn account(&self, name: &str) -> Result<&Account, ComputationError> {
        let id = self.registry.variable_id(name)?;
        Ok(self.registry.account(id))
    }

    /// Value of `name` at a 1-based period; `None` when the slot is unset.
    pub fn value_at(&self, name: &str, period: usize) -> Result<Option<f64>, ComputationError> {
        let entry = self.get(name)?;
        let max = self.registry.series_len();
        if period < 1 || period > max {
            return Err(ComputationError::OutOfRange { name: name.to_string(), period: period as i64, max });
        }
        Ok(match entry {
            Entry::Variable(acc) => acc.get(period),
            Entry::Parameter(p) => p.get_at(period),
        })
    }

    pub fn variables(&self) -> impl Iterator<Item = &Account> { self.registry.accounts.iter() }

    pub fn parameters(&self) -> impl Iterator<Item = (&str, &Parameter)> {
        self.registry.parameters.iter().map(|(n, p)| (n.as_str(), p))
    }

    /// Runs the evaluation pass. Repeated calls with unchanged inputs give identical results.
    pub fn calculate(&mut self) -> Result<(), ComputationError> {
        Engine::calculate(&mut self.registry, &self.rules)
    }

    pub(crate) fn registry(&self) -> &Registry { &self.registry }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn counter_model() -> Model {
        let mut m = Model::new(40).unwrap();
        m.add_variables(["a", "b"]).unwrap();
        m.set_initials([("a", 10.0)]).unwrap();
        m.set_rules([("a", ":a[-1] + 1"), ("b", ":a[+0] * 3")]).unwrap();
        m
    }

    #[test]
    fn test_zero_periods_rejected() {
        assert_eq!(Model::new(0).unwrap_err(), ComputationError::InvalidPeriodCount(0));
    }

    #[rstest]
    #[case(1)]
    #[case(12)]
    #[case(40)]
    fn test_account_length_after_add(#[case] n: usize) {
        let mut m = Model::new(n).unwrap();
        m.add_variables(["x", "y"]).unwrap();
        assert_eq!(m.account("x").unwrap().len(), n + 1);
        assert_eq!(m.account("y").unwrap().len(), n + 1);
    }

    #[test]
    fn test_initials_fill_slot_one_only() {
        let mut m = Model::new(3).unwrap();
        m.add_variables(["cash"]).unwrap();
        m.set_initials([("cash", 42.0)]).unwrap();
        assert_eq!(m.value_at("cash", 1).unwrap(), Some(42.0));
        assert_eq!(m.value_at("cash", 2).unwrap(), None);
    }

    #[test]
    fn test_initials_are_all_or_nothing() {
        let mut m = Model::new(3).unwrap();
        m.add_variables(["cash"]).unwrap();
        let err = m.set_initials([("cash", 1.0), ("ghost", 2.0)]).unwrap_err();
        assert_eq!(err, ComputationError::UnknownName { name: "ghost".into() });
        assert_eq!(m.value_at("cash", 1).unwrap(), None);
    }

    #[test]
    fn test_initials_reject_parameters() {
        let mut m = Model::new(3).unwrap();
        m.set_parameters([("price", 8.0)]).unwrap();
        let err = m.set_initials([("price", 1.0)]).unwrap_err();
        assert_eq!(err, ComputationError::NotAVariable { name: "price".into() });
    }

    #[test]
    fn test_end_to_end_counter() {
        let mut m = counter_model();
        m.calculate().unwrap();
        assert_eq!(m.value_at("a", 41).unwrap(), Some(50.0));
        assert_eq!(m.value_at("b", 41).unwrap(), Some(150.0));
        assert_eq!(m.value_at("b", 1).unwrap(), None);
    }

    #[test]
    fn test_calculate_is_idempotent() {
        let mut m = counter_model();
        m.calculate().unwrap();
        let first: Vec<Account> = m.variables().cloned().collect();
        m.calculate().unwrap();
        let second: Vec<Account> = m.variables().cloned().collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_failed_pass_is_repeatable() {
        let mut m = Model::new(3).unwrap();
        m.add_variables(["a", "lead"]).unwrap();
        m.set_initials([("a", 1.0)]).unwrap();
        m.set_rules([("lead", ":a[+1]"), ("a", ":a[-1] * 2")]).unwrap();

        // `lead` reads a period that is not computed yet, and at the last
        // period a[t+1] does not exist at all.
        let first_err = m.calculate().unwrap_err();
        let first: Vec<Account> = m.variables().cloned().collect();
        let second_err = m.calculate().unwrap_err();
        let second: Vec<Account> = m.variables().cloned().collect();

        assert_eq!(first_err, second_err);
        assert_eq!(first, second);
        assert_eq!(m.account("a").unwrap().values(), &[Some(1.0), Some(2.0), Some(4.0), None]);
        assert!(m.account("lead").unwrap().values().iter().all(Option::is_none));
    }

    #[test]
    fn test_scalar_parameter_equals_constant_series() {
        let build = |price: Parameter| {
            let mut m = Model::new(5).unwrap();
            m.add_variables(["rev"]).unwrap();
            m.set_parameters([("price", price), ("qty", Parameter::Scalar(3.0))]).unwrap();
            m.set_rules([("rev", ":price * :qty + :price[+0]")]).unwrap();
            m.calculate().unwrap();
            m.account("rev").unwrap().clone()
        };
        assert_eq!(build(Parameter::Scalar(8.0)), build(Parameter::Series(vec![8.0; 6])));
    }

    #[test]
    fn test_parameter_length_check() {
        let mut m = Model::new(4).unwrap();
        let err = m.set_parameters([("p", vec![1.0, 2.0])]).unwrap_err();
        assert_eq!(err, ComputationError::LengthMismatch { name: "p".into(), expected: 5, actual: 2 });
        assert!(m.set_parameters([("p", vec![1.0; 5])]).is_ok());
        assert!(m.set_parameters([("p", vec![1.0])]).is_ok());
    }

    #[test]
    fn test_failed_parameter_registration_keeps_previous_set() {
        let mut m = Model::new(4).unwrap();
        m.set_parameters([("p", 1.0)]).unwrap();
        assert!(m.set_parameters([("q", vec![1.0, 2.0])]).is_err());
        assert_eq!(m.get("p").unwrap(), Entry::Parameter(&Parameter::Scalar(1.0)));
    }

    #[test]
    fn test_empty_registration_clears() {
        let mut m = counter_model();
        m.set_parameters([("p", 1.0)]).unwrap();
        m.set_parameters(Vec::<(String, f64)>::new()).unwrap();
        m.set_rules(Vec::<(String, String)>::new()).unwrap();
        assert!(m.rules().is_empty());
        assert_eq!(m.parameters().count(), 0);
        assert!(matches!(m.get("p"), Err(ComputationError::UnknownName { .. })));
    }

    #[test]
    fn test_rules_fail_loudly_at_registration() {
        let mut m = counter_model();
        assert!(matches!(
            m.set_rules([("a", ":a[-1] +")]),
            Err(ComputationError::MalformedFormula { .. })
        ));
        assert!(matches!(m.set_rules([("ghost", "1")]), Err(ComputationError::UnknownName { .. })));
        assert!(matches!(m.set_rules([("a", ":nope[-1]")]), Err(ComputationError::UnknownName { .. })));
        assert!(matches!(m.set_rules([("a", ":b")]), Err(ComputationError::MalformedFormula { .. })));
        // The previous rules survive a failed replacement.
        assert_eq!(m.rules().len(), 2);
    }

    #[rstest]
    #[case(":a[-2]", 0)]
    #[case(":a[+1]", 42)]
    #[case(":a[+9223372036854775807]", i64::MAX)]
    #[case(":a[-9223372036854775808]", i64::MIN + 2)]
    fn test_out_of_range_offsets_fail(#[case] formula: &str, #[case] period: i64) {
        let mut m = counter_model();
        m.set_rules([("b", formula)]).unwrap();
        let err = m.calculate().unwrap_err();
        assert_eq!(err.root_cause(), &ComputationError::OutOfRange { name: "a".into(), period, max: 41 });
    }

    #[test]
    fn test_unset_input_propagates() {
        let mut m = Model::new(3).unwrap();
        m.add_variables(["a", "b"]).unwrap();
        m.set_rules([("b", ":a[-1] + 1")]).unwrap();
        m.calculate().unwrap();
        assert!(m.account("b").unwrap().values().iter().all(Option::is_none));
    }

    #[test]
    fn test_lookup() {
        let mut m = counter_model();
        m.set_parameters([("rate", 0.2)]).unwrap();
        assert!(matches!(m.get("a").unwrap(), Entry::Variable(acc) if acc.name == "a"));
        assert_eq!(m.get("rate").unwrap(), Entry::Parameter(&Parameter::Scalar(0.2)));
        assert_eq!(m.value_at("rate", 7).unwrap(), Some(0.2));
        assert!(matches!(m.get("zzz"), Err(ComputationError::UnknownName { .. })));
        assert!(matches!(m.value_at("a", 0), Err(ComputationError::OutOfRange { .. })));
        assert!(matches!(m.value_at("a", 42), Err(ComputationError::OutOfRange { .. })));
        // The name is resolved before the period is checked.
        assert!(matches!(m.value_at("ghost", 0), Err(ComputationError::UnknownName { .. })));
        assert!(matches!(m.value_at("ghost", 99), Err(ComputationError::UnknownName { .. })));
    }

    #[test]
    fn test_sort_rules_repairs_declaration_order() {
        let mut m = Model::new(40).unwrap();
        m.add_variables(["a", "b"]).unwrap();
        m.set_initials([("a", 10.0)]).unwrap();
        m.set_rules([("b", ":a[+0] * 3"), ("a", ":a[-1] + 1")]).unwrap();

        // As declared, b reads a before a is computed for the period.
        m.calculate().unwrap();
        assert_eq!(m.value_at("b", 41).unwrap(), None);

        m.sort_rules().unwrap();
        assert_eq!(m.rules()[0].target, "a");
        m.calculate().unwrap();
        assert_eq!(m.value_at("b", 41).unwrap(), Some(150.0));
    }

    #[test]
    fn test_units_are_carried() {
        let mut m = counter_model();
        m.set_unit("a", "USD").unwrap();
        assert_eq!(m.account("a").unwrap().unit, Some(Unit("USD".into())));
    }
}
