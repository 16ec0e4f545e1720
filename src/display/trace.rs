use crate::compute::error::ComputationError;
use crate::model::{Entry, Model, Rule};
use std::collections::HashMap;
use std::fmt::Write;

/// Renders how the value of `name` at `period` came about.
///
/// Each computed cell shows the governing rule and recurses into the cells it
/// read, down to `max_depth` levels. Parameters and initial values are leaves;
/// a cell already printed is shown as a reference to its first level.
pub fn format_trace(model: &Model, name: &str, period: usize, max_depth: usize) -> Result<String, ComputationError> {
    // Validates the name and the period.
    model.value_at(name, period)?;

    let mut tracer = Tracer {
        model,
        max_depth,
        governing: governing_rules(model.rules()),
        visited_at_level: HashMap::new(),
        output: String::new(),
    };

    let _ = writeln!(tracer.output, "AUDIT TRACE for '{}' at period {}:", name, period);
    let _ = writeln!(tracer.output, "--------------------------------------------------");
    tracer.trace_cell(name, period, 1, "");
    Ok(tracer.output)
}

/// The rule whose write survives a period: the last one declared for each target.
fn governing_rules(rules: &[Rule]) -> HashMap<&str, &Rule> {
    rules.iter().map(|r| (r.target.as_str(), r)).collect()
}

struct Tracer<'a> {
    model: &'a Model,
    max_depth: usize,
    governing: HashMap<&'a str, &'a Rule>,
    visited_at_level: HashMap<(String, usize), usize>,
    output: String,
}

impl<'a> Tracer<'a> {
    fn trace_cell(&mut self, name: &str, period: usize, level: usize, prefix: &str) {
        let key = (name.to_string(), period);
        if let Some(&first_seen) = self.visited_at_level.get(&key) {
            let _ = writeln!(self.output, "{}[L{}] {}[{}] -> (Ref to L{})", prefix, level, name, period, first_seen);
            return;
        }

        let value = Self::format_value(self.model.value_at(name, period).ok().flatten());
        let line_header = format!("[L{}] {}[{}] {}", level, name, period, value);

        match self.model.get(name) {
            Ok(Entry::Parameter(_)) => {
                let _ = writeln!(self.output, "{}{} -> Param", prefix, line_header);
            }
            Ok(Entry::Variable(_)) if period == 1 => {
                let _ = writeln!(self.output, "{}{} -> Initial", prefix, line_header);
            }
            Ok(Entry::Variable(_)) => match self.governing.get(name).copied() {
                None => {
                    let _ = writeln!(self.output, "{}{} -> Input", prefix, line_header);
                }
                Some(rule) => {
                    self.visited_at_level.insert(key, level);
                    let _ = writeln!(self.output, "{}{} = {}", prefix, line_header, rule.expr);
                    if level >= self.max_depth {
                        let stem = Self::build_child_stem(prefix);
                        let _ = writeln!(self.output, "{}`-- ...", stem);
                        return;
                    }
                    self.recurse_children(rule, period, level, prefix);
                }
            },
            Err(e) => {
                let _ = writeln!(self.output, "{}[L{}] {} [Err: {}]", prefix, level, name, e);
            }
        }
    }

    fn recurse_children(&mut self, rule: &'a Rule, period: usize, level: usize, prefix: &str) {
        let stem = Self::build_child_stem(prefix);
        let refs = rule.expr.references();
        for (i, reference) in refs.iter().enumerate() {
            let connector = if i == refs.len() - 1 { "`--" } else { "|--" };
            let full_prefix = format!("{}{}", stem, connector);
            let resolved = (period as i64).saturating_add(reference.offset.unwrap_or(0));
            let max = self.model.n_periods() as i64 + 1;
            if resolved < 1 || resolved > max {
                let _ = writeln!(
                    self.output,
                    "{}[L{}] {}[{}] [out of range 1..={}]",
                    full_prefix,
                    level + 1,
                    reference.name,
                    resolved,
                    max
                );
                continue;
            }
            self.trace_cell(&reference.name, resolved as usize, level + 1, &full_prefix);
        }
    }

    fn format_value(value: Option<f64>) -> String {
        match value {
            Some(v) => format!("[{:.3}]", v),
            None => "[unset]".to_string(),
        }
    }

    fn build_child_stem(current_prefix: &str) -> String {
        current_prefix.replace("`--", "   ").replace("|--", "|  ")
    }
}
