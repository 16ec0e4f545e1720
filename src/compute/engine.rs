//! A synchronous, single-threaded evaluation engine.
use crate::compute::bytecode::{Compiler, OpCode, Program};
use crate::compute::error::ComputationError;
use crate::compute::kernel;
use crate::model::Rule;
use crate::store::{AccountId, ParamId, Registry};
use smallvec::SmallVec;

/// A rule linked against the current namespace.
#[derive(Debug, Clone)]
pub struct LinkedRule {
    pub target: AccountId,
    pub program: Program,
}

pub struct Engine;

impl Engine {
    /// Resolves every rule's target and references and checks each program's
    /// layout. Fails on the first rule whose names no longer exist in the namespace.
    pub fn link(registry: &Registry, rules: &[Rule]) -> Result<Vec<LinkedRule>, ComputationError> {
        let compiler = Compiler::new(registry);
        let mut linked = Vec::with_capacity(rules.len());
        for (index, rule) in rules.iter().enumerate() {
            let result = registry
                .variable_id(&rule.target)
                .and_then(|target| {
                    let program = compiler.compile(&rule.expr, &rule.formula)?;
                    Self::validate_layout(&program, registry)?;
                    Ok(LinkedRule { target, program })
                });
            match result {
                Ok(l) => linked.push(l),
                Err(source) => {
                    return Err(ComputationError::InvalidRule {
                        index,
                        target: rule.target.clone(),
                        formula: rule.formula.clone(),
                        source: Box::new(source),
                    })
                }
            }
        }
        Ok(linked)
    }

    /// Runs the full pass: periods `2..=n_periods+1` in order, rules in declared order.
    ///
    /// Every target's computed slots are cleared first, so a pass never reads
    /// values left over from a previous one. The pass aborts on the first
    /// failing (rule, period); that slot and all later ones stay unset.
    pub fn calculate(registry: &mut Registry, rules: &[Rule]) -> Result<(), ComputationError> {
        let linked = Self::link(registry, rules)?;
        tracing::info!(n_periods = registry.n_periods(), rules = linked.len(), "calculate pass started");

        for rule in &linked {
            registry.account_mut(rule.target).reset_computed();
        }

        for t in 2..=registry.series_len() {
            for (index, rule) in linked.iter().enumerate() {
                match Self::execute(&rule.program, registry, t) {
                    Ok(value) => registry.account_mut(rule.target).set(t, value),
                    Err(source) => {
                        let r = &rules[index];
                        tracing::warn!(rule = index, account = %r.target, period = t, error = %source, "calculate pass aborted");
                        return Err(ComputationError::RuleFailed {
                            index,
                            target: r.target.clone(),
                            period: t,
                            formula: r.formula.clone(),
                            source: Box::new(source),
                        });
                    }
                }
            }
        }

        tracing::info!(evaluations = registry.n_periods() * linked.len(), "calculate pass finished");
        Ok(())
    }

    /// Evaluates a standalone program at period `t`, checking its layout first.
    pub fn run(program: &Program, registry: &Registry, t: usize) -> Result<Option<f64>, ComputationError> {
        Self::validate_layout(program, registry)?;
        Self::execute(program, registry, t)
    }

    /// Hot loop. `program` must have passed `validate_layout` against `registry`,
    /// so only the period of each load is checked here.
    fn execute(program: &Program, registry: &Registry, t: usize) -> Result<Option<f64>, ComputationError> {
        let mut stack: SmallVec<[Option<f64>; 16]> = SmallVec::with_capacity(program.max_depth);
        for i in 0..program.ops.len() {
            let op = program.ops[i];
            let arg = program.arg[i] as usize;
            match op {
                OpCode::Const => stack.push(Some(program.consts[arg])),
                OpCode::LoadAccount => {
                    let account = registry.account(AccountId::new(arg));
                    let period = Self::resolve_period(&account.name, t, program.aux[i], registry)?;
                    stack.push(account.get(period));
                }
                OpCode::LoadParam => {
                    let (name, param) = registry.parameter(ParamId::new(arg));
                    let period = Self::resolve_period(name, t, program.aux[i], registry)?;
                    stack.push(param.get_at(period));
                }
                OpCode::Neg => {
                    let v = Self::pop(&mut stack)?;
                    stack.push(kernel::execute_instruction(op, v, Some(0.0)));
                }
                OpCode::Add | OpCode::Sub | OpCode::Mul | OpCode::Div => {
                    let rhs = Self::pop(&mut stack)?;
                    let lhs = Self::pop(&mut stack)?;
                    stack.push(kernel::execute_instruction(op, lhs, rhs));
                }
            }
        }

        match (stack.pop(), stack.is_empty()) {
            (Some(value), true) => Ok(value),
            _ => Err(ComputationError::Mismatch { msg: "Program did not reduce to a single value".into() }),
        }
    }

    #[inline(always)]
    fn resolve_period(name: &str, t: usize, offset: i64, registry: &Registry) -> Result<usize, ComputationError> {
        // Saturates on extreme offsets; the range check below rejects the result.
        let period = (t as i64).saturating_add(offset);
        let max = registry.series_len();
        if period < 1 || period > max as i64 {
            return Err(ComputationError::OutOfRange { name: name.to_string(), period, max });
        }
        Ok(period as usize)
    }

    #[inline(always)]
    fn pop(stack: &mut SmallVec<[Option<f64>; 16]>) -> Result<Option<f64>, ComputationError> {
        stack.pop().ok_or_else(|| ComputationError::Mismatch { msg: "Operand stack underflow".into() })
    }

    /// Bounds checking before execution starts.
    fn validate_layout(program: &Program, registry: &Registry) -> Result<(), ComputationError> {
        let n = program.ops.len();
        if program.arg.len() != n || program.aux.len() != n {
            return Err(ComputationError::Mismatch {
                msg: format!("Parallel arrays disagree: {} ops, {} args, {} aux", n, program.arg.len(), program.aux.len()),
            });
        }

        for (&op, &arg) in program.ops.iter().zip(&program.arg) {
            let limit = match op {
                OpCode::Const => program.consts.len(),
                OpCode::LoadAccount => registry.accounts.len(),
                OpCode::LoadParam => registry.parameters.len(),
                _ => continue,
            };
            if arg as usize >= limit {
                return Err(ComputationError::Mismatch {
                    msg: format!("{:?} operand {} is outside 0..{}", op, arg, limit),
                });
            }
        }
        Ok(())
    }
}
