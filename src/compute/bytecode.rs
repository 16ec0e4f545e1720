use crate::compute::error::ComputationError;
use crate::formula::{BinaryOp, Expr};
use crate::store::{Registry, Symbol};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OpCode {
    /// Push `consts[arg]`.
    Const = 0,
    /// Push account `arg` at period `t + aux`.
    LoadAccount = 1,
    /// Push parameter `arg` at period `t + aux`.
    LoadParam = 2,
    Neg = 3,
    Add = 4,
    Sub = 5,
    Mul = 6,
    Div = 7,
}

/// Structure-of-Arrays (SoA) layout for a linked rule, in postfix order.
///
/// The program is period-agnostic: loads carry a relative offset, and the
/// engine binds the current period `t` at run time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Program {
    // Parallel Arrays
    pub ops: Vec<OpCode>,
    pub arg: Vec<u32>,
    pub aux: Vec<i64>, // Period offset for loads, 0 otherwise.

    pub consts: Vec<f64>,
    /// Deepest operand stack the program needs.
    pub max_depth: usize,
}

impl Program {
    pub fn len(&self) -> usize { self.ops.len() }

    pub fn is_empty(&self) -> bool { self.ops.is_empty() }

    fn emit(&mut self, op: OpCode, arg: u32, aux: i64) {
        self.ops.push(op);
        self.arg.push(arg);
        self.aux.push(aux);
    }
}

/// Links a parsed formula against the namespace.
///
/// Every name is resolved exactly once here; the engine never looks a name up.
pub struct Compiler<'a> {
    registry: &'a Registry,
}

impl<'a> Compiler<'a> {
    pub fn new(registry: &'a Registry) -> Self {
        Self { registry }
    }

    pub fn compile(&self, expr: &Expr, formula: &str) -> Result<Program, ComputationError> {
        let mut program = Program::default();
        let mut depth = 0;
        self.emit_expr(expr, formula, &mut program, &mut depth)?;
        Ok(program)
    }

    fn emit_expr(
        &self,
        expr: &Expr,
        formula: &str,
        program: &mut Program,
        depth: &mut usize,
    ) -> Result<(), ComputationError> {
        match expr {
            Expr::Number(n) => {
                let idx = program.consts.len() as u32;
                program.consts.push(*n);
                program.emit(OpCode::Const, idx, 0);
                Self::push(program, depth);
            }
            Expr::Ref(r) => {
                let symbol = self.registry.resolve(&r.name).ok_or_else(|| ComputationError::UnknownName {
                    name: r.name.clone(),
                })?;
                match (symbol, r.offset) {
                    (Symbol::Variable(id), Some(k)) => program.emit(OpCode::LoadAccount, id.0, k),
                    (Symbol::Variable(_), None) => {
                        return Err(ComputationError::MalformedFormula {
                            formula: formula.to_string(),
                            position: r.pos,
                            reason: format!("variable '{}' needs a period offset, e.g. :{}[+0]", r.name, r.name),
                        });
                    }
                    // A bare parameter follows the current period.
                    (Symbol::Parameter(id), k) => program.emit(OpCode::LoadParam, id.0, k.unwrap_or(0)),
                }
                Self::push(program, depth);
            }
            Expr::Neg(inner) => {
                self.emit_expr(inner, formula, program, depth)?;
                program.emit(OpCode::Neg, 0, 0);
            }
            Expr::Binary { op, lhs, rhs } => {
                self.emit_expr(lhs, formula, program, depth)?;
                self.emit_expr(rhs, formula, program, depth)?;
                let code = match op {
                    BinaryOp::Add => OpCode::Add,
                    BinaryOp::Sub => OpCode::Sub,
                    BinaryOp::Mul => OpCode::Mul,
                    BinaryOp::Div => OpCode::Div,
                };
                program.emit(code, 0, 0);
                *depth -= 1;
            }
        }
        Ok(())
    }

    fn push(program: &mut Program, depth: &mut usize) {
        *depth += 1;
        program.max_depth = program.max_depth.max(*depth);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formula::parse_formula;
    use crate::store::Parameter;

    fn registry() -> Registry {
        let mut reg = Registry::new(3);
        reg.add_variable("a").unwrap();
        reg.add_variable("b").unwrap();
        reg.replace_parameters(vec![("rate".into(), Parameter::Scalar(0.5))]);
        reg
    }

    fn compile(reg: &Registry, src: &str) -> Result<Program, ComputationError> {
        Compiler::new(reg).compile(&parse_formula(src)?, src)
    }

    #[test]
    fn test_postfix_layout() {
        let reg = registry();
        let p = compile(&reg, ":a[-1] + :b[+0] * :rate").unwrap();
        assert_eq!(
            p.ops,
            vec![OpCode::LoadAccount, OpCode::LoadAccount, OpCode::LoadParam, OpCode::Mul, OpCode::Add]
        );
        assert_eq!(p.arg[..3], [0, 1, 0]);
        assert_eq!(p.aux[..3], [-1, 0, 0]);
        assert_eq!(p.max_depth, 3);
    }

    #[test]
    fn test_left_deep_chain_needs_two_slots() {
        let reg = registry();
        let p = compile(&reg, "1 + 2 + 3 + 4").unwrap();
        assert_eq!(p.consts, vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(p.max_depth, 2);
    }

    #[test]
    fn test_unknown_name() {
        let reg = registry();
        let err = compile(&reg, ":a[-1] + :ghost").unwrap_err();
        assert_eq!(err, ComputationError::UnknownName { name: "ghost".into() });
    }

    #[test]
    fn test_bare_variable_is_malformed() {
        let reg = registry();
        match compile(&reg, "2 * :a").unwrap_err() {
            ComputationError::MalformedFormula { position, reason, .. } => {
                assert_eq!(position, 4);
                assert!(reason.contains(":a[+0]"), "{}", reason);
            }
            other => panic!("Wrong error type: {:?}", other),
        }
    }
}
