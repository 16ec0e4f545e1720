use crate::compute::bytecode::OpCode;

/// Applies an arithmetic instruction. An unset operand makes the result unset.
///
/// Division follows IEEE-754: `x / 0.0` is an infinity or NaN, never an error.
#[inline(always)]
pub fn execute_instruction(op: OpCode, lhs: Option<f64>, rhs: Option<f64>) -> Option<f64> {
    let (l, r) = (lhs?, rhs?);
    match op {
        OpCode::Add => Some(l + r),
        OpCode::Sub => Some(l - r),
        OpCode::Mul => Some(l * r),
        OpCode::Div => Some(l / r),
        OpCode::Neg => Some(-l),
        OpCode::Const | OpCode::LoadAccount | OpCode::LoadParam => None,
    }
}
