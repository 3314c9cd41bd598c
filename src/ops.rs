//! Operators.

use crate::ir::Func;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operator {
    Nop,

    I32Const { value: u32 },
    I64Const { value: u64 },

    I32Eqz,
    I32Eq,
    I32LtU,

    I32Add,
    I32Sub,
    I32Mul,
    I32And,

    I64Add,

    Call { function_index: Func },
}

impl std::fmt::Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Operator::Nop => write!(f, "nop"),
            Operator::I32Const { value } => write!(f, "i32.const<{}>", value),
            Operator::I64Const { value } => write!(f, "i64.const<{}>", value),
            Operator::I32Eqz => write!(f, "i32.eqz"),
            Operator::I32Eq => write!(f, "i32.eq"),
            Operator::I32LtU => write!(f, "i32.lt_u"),
            Operator::I32Add => write!(f, "i32.add"),
            Operator::I32Sub => write!(f, "i32.sub"),
            Operator::I32Mul => write!(f, "i32.mul"),
            Operator::I32And => write!(f, "i32.and"),
            Operator::I64Add => write!(f, "i64.add"),
            Operator::Call { function_index } => write!(f, "call<{}>", function_index),
        }
    }
}
