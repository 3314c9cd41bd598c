//! Metadata on operators.

use crate::ir::{Module, Type};
use crate::ops::Operator;
use anyhow::{bail, Result};

pub fn op_inputs(module: &Module, op: &Operator) -> Result<Vec<Type>> {
    match op {
        &Operator::Nop => Ok(vec![]),
        &Operator::I32Const { .. } | &Operator::I64Const { .. } => Ok(vec![]),

        &Operator::I32Eqz => Ok(vec![Type::I32]),
        &Operator::I32Eq
        | &Operator::I32LtU
        | &Operator::I32Add
        | &Operator::I32Sub
        | &Operator::I32Mul
        | &Operator::I32And => Ok(vec![Type::I32, Type::I32]),
        &Operator::I64Add => Ok(vec![Type::I64, Type::I64]),

        &Operator::Call { function_index } => match module.funcs.get(function_index) {
            Some(decl) => Ok(module.signatures[decl.sig()].params.clone()),
            None => bail!("call to unknown function {}", function_index),
        },
    }
}

pub fn op_outputs(module: &Module, op: &Operator) -> Result<Vec<Type>> {
    match op {
        &Operator::Nop => Ok(vec![]),
        &Operator::I32Const { .. } => Ok(vec![Type::I32]),
        &Operator::I64Const { .. } => Ok(vec![Type::I64]),

        &Operator::I32Eqz
        | &Operator::I32Eq
        | &Operator::I32LtU
        | &Operator::I32Add
        | &Operator::I32Sub
        | &Operator::I32Mul
        | &Operator::I32And => Ok(vec![Type::I32]),
        &Operator::I64Add => Ok(vec![Type::I64]),

        &Operator::Call { function_index } => match module.funcs.get(function_index) {
            Some(decl) => Ok(module.signatures[decl.sig()].returns.clone()),
            None => bail!("call to unknown function {}", function_index),
        },
    }
}
