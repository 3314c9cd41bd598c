//! Whole-function verification.

use crate::cfg::CFGInfo;
use crate::entity::{EntityRef, PerEntity};
use crate::ir::{Block, BlockTarget, FunctionBody, Module, Terminator, Type, Value, ValueDef};
use crate::op_traits::{op_inputs, op_outputs};
use anyhow::{bail, ensure, Result};

fn value_type(body: &FunctionBody, value: Value) -> Result<Type> {
    let value = body.resolve_alias(value);
    match body.values.get(value) {
        Some(def) => match def.ty() {
            Some(ty) => Ok(ty),
            None => bail!("value {} has no single type: {:?}", value, def),
        },
        None => bail!("use of undefined value {}", value),
    }
}

fn check_target(body: &FunctionBody, from: Block, target: &BlockTarget) -> Result<()> {
    let to = match body.blocks.get(target.block) {
        Some(to) => to,
        None => bail!("{} branches to nonexistent {}", from, target.block),
    };
    ensure!(
        to.params.len() == target.args.len(),
        "{} passes {} args to {}, which takes {}",
        from,
        target.args.len(),
        target.block,
        to.params.len()
    );
    for (&arg, &(ty, _)) in target.args.iter().zip(to.params.iter()) {
        let arg_ty = value_type(body, arg)?;
        ensure!(
            arg_ty == ty,
            "{} passes {} of type {} to a {} param of {}",
            from,
            arg,
            arg_ty,
            ty,
            target.block
        );
    }
    Ok(())
}

/// Check that the recorded edges are exactly those implied by the
/// terminators.
fn check_edges(body: &FunctionBody) -> Result<()> {
    let mut preds: PerEntity<Block, Vec<Block>> = PerEntity::default();
    for (block, data) in body.blocks.entries() {
        let succs = data.terminator.successors();
        ensure!(
            succs == data.succs,
            "{} succs {:?} do not match its terminator ({:?})",
            block,
            data.succs,
            succs
        );
        for succ in succs {
            preds[succ].push(block);
        }
    }
    for (block, data) in body.blocks.entries() {
        let mut expected = preds[block].clone();
        let mut actual = data.preds.clone();
        expected.sort();
        actual.sort();
        ensure!(
            expected == actual,
            "{} preds {:?} do not match the terminators ({:?})",
            block,
            data.preds,
            expected
        );
    }
    Ok(())
}

pub fn run(module: &Module, body: &FunctionBody) -> Result<()> {
    // A body with no blocks has nothing to check.
    if body.blocks.is_empty() {
        return Ok(());
    }
    ensure!(
        body.entry.is_valid() && body.entry.index() < body.blocks.len(),
        "function has no entry block"
    );

    // Every instruction must live in exactly one block, and the
    // placement map must agree.
    let mut placed: PerEntity<Value, Block> = PerEntity::default();
    for (block, data) in body.blocks.entries() {
        for (i, &(ty, param)) in data.params.iter().enumerate() {
            match body.values.get(param) {
                Some(&ValueDef::BlockParam(param_block, param_idx, param_ty)) => {
                    ensure!(
                        param_block == block && param_idx as usize == i && param_ty == ty,
                        "bad blockparam {} for param {} of {}",
                        param,
                        i,
                        block
                    );
                }
                other => bail!("bad blockparam value for param {} of {}: {:?}", i, block, other),
            }
            placed[param] = block;
        }
        for &inst in &data.insts {
            ensure!(inst.index() < body.values.len(), "{} holds undefined {}", block, inst);
            ensure!(
                placed[inst].is_invalid(),
                "{} placed in both {} and {}",
                inst,
                placed[inst],
                block
            );
            placed[inst] = block;
            ensure!(
                body.value_blocks[inst] == block,
                "{} is in {} but recorded in {}",
                inst,
                block,
                body.value_blocks[inst]
            );
        }
        match &data.terminator {
            Terminator::None => bail!("{} has no terminator", block),
            Terminator::Return { values } => {
                ensure!(
                    values.len() == body.rets.len(),
                    "{} returns {} values, function returns {}",
                    block,
                    values.len(),
                    body.rets.len()
                );
                for (&value, &ty) in values.iter().zip(body.rets.iter()) {
                    ensure!(
                        value_type(body, value)? == ty,
                        "{} returns {} which is not {}",
                        block,
                        value,
                        ty
                    );
                }
            }
            Terminator::CondBr { cond, .. } => {
                ensure!(value_type(body, *cond)? == Type::I32, "{} branches on non-i32", block);
            }
            Terminator::Select { value, .. } => {
                ensure!(value_type(body, *value)? == Type::I32, "{} selects on non-i32", block);
            }
            _ => {}
        }
        let mut result = Ok(());
        data.terminator.visit_targets(|target| {
            if result.is_ok() {
                result = check_target(body, block, target);
            }
        });
        result?;
    }

    check_edges(body)?;

    let cfg = CFGInfo::new(body);

    // Operand types, and dominance of defs over uses, in reachable
    // blocks.
    for &block in &cfg.rpo {
        let data = &body.blocks[block];
        let validate = |value: Value| -> Result<()> {
            let value = body.resolve_alias(value);
            let def_block = cfg.def_block[value];
            ensure!(
                def_block.is_valid(),
                "value {} used in block {} is not placed in any block",
                value,
                block
            );
            ensure!(
                cfg.dominates(def_block, block),
                "value {} defined in block {} used in block {}: def does not dominate use",
                value,
                def_block,
                block
            );
            Ok(())
        };

        for (pos, &inst) in data.insts.iter().enumerate() {
            match &body.values[inst] {
                ValueDef::Operator(op, args, tys) => {
                    let expected_args = op_inputs(module, op)?;
                    let arg_tys = args
                        .iter()
                        .map(|&arg| value_type(body, arg))
                        .collect::<Result<Vec<_>>>()?;
                    ensure!(
                        arg_tys == expected_args,
                        "{} = {} takes {:?}, given {:?}",
                        inst,
                        op,
                        expected_args,
                        arg_tys
                    );
                    ensure!(
                        *tys == op_outputs(module, op)?,
                        "{} = {} declares outputs {:?}",
                        inst,
                        op,
                        tys
                    );
                    for &arg in args {
                        validate(arg)?;
                        // Within the defining block, the def must come first.
                        let arg = body.resolve_alias(arg);
                        if cfg.def_block[arg] == block {
                            if let Some(arg_pos) = data.insts.iter().position(|&i| i == arg) {
                                ensure!(
                                    arg_pos < pos,
                                    "{} uses {} before its definition in {}",
                                    inst,
                                    arg,
                                    block
                                );
                            }
                        }
                    }
                }
                ValueDef::Alias(..) => {}
                other => bail!("{} in {} is not an instruction: {:?}", inst, block, other),
            }
        }
        let mut result = Ok(());
        data.terminator.visit_uses(|u| {
            if result.is_ok() {
                result = validate(u);
            }
        });
        result?;
    }

    Ok(())
}
