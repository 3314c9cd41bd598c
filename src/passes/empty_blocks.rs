//! Pass to remove empty blocks.

use crate::entity::EntityRef;
use crate::ir::{Block, BlockTarget, Func, FunctionBody, Module, Terminator};
use crate::pipeline::{FunctionPass, TodoFlags};
use anyhow::Result;

/// Determines whether a block (i) has no blockparams, and (ii) is
/// solely a jump to another block. We can remove these blocks.
///
/// Blocks that are solely jumps but *do* have blockparams still define
/// those blockparams as a join of the incoming values, so they stay.
fn block_is_empty_jump(body: &FunctionBody, block: Block) -> Option<BlockTarget> {
    if !body.blocks[block].insts.is_empty() {
        return None;
    }
    if !body.blocks[block].params.is_empty() {
        return None;
    }
    match &body.blocks[block].terminator {
        Terminator::Br { target } => Some(target.clone()),
        _ => None,
    }
}

/// Follow a chain of forwardings from `target` to its final
/// destination. A chain that loops back on itself (an infinite loop of
/// empty blocks) is left alone.
fn rewrite_target(
    forwardings: &[Option<BlockTarget>],
    target: &BlockTarget,
) -> Option<BlockTarget> {
    if !target.args.is_empty() {
        return None;
    }
    let mut current = forwardings[target.block.index()].clone()?;
    let mut steps = 0;
    while current.args.is_empty() {
        match &forwardings[current.block.index()] {
            Some(next) => {
                current = next.clone();
                steps += 1;
                if steps > forwardings.len() {
                    return None;
                }
            }
            None => break,
        }
    }
    Some(current)
}

pub fn run(body: &mut FunctionBody) {
    log::trace!(
        "empty_blocks: running on func:\n{}\n",
        body.display_verbose("| ")
    );

    // Identify empty blocks, and to where they should forward.
    let forwardings = body
        .blocks
        .iter()
        .map(|block| {
            if block != body.entry {
                block_is_empty_jump(body, block)
            } else {
                None
            }
        })
        .collect::<Vec<_>>();

    // Rewrite every target according to a forwarding (or a chain of
    // composed forwardings).
    for block_data in body.blocks.values_mut() {
        block_data.terminator.update_targets(|target| {
            if let Some(new_target) = rewrite_target(&forwardings[..], target) {
                log::trace!("empty_blocks: replacing {} with {}", target, new_target);
                *target = new_target;
            }
        });
    }

    body.recompute_edges();
}

/// The pipeline's `cleanup_cfg` pass.
pub struct CleanupCfgPass;

impl FunctionPass for CleanupCfgPass {
    fn name(&self) -> &str {
        "cleanup_cfg"
    }

    fn execute(&mut self, _: &mut Module, _: Func, body: &mut FunctionBody) -> Result<TodoFlags> {
        run(body);
        Ok(TodoFlags::empty())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ir::{SignatureData, Type};
    use crate::ops::Operator;

    fn jump(block: Block) -> Terminator {
        Terminator::Br {
            target: BlockTarget {
                block,
                args: vec![],
            },
        }
    }

    #[test]
    fn forwards_through_empty_jump_chains() {
        let mut module = Module::empty();
        let sig = module.add_signature(SignatureData {
            params: vec![],
            returns: vec![Type::I32],
        });
        let mut body = FunctionBody::new(&module, sig);
        let a = body.add_block();
        let b = body.add_block();
        let exit = body.add_block();
        body.set_terminator(body.entry, jump(a));
        body.set_terminator(a, jump(b));
        body.set_terminator(b, jump(exit));
        let v = body.add_op(exit, Operator::I32Const { value: 1 }, &[], &[Type::I32]);
        body.set_terminator(exit, Terminator::Return { values: vec![v] });

        run(&mut body);

        assert_eq!(body.blocks[body.entry].succs, vec![exit]);
        assert!(body.blocks[a].preds.is_empty());
        assert_eq!(body.blocks[exit].preds, vec![body.entry]);
    }
}
