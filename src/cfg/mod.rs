//! Lightweight CFG analyses.

use crate::entity::PerEntity;
use crate::ir::{Block, FunctionBody, Value};

pub mod domtree;
pub mod postorder;

/// Auxiliary analyses of the control-flow graph. Computed from the
/// `preds`/`succs` lists, so those must be current.
#[derive(Clone, Debug)]
pub struct CFGInfo {
    /// Reverse-postorder traversal of reachable blocks.
    pub rpo: Vec<Block>,
    /// Domtree parents, indexed by block.
    pub domtree: PerEntity<Block, Block>,
    /// Defining block for a given value.
    pub def_block: PerEntity<Value, Block>,
}

impl CFGInfo {
    pub fn new(f: &FunctionBody) -> CFGInfo {
        let postorder = postorder::calculate(f.entry, |block| &f.blocks[block].succs[..]);

        let domtree =
            domtree::calculate(|block| &f.blocks[block].preds[..], &postorder[..], f.entry);

        let mut def_block: PerEntity<Value, Block> = PerEntity::default();
        for (block, block_def) in f.blocks.entries() {
            for &(_, param) in &block_def.params {
                def_block[param] = block;
            }
            for &value in &block_def.insts {
                def_block[value] = block;
            }
        }
        for value in f.values.iter() {
            let orig_value = f.resolve_alias(value);
            def_block[value] = def_block[orig_value];
        }

        let mut rpo = postorder;
        rpo.reverse();

        CFGInfo {
            rpo,
            domtree,
            def_block,
        }
    }

    pub fn dominates(&self, a: Block, b: Block) -> bool {
        domtree::dominates(&self.domtree, a, b)
    }
}
