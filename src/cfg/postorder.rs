//! Postorder computation over the successor graph.

use crate::entity::PerEntity;
use crate::ir::Block;
use smallvec::{smallvec, SmallVec};

/// Compute the postorder of blocks reachable from `entry`, with an
/// explicit DFS stack so deep CFGs cannot overflow the native stack.
/// Unreachable blocks do not appear in the result.
pub fn calculate<'a, SuccFn: Fn(Block) -> &'a [Block]>(
    entry: Block,
    succ_blocks: SuccFn,
) -> Vec<Block> {
    let mut ret = vec![];
    let mut visited: PerEntity<Block, bool> = PerEntity::default();

    #[derive(Debug)]
    struct Frame<'a> {
        block: Block,
        succs: &'a [Block],
        next_succ: usize,
    }
    let mut stack: SmallVec<[Frame; 64]> = smallvec![];

    visited[entry] = true;
    stack.push(Frame {
        block: entry,
        succs: succ_blocks(entry),
        next_succ: 0,
    });

    while let Some(frame) = stack.last_mut() {
        if let Some(&succ) = frame.succs.get(frame.next_succ) {
            frame.next_succ += 1;
            if !visited[succ] {
                visited[succ] = true;
                stack.push(Frame {
                    block: succ,
                    succs: succ_blocks(succ),
                    next_succ: 0,
                });
            }
        } else {
            log::trace!("postorder: finished {}", frame.block);
            ret.push(frame.block);
            stack.pop();
        }
    }

    ret
}
