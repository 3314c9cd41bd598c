//! Establishing and updating assignment form.
//!
//! Bodies are built in SSA form directly; what can go stale is the
//! bookkeeping around it. This pass resolves alias chains, then
//! recomputes value placement and block edges from block contents.

use super::resolve_aliases;
use crate::ir::{Func, FunctionBody, Module};
use crate::pipeline::{FunctionPass, TodoFlags};
use anyhow::Result;

pub fn run(body: &mut FunctionBody) {
    resolve_aliases::run(body);
    body.recompute_value_blocks();
    body.recompute_edges();
}

/// The pipeline's `ssa` pass.
pub struct SsaPass;

impl FunctionPass for SsaPass {
    fn name(&self) -> &str {
        "ssa"
    }

    fn execute(&mut self, _: &mut Module, _: Func, body: &mut FunctionBody) -> Result<TodoFlags> {
        run(body);
        Ok(TodoFlags::VERIFY_ALL)
    }
}
