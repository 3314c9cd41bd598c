//! Host pass pipeline: an ordered list of per-function passes, run
//! over every function body in a module.
//!
//! A pass may leave consistency metadata stale (block edges, value
//! placement, alias chains). Rather than repairing it itself, it
//! returns `TodoFlags` naming the repairs the pipeline must run before
//! the next pass sees the function.

use crate::ir::{Func, FunctionBody, Module};
use crate::passes;
use anyhow::{anyhow, bail, Context, Result};

/// Repairs requested by a pass after it has run.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TodoFlags(u32);

impl TodoFlags {
    /// Re-establish assignment form: resolve aliases, recompute
    /// value placement and block edges.
    pub const UPDATE_SSA: TodoFlags = TodoFlags(1 << 0);
    /// Verify the whole function.
    pub const VERIFY_ALL: TodoFlags = TodoFlags(1 << 1);
    /// Simplify the CFG shape.
    pub const CLEANUP_CFG: TodoFlags = TodoFlags(1 << 2);

    pub fn empty() -> TodoFlags {
        TodoFlags(0)
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn contains(self, other: TodoFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for TodoFlags {
    type Output = TodoFlags;
    fn bitor(self, other: TodoFlags) -> TodoFlags {
        TodoFlags(self.0 | other.0)
    }
}

impl std::ops::BitOrAssign for TodoFlags {
    fn bitor_assign(&mut self, other: TodoFlags) {
        self.0 |= other.0;
    }
}

impl std::fmt::Debug for TodoFlags {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let mut names = vec![];
        if self.contains(TodoFlags::UPDATE_SSA) {
            names.push("UPDATE_SSA");
        }
        if self.contains(TodoFlags::VERIFY_ALL) {
            names.push("VERIFY_ALL");
        }
        if self.contains(TodoFlags::CLEANUP_CFG) {
            names.push("CLEANUP_CFG");
        }
        write!(f, "TodoFlags({})", names.join(" | "))
    }
}

/// A transformation run once per function body.
pub trait FunctionPass {
    fn name(&self) -> &str;

    /// Run on `body`, which belongs to `func` in `module`. The body has
    /// been taken out of the module for the duration of the call.
    fn execute(
        &mut self,
        module: &mut Module,
        func: Func,
        body: &mut FunctionBody,
    ) -> Result<TodoFlags>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PassPosition {
    InsertAfter,
    InsertBefore,
    Replace,
}

/// Where to place a pass in the pipeline: relative to the
/// `ref_pass_instance_number`-th (1-based) pass named
/// `reference_pass_name`.
pub struct PassRegistration {
    pub pass: Box<dyn FunctionPass>,
    pub reference_pass_name: String,
    pub ref_pass_instance_number: usize,
    pub pos_op: PassPosition,
}

#[derive(Default)]
pub struct Pipeline {
    passes: Vec<Box<dyn FunctionPass>>,
}

impl Pipeline {
    pub fn new() -> Pipeline {
        Pipeline::default()
    }

    /// The built-in schedule: establish assignment form, then clean
    /// up the CFG.
    pub fn standard() -> Pipeline {
        let mut pipeline = Pipeline::new();
        pipeline.add_pass(Box::new(passes::ssa::SsaPass));
        pipeline.add_pass(Box::new(passes::empty_blocks::CleanupCfgPass));
        pipeline
    }

    pub fn add_pass(&mut self, pass: Box<dyn FunctionPass>) {
        self.passes.push(pass);
    }

    pub fn pass_names(&self) -> Vec<&str> {
        self.passes.iter().map(|pass| pass.name()).collect()
    }

    pub fn register(&mut self, registration: PassRegistration) -> Result<()> {
        let PassRegistration {
            pass,
            reference_pass_name,
            ref_pass_instance_number,
            pos_op,
        } = registration;
        if ref_pass_instance_number == 0 {
            bail!("pass instance numbers start at 1");
        }
        let index = self
            .passes
            .iter()
            .enumerate()
            .filter(|(_, p)| p.name() == reference_pass_name)
            .map(|(i, _)| i)
            .nth(ref_pass_instance_number - 1)
            .ok_or_else(|| {
                anyhow!(
                    "reference pass `{}` instance {} not found",
                    reference_pass_name,
                    ref_pass_instance_number
                )
            })?;
        log::debug!(
            "registering pass `{}` {:?} `{}` #{}",
            pass.name(),
            pos_op,
            reference_pass_name,
            ref_pass_instance_number
        );
        match pos_op {
            PassPosition::InsertAfter => self.passes.insert(index + 1, pass),
            PassPosition::InsertBefore => self.passes.insert(index, pass),
            PassPosition::Replace => self.passes[index] = pass,
        }
        Ok(())
    }

    /// Run every pass over every function body in `module`, one
    /// function at a time.
    pub fn run_module(&mut self, module: &mut Module) -> Result<()> {
        for func in module.funcs.iter() {
            self.run_func(module, func)?;
        }
        Ok(())
    }

    /// Run every pass over one function. Imports are skipped.
    pub fn run_func(&mut self, module: &mut Module, func: Func) -> Result<()> {
        let mut body = match module.funcs[func].take_body() {
            Some(body) => body,
            None => return Ok(()),
        };
        let result = self.run_passes(module, func, &mut body);
        module.funcs[func].put_body(body);
        result
    }

    fn run_passes(
        &mut self,
        module: &mut Module,
        func: Func,
        body: &mut FunctionBody,
    ) -> Result<()> {
        for pass in self.passes.iter_mut() {
            log::debug!("running pass `{}` on {}", pass.name(), func);
            let todo = pass
                .execute(module, func, body)
                .with_context(|| format!("pass `{}` failed on {}", pass.name(), func))?;
            log::trace!("pass `{}` requested {:?}", pass.name(), todo);
            execute_todo(module, body, todo)
                .with_context(|| format!("after pass `{}` on {}", pass.name(), func))?;
        }
        Ok(())
    }
}

fn execute_todo(module: &Module, body: &mut FunctionBody, todo: TodoFlags) -> Result<()> {
    if todo.contains(TodoFlags::CLEANUP_CFG) {
        passes::empty_blocks::run(body);
    }
    if todo.contains(TodoFlags::UPDATE_SSA) {
        passes::ssa::run(body);
    }
    if todo.contains(TodoFlags::VERIFY_ALL) {
        passes::verify::run(module, body)?;
    }
    Ok(())
}
