//! Reference interpreter for IR function bodies.
//!
//! Values are carried as `u64`; `i32` values are kept zero-extended.
//! Calls to imports go through an `ImportHandler`, which is where a
//! runtime (such as the coverage tracer) plugs in.

use crate::ir::{Block, Func, FuncDecl, FunctionBody, Module, Terminator, Value, ValueDef};
use crate::ops::Operator;
use crate::passes::coverage::{TRACE_FUNC, TRACE_MODULE};
use anyhow::{anyhow, bail, ensure, Result};
use fxhash::FxHashMap;

const MAX_CALL_DEPTH: usize = 256;

/// Execution budget, counted in executed blocks.
#[derive(Clone, Debug)]
pub struct Fuel {
    pub remaining: u64,
    pub consumed: u64,
}

impl Fuel {
    pub fn new(remaining: u64) -> Fuel {
        Fuel {
            remaining,
            consumed: 0,
        }
    }

    pub fn infinite() -> Fuel {
        Fuel::new(u64::MAX)
    }

    pub fn consume(&mut self) -> bool {
        self.consumed += 1;
        if self.remaining == u64::MAX {
            return true;
        }
        if self.remaining == 0 {
            false
        } else {
            self.remaining -= 1;
            true
        }
    }
}

/// Handles calls to imported functions.
pub trait ImportHandler {
    fn call_import(&mut self, module: &str, name: &str, args: &[u64]) -> Result<Vec<u64>>;
}

/// A runtime that implements only the tracing routine, recording every
/// location id it is called with.
#[derive(Clone, Debug, Default)]
pub struct TraceRecorder {
    pub locations: Vec<u32>,
}

impl ImportHandler for TraceRecorder {
    fn call_import(&mut self, module: &str, name: &str, args: &[u64]) -> Result<Vec<u64>> {
        if module == TRACE_MODULE && name == TRACE_FUNC {
            ensure!(args.len() == 1, "{} takes one argument", TRACE_FUNC);
            self.locations.push(args[0] as u32);
            Ok(vec![])
        } else {
            bail!("unknown import {}.{}", module, name)
        }
    }
}

#[derive(Debug)]
pub struct InterpContext<'a, H: ImportHandler> {
    module: &'a Module,
    pub handler: H,
    pub fuel: Fuel,
    depth: usize,
}

impl<'a, H: ImportHandler> InterpContext<'a, H> {
    pub fn new(module: &'a Module, handler: H, fuel: Fuel) -> Self {
        InterpContext {
            module,
            handler,
            fuel,
            depth: 0,
        }
    }

    /// Call `func` with `args`, returning its results.
    pub fn call(&mut self, func: Func, args: &[u64]) -> Result<Vec<u64>> {
        match self.module.funcs.get(func) {
            Some(FuncDecl::Body(_, _, body)) => {
                ensure!(self.depth < MAX_CALL_DEPTH, "call depth exceeded");
                self.depth += 1;
                let result = self.run_body(body, args);
                self.depth -= 1;
                result
            }
            Some(FuncDecl::Import(..)) => {
                let import = self
                    .module
                    .import_of(func)
                    .ok_or_else(|| anyhow!("{} is not in the import table", func))?;
                self.handler.call_import(&import.module, &import.name, args)
            }
            None => bail!("call to unknown function {}", func),
        }
    }

    fn run_body(&mut self, body: &FunctionBody, args: &[u64]) -> Result<Vec<u64>> {
        let mut vals: FxHashMap<Value, u64> = FxHashMap::default();
        let get = |vals: &FxHashMap<Value, u64>, value: Value| -> Result<u64> {
            let value = body.resolve_alias(value);
            vals.get(&value)
                .copied()
                .ok_or_else(|| anyhow!("read of undefined value {}", value))
        };

        let mut block = body.entry;
        let mut block_args = args.to_vec();
        loop {
            ensure!(self.fuel.consume(), "out of fuel");
            let data = match body.blocks.get(block) {
                Some(data) => data,
                None => bail!("jump to nonexistent {}", block),
            };
            ensure!(
                data.params.len() == block_args.len(),
                "{} takes {} args, given {}",
                block,
                data.params.len(),
                block_args.len()
            );
            for (&(_, param), &arg) in data.params.iter().zip(block_args.iter()) {
                vals.insert(param, arg);
            }

            for &inst in &data.insts {
                match &body.values[inst] {
                    ValueDef::Operator(op, op_args, _) => {
                        let op_args = op_args
                            .iter()
                            .map(|&arg| get(&vals, arg))
                            .collect::<Result<Vec<_>>>()?;
                        let results = self.eval(op, &op_args)?;
                        if let Some(&result) = results.first() {
                            vals.insert(inst, result);
                        }
                    }
                    ValueDef::Alias(_) => {}
                    other => bail!("{} is not executable: {:?}", inst, other),
                }
            }

            let (next, next_args): (Block, &[Value]) = match &data.terminator {
                Terminator::Br { target } => (target.block, &target.args[..]),
                Terminator::CondBr {
                    cond,
                    if_true,
                    if_false,
                } => {
                    let target = if get(&vals, *cond)? != 0 {
                        if_true
                    } else {
                        if_false
                    };
                    (target.block, &target.args[..])
                }
                Terminator::Select {
                    value,
                    targets,
                    default,
                } => {
                    let index = get(&vals, *value)? as usize;
                    let target = targets.get(index).unwrap_or(default);
                    (target.block, &target.args[..])
                }
                Terminator::Return { values } => {
                    return values.iter().map(|&value| get(&vals, value)).collect();
                }
                Terminator::Unreachable => bail!("reached unreachable in {}", block),
                Terminator::None => bail!("{} has no terminator", block),
            };
            block_args = next_args
                .iter()
                .map(|&arg| get(&vals, arg))
                .collect::<Result<Vec<_>>>()?;
            block = next;
        }
    }

    fn eval(&mut self, op: &Operator, args: &[u64]) -> Result<Vec<u64>> {
        let i32_arg = |i: usize| args[i] as u32;
        Ok(match op {
            Operator::Nop => vec![],
            Operator::I32Const { value } => vec![u64::from(*value)],
            Operator::I64Const { value } => vec![*value],
            Operator::I32Eqz => vec![(i32_arg(0) == 0) as u64],
            Operator::I32Eq => vec![(i32_arg(0) == i32_arg(1)) as u64],
            Operator::I32LtU => vec![(i32_arg(0) < i32_arg(1)) as u64],
            Operator::I32Add => vec![u64::from(i32_arg(0).wrapping_add(i32_arg(1)))],
            Operator::I32Sub => vec![u64::from(i32_arg(0).wrapping_sub(i32_arg(1)))],
            Operator::I32Mul => vec![u64::from(i32_arg(0).wrapping_mul(i32_arg(1)))],
            Operator::I32And => vec![u64::from(i32_arg(0) & i32_arg(1))],
            Operator::I64Add => vec![args[0].wrapping_add(args[1])],
            Operator::Call { function_index } => self.call(*function_index, args)?,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ir::{BlockTarget, SignatureData, Type};

    /// sum = 0; for i in (0..n).rev() { sum += i }; return sum
    fn countdown(module: &mut Module) -> Func {
        let sig = module.add_signature(SignatureData {
            params: vec![Type::I32],
            returns: vec![Type::I32],
        });
        let mut body = FunctionBody::new(module, sig);
        let entry = body.entry;
        let n = body.blocks[entry].params[0].1;
        let header = body.add_block();
        let i = body.add_blockparam(header, Type::I32);
        let sum = body.add_blockparam(header, Type::I32);
        let latch = body.add_block();
        let exit = body.add_block();

        let zero = body.add_op(entry, Operator::I32Const { value: 0 }, &[], &[Type::I32]);
        body.set_terminator(
            entry,
            Terminator::Br {
                target: BlockTarget {
                    block: header,
                    args: vec![n, zero],
                },
            },
        );
        body.set_terminator(
            header,
            Terminator::CondBr {
                cond: i,
                if_true: BlockTarget {
                    block: latch,
                    args: vec![],
                },
                if_false: BlockTarget {
                    block: exit,
                    args: vec![],
                },
            },
        );
        let one = body.add_op(latch, Operator::I32Const { value: 1 }, &[], &[Type::I32]);
        let next_i = body.add_op(latch, Operator::I32Sub, &[i, one], &[Type::I32]);
        let next_sum = body.add_op(latch, Operator::I32Add, &[sum, next_i], &[Type::I32]);
        body.set_terminator(
            latch,
            Terminator::Br {
                target: BlockTarget {
                    block: header,
                    args: vec![next_i, next_sum],
                },
            },
        );
        body.set_terminator(exit, Terminator::Return { values: vec![sum] });
        module.add_func(sig, "countdown", body)
    }

    #[test]
    fn runs_a_loop() {
        let mut module = Module::empty();
        let func = countdown(&mut module);
        let mut ctx = InterpContext::new(&module, TraceRecorder::default(), Fuel::infinite());
        assert_eq!(ctx.call(func, &[4]).unwrap(), vec![6]);
        // entry, 5 header visits, 4 latch visits, exit.
        assert_eq!(ctx.fuel.consumed, 11);
    }

    #[test]
    fn runs_out_of_fuel() {
        let mut module = Module::empty();
        let func = countdown(&mut module);
        let mut ctx = InterpContext::new(&module, TraceRecorder::default(), Fuel::new(5));
        assert!(ctx.call(func, &[100]).is_err());
    }

    #[test]
    fn unknown_imports_fail() {
        let mut recorder = TraceRecorder::default();
        assert!(recorder.call_import("env", "nope", &[]).is_err());
        assert_eq!(recorder.call_import(TRACE_MODULE, TRACE_FUNC, &[42]).unwrap(), vec![]);
        assert_eq!(recorder.locations, vec![42]);
    }
}
