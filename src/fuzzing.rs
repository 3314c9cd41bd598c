//! Fuzzing-specific utilities.

use crate::ir::{
    Block, BlockTarget, Func, FunctionBody, Module, SignatureData, Terminator, Type, Value,
};
use crate::ops::Operator;
use libfuzzer_sys::arbitrary::{self, Arbitrary, Unstructured};

/// A module holding one `(i32) -> i32` function with an arbitrary
/// CFG. Every non-entry block takes one `i32` param, and every block
/// only uses its own param and the values it defines, so the body is
/// always well-formed SSA whatever shape the CFG takes.
///
/// Public/exported only for access by fuzzers.
#[derive(Debug)]
pub struct ArbitraryFunction {
    pub module: Module,
    pub func: Func,
}

impl<'a> Arbitrary<'a> for ArbitraryFunction {
    fn arbitrary(u: &mut Unstructured<'a>) -> arbitrary::Result<Self> {
        let mut module = Module::empty();
        let sig = module.add_signature(SignatureData {
            params: vec![Type::I32],
            returns: vec![Type::I32],
        });
        let mut body = FunctionBody::new(&module, sig);

        let n_blocks = u.int_in_range(1..=16)?;
        let mut blocks: Vec<Block> = vec![body.entry];
        let mut params: Vec<Value> = vec![body.blocks[body.entry].params[0].1];
        for _ in 1..n_blocks {
            let block = body.add_block();
            params.push(body.add_blockparam(block, Type::I32));
            blocks.push(block);
        }

        for (i, &block) in blocks.iter().enumerate() {
            let mut avail = vec![params[i]];
            for _ in 0..u.int_in_range(0..=4)? {
                let a = *u.choose(&avail)?;
                let b = *u.choose(&avail)?;
                let value = match u.int_in_range(0..=5)? {
                    0 => {
                        let value = u.arbitrary()?;
                        body.add_op(block, Operator::I32Const { value }, &[], &[Type::I32])
                    }
                    1 => body.add_op(block, Operator::I32Add, &[a, b], &[Type::I32]),
                    2 => body.add_op(block, Operator::I32Sub, &[a, b], &[Type::I32]),
                    3 => body.add_op(block, Operator::I32Mul, &[a, b], &[Type::I32]),
                    4 => body.add_op(block, Operator::I32And, &[a, b], &[Type::I32]),
                    _ => body.add_op(block, Operator::I32Eqz, &[a], &[Type::I32]),
                };
                avail.push(value);
            }

            let targets = &blocks[1..];
            let terminator = if targets.is_empty() || u.ratio(1, 4)? {
                Terminator::Return {
                    values: vec![*u.choose(&avail)?],
                }
            } else if u.arbitrary()? {
                Terminator::Br {
                    target: BlockTarget {
                        block: *u.choose(targets)?,
                        args: vec![*u.choose(&avail)?],
                    },
                }
            } else {
                Terminator::CondBr {
                    cond: *u.choose(&avail)?,
                    if_true: BlockTarget {
                        block: *u.choose(targets)?,
                        args: vec![*u.choose(&avail)?],
                    },
                    if_false: BlockTarget {
                        block: *u.choose(targets)?,
                        args: vec![*u.choose(&avail)?],
                    },
                }
            };
            body.set_terminator(block, terminator);
        }

        let func = module.add_func(sig, "arbitrary", body);
        Ok(ArbitraryFunction { module, func })
    }
}
