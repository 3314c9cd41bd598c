//! End-to-end tests: the plugin registered in a host pipeline,
//! instrumented code run under the interpreter.

use anyhow::Result;
use blockcov::config::{Config, MAP_SIZE};
use blockcov::interp::{Fuel, InterpContext, TraceRecorder};
use blockcov::passes::coverage::{declare_trace, instrument, CoveragePass, InstrumentState, Summary};
use blockcov::passes::verify;
use blockcov::pipeline::{FunctionPass, PassPosition, PassRegistration, Pipeline, TodoFlags};
use blockcov::plugin::{plugin_init_with_rng, Environment, HostVersion};
use blockcov::rng::ProcessRng;
use blockcov::{BlockTarget, Func, FunctionBody, Module, Operator, SignatureData, Terminator, Type};
use std::cell::RefCell;
use std::rc::Rc;

/// `sum = 0; while n != 0 { n -= 1; sum += n }; return sum`, in four
/// blocks: entry, header, latch, exit.
fn counting_loop(module: &mut Module) -> Func {
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
    module.add_func(sig, "counting_loop", body)
}

/// A straight-line chain of `n` blocks, each holding one constant.
fn chain(module: &mut Module, n: usize) -> Func {
    let sig = module.add_signature(SignatureData {
        params: vec![],
        returns: vec![],
    });
    let mut body = FunctionBody::new(module, sig);
    let mut block = body.entry;
    for i in 1..n {
        body.add_op(block, Operator::I32Const { value: i as u32 }, &[], &[Type::I32]);
        let next = body.add_block();
        body.set_terminator(
            block,
            Terminator::Br {
                target: BlockTarget {
                    block: next,
                    args: vec![],
                },
            },
        );
        block = next;
    }
    body.set_terminator(block, Terminator::Return { values: vec![] });
    module.add_func(sig, "chain", body)
}

fn no_env(_: &str) -> Option<String> {
    None
}

fn run(module: &Module, func: Func, n: u32) -> (Vec<u64>, Vec<u32>, u64) {
    let mut ctx = InterpContext::new(module, TraceRecorder::default(), Fuel::infinite());
    let result = ctx.call(func, &[u64::from(n)]).unwrap();
    (result, ctx.handler.locations, ctx.fuel.consumed)
}

#[test]
fn plugin_instruments_module_in_pipeline() {
    let _ = env_logger::try_init();
    let mut module = Module::empty();
    let func = counting_loop(&mut module);

    let mut pipeline = Pipeline::standard();
    let config = plugin_init_with_rng(
        &HostVersion::current(),
        &mut pipeline,
        Environment::Lookup(&no_env, false),
        ProcessRng::from_seed(42),
    )
    .unwrap();
    assert_eq!(config.inst_ratio, 100);
    pipeline.run_module(&mut module).unwrap();

    let trace = module.lookup_import("env", "__afl_trace").unwrap();
    let body = module.funcs[func].body().unwrap();
    verify::run(&module, body).unwrap();
    for data in body.blocks.values() {
        assert!(matches!(
            body.values[data.insts[1]],
            blockcov::ValueDef::Operator(Operator::Call { function_index }, _, _)
                if function_index == trace
        ));
    }
}

#[test]
fn every_executed_block_traces_once() {
    let mut module = Module::empty();
    let func = counting_loop(&mut module);
    let (orig_result, orig_trace, blocks_run) = run(&module, func, 5);
    assert!(orig_trace.is_empty());

    let mut pipeline = Pipeline::standard();
    plugin_init_with_rng(
        &HostVersion::current(),
        &mut pipeline,
        Environment::Lookup(&no_env, false),
        ProcessRng::from_seed(9),
    )
    .unwrap();
    pipeline.run_module(&mut module).unwrap();

    let (result, trace, inst_blocks_run) = run(&module, func, 5);
    assert_eq!(result, orig_result);
    assert_eq!(result, vec![10]);
    assert_eq!(inst_blocks_run, blocks_run);
    assert_eq!(trace.len() as u64, blocks_run);
    assert!(trace.iter().all(|&loc| loc < MAP_SIZE));

    // entry, header x6, latch x5, exit: the loop body repeats its ids.
    assert_eq!(trace[2], trace[4]);
    assert_eq!(trace[1], trace[3]);
}

#[test]
fn four_block_function_summary() {
    let mut module = Module::empty();
    let func = counting_loop(&mut module);
    let mut config = Config::default();
    config.quiet = true;
    let mut pass = CoveragePass::new(config, ProcessRng::from_seed(1));
    let mut body = module.funcs[func].take_body().unwrap();
    pass.execute(&mut module, func, &mut body).unwrap();
    module.funcs[func].put_body(body);

    assert_eq!(
        pass.last_summary().map(|s| s.to_string()),
        Some("Instrumented 4 locations (non-hardened mode, ratio 100%).".to_owned())
    );
}

#[test]
fn ratio_controls_fraction_of_blocks() {
    const BLOCKS: usize = 1000;
    const SEEDS: u64 = 5;

    let config = Config::default().with_ratio(30).unwrap();
    let mut total = 0;
    for seed in 0..SEEDS {
        let mut module = Module::empty();
        let func = chain(&mut module, BLOCKS);
        let mut body = module.funcs[func].take_body().unwrap();
        let mut state = InstrumentState::new(ProcessRng::from_seed(seed));
        let declare = || declare_trace(&mut module);
        let count = instrument(&mut body, declare, &config, &mut state).unwrap();
        assert_eq!(state.inst_blocks, count as u64);
        verify::run(&module, &body).unwrap();
        total += count;
    }

    // 5000 trials at p = 0.3: mean 1500, standard deviation about 32.
    let expected = (BLOCKS as u64 * SEEDS * 30 / 100) as usize;
    assert!(
        total > expected - 160 && total < expected + 160,
        "instrumented {} of {} blocks",
        total,
        BLOCKS as u64 * SEEDS
    );
}

#[test]
fn partial_instrumentation_preserves_behavior() {
    let lookup = |name: &str| {
        if name == "AFL_INST_RATIO" {
            Some("50".to_owned())
        } else {
            None
        }
    };
    for seed in 0..8 {
        let mut module = Module::empty();
        let func = counting_loop(&mut module);
        let (orig_result, _, blocks_run) = run(&module, func, 7);

        let mut pipeline = Pipeline::standard();
        plugin_init_with_rng(
            &HostVersion::current(),
            &mut pipeline,
            Environment::Lookup(&lookup, false),
            ProcessRng::from_seed(seed),
        )
        .unwrap();
        pipeline.run_module(&mut module).unwrap();

        let (result, trace, _) = run(&module, func, 7);
        assert_eq!(result, orig_result);
        assert!(trace.len() as u64 <= blocks_run);
    }
}

/// Lets the test read the pass's state after the pipeline has run it.
struct SharedPass(Rc<RefCell<CoveragePass<ProcessRng>>>);

impl FunctionPass for SharedPass {
    fn name(&self) -> &str {
        CoveragePass::<ProcessRng>::NAME
    }

    fn execute(
        &mut self,
        module: &mut Module,
        func: Func,
        body: &mut FunctionBody,
    ) -> Result<TodoFlags> {
        self.0.borrow_mut().execute(module, func, body)
    }
}

fn empty_function(module: &mut Module) -> Func {
    let sig = module.add_signature(SignatureData {
        params: vec![],
        returns: vec![],
    });
    module.add_func(sig, "empty", FunctionBody::default())
}

#[test]
fn zero_block_function_warns_and_compiles() {
    let mut module = Module::empty();
    let func = empty_function(&mut module);

    let pass = CoveragePass::new(Config::default(), ProcessRng::from_seed(0));
    let pass = Rc::new(RefCell::new(pass));
    let mut pipeline = Pipeline::standard();
    pipeline
        .register(PassRegistration {
            pass: Box::new(SharedPass(pass.clone())),
            reference_pass_name: "ssa".to_owned(),
            ref_pass_instance_number: 1,
            pos_op: PassPosition::InsertAfter,
        })
        .unwrap();
    pipeline.run_module(&mut module).unwrap();

    assert!(module.imports.is_empty());
    assert!(module.funcs[func].body().unwrap().blocks.is_empty());
    assert_eq!(pass.borrow().state().inst_blocks, 0);
    assert_eq!(pass.borrow().last_summary(), Some(&Summary::NoTargets));
}

#[test]
fn plugin_tolerates_zero_block_function() {
    let mut module = Module::empty();
    empty_function(&mut module);
    let func = counting_loop(&mut module);

    let mut pipeline = Pipeline::standard();
    plugin_init_with_rng(
        &HostVersion::current(),
        &mut pipeline,
        Environment::Lookup(&no_env, false),
        ProcessRng::from_seed(0),
    )
    .unwrap();
    pipeline.run_module(&mut module).unwrap();

    // The loop after the empty function is still instrumented.
    assert_eq!(module.imports.len(), 1);
    let (result, trace, blocks_run) = run(&module, func, 3);
    assert_eq!(result, vec![3]);
    assert_eq!(trace.len() as u64, blocks_run);
}
