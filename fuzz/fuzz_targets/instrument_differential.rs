#![no_main]
use libfuzzer_sys::fuzz_target;
use std::sync::atomic::{AtomicU64, Ordering};

use blockcov::config::MAP_SIZE;
use blockcov::fuzzing::ArbitraryFunction;
use blockcov::interp::{Fuel, InterpContext, TraceRecorder};
use blockcov::pipeline::Pipeline;
use blockcov::plugin::{plugin_init_with_rng, Environment, HostVersion};
use blockcov::rng::ProcessRng;

const FUEL: u64 = 10_000;

fuzz_target!(|input: (ArbitraryFunction, u32)| {
    let _ = env_logger::try_init();
    let (ArbitraryFunction { mut module, func }, arg) = input;

    let mut orig_ctx = InterpContext::new(&module, TraceRecorder::default(), Fuel::new(FUEL));
    let orig_result = match orig_ctx.call(func, &[u64::from(arg)]) {
        Ok(result) => result,
        Err(e) => {
            log::debug!("original does not finish ({:?}); discarding", e);
            return;
        }
    };
    let blocks_run = orig_ctx.fuel.consumed;
    assert!(orig_ctx.handler.locations.is_empty());

    let total = TOTAL.fetch_add(1, Ordering::Relaxed);

    let no_env = |_: &str| None;
    let mut pipeline = Pipeline::standard();
    plugin_init_with_rng(
        &HostVersion::current(),
        &mut pipeline,
        Environment::Lookup(&no_env, false),
        ProcessRng::from_seed(u64::from(arg)),
    )
    .unwrap();
    pipeline.run_module(&mut module).unwrap();

    let mut inst_ctx = InterpContext::new(&module, TraceRecorder::default(), Fuel::new(FUEL));
    let inst_result = inst_ctx
        .call(func, &[u64::from(arg)])
        .expect("instrumented function failed where the original ran");

    log::info!("orig = {:?} instrumented = {:?}", orig_result, inst_result);
    assert_eq!(orig_result, inst_result);
    // Every block is instrumented at the default ratio, so every
    // executed block traced exactly once.
    assert_eq!(inst_ctx.handler.locations.len() as u64, blocks_run);
    assert!(inst_ctx.handler.locations.iter().all(|&loc| loc < MAP_SIZE));

    success(total);
});

static TOTAL: AtomicU64 = AtomicU64::new(0);
static SUCCESS: AtomicU64 = AtomicU64::new(0);

fn success(total: u64) {
    let value = SUCCESS.fetch_add(1, Ordering::Relaxed);
    if value % 100 == 0 {
        eprintln!("SUCCESS: {} / TOTAL: {}", value, total);
    }
}
