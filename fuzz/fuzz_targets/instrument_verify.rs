#![no_main]
use libfuzzer_sys::fuzz_target;

use blockcov::fuzzing::ArbitraryFunction;
use blockcov::pipeline::Pipeline;
use blockcov::plugin::{plugin_init_with_rng, Environment, HostVersion};
use blockcov::rng::ProcessRng;

fuzz_target!(|input: (ArbitraryFunction, u8, u64)| {
    let _ = env_logger::try_init();
    let (ArbitraryFunction { mut module, func }, ratio, seed) = input;
    let ratio = (1 + ratio % 100).to_string();
    let lookup = |name: &str| {
        if name == "AFL_INST_RATIO" {
            Some(ratio.clone())
        } else {
            None
        }
    };

    let n_blocks = module.funcs[func].body().unwrap().blocks.len();
    let mut pipeline = Pipeline::standard();
    plugin_init_with_rng(
        &HostVersion::current(),
        &mut pipeline,
        Environment::Lookup(&lookup, false),
        ProcessRng::from_seed(seed),
    )
    .unwrap();
    if let Err(e) = pipeline.run_module(&mut module) {
        panic!("instrumented module failed verification: {:?}\n{}", e, module.display());
    }

    // Instrumentation only inserts into existing blocks.
    let body = module.funcs[func].body().unwrap();
    assert_eq!(body.blocks.len(), n_blocks);
});
