//! blockcov command-line tool.

use anyhow::Result;
use blockcov::config::Config;
use blockcov::interp::{Fuel, InterpContext, TraceRecorder};
use blockcov::pipeline::Pipeline;
use blockcov::plugin::{plugin_init_with_rng, Environment, HostVersion};
use blockcov::rng::ProcessRng;
use blockcov::{BlockTarget, Func, FunctionBody, Module, Operator, SignatureData, Terminator, Type};
use log::debug;
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(name = "blockcov-util", about = "blockcov utility.")]
struct Options {
    #[structopt(short, long)]
    debug: bool,

    #[structopt(subcommand)]
    command: Command,
}

#[derive(Debug, StructOpt)]
enum Command {
    #[structopt(name = "check-config", about = "Read the AFL_* environment and print the result")]
    CheckConfig,
    #[structopt(
        name = "run-sample",
        about = "Instrument a counting loop, run it and print the trace"
    )]
    RunSample {
        #[structopt(long, default_value = "4", help = "Loop trip count")]
        n: u32,
        #[structopt(long, help = "Seed for location ids (default: time and pid)")]
        seed: Option<u64>,
    },
}

/// `sum = 0; while n != 0 { n -= 1; sum += n }; return sum`
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

fn main() -> Result<()> {
    let opts = Options::from_args();

    let mut logger = env_logger::Builder::from_default_env();
    if opts.debug {
        logger.filter_level(log::LevelFilter::Debug);
    } else {
        logger.filter_level(log::LevelFilter::Info);
    }
    let _ = logger.try_init();

    match opts.command {
        Command::CheckConfig => {
            let config = Config::from_env()?;
            println!("{:#?}", config);
        }
        Command::RunSample { n, seed } => {
            let rng = match seed {
                Some(seed) => ProcessRng::from_seed(seed),
                None => ProcessRng::from_time_and_pid(),
            };
            debug!("location seed: {}", rng.seed());

            let mut module = Module::empty();
            let func = counting_loop(&mut module);
            let mut pipeline = Pipeline::standard();
            plugin_init_with_rng(
                &HostVersion::current(),
                &mut pipeline,
                Environment::Process,
                rng,
            )?;
            pipeline.run_module(&mut module)?;
            println!("{}", module.display());

            let mut ctx = InterpContext::new(&module, TraceRecorder::default(), Fuel::infinite());
            let result = ctx.call(func, &[u64::from(n)])?;
            println!("result: {:?}", result);
            println!("trace ({} calls): {:?}", ctx.handler.locations.len(), ctx.handler.locations);
        }
    }

    Ok(())
}
