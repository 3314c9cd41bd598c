//! Coverage instrumentation: inject calls to an external tracing
//! routine at the head of a randomly sampled subset of basic blocks.
//!
//! For every block in a function, one sample in `[0, 100)` decides
//! whether the block is instrumented: it is skipped when the sample is
//! at least the configured ratio, so a ratio of 100 instruments every
//! block and a ratio of R instruments each block independently with
//! probability R/100. An instrumented block gets
//!
//! ```text
//!   vN   = i32.const<loc>
//!   vN+1 = call<__afl_trace> vN
//! ```
//!
//! in front of its first original instruction, where `loc` is drawn
//! uniformly from the coverage map's slot range. Ids may collide
//! across blocks and across modules; the runtime tolerates that.
//!
//! Only block contents change. The block set, each block's params and
//! terminator, and so the CFG shape, are left exactly as they were.

use crate::config::Config;
use crate::entity::EntityRef;
use crate::ir::{Block, Func, FunctionBody, Module, SignatureData, Type, Value, ValueDef};
use crate::ops::Operator;
use crate::pipeline::{FunctionPass, TodoFlags};
use crate::rng::RandomSource;
use anyhow::Result;

/// Module the tracing routine is imported from.
pub const TRACE_MODULE: &str = "env";
/// Name of the tracing routine. Defined by the runtime library linked
/// into the instrumented program.
pub const TRACE_FUNC: &str = "__afl_trace";

/// Signature of the tracing routine: one location id, no result.
pub fn trace_signature() -> SignatureData {
    SignatureData {
        params: vec![Type::I32],
        returns: vec![],
    }
}

/// Declare the tracing routine in `module`, or find the existing
/// declaration.
pub fn declare_trace(module: &mut Module) -> Result<Func> {
    Ok(module.declare_import(TRACE_MODULE, TRACE_FUNC, trace_signature())?)
}

/// The view of a host-owned function body the instrumentor needs.
pub trait BlockGraph {
    /// Number of blocks. Blocks are `Block::new(0)` up to this count.
    fn num_blocks(&self) -> usize;
    /// Define a new value without placing it in any block.
    fn add_value(&mut self, def: ValueDef) -> Value;
    /// Place `seq`, in order, before the first instruction of `block`.
    fn prepend_to_block(&mut self, block: Block, seq: &[Value]);
}

impl BlockGraph for FunctionBody {
    fn num_blocks(&self) -> usize {
        self.blocks.len()
    }

    fn add_value(&mut self, def: ValueDef) -> Value {
        FunctionBody::add_value(self, def)
    }

    fn prepend_to_block(&mut self, block: Block, seq: &[Value]) {
        FunctionBody::prepend_to_block(self, block, seq)
    }
}

/// State shared by every invocation within one compilation process.
#[derive(Clone, Debug)]
pub struct InstrumentState<R: RandomSource> {
    pub rng: R,
    /// Blocks instrumented so far, across all functions. Never reset.
    pub inst_blocks: u64,
}

impl<R: RandomSource> InstrumentState<R> {
    pub fn new(rng: R) -> Self {
        InstrumentState {
            rng,
            inst_blocks: 0,
        }
    }
}

/// Instrument the blocks of `graph` with calls to the tracing routine.
/// `declare` yields the routine and is only called once a block is
/// selected, so a function with no selected blocks leaves the module
/// untouched. Returns how many blocks received a call.
pub fn instrument<G, R, D>(
    graph: &mut G,
    mut declare: D,
    config: &Config,
    state: &mut InstrumentState<R>,
) -> Result<usize>
where
    G: BlockGraph + ?Sized,
    R: RandomSource,
    D: FnMut() -> Result<Func>,
{
    let mut trace = None;
    let mut count = 0;
    for block in (0..graph.num_blocks()).map(Block::new) {
        // Bail on this block if we trip the ratio.
        if state.rng.below(100) >= config.inst_ratio {
            log::trace!("coverage: skipping {}", block);
            continue;
        }

        let function_index = match trace {
            Some(func) => func,
            None => *trace.insert(declare()?),
        };
        let loc = state.rng.below(config.map_size());
        let cur_loc = graph.add_value(ValueDef::Operator(
            Operator::I32Const { value: loc },
            vec![],
            vec![Type::I32],
        ));
        let call = graph.add_value(ValueDef::Operator(
            Operator::Call { function_index },
            vec![cur_loc],
            vec![],
        ));
        graph.prepend_to_block(block, &[cur_loc, call]);
        log::trace!("coverage: {} gets location {}", block, loc);

        count += 1;
        state.inst_blocks += 1;
    }
    Ok(count)
}

/// What to tell the user after instrumenting.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Summary {
    NoTargets,
    Instrumented {
        count: u64,
        mode: &'static str,
        ratio: u32,
    },
}

impl Summary {
    pub fn new(config: &Config, inst_blocks: u64) -> Summary {
        if inst_blocks == 0 {
            Summary::NoTargets
        } else {
            Summary::Instrumented {
                count: inst_blocks,
                mode: config.mode_label(),
                ratio: config.inst_ratio,
            }
        }
    }

    pub fn is_warning(&self) -> bool {
        *self == Summary::NoTargets
    }

    pub fn log(&self) {
        if self.is_warning() {
            log::warn!("{}", self);
        } else {
            log::info!("{}", self);
        }
    }
}

impl std::fmt::Display for Summary {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Summary::NoTargets => write!(f, "No instrumentation targets found."),
            Summary::Instrumented { count, mode, ratio } => write!(
                f,
                "Instrumented {} locations ({} mode, ratio {}%).",
                count, mode, ratio
            ),
        }
    }
}

/// The instrumentor as a pipeline pass.
pub struct CoveragePass<R: RandomSource> {
    config: Config,
    state: InstrumentState<R>,
    last_summary: Option<Summary>,
}

impl<R: RandomSource> CoveragePass<R> {
    pub const NAME: &'static str = "afl-inst";

    pub fn new(config: Config, rng: R) -> Self {
        CoveragePass {
            config,
            state: InstrumentState::new(rng),
            last_summary: None,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn state(&self) -> &InstrumentState<R> {
        &self.state
    }

    /// The summary computed by the most recent invocation, whether or
    /// not it was printed.
    pub fn last_summary(&self) -> Option<&Summary> {
        self.last_summary.as_ref()
    }
}

impl<R: RandomSource> FunctionPass for CoveragePass<R> {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn execute(
        &mut self,
        module: &mut Module,
        func: Func,
        body: &mut FunctionBody,
    ) -> Result<TodoFlags> {
        let count = instrument(
            body,
            || declare_trace(module),
            &self.config,
            &mut self.state,
        )?;
        log::debug!(
            "coverage: {} of {} blocks instrumented in {}",
            count,
            body.blocks.len(),
            func
        );

        let summary = Summary::new(&self.config, self.state.inst_blocks);
        if !self.config.quiet {
            summary.log();
        }
        self.last_summary = Some(summary);

        // New values, new uses: the host must bring assignment form,
        // verification state and CFG shape back up to date.
        Ok(TodoFlags::UPDATE_SSA | TodoFlags::VERIFY_ALL | TodoFlags::CLEANUP_CFG)
    }
}
