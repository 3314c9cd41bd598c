//! blockcov: basic-block coverage instrumentation for an SSA CFG IR.
//!
//! The crate carries a small host (IR, pass pipeline, verifier and
//! interpreter) and the coverage pass itself, which injects calls to an
//! external `__afl_trace(loc)` routine at the head of a sampled subset
//! of each function's basic blocks.

pub mod cfg;
pub mod config;
pub mod entity;
mod errors;
pub mod interp;
mod ir;
pub mod op_traits;
mod ops;
pub mod passes;
pub mod pipeline;
pub mod plugin;
pub mod rng;

pub use errors::*;
pub use ir::*;
pub use ops::Operator;

#[cfg(feature = "fuzzing")]
pub mod fuzzing;
