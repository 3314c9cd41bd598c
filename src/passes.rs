//! Passes.

pub mod coverage;
pub mod empty_blocks;
pub mod resolve_aliases;
pub mod ssa;
pub mod verify;
