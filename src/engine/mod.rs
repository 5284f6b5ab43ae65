// src/engine/mod.rs
// =============================================================================
// This module runs the resolution pipeline over a whole document.
//
// Submodules:
// - checkpoint: the durable link -> token store that makes runs resumable
// - batch: the worker pool, the aggregator, and the progress reporting
//
// Design in one paragraph: workers only resolve and report; one aggregator
// loop owns the checkpoint and all counters. Every completion - success or
// failure - flows back through that single loop, which persists the full
// checkpoint and prints a progress line. No shared mutable state anywhere.
//
// Rust concepts:
// - Modules: Organize code into namespaces
// - pub use: Re-export items to simplify imports for users of this module
// =============================================================================

mod batch;
mod checkpoint;

// Re-export the public API of the engine
pub use batch::{run_batch, BatchSummary, DEFAULT_WORKERS};
