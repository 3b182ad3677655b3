//! Sync orchestration for Singer taps and targets.
//!
//! Resolves connector configs, pipes a tap into a target, and keeps the
//! tap's checkpoint in object storage between runs.

pub mod cleanup;
pub mod config;
pub mod context;
pub mod discover;
pub mod errors;
pub mod orchestrator;
pub mod process;
pub mod provision;
pub mod runner;

// Re-export public API for convenience
pub use context::RunContext;
pub use errors::SyncError;
pub use orchestrator::{discover_tap, sync_tap, SyncRequest};
pub use runner::{PipelineRunner, RunResult};
