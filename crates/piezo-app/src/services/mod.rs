//! Orchestration layer around the compression engine.
//!
//! Pure transforms (option sanitation, argument building, version sniffing,
//! progress parsing) live in dedicated modules at the crate root; the
//! modules here own concurrency, channels, and engine I/O.

pub mod bridge;
pub mod queue;
pub mod runner;

pub use bridge::{
    BridgeError, JobId, JobStage, WorkerEvent, WorkerHandle, WorkerRequest,
};
pub use runner::JobError;
