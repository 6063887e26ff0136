//! Application-level error type shared by the CLI and services.

use std::path::PathBuf;

use thiserror::Error;

use piezo_engine::EngineError;

use crate::config::AppConfigError;
use crate::services::BridgeError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    ConfigLoad(#[from] AppConfigError),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Bridge(#[from] BridgeError),
    #[error("failed to read input file {path}: {source}")]
    ReadInput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write output file {path}: {source}")]
    WriteOutput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{path}: compression failed: {message}")]
    JobFailed { path: PathBuf, message: String },
    #[error("worker stopped before delivering all results")]
    WorkerStopped,
    #[error("{failed} of {total} jobs failed")]
    PartialFailure { failed: usize, total: usize },
}
