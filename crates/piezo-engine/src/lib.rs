//! Opaque PDF-rewriting engine boundary.
//!
//! The byte-level PDF work (image downsampling, font subsetting, stream
//! rewriting) happens inside an external compiled binary, a
//! PostScript/PDF interpreter. This crate wraps that binary behind the
//! [`Engine`]/[`EngineSession`] traits: a private per-session scratch
//! filesystem, a synchronous "run with arguments" entry point, and
//! line-oriented forwarding of both output streams. Orchestration lives in
//! `piezo-app`; this crate knows nothing about jobs, queues, or progress.

mod ghostscript;

pub use ghostscript::{Ghostscript, GhostscriptSession};

use thiserror::Error;

/// Errors emitted by the engine boundary.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("no usable engine binary found (tried: {tried})")]
    BinaryNotFound { tried: String },

    #[error("failed to create engine scratch directory: {0}")]
    Scratch(#[source] std::io::Error),

    #[error("failed to write `{name}` into the engine filesystem: {source}")]
    Write {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read `{name}` from the engine filesystem: {source}")]
    Read {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to remove `{name}` from the engine filesystem: {source}")]
    Remove {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to launch engine process: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("engine run failed: {detail}")]
    Failed { detail: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Factory handing out single-use engine sessions.
pub trait Engine: Send + Sync {
    type Session: EngineSession;

    /// Open a fresh session with its own private filesystem. Sessions are
    /// never pooled or reused; one session serves exactly one invocation
    /// context.
    fn open_session(&self) -> Result<Self::Session, EngineError>;

    /// Human-readable identity of the underlying engine build.
    fn describe(&self) -> String;
}

/// One engine invocation context.
///
/// A session owns a private filesystem namespace; file names are relative
/// to it and resolved with [`file_path`](EngineSession::file_path) when they
/// appear on the engine command line. Dropping a session tears the
/// namespace down, on success and failure alike.
pub trait EngineSession: Send {
    fn write_file(&mut self, name: &str, bytes: &[u8]) -> Result<(), EngineError>;

    fn read_file(&mut self, name: &str) -> Result<Vec<u8>, EngineError>;

    /// Remove a file if present. Missing files are not an error.
    fn remove_file(&mut self, name: &str) -> Result<(), EngineError>;

    /// Absolute path of `name` inside the session filesystem, as the engine
    /// expects it on its command line.
    fn file_path(&self, name: &str) -> String;

    /// Run the engine synchronously with the given arguments.
    ///
    /// The call does not return until the engine exits. Both the standard
    /// and the diagnostic stream are forwarded to `on_line` one line at a
    /// time, in arrival order; the engine does not separate informational
    /// and diagnostic text cleanly, so callers must treat every line the
    /// same way.
    fn run(&mut self, args: &[String], on_line: &mut dyn FnMut(&str)) -> Result<(), EngineError>;
}
