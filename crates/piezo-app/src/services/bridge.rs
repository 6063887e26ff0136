//! Wire contract between a caller and the compression worker.
//!
//! Requests and events are typed messages correlated by job id. Binary
//! buffers move through the channels by ownership: the caller's copy is
//! gone once a request is submitted, and the result buffer arrives the same
//! way. Each job receives zero or more `status` and `progress` events and
//! exactly one terminal event (`result` or `error`). Progress percentages
//! are not forced monotonic here (a revised page total may lower them), so
//! display-side smoothing belongs to the caller, as does dropping events
//! for job ids it no longer cares about.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;
use uuid::Uuid;

use piezo_engine::Engine;

use crate::options::ShrinkOptions;
use crate::services::queue;

/// Opaque job correlation token.
pub type JobId = Uuid;

/// Pending requests the queue will buffer before `submit` applies
/// backpressure.
const REQUEST_CHANNEL_DEPTH: usize = 32;

/// Events buffered before the worker awaits the consumer.
const EVENT_CHANNEL_DEPTH: usize = 64;

/// Caller → worker messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum WorkerRequest {
    #[serde(rename_all = "camelCase")]
    Compress {
        job_id: JobId,
        pdf_buffer: Vec<u8>,
        options: ShrinkOptions,
    },
}

/// Job lifecycle stage reported through `status` events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStage {
    Loading,
    Ready,
    Running,
    Done,
    Failed,
}

/// Worker → caller messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum WorkerEvent {
    #[serde(rename_all = "camelCase")]
    Status {
        job_id: JobId,
        stage: JobStage,
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Progress {
        job_id: JobId,
        percent: u8,
        current: u32,
        total: Option<u32>,
    },
    #[serde(rename_all = "camelCase")]
    Result {
        job_id: JobId,
        out_buffer: Vec<u8>,
        used_original: bool,
        pdf_version_used: String,
    },
    #[serde(rename_all = "camelCase")]
    Error { job_id: JobId, error: String },
}

impl WorkerEvent {
    /// Job this event is correlated with.
    pub fn job_id(&self) -> JobId {
        match self {
            WorkerEvent::Status { job_id, .. }
            | WorkerEvent::Progress { job_id, .. }
            | WorkerEvent::Result { job_id, .. }
            | WorkerEvent::Error { job_id, .. } => *job_id,
        }
    }

    /// Whether this event terminates its job.
    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkerEvent::Result { .. } | WorkerEvent::Error { .. })
    }
}

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("compression worker is no longer running")]
    WorkerGone,
}

/// Handle to a spawned compression worker.
///
/// Dropping the handle closes the request channel; the worker drains any
/// queued jobs and exits. Must be created inside a tokio runtime.
pub struct WorkerHandle {
    requests: mpsc::Sender<WorkerRequest>,
    events: mpsc::Receiver<WorkerEvent>,
}

impl WorkerHandle {
    /// Spawn the worker loop around the given engine.
    pub fn spawn<E>(engine: E) -> Self
    where
        E: Engine + 'static,
        E::Session: 'static,
    {
        let (request_tx, request_rx) = mpsc::channel(REQUEST_CHANNEL_DEPTH);
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_DEPTH);
        tokio::spawn(queue::run_worker(engine, request_rx, event_tx));
        Self {
            requests: request_tx,
            events: event_rx,
        }
    }

    /// Submit a job, transferring ownership of the input buffer to the
    /// worker.
    pub async fn submit(&self, request: WorkerRequest) -> Result<(), BridgeError> {
        self.requests
            .send(request)
            .await
            .map_err(|_| BridgeError::WorkerGone)
    }

    /// Next event from the worker; `None` once the worker has shut down and
    /// every pending event was consumed.
    pub async fn next_event(&mut self) -> Option<WorkerEvent> {
        self.events.recv().await
    }
}
