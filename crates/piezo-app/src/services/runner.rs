//! Drives a single compression job end-to-end.
//!
//! Per-job state machine: `loading → ready → running → {done, failed}`.
//! Every failure inside a job is converted into exactly one `error` event
//! at this boundary; nothing escapes into the worker loop. Per-job state
//! (engine session, progress tracker) is owned by the job's own call frame,
//! so cleanup on both exit paths is a matter of dropping it.

use std::collections::VecDeque;

use thiserror::Error;
use tokio::sync::mpsc;

use piezo_engine::{Engine, EngineError, EngineSession};

use crate::constants::{
    ENGINE_INPUT_NAME, ENGINE_OUTPUT_NAME, ERROR_LOG_TAIL_LINES, FALLBACK_PDF_VERSION,
};
use crate::invocation::build_engine_args;
use crate::options::ShrinkOptions;
use crate::pdf::sniff_pdf_version;
use crate::progress::ProgressTracker;
use crate::services::bridge::{JobId, JobStage, WorkerEvent};

/// Failures while driving one job.
#[derive(Debug, Error)]
pub enum JobError {
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("{message}")]
    Execution { message: String },
    #[error("engine task aborted: {0}")]
    Join(String),
}

struct JobOutcome {
    output: Vec<u8>,
    used_original: bool,
    pdf_version: String,
    final_page: u32,
    total_pages: Option<u32>,
}

/// Run one job to completion and report its outcome through `events`.
///
/// Event sends are best-effort: a caller that dropped its handle mid-job
/// loses the remaining events, nothing else.
pub(crate) async fn run_job<E>(
    engine: &E,
    job_id: JobId,
    input: Vec<u8>,
    options: ShrinkOptions,
    events: &mpsc::Sender<WorkerEvent>,
) where
    E: Engine,
    E::Session: 'static,
{
    let started = std::time::Instant::now();
    match drive(engine, job_id, input, options, events).await {
        Ok(outcome) => {
            // Completion is the only source of 100%; the tracker never
            // reports it on its own.
            let _ = events
                .send(WorkerEvent::Progress {
                    job_id,
                    percent: 100,
                    current: outcome.final_page,
                    total: outcome.total_pages,
                })
                .await;
            let message = if outcome.used_original {
                "engine output was larger than the input; keeping the original".to_string()
            } else {
                "compression finished".to_string()
            };
            let _ = events
                .send(WorkerEvent::Status {
                    job_id,
                    stage: JobStage::Done,
                    message: Some(message),
                })
                .await;
            tracing::info!(
                %job_id,
                elapsed_ms = started.elapsed().as_millis() as u64,
                output_bytes = outcome.output.len(),
                used_original = outcome.used_original,
                "job finished"
            );
            let _ = events
                .send(WorkerEvent::Result {
                    job_id,
                    out_buffer: outcome.output,
                    used_original: outcome.used_original,
                    pdf_version_used: outcome.pdf_version,
                })
                .await;
        }
        Err(err) => {
            tracing::warn!(%job_id, error = %err, "job failed");
            let _ = events
                .send(WorkerEvent::Status {
                    job_id,
                    stage: JobStage::Failed,
                    message: None,
                })
                .await;
            let _ = events
                .send(WorkerEvent::Error {
                    job_id,
                    error: err.to_string(),
                })
                .await;
        }
    }
}

async fn drive<E>(
    engine: &E,
    job_id: JobId,
    input: Vec<u8>,
    options: ShrinkOptions,
    events: &mpsc::Sender<WorkerEvent>,
) -> Result<JobOutcome, JobError>
where
    E: Engine,
    E::Session: 'static,
{
    send_status(events, job_id, JobStage::Loading, None).await;
    let session = engine.open_session()?;
    send_status(events, job_id, JobStage::Ready, Some(engine.describe())).await;

    send_status(events, job_id, JobStage::Running, None).await;
    // Fresh progress state for this job; announce the starting point.
    let _ = events
        .send(WorkerEvent::Progress {
            job_id,
            percent: 0,
            current: 0,
            total: None,
        })
        .await;

    let blocking_events = events.clone();
    tokio::task::spawn_blocking(move || execute(session, job_id, input, options, blocking_events))
        .await
        .map_err(|err| JobError::Join(err.to_string()))?
}

/// The synchronous middle of a job: engine filesystem setup, the engine
/// invocation itself, and the size-fallback decision. Runs on the blocking
/// pool because the engine call does not yield.
fn execute<S: EngineSession>(
    mut session: S,
    job_id: JobId,
    input: Vec<u8>,
    options: ShrinkOptions,
    events: mpsc::Sender<WorkerEvent>,
) -> Result<JobOutcome, JobError> {
    // Stale same-named files would otherwise leak into this run.
    session.remove_file(ENGINE_INPUT_NAME)?;
    session.remove_file(ENGINE_OUTPUT_NAME)?;
    session.write_file(ENGINE_INPUT_NAME, &input)?;

    let pdf_version =
        sniff_pdf_version(&input).unwrap_or_else(|| FALLBACK_PDF_VERSION.to_string());
    let options = options.sanitized();
    let args = build_engine_args(
        &options,
        &pdf_version,
        &session.file_path(ENGINE_OUTPUT_NAME),
        &session.file_path(ENGINE_INPUT_NAME),
    );

    let mut tracker = ProgressTracker::new();
    let mut tail: VecDeque<String> = VecDeque::with_capacity(ERROR_LOG_TAIL_LINES);
    let run_result = session.run(&args, &mut |line| {
        if tail.len() == ERROR_LOG_TAIL_LINES {
            tail.pop_front();
        }
        tail.push_back(line.to_string());

        if let Some(snapshot) = tracker.observe_line(line) {
            let _ = events.blocking_send(WorkerEvent::Progress {
                job_id,
                percent: snapshot.percent,
                current: snapshot.current_page,
                total: snapshot.total_pages,
            });
        }
    });
    if let Err(source) = run_result {
        return Err(JobError::Execution {
            message: failure_message(&source, &tail),
        });
    }

    // A missing or unreadable output propagates as an execution failure.
    let output = session.read_file(ENGINE_OUTPUT_NAME)?;

    // Some presets inflate already-optimized documents; keep whichever
    // buffer is smaller.
    let (output, used_original) = if output.len() > input.len() {
        (input, true)
    } else {
        (output, false)
    };

    Ok(JobOutcome {
        output,
        used_original,
        pdf_version,
        final_page: tracker.total_pages().unwrap_or_else(|| tracker.current_page()),
        total_pages: tracker.total_pages(),
    })
}

fn failure_message(source: &EngineError, tail: &VecDeque<String>) -> String {
    if tail.is_empty() {
        source.to_string()
    } else {
        let context = tail.iter().map(String::as_str).collect::<Vec<_>>().join(" | ");
        format!("{source}; last engine output: {context}")
    }
}

async fn send_status(
    events: &mpsc::Sender<WorkerEvent>,
    job_id: JobId,
    stage: JobStage,
    message: Option<String>,
) {
    let _ = events
        .send(WorkerEvent::Status {
            job_id,
            stage,
            message,
        })
        .await;
}
