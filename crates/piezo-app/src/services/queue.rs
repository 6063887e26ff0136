//! Sequential job scheduling.
//!
//! One worker loop owns the engine. Requests drain strictly in submission
//! order, one at a time, so no two engine invocations ever overlap within a
//! worker. A job's failure is reported through its own `error` event and
//! never stops the loop; the next queued job runs regardless of the prior
//! outcome.

use tokio::sync::mpsc;

use piezo_engine::Engine;

use crate::services::bridge::{WorkerEvent, WorkerRequest};
use crate::services::runner;

pub(crate) async fn run_worker<E>(
    engine: E,
    mut requests: mpsc::Receiver<WorkerRequest>,
    events: mpsc::Sender<WorkerEvent>,
) where
    E: Engine,
    E::Session: 'static,
{
    while let Some(request) = requests.recv().await {
        let WorkerRequest::Compress {
            job_id,
            pdf_buffer,
            options,
        } = request;
        tracing::info!(%job_id, input_bytes = pdf_buffer.len(), "job dequeued");
        // run_job reports its own outcome; the loop advances unconditionally.
        runner::run_job(&engine, job_id, pdf_buffer, options, &events).await;
    }
    tracing::debug!("request channel closed; compression worker exiting");
}
