// Pipeline runner - At most one background run at a time

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::oneshot;
use tracing::{debug, info};

use crate::app::pipeline_interactor::{PipelineOrchestrator, PipelineRequest};
use crate::domain::model::PipelineOutcome;
use crate::error::{Video2PdfError, Video2PdfResult};
use crate::progress::{progress_channel, ProgressEvent, ProgressReceiver};

/// Observer side of a started run
#[derive(Debug)]
pub struct RunHandle {
    pub events: ProgressReceiver,
    completion: oneshot::Receiver<Video2PdfResult<PipelineOutcome>>,
}

impl RunHandle {
    /// Non-blocking completion check
    pub fn try_outcome(&mut self) -> Option<Video2PdfResult<PipelineOutcome>> {
        match self.completion.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => Some(Err(run_aborted())),
        }
    }

    /// Wait for completion
    pub async fn outcome(self) -> Video2PdfResult<PipelineOutcome> {
        self.completion.await.unwrap_or_else(|_| Err(run_aborted()))
    }
}

fn run_aborted() -> Video2PdfError {
    Video2PdfError::Io(std::io::Error::new(
        std::io::ErrorKind::Interrupted,
        "run ended without reporting a result",
    ))
}

/// Clears the busy flag when the run's task ends, including on panic
struct ActiveRun(Arc<AtomicBool>);

impl Drop for ActiveRun {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Owns the single active run
pub struct PipelineRunner {
    orchestrator: Arc<PipelineOrchestrator>,
    active: Arc<AtomicBool>,
}

impl PipelineRunner {
    pub fn new(orchestrator: Arc<PipelineOrchestrator>) -> Self {
        Self {
            orchestrator,
            active: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Whether a run is still in flight
    pub fn is_running(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Start a run in the background. A second start while one is active is
    /// rejected with [`Video2PdfError::Busy`] and nothing is queued. The slot
    /// is free again before the outcome is delivered.
    pub fn start(&self, request: PipelineRequest) -> Video2PdfResult<RunHandle> {
        if self
            .active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            info!("Run rejected: another run is in progress");
            return Err(Video2PdfError::Busy);
        }

        let guard = ActiveRun(Arc::clone(&self.active));
        let (events_tx, events_rx) = progress_channel();
        let (done_tx, done_rx) = oneshot::channel();
        let orchestrator = Arc::clone(&self.orchestrator);

        tokio::spawn(async move {
            let outcome = orchestrator.run(request, &events_tx).await;
            if let Err(e) = &outcome {
                debug!("Run failed: {}", e);
                events_tx.emit(ProgressEvent::Error {
                    message: e.to_string(),
                });
            }
            drop(guard);
            let _ = done_tx.send(outcome);
        });

        Ok(RunHandle {
            events: events_rx,
            completion: done_rx,
        })
    }
}
