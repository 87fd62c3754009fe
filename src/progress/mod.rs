//! Progress stream between pipeline stages and an observer
//!
//! Events are delivered in emission order over an unbounded FIFO channel.
//! The observer drains whatever has accumulated without blocking.

use std::path::PathBuf;

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::debug;

use crate::domain::model::TrimStrategy;
use crate::error::PipelineWarning;

/// Status events emitted by pipeline stages
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum ProgressEvent {
    Downloading {
        percent: String,
        speed: String,
        eta: String,
    },
    Finished {
        total_bytes: Option<u64>,
    },
    TrimStarted {
        start: Option<f64>,
        end: Option<f64>,
    },
    TrimFinished {
        output: PathBuf,
        strategy: TrimStrategy,
    },
    Probed {
        width: u32,
        height: u32,
    },
    RegionChosen {
        x: u32,
        y: u32,
        w: u32,
        h: u32,
    },
    RegionCancelled,
    Message {
        text: String,
    },
    Warning {
        message: String,
    },
    Error {
        message: String,
    },
}

impl From<PipelineWarning> for ProgressEvent {
    fn from(warning: PipelineWarning) -> Self {
        ProgressEvent::Warning {
            message: warning.to_string(),
        }
    }
}

/// Create a connected sender/receiver pair
pub fn progress_channel() -> (ProgressSender, ProgressReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ProgressSender { tx }, ProgressReceiver { rx })
}

/// Producer side; cheap to clone into each stage
#[derive(Debug, Clone)]
pub struct ProgressSender {
    tx: mpsc::UnboundedSender<ProgressEvent>,
}

impl ProgressSender {
    /// Append an event. A dropped observer is not an error for the run.
    pub fn emit(&self, event: ProgressEvent) {
        if self.tx.send(event).is_err() {
            debug!("Progress observer dropped; event discarded");
        }
    }

    /// Shorthand for a free-form message
    pub fn message(&self, text: impl Into<String>) {
        self.emit(ProgressEvent::Message { text: text.into() });
    }

    /// Report a non-fatal condition
    pub fn warn(&self, warning: PipelineWarning) {
        self.emit(warning.into());
    }

    /// A sender whose events go nowhere, for one-shot commands
    pub fn detached() -> Self {
        progress_channel().0
    }
}

/// Consumer side
#[derive(Debug)]
pub struct ProgressReceiver {
    rx: mpsc::UnboundedReceiver<ProgressEvent>,
}

impl ProgressReceiver {
    /// Take every event currently queued, in order, without waiting
    pub fn drain(&mut self) -> Vec<ProgressEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.rx.try_recv() {
            events.push(event);
        }
        events
    }
}
