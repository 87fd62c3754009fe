//! video2pdf library
//!
//! Resolves a local file or a video URL to a local clip, trims it to a time
//! range, probes its frame size, picks an optional crop region and hands the
//! result to a slide extractor.

pub mod adapters;
pub mod app;
pub mod cli;
pub mod domain;
pub mod error;
pub mod ports;
pub mod progress;
pub mod utils;

// Re-export commonly used types
pub use app::{PipelineRequest, PipelineRunner, RunHandle};
pub use domain::model::{
    CropRegion, MediaSource, PipelineOutcome, PipelineResult, QualityTier, RegionMode, Resolution,
    TrimRange,
};
pub use error::{Video2PdfError, Video2PdfResult};
pub use progress::{ProgressEvent, ProgressReceiver, ProgressSender};
