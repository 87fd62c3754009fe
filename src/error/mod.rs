//! Error handling module for video2pdf

use std::fmt;

use thiserror::Error;

/// Main error type for video2pdf operations
///
/// Every variant aborts a pipeline run. Conditions that only degrade a run
/// are reported as [`PipelineWarning`] instead.
#[derive(Error, Debug)]
pub enum Video2PdfError {
    /// No input path or URL was given
    #[error("Missing input: provide a local video path or a video URL")]
    MissingInput,

    /// Invalid time format
    #[error("Invalid {field} time '{text}': {hint}")]
    TimeFormat {
        field: String,
        text: String,
        hint: String,
    },

    /// Time range validation error
    #[error("Invalid time range: end time ({end:.3}s) must be greater than start time ({start:.3}s)")]
    InvalidRange { start: f64, end: f64 },

    /// Download engine failure or unusable metadata
    #[error("Download failed: {message}")]
    Download { message: String },

    /// Required external tool not found
    #[error("{tool} not found; install it and make sure it is on PATH")]
    ToolMissing { tool: String },

    /// Both the stream-copy and the re-encode attempt failed
    #[error("Trimming failed: {message}")]
    TrimFailed { message: String },

    /// Malformed explicit crop specification
    #[error("Invalid crop region '{spec}': expected four comma-separated non-negative integers x,y,w,h")]
    RegionSpec { spec: String },

    /// A run is already in progress
    #[error("A run is already in progress; wait for it to finish")]
    Busy,

    /// External frame extractor failure
    #[error("Frame extraction failed: {message}")]
    Extraction { message: String },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// FFmpeg error
    #[error("FFmpeg error: {0}")]
    FFmpeg(#[from] ffmpeg_next::Error),

    /// Image encoding error
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Blocking worker panicked or was cancelled
    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Result type alias for video2pdf operations
pub type Video2PdfResult<T> = std::result::Result<T, Video2PdfError>;

/// Non-fatal conditions. The run continues with the affected data absent.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineWarning {
    /// Resolution could not be determined
    Probe(String),
    /// Region selection failed or was degenerate
    RegionSelection(String),
}

impl fmt::Display for PipelineWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineWarning::Probe(msg) => write!(f, "Resolution unavailable: {}", msg),
            PipelineWarning::RegionSelection(msg) => {
                write!(f, "Region selection skipped: {}", msg)
            }
        }
    }
}
