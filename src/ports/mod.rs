// Ports - Interface definitions (contracts)

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::model::*;
use crate::error::Video2PdfResult;
use crate::progress::ProgressSender;

/// Everything the download engine needs for one fetch
#[derive(Debug, Clone, PartialEq)]
pub struct EngineRequest {
    pub url: String,
    pub output_dir: PathBuf,
    pub output_template: String,
    pub format: String,
    pub merge_format: String,
    pub concurrent_fragments: u32,
    pub retries: u32,
    pub fragment_retries: u32,
    pub subtitle_langs: Vec<String>,
    pub options: DownloadOptions,
}

/// Raw progress tick reported by the download engine
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EngineProgress {
    pub status: String,
    pub percent: String,
    pub speed: String,
    pub eta: String,
    pub total_bytes: Option<u64>,
    pub total_bytes_estimate: Option<u64>,
}

/// Port for the external download engine
#[async_trait]
pub trait DownloadPort: Send + Sync {
    /// Fetch the media and return the engine's metadata, if any
    async fn fetch(
        &self,
        request: &EngineRequest,
        on_progress: &(dyn Fn(EngineProgress) + Send + Sync),
    ) -> Video2PdfResult<Option<Value>>;
}

/// Exit status and trailing diagnostics of a tool run
#[derive(Debug, Clone, PartialEq)]
pub struct ToolStatus {
    pub exit_code: Option<i32>,
    pub stderr_tail: String,
}

impl ToolStatus {
    pub fn succeeded(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Port for the external transcoding tool
#[async_trait]
pub trait TranscodePort: Send + Sync {
    /// Locate the tool binary; `None` when it is not installed
    fn locate(&self) -> Option<PathBuf>;

    /// Run the tool to completion
    async fn run(&self, program: &Path, args: &[OsString]) -> Video2PdfResult<ToolStatus>;
}

/// Port for reading frame dimensions
#[async_trait]
pub trait ProbePort: Send + Sync {
    async fn resolution(&self, path: &Path) -> Video2PdfResult<Option<Resolution>>;
}

/// Port for interactive single-frame region selection
#[async_trait]
pub trait RegionPickerPort: Send + Sync {
    /// `None` on cancellation
    async fn pick(&self, video: &Path) -> Video2PdfResult<Option<CropRegion>>;
}

/// Port for automatic region detection
#[async_trait]
pub trait GeometryDetector: Send + Sync {
    /// Raw candidate rectangle before padding and area filtering
    async fn detect(&self, video: &Path) -> Video2PdfResult<Option<CropRegion>>;
}

/// Port for the downstream frame extractor
#[async_trait]
pub trait FrameExtractorPort: Send + Sync {
    /// Produce the document and return its path
    async fn extract(
        &self,
        result: &PipelineResult,
        progress: &ProgressSender,
    ) -> Video2PdfResult<PathBuf>;
}
