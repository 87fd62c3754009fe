//! Terminal region picker
//!
//! Writes the first frame next to the video so the operator can inspect it,
//! then reads an `x,y,w,h` rectangle from standard input.

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::info;

use crate::adapters::probe_libav::ProbeLibavAdapter;
use crate::domain::model::{CropRegion, Resolution};
use crate::domain::rules::PathDefaults;
use crate::error::Video2PdfResult;
use crate::ports::RegionPickerPort;

/// Interactive picker on stdin/stderr
pub struct TerminalRegionPicker;

impl TerminalRegionPicker {
    pub fn new() -> Self {
        Self
    }

    fn pick_blocking(video: &Path) -> Video2PdfResult<Option<CropRegion>> {
        let frame = ProbeLibavAdapter::decode_first_frame(video)?;
        let frame_path = PathDefaults::first_frame_path(video);
        frame.save(&frame_path)?;
        info!("First frame written to {}", frame_path.display());

        let size = Resolution::non_zero(frame.width(), frame.height());
        let stdin = std::io::stdin();
        let stderr = std::io::stderr();
        prompt_region(&frame_path, size, &mut stdin.lock(), &mut stderr.lock())
    }
}

impl Default for TerminalRegionPicker {
    fn default() -> Self {
        Self::new()
    }
}

/// Ask for a rectangle; blank input or end of input cancels
pub fn prompt_region<R: BufRead, W: Write>(
    frame_path: &Path,
    size: Option<Resolution>,
    reader: &mut R,
    writer: &mut W,
) -> Video2PdfResult<Option<CropRegion>> {
    write!(writer, "First frame saved to {}", frame_path.display())?;
    if let Some(size) = size {
        write!(writer, " ({})", size)?;
    }
    writeln!(writer)?;
    write!(writer, "Region x,y,w,h (blank to cancel): ")?;
    writer.flush()?;

    let mut line = String::new();
    if reader.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    CropRegion::parse_spec(&line)
}

#[async_trait]
impl RegionPickerPort for TerminalRegionPicker {
    async fn pick(&self, video: &Path) -> Video2PdfResult<Option<CropRegion>> {
        let video: PathBuf = video.to_path_buf();
        tokio::task::spawn_blocking(move || Self::pick_blocking(&video)).await?
    }
}
