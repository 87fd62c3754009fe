//! FFmpeg execution adapter
//!
//! Locates the ffmpeg binary and runs it as a subprocess.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::error::{Video2PdfError, Video2PdfResult};
use crate::ports::*;

const STDERR_TAIL_LINES: usize = 6;

/// FFmpeg subprocess adapter
pub struct FFmpegAdapter {
    location: Option<PathBuf>,
}

impl FFmpegAdapter {
    /// Create adapter; `location` may name the binary or its directory
    pub fn new(location: Option<PathBuf>) -> Self {
        Self { location }
    }

    fn binary_name() -> &'static str {
        if cfg!(windows) {
            "ffmpeg.exe"
        } else {
            "ffmpeg"
        }
    }

    fn from_configured(location: &Path) -> Option<PathBuf> {
        if location.is_file() {
            return Some(location.to_path_buf());
        }
        let candidate = location.join(Self::binary_name());
        candidate.is_file().then_some(candidate)
    }
}

#[async_trait]
impl TranscodePort for FFmpegAdapter {
    fn locate(&self) -> Option<PathBuf> {
        self.location
            .as_deref()
            .and_then(Self::from_configured)
            .or_else(|| which::which("ffmpeg").ok())
    }

    async fn run(&self, program: &Path, args: &[OsString]) -> Video2PdfResult<ToolStatus> {
        debug!("Running {} {:?}", program.display(), args);

        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => Video2PdfError::ToolMissing {
                    tool: "ffmpeg".to_string(),
                },
                _ => Video2PdfError::Io(e),
            })?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        let lines: Vec<&str> = stderr.lines().filter(|line| !line.trim().is_empty()).collect();
        let stderr_tail = lines[lines.len().saturating_sub(STDERR_TAIL_LINES)..].join("\n");

        Ok(ToolStatus {
            exit_code: output.status.code(),
            stderr_tail,
        })
    }
}
