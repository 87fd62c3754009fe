//! External command adapters for frame extraction and region detection

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info};

use crate::domain::model::{CropRegion, PipelineResult};
use crate::error::{Video2PdfError, Video2PdfResult};
use crate::ports::{FrameExtractorPort, GeometryDetector};
use crate::progress::ProgressSender;

/// Runs the configured frame extractor program
pub struct CommandExtractor {
    program: PathBuf,
    base_args: Vec<String>,
}

impl CommandExtractor {
    pub fn new(program: impl Into<PathBuf>, base_args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            base_args,
        }
    }

    /// `--video <path> [--crop x,y,w,h]` followed by one flag per option.
    /// `true` becomes `--key`, `false` becomes `--no-key`.
    pub fn build_args(&self, result: &PipelineResult) -> Vec<OsString> {
        let mut args: Vec<OsString> = self.base_args.iter().map(OsString::from).collect();
        args.push("--video".into());
        args.push(result.final_video_path.as_os_str().to_os_string());
        if let Some(crop) = &result.crop {
            args.push("--crop".into());
            args.push(crop.to_spec().into());
        }

        for (key, value) in &result.extraction_options {
            let flag = key.replace('_', "-");
            match value {
                Value::Bool(true) => args.push(format!("--{}", flag).into()),
                Value::Bool(false) => args.push(format!("--no-{}", flag).into()),
                Value::Null => {}
                Value::String(text) => {
                    args.push(format!("--{}", flag).into());
                    args.push(text.into());
                }
                other => {
                    args.push(format!("--{}", flag).into());
                    args.push(other.to_string().into());
                }
            }
        }
        args
    }
}

#[async_trait]
impl FrameExtractorPort for CommandExtractor {
    async fn extract(
        &self,
        result: &PipelineResult,
        progress: &ProgressSender,
    ) -> Video2PdfResult<PathBuf> {
        let args = self.build_args(result);
        debug!("Running {} {:?}", self.program.display(), args);

        let mut child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => Video2PdfError::ToolMissing {
                    tool: self.program.display().to_string(),
                },
                _ => Video2PdfError::Io(e),
            })?;

        let stdout = child.stdout.take().ok_or_else(|| Video2PdfError::Extraction {
            message: "failed to capture extractor stdout".to_string(),
        })?;
        let stderr = child.stderr.take().ok_or_else(|| Video2PdfError::Extraction {
            message: "failed to capture extractor stderr".to_string(),
        })?;

        let mut stdout_lines = BufReader::new(stdout).lines();
        let mut stderr_lines = BufReader::new(stderr).lines();
        let mut stdout_open = true;
        let mut stderr_open = true;
        let mut last_stderr: Option<String> = None;

        while stdout_open || stderr_open {
            tokio::select! {
                line = stdout_lines.next_line(), if stdout_open => match line? {
                    Some(line) => progress.message(line),
                    None => stdout_open = false,
                },
                line = stderr_lines.next_line(), if stderr_open => match line? {
                    Some(line) => {
                        if !line.trim().is_empty() {
                            last_stderr = Some(line.clone());
                        }
                        progress.message(line);
                    }
                    None => stderr_open = false,
                },
            }
        }

        let status = child.wait().await?;
        if !status.success() {
            return Err(Video2PdfError::Extraction {
                message: last_stderr.unwrap_or_else(|| format!("extractor exited with {}", status)),
            });
        }

        let document = result
            .option("output_pdf")
            .and_then(Value::as_str)
            .map(PathBuf::from)
            .ok_or_else(|| Video2PdfError::Extraction {
                message: "no output document configured".to_string(),
            })?;
        info!("Document written to {}", document.display());
        Ok(document)
    }
}

/// Runs a detection program that prints `x,y,w,h` for a video
pub struct CommandDetector {
    program: PathBuf,
}

impl CommandDetector {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

#[async_trait]
impl GeometryDetector for CommandDetector {
    async fn detect(&self, video: &Path) -> Video2PdfResult<Option<CropRegion>> {
        let output = Command::new(&self.program)
            .arg(video)
            .stdin(Stdio::null())
            .output()
            .await?;

        if !output.status.success() {
            return Err(Video2PdfError::Extraction {
                message: format!(
                    "region detector exited with {}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        match stdout.lines().rev().find(|line| !line.trim().is_empty()) {
            Some(line) => CropRegion::parse_spec(line),
            None => Ok(None),
        }
    }
}
