// Trim interactor - Stream-copy trimming with re-encode fallback

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::domain::model::*;
use crate::domain::rules::*;
use crate::error::{Video2PdfError, Video2PdfResult};
use crate::ports::*;

/// Trimmer states
#[derive(Debug)]
enum TrimState {
    Idle,
    ToolCheck,
    FastCopyAttempt(PathBuf),
    ReencodeAttempt(PathBuf),
    Done(TrimOutcome),
    Fatal(Video2PdfError),
}

/// Cuts `[start, end)` out of a local file
pub struct Trimmer {
    transcode_port: Arc<dyn TranscodePort>,
    profile: ReencodeProfile,
}

impl Trimmer {
    pub fn new(transcode_port: Arc<dyn TranscodePort>, profile: ReencodeProfile) -> Self {
        Self {
            transcode_port,
            profile,
        }
    }

    /// Trim `input` into `output`. The range is already ordered by
    /// construction; an unbounded range still produces a copy.
    pub async fn trim(
        &self,
        input: &Path,
        output: &Path,
        range: &TrimRange,
    ) -> Video2PdfResult<TrimOutcome> {
        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let plan = TrimPlan::new(input, output, range);
        let mut state = TrimState::Idle;

        loop {
            debug!("Trim state: {:?}", state);
            state = match state {
                TrimState::Idle => TrimState::ToolCheck,
                TrimState::ToolCheck => match self.transcode_port.locate() {
                    Some(program) => TrimState::FastCopyAttempt(program),
                    None => TrimState::Fatal(Video2PdfError::ToolMissing {
                        tool: "ffmpeg".to_string(),
                    }),
                },
                TrimState::FastCopyAttempt(program) => {
                    let status = self.transcode_port.run(&program, &plan.copy_args()).await?;
                    if produced_output(&status, plan.output()).await {
                        TrimState::Done(TrimOutcome {
                            output: plan.output().to_path_buf(),
                            strategy: TrimStrategy::Copy,
                        })
                    } else {
                        warn!(
                            "Stream copy failed (exit {:?}); re-encoding",
                            status.exit_code
                        );
                        TrimState::ReencodeAttempt(program)
                    }
                }
                TrimState::ReencodeAttempt(program) => {
                    let status = self
                        .transcode_port
                        .run(&program, &plan.reencode_args(&self.profile))
                        .await?;
                    if produced_output(&status, plan.output()).await {
                        TrimState::Done(TrimOutcome {
                            output: plan.output().to_path_buf(),
                            strategy: TrimStrategy::Reencode,
                        })
                    } else {
                        TrimState::Fatal(Video2PdfError::TrimFailed {
                            message: failure_detail(&status),
                        })
                    }
                }
                TrimState::Done(outcome) => {
                    info!(
                        "Trimmed {} -> {} ({:?})",
                        input.display(),
                        outcome.output.display(),
                        outcome.strategy
                    );
                    return Ok(outcome);
                }
                TrimState::Fatal(error) => return Err(error),
            };
        }
    }
}

/// Exit code zero and a non-empty output file
async fn produced_output(status: &ToolStatus, output: &Path) -> bool {
    if !status.succeeded() {
        return false;
    }
    match tokio::fs::metadata(output).await {
        Ok(meta) => meta.is_file() && meta.len() > 0,
        Err(_) => false,
    }
}

fn failure_detail(status: &ToolStatus) -> String {
    let exit = status
        .exit_code
        .map(|code| format!("exit code {}", code))
        .unwrap_or_else(|| "terminated by signal".to_string());
    if status.stderr_tail.trim().is_empty() {
        exit
    } else {
        format!("{}: {}", exit, status.stderr_tail.trim())
    }
}
