//! yt-dlp execution adapter
//!
//! Drives yt-dlp as a subprocess. Progress arrives as machine-readable
//! template lines; metadata arrives as a single JSON document on stdout.

use std::collections::VecDeque;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info};

use crate::error::{Video2PdfError, Video2PdfResult};
use crate::ports::*;

const PROGRESS_PREFIX: &str = "V2P_PROGRESS|";
const PROGRESS_TEMPLATE: &str = "download:V2P_PROGRESS|%(progress.status)s|%(progress._percent_str)s|%(progress._speed_str)s|%(progress._eta_str)s|%(progress.total_bytes)s|%(progress.total_bytes_estimate)s";
const STDERR_TAIL_LINES: usize = 8;

/// yt-dlp backed download engine
pub struct YtDlpAdapter {
    program: PathBuf,
}

impl YtDlpAdapter {
    /// Create adapter for the given yt-dlp executable
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Full argument list for one fetch
    pub fn build_args(request: &EngineRequest) -> Vec<OsString> {
        let options = &request.options;
        let mut args: Vec<OsString> = Vec::new();
        let mut push = |flag: &str, value: Option<OsString>| {
            args.push(flag.into());
            if let Some(value) = value {
                args.push(value);
            }
        };

        push("-f", Some(request.format.clone().into()));
        push(
            "-o",
            Some(request.output_dir.join(&request.output_template).into_os_string()),
        );
        push("--merge-output-format", Some(request.merge_format.clone().into()));
        push("-N", Some(request.concurrent_fragments.to_string().into()));
        if options.allow_playlist {
            push("--yes-playlist", None);
        } else {
            push("--no-playlist", None);
        }
        push("--retries", Some(request.retries.to_string().into()));
        push("--fragment-retries", Some(request.fragment_retries.to_string().into()));
        push("--continue", None);
        push("--part", None);
        if let Some(proxy) = &options.proxy {
            push("--proxy", Some(proxy.clone().into()));
        }
        if let Some(cookies) = &options.cookies_path {
            push("--cookies", Some(cookies.clone().into_os_string()));
        }
        if options.subtitles {
            push("--write-subs", None);
            push("--embed-subs", None);
            push("--sub-langs", Some(request.subtitle_langs.join(",").into()));
        }
        if let Some(location) = &options.tool_location {
            push("--ffmpeg-location", Some(location.clone().into_os_string()));
        }
        push("--newline", None);
        push("--progress", None);
        push("--progress-template", Some(PROGRESS_TEMPLATE.into()));
        push("--dump-single-json", None);
        push("--no-simulate", None);

        args.push(request.url.clone().into());
        args
    }

    /// Parse one progress template line
    pub fn parse_progress_line(line: &str) -> Option<EngineProgress> {
        let payload = line.trim().strip_prefix(PROGRESS_PREFIX)?;
        let fields: Vec<&str> = payload.split('|').map(str::trim).collect();
        let [status, percent, speed, eta, total, estimate] = fields.as_slice() else {
            return None;
        };

        Some(EngineProgress {
            status: status.to_string(),
            percent: percent.to_string(),
            speed: speed.to_string(),
            eta: eta.to_string(),
            total_bytes: parse_byte_count(total),
            total_bytes_estimate: parse_byte_count(estimate),
        })
    }
}

/// yt-dlp prints `NA` for unknown fields and floats for estimates
fn parse_byte_count(text: &str) -> Option<u64> {
    text.parse::<f64>()
        .ok()
        .filter(|value| value.is_finite() && *value >= 0.0)
        .map(|value| value as u64)
}

#[async_trait]
impl DownloadPort for YtDlpAdapter {
    async fn fetch(
        &self,
        request: &EngineRequest,
        on_progress: &(dyn Fn(EngineProgress) + Send + Sync),
    ) -> Video2PdfResult<Option<Value>> {
        let args = Self::build_args(request);
        debug!("Running {} {:?}", self.program.display(), args);

        let mut child = Command::new(&self.program)
            .args(&args)
            .env("PYTHONIOENCODING", "UTF-8")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => Video2PdfError::ToolMissing {
                    tool: "yt-dlp".to_string(),
                },
                _ => Video2PdfError::Io(e),
            })?;

        let stdout = child.stdout.take().ok_or_else(|| Video2PdfError::Download {
            message: "failed to capture yt-dlp stdout".to_string(),
        })?;
        let stderr = child.stderr.take().ok_or_else(|| Video2PdfError::Download {
            message: "failed to capture yt-dlp stderr".to_string(),
        })?;

        let mut stdout_lines = BufReader::new(stdout).lines();
        let mut stderr_lines = BufReader::new(stderr).lines();
        let mut stdout_open = true;
        let mut stderr_open = true;
        let mut metadata_line: Option<String> = None;
        let mut stderr_tail: VecDeque<String> = VecDeque::with_capacity(STDERR_TAIL_LINES);

        // Some yt-dlp builds print progress to stdout, others to stderr.
        while stdout_open || stderr_open {
            tokio::select! {
                line = stdout_lines.next_line(), if stdout_open => match line? {
                    Some(line) => {
                        if let Some(tick) = Self::parse_progress_line(&line) {
                            on_progress(tick);
                        } else if line.trim_start().starts_with('{') {
                            metadata_line = Some(line);
                        } else if !line.trim().is_empty() {
                            debug!("yt-dlp: {}", line);
                        }
                    }
                    None => stdout_open = false,
                },
                line = stderr_lines.next_line(), if stderr_open => match line? {
                    Some(line) => {
                        if let Some(tick) = Self::parse_progress_line(&line) {
                            on_progress(tick);
                        } else if !line.trim().is_empty() {
                            debug!("yt-dlp: {}", line);
                            if stderr_tail.len() == STDERR_TAIL_LINES {
                                stderr_tail.pop_front();
                            }
                            stderr_tail.push_back(line);
                        }
                    }
                    None => stderr_open = false,
                },
            }
        }

        let status = child.wait().await?;
        if !status.success() {
            let detail = stderr_tail
                .iter()
                .rev()
                .find(|line| line.contains("ERROR"))
                .or_else(|| stderr_tail.back())
                .cloned()
                .unwrap_or_else(|| format!("yt-dlp exited with {}", status));
            return Err(Video2PdfError::Download { message: detail });
        }

        let Some(line) = metadata_line else {
            info!("yt-dlp finished without printing metadata");
            return Ok(None);
        };

        let metadata = serde_json::from_str::<Value>(&line).map_err(|e| Video2PdfError::Download {
            message: format!("unreadable metadata from yt-dlp: {}", e),
        })?;
        Ok(Some(metadata))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{DownloadOptions, QualityTier};
    use std::path::PathBuf;

    fn request(options: DownloadOptions) -> EngineRequest {
        EngineRequest {
            url: "https://example.com/watch?v=abc".to_string(),
            output_dir: PathBuf::from("/tmp/dl"),
            output_template: "%(title).200s [%(id)s].%(ext)s".to_string(),
            format: "bv*[height<=?720]+ba/b[height<=?720]".to_string(),
            merge_format: "mp4".to_string(),
            concurrent_fragments: 4,
            retries: 10,
            fragment_retries: 10,
            subtitle_langs: vec!["zh-Hans".into(), "zh".into(), "en".into()],
            options,
        }
    }

    fn as_strings(args: Vec<OsString>) -> Vec<String> {
        args.into_iter().map(|a| a.to_string_lossy().to_string()).collect()
    }

    fn value_after(args: &[String], flag: &str) -> Option<String> {
        args.iter()
            .position(|arg| arg == flag)
            .and_then(|idx| args.get(idx + 1))
            .cloned()
    }

    #[test]
    fn test_build_args_defaults() {
        let args = as_strings(YtDlpAdapter::build_args(&request(DownloadOptions::default())));

        assert_eq!(value_after(&args, "-f").as_deref(), Some("bv*[height<=?720]+ba/b[height<=?720]"));
        assert_eq!(value_after(&args, "-o").as_deref(), Some("/tmp/dl/%(title).200s [%(id)s].%(ext)s"));
        assert_eq!(value_after(&args, "--merge-output-format").as_deref(), Some("mp4"));
        assert_eq!(value_after(&args, "-N").as_deref(), Some("4"));
        assert_eq!(value_after(&args, "--retries").as_deref(), Some("10"));
        assert_eq!(value_after(&args, "--fragment-retries").as_deref(), Some("10"));
        assert!(args.contains(&"--no-playlist".to_string()));
        assert!(args.contains(&"--continue".to_string()));
        assert!(args.contains(&"--part".to_string()));
        assert!(!args.contains(&"--write-subs".to_string()));
        assert!(!args.contains(&"--proxy".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("https://example.com/watch?v=abc"));
    }

    #[test]
    fn test_build_args_optional_flags() {
        let options = DownloadOptions {
            quality: QualityTier::MaxHeight(720),
            cookies_path: Some(PathBuf::from("/home/u/cookies.txt")),
            proxy: Some("socks5://127.0.0.1:1080".to_string()),
            allow_playlist: true,
            subtitles: true,
            tool_location: Some(PathBuf::from("/opt/ffmpeg/bin")),
        };
        let args = as_strings(YtDlpAdapter::build_args(&request(options)));

        assert!(args.contains(&"--yes-playlist".to_string()));
        assert_eq!(value_after(&args, "--proxy").as_deref(), Some("socks5://127.0.0.1:1080"));
        assert_eq!(value_after(&args, "--cookies").as_deref(), Some("/home/u/cookies.txt"));
        assert_eq!(value_after(&args, "--sub-langs").as_deref(), Some("zh-Hans,zh,en"));
        assert!(args.contains(&"--embed-subs".to_string()));
        assert_eq!(value_after(&args, "--ffmpeg-location").as_deref(), Some("/opt/ffmpeg/bin"));
    }

    #[test]
    fn test_parse_progress_line() {
        let tick = YtDlpAdapter::parse_progress_line(
            "V2P_PROGRESS|downloading|  42.0%| 1.20MiB/s|00:13|NA|15728640.0",
        )
        .unwrap();
        assert_eq!(tick.status, "downloading");
        assert_eq!(tick.percent, "42.0%");
        assert_eq!(tick.speed, "1.20MiB/s");
        assert_eq!(tick.eta, "00:13");
        assert_eq!(tick.total_bytes, None);
        assert_eq!(tick.total_bytes_estimate, Some(15_728_640));

        let done = YtDlpAdapter::parse_progress_line("V2P_PROGRESS|finished|100%|NA|NA|1048576|NA").unwrap();
        assert_eq!(done.status, "finished");
        assert_eq!(done.total_bytes, Some(1_048_576));
    }

    #[test]
    fn test_parse_progress_line_rejects_other_output() {
        assert!(YtDlpAdapter::parse_progress_line("[youtube] abc: Downloading webpage").is_none());
        assert!(YtDlpAdapter::parse_progress_line("V2P_PROGRESS|downloading|1%").is_none());
    }
}
