// Domain rules - Business logic and policies

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::domain::model::*;
use crate::error::{Video2PdfError, Video2PdfResult};

/// Subdirectory of the system temp dir that receives downloads
pub const DOWNLOAD_DIR_NAME: &str = "video2pdf_downloads";
/// Subdirectory next to the input that receives trimmed clips
pub const SEGMENT_DIR_NAME: &str = "video2pdf_segments";
/// Subdirectory next to the video that receives extracted frames
pub const FRAMES_DIR_NAME: &str = "slides_phash";

/// Format selection policy for the download engine
pub struct FormatSelector;

impl FormatSelector {
    /// Build the engine format query for a quality tier
    pub fn build(quality: &QualityTier) -> String {
        match quality {
            QualityTier::MaxHeight(height) => {
                format!("bv*[height<=?{h}]+ba/b[height<=?{h}]", h = height)
            }
            QualityTier::Best => "bv*+ba/b".to_string(),
        }
    }
}

/// Naming and path resolution for downloaded media
pub struct DownloadNaming;

impl DownloadNaming {
    /// Engine output template: bounded title, id and extension
    pub fn output_template(title_max: usize) -> String {
        format!("%(title).{}s [%(id)s].%(ext)s", title_max)
    }

    /// Resolve the local file the engine produced.
    ///
    /// For a collection only the first entry counts. An engine-reported
    /// artifact path wins over the template-derived name.
    pub fn resolve_path(
        info: Option<&Value>,
        dir: &Path,
        title_max: usize,
        fallback_ext: &str,
    ) -> Video2PdfResult<PathBuf> {
        let info = info
            .filter(|value| value.is_object())
            .ok_or_else(|| download_error("engine returned no metadata"))?;

        let entry = match info.get("entries") {
            Some(Value::Array(entries)) if !entries.is_empty() => entries
                .iter()
                .find(|entry| entry.is_object())
                .ok_or_else(|| download_error("playlist has no downloadable entries"))?,
            _ => info,
        };

        let reported = entry
            .get("requested_downloads")
            .and_then(Value::as_array)
            .and_then(|downloads| downloads.first())
            .and_then(|download| download.get("filepath"))
            .and_then(Value::as_str)
            .filter(|path| !path.is_empty());

        if let Some(path) = reported {
            return Ok(PathBuf::from(path));
        }

        Self::render_template(entry, dir, title_max, fallback_ext)
    }

    /// Derive `<dir>/<title> [<id>].<ext>` from metadata
    pub fn render_template(
        entry: &Value,
        dir: &Path,
        title_max: usize,
        fallback_ext: &str,
    ) -> Video2PdfResult<PathBuf> {
        let id = entry
            .get("id")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| download_error("metadata has no id"))?;

        let title: String = entry
            .get("title")
            .and_then(Value::as_str)
            .unwrap_or("NA")
            .chars()
            .take(title_max)
            .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
            .collect();

        let ext = entry
            .get("ext")
            .and_then(Value::as_str)
            .filter(|ext| !ext.is_empty())
            .unwrap_or(fallback_ext);

        let id = id.replace(['/', '\\'], "_");
        Ok(dir.join(format!("{} [{}].{}", title, id, ext)))
    }
}

fn download_error(message: &str) -> Video2PdfError {
    Video2PdfError::Download {
        message: message.to_string(),
    }
}

/// Default locations for run artifacts
pub struct PathDefaults;

impl PathDefaults {
    /// `<tmp>/video2pdf_downloads`
    pub fn download_dir() -> PathBuf {
        std::env::temp_dir().join(DOWNLOAD_DIR_NAME)
    }

    /// Clips go next to the input, or under the temp dir when the input's
    /// directory does not exist. A bare file name keeps clips relative to
    /// the working directory.
    pub fn segment_dir(input: &Path) -> PathBuf {
        match input.parent() {
            Some(parent) if parent.as_os_str().is_empty() => PathBuf::from(SEGMENT_DIR_NAME),
            Some(parent) if parent.is_dir() => parent.join(SEGMENT_DIR_NAME),
            _ => std::env::temp_dir().join(SEGMENT_DIR_NAME),
        }
    }

    /// `<clip dir>/<stem>.clip.mp4`
    pub fn clip_path(input: &Path, clip_dir: &Path) -> PathBuf {
        let stem = input
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_string())
            .unwrap_or_else(|| "clip".to_string());
        clip_dir.join(format!("{}.clip.mp4", stem))
    }

    /// The video path with its extension replaced by `.pdf`
    pub fn pdf_path(video: &Path) -> PathBuf {
        video.with_extension("pdf")
    }

    /// `<video dir>/slides_phash`
    pub fn frames_dir(video: &Path) -> PathBuf {
        video
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default()
            .join(FRAMES_DIR_NAME)
    }

    /// `<video dir>/<stem>.first_frame.png`
    pub fn first_frame_path(video: &Path) -> PathBuf {
        let stem = video
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_string())
            .unwrap_or_else(|| "video".to_string());
        video.with_file_name(format!("{}.first_frame.png", stem))
    }
}

/// Codec settings for the re-encode fallback
#[derive(Debug, Clone, PartialEq)]
pub struct ReencodeProfile {
    pub video_codec: String,
    pub preset: String,
    pub crf: u8,
    pub audio_codec: String,
    pub audio_bitrate: String,
}

impl Default for ReencodeProfile {
    fn default() -> Self {
        Self {
            video_codec: "libx264".to_string(),
            preset: "fast".to_string(),
            crf: 23,
            audio_codec: "aac".to_string(),
            audio_bitrate: "192k".to_string(),
        }
    }
}

/// Argument lists for the two trim invocations
#[derive(Debug, Clone)]
pub struct TrimPlan {
    prefix: Vec<OsString>,
    output: PathBuf,
}

impl TrimPlan {
    /// Shared prefix: overwrite, optional seek, input, optional duration
    pub fn new(input: &Path, output: &Path, range: &TrimRange) -> Self {
        let mut prefix: Vec<OsString> = vec!["-y".into()];
        if let Some(start) = range.start() {
            prefix.push("-ss".into());
            prefix.push(format!("{:.3}", start).into());
        }
        prefix.push("-i".into());
        prefix.push(input.as_os_str().to_os_string());
        if let Some(duration) = range.duration() {
            prefix.push("-t".into());
            prefix.push(format!("{:.3}", duration).into());
        }

        Self {
            prefix,
            output: output.to_path_buf(),
        }
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Arguments for the stream-copy attempt
    pub fn copy_args(&self) -> Vec<OsString> {
        let mut args = self.prefix.clone();
        args.push("-c".into());
        args.push("copy".into());
        args.push(self.output.as_os_str().to_os_string());
        args
    }

    /// Arguments for the re-encode fallback
    pub fn reencode_args(&self, profile: &ReencodeProfile) -> Vec<OsString> {
        let mut args = self.prefix.clone();
        for (flag, value) in [
            ("-c:v", profile.video_codec.clone()),
            ("-preset", profile.preset.clone()),
            ("-crf", profile.crf.to_string()),
            ("-c:a", profile.audio_codec.clone()),
            ("-b:a", profile.audio_bitrate.clone()),
        ] {
            args.push(flag.into());
            args.push(value.into());
        }
        args.push(self.output.as_os_str().to_os_string());
        args
    }
}

/// Post-processing for automatically detected regions
pub struct RegionRules;

impl RegionRules {
    /// Pad a detected rectangle, clamp it to the frame and reject candidates
    /// that are empty or cover less than the minimum area ratio.
    pub fn refine_candidate(
        candidate: CropRegion,
        frame: Option<Resolution>,
        settings: &AutoCropSettings,
    ) -> Option<CropRegion> {
        if !candidate.is_selected() {
            return None;
        }

        let pad = settings.pad;
        let x = candidate.x.saturating_sub(pad);
        let y = candidate.y.saturating_sub(pad);
        let mut right = candidate.x.saturating_add(candidate.w).saturating_add(pad);
        let mut bottom = candidate.y.saturating_add(candidate.h).saturating_add(pad);

        if let Some(frame) = frame {
            right = right.min(frame.width);
            bottom = bottom.min(frame.height);
        }

        let padded = CropRegion::new(x, y, right.saturating_sub(x), bottom.saturating_sub(y));
        if !padded.is_selected() {
            return None;
        }

        if let Some(frame) = frame {
            let ratio = padded.area() as f64 / frame.area() as f64;
            if ratio < settings.min_area_ratio {
                return None;
            }
        }

        Some(padded)
    }
}
