// Domain models - Core types and data structures

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Video2PdfError, Video2PdfResult};
use crate::utils::Utils;

/// Where a media source lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    Local,
    Remote,
}

/// A video reference. Stages that produce a new file replace the source
/// instead of mutating it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaSource {
    origin: Origin,
    locator: String,
}

impl MediaSource {
    /// Classify operator input as a local path or a remote URL
    pub fn from_input(input: &str) -> Video2PdfResult<Self> {
        let locator = input.trim();
        if locator.is_empty() {
            return Err(Video2PdfError::MissingInput);
        }

        let origin = if Utils::is_remote(locator) {
            Origin::Remote
        } else {
            Origin::Local
        };

        Ok(Self {
            origin,
            locator: locator.to_string(),
        })
    }

    /// A source backed by a file on disk
    pub fn local(path: impl AsRef<Path>) -> Self {
        Self {
            origin: Origin::Local,
            locator: path.as_ref().to_string_lossy().to_string(),
        }
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    pub fn locator(&self) -> &str {
        &self.locator
    }

    pub fn is_remote(&self) -> bool {
        self.origin == Origin::Remote
    }

    /// Local path, if the source is already on disk
    pub fn local_path(&self) -> Option<PathBuf> {
        match self.origin {
            Origin::Local => Some(PathBuf::from(&self.locator)),
            Origin::Remote => None,
        }
    }
}

impl fmt::Display for MediaSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.locator)
    }
}

/// Semantic quality tier requested from the download engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityTier {
    /// Best available video + audio
    Best,
    /// Best available at or below the given frame height
    MaxHeight(u32),
}

impl QualityTier {
    /// Parse `"best"` or `"<height>p"`. Anything else is unconstrained.
    pub fn parse(selector: &str) -> Self {
        let selector = selector.trim();
        selector
            .strip_suffix('p')
            .filter(|digits| !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()))
            .and_then(|digits| digits.parse::<u32>().ok())
            .filter(|height| *height > 0)
            .map(QualityTier::MaxHeight)
            .unwrap_or(QualityTier::Best)
    }
}

impl fmt::Display for QualityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QualityTier::Best => write!(f, "best"),
            QualityTier::MaxHeight(height) => write!(f, "{}p", height),
        }
    }
}

/// Per-run download options
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadOptions {
    pub quality: QualityTier,
    pub cookies_path: Option<PathBuf>,
    pub proxy: Option<String>,
    pub allow_playlist: bool,
    pub subtitles: bool,
    /// Location of the transcoding tool handed to the engine for merging
    pub tool_location: Option<PathBuf>,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            quality: QualityTier::Best,
            cookies_path: None,
            proxy: None,
            allow_playlist: false,
            subtitles: false,
            tool_location: None,
        }
    }
}

/// Optional sub-range of a video, in seconds
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TrimRange {
    start: Option<f64>,
    end: Option<f64>,
}

impl TrimRange {
    /// Create a range; when both bounds are present `end` must exceed `start`
    pub fn new(start: Option<f64>, end: Option<f64>) -> Video2PdfResult<Self> {
        if let (Some(start), Some(end)) = (start, end) {
            if end <= start {
                return Err(Video2PdfError::InvalidRange { start, end });
            }
        }
        Ok(Self { start, end })
    }

    /// A range with no bounds; trimming is skipped
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn start(&self) -> Option<f64> {
        self.start
    }

    pub fn end(&self) -> Option<f64> {
        self.end
    }

    /// Whether any bound was given
    pub fn is_bounded(&self) -> bool {
        self.start.is_some() || self.end.is_some()
    }

    /// Clip duration, only known when both bounds are present
    pub fn duration(&self) -> Option<f64> {
        match (self.start, self.end) {
            (Some(start), Some(end)) => Some(end - start),
            _ => None,
        }
    }
}

/// Frame dimensions in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    /// Zero dimensions mean "unknown"
    pub fn non_zero(width: u32, height: u32) -> Option<Self> {
        if width > 0 && height > 0 {
            Some(Self { width, height })
        } else {
            None
        }
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} x {}", self.width, self.height)
    }
}

/// Rectangle in frame coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropRegion {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl CropRegion {
    pub fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }

    /// A zero-area rectangle counts as "no selection"
    pub fn is_selected(&self) -> bool {
        self.w > 0 && self.h > 0
    }

    pub fn area(&self) -> u64 {
        self.w as u64 * self.h as u64
    }

    /// Parse an `x,y,w,h` spec.
    ///
    /// Blank text and zero-area rectangles yield `Ok(None)`; any other shape
    /// fails with [`Video2PdfError::RegionSpec`].
    pub fn parse_spec(spec: &str) -> Video2PdfResult<Option<Self>> {
        let trimmed = spec.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }

        let values = trimmed
            .split(',')
            .map(|part| part.trim().parse::<u32>())
            .collect::<Result<Vec<u32>, _>>()
            .map_err(|_| Video2PdfError::RegionSpec {
                spec: trimmed.to_string(),
            })?;

        match values.as_slice() {
            [x, y, w, h] => Ok(Some(Self::new(*x, *y, *w, *h)).filter(CropRegion::is_selected)),
            _ => Err(Video2PdfError::RegionSpec {
                spec: trimmed.to_string(),
            }),
        }
    }

    /// `x,y,w,h` form understood by the frame extractor
    pub fn to_spec(&self) -> String {
        format!("{},{},{},{}", self.x, self.y, self.w, self.h)
    }
}

impl fmt::Display for CropRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "x={}, y={}, w={}, h={}", self.x, self.y, self.w, self.h)
    }
}

/// Tuning for automatic region detection
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AutoCropSettings {
    /// Pixels added around a detected rectangle
    pub pad: u32,
    /// Candidates covering less than this share of the frame are rejected
    pub min_area_ratio: f64,
}

impl Default for AutoCropSettings {
    fn default() -> Self {
        Self {
            pad: 6,
            min_area_ratio: 0.05,
        }
    }
}

/// How the region of interest is chosen. Manual and automatic selection are
/// variants of one enum, so both can never be active at once.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RegionMode {
    Off,
    Manual,
    Auto(AutoCropSettings),
}

/// Which borders automatic white-margin trimming may remove
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrimSides {
    /// Top and bottom only
    Tb,
    /// All four sides
    All,
}

/// White-margin trimming applied by the frame extractor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AutoTrimSettings {
    pub enabled: bool,
    pub ratio: f64,
    pub pad: u32,
    pub sides: TrimSides,
}

impl Default for AutoTrimSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            ratio: 0.98,
            pad: 6,
            sides: TrimSides::Tb,
        }
    }
}

/// Operator-facing knobs for the frame extractor
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionSettings {
    pub output_pdf: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub sample_seconds: f64,
    pub threshold: u8,
    pub scale_width: Option<u32>,
    pub max_pages: Option<u32>,
    pub a4: bool,
    pub auto_trim: AutoTrimSettings,
}

impl Default for ExtractionSettings {
    fn default() -> Self {
        Self {
            output_pdf: None,
            output_dir: None,
            sample_seconds: 0.5,
            threshold: 10,
            scale_width: None,
            max_pages: None,
            a4: false,
            auto_trim: AutoTrimSettings::default(),
        }
    }
}

/// Options forwarded verbatim to the frame extractor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionOptions {
    pub output_pdf: PathBuf,
    pub output_dir: PathBuf,
    pub sample_seconds: f64,
    pub threshold: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale_width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_pages: Option<u32>,
    pub a4: bool,
    pub auto_trim: bool,
    pub auto_trim_ratio: f64,
    pub auto_trim_pad: u32,
    pub auto_trim_sides: TrimSides,
    pub auto_crop: bool,
    pub auto_crop_pad: u32,
    pub auto_crop_min_area_ratio: f64,
}

impl ExtractionOptions {
    /// Flatten into the key/value map carried by [`PipelineResult`]
    pub fn into_map(self) -> Video2PdfResult<BTreeMap<String, serde_json::Value>> {
        match serde_json::to_value(self)? {
            serde_json::Value::Object(object) => Ok(object.into_iter().collect()),
            other => Err(Video2PdfError::Config {
                message: format!("extraction options serialized to {}", other),
            }),
        }
    }
}

/// Which trimming strategy produced a clip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrimStrategy {
    /// Stream copy, no re-encode
    Copy,
    /// Full re-encode fallback
    Reencode,
}

/// Result of a successful trim
#[derive(Debug, Clone, PartialEq)]
pub struct TrimOutcome {
    pub output: PathBuf,
    pub strategy: TrimStrategy,
}

/// Everything the frame extractor needs
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineResult {
    pub final_video_path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution: Option<Resolution>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crop: Option<CropRegion>,
    pub extraction_options: BTreeMap<String, serde_json::Value>,
}

impl PipelineResult {
    /// Look up a forwarded option
    pub fn option(&self, key: &str) -> Option<&serde_json::Value> {
        self.extraction_options.get(key)
    }
}

/// Final outcome of a run
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutcome {
    pub result: PipelineResult,
    /// Document written by the frame extractor, when one ran
    pub document: Option<PathBuf>,
}
