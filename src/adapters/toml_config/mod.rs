// TOML config adapter - Configuration management using TOML files

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::info;

use crate::adapters::tracing_log::LogFormat;
use crate::app::resolve_interactor::SourceSettings;
use crate::domain::rules::ReencodeProfile;
use crate::error::{Video2PdfError, Video2PdfResult};

/// Config files tried in order when none is given explicitly
pub const DEFAULT_CONFIG_PATHS: [&str; 2] = ["video2pdf.toml", "config/video2pdf.toml"];

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub log_level: String,
    pub log_format: LogFormat,
    pub download: DownloadConfig,
    pub trim: TrimConfig,
    pub extract: ExtractConfig,
    pub observer: ObserverConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            download: DownloadConfig::default(),
            trim: TrimConfig::default(),
            extract: ExtractConfig::default(),
            observer: ObserverConfig::default(),
        }
    }
}

/// `[download]`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    pub dir: Option<PathBuf>,
    pub quality: String,
    pub proxy: Option<String>,
    pub cookies: Option<PathBuf>,
    pub ytdlp: PathBuf,
    pub merge_format: String,
    pub concurrent_fragments: u32,
    pub retries: u32,
    pub fragment_retries: u32,
    pub title_max: usize,
    pub subtitle_langs: Vec<String>,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            dir: None,
            quality: "best".to_string(),
            proxy: None,
            cookies: None,
            ytdlp: PathBuf::from("yt-dlp"),
            merge_format: "mp4".to_string(),
            concurrent_fragments: 4,
            retries: 10,
            fragment_retries: 10,
            title_max: 200,
            subtitle_langs: vec!["zh-Hans".to_string(), "zh".to_string(), "en".to_string()],
        }
    }
}

impl From<&DownloadConfig> for SourceSettings {
    fn from(config: &DownloadConfig) -> Self {
        Self {
            merge_format: config.merge_format.clone(),
            concurrent_fragments: config.concurrent_fragments,
            retries: config.retries,
            fragment_retries: config.fragment_retries,
            title_max: config.title_max,
            subtitle_langs: config.subtitle_langs.clone(),
        }
    }
}

/// `[trim]`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TrimConfig {
    pub ffmpeg_location: Option<PathBuf>,
    pub segment_dir: Option<PathBuf>,
    pub video_codec: String,
    pub preset: String,
    pub crf: u8,
    pub audio_codec: String,
    pub audio_bitrate: String,
}

impl Default for TrimConfig {
    fn default() -> Self {
        let profile = ReencodeProfile::default();
        Self {
            ffmpeg_location: None,
            segment_dir: None,
            video_codec: profile.video_codec,
            preset: profile.preset,
            crf: profile.crf,
            audio_codec: profile.audio_codec,
            audio_bitrate: profile.audio_bitrate,
        }
    }
}

impl TrimConfig {
    pub fn reencode_profile(&self) -> ReencodeProfile {
        ReencodeProfile {
            video_codec: self.video_codec.clone(),
            preset: self.preset.clone(),
            crf: self.crf,
            audio_codec: self.audio_codec.clone(),
            audio_bitrate: self.audio_bitrate.clone(),
        }
    }
}

/// `[extract]`
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    /// Frame extractor program used by `run`
    pub command: Option<PathBuf>,
    /// Arguments placed before the generated ones
    pub args: Vec<String>,
    /// Optional program printing `x,y,w,h` for automatic region detection
    pub detect_command: Option<PathBuf>,
}

/// `[observer]`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ObserverConfig {
    pub poll_interval_ms: u64,
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 100,
        }
    }
}

/// TOML configuration adapter
pub struct TomlConfigAdapter;

impl TomlConfigAdapter {
    /// Load configuration following precedence: Env > File > Defaults.
    /// CLI overrides are applied by the command layer.
    pub fn load(explicit: Option<&Path>) -> Video2PdfResult<AppConfig> {
        let mut config = match Self::locate(explicit)? {
            Some(path) => {
                info!("Loading configuration from: {}", path.display());
                let content = std::fs::read_to_string(&path)?;
                Self::parse(&content)?
            }
            None => AppConfig::default(),
        };

        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Explicit path must exist; otherwise the first default path present
    pub fn locate(explicit: Option<&Path>) -> Video2PdfResult<Option<PathBuf>> {
        if let Some(path) = explicit {
            if !path.is_file() {
                return Err(Video2PdfError::Config {
                    message: format!("config file does not exist: {}", path.display()),
                });
            }
            return Ok(Some(path.to_path_buf()));
        }

        Ok(DEFAULT_CONFIG_PATHS
            .iter()
            .map(PathBuf::from)
            .find(|path| path.is_file()))
    }

    /// Parse TOML text
    pub fn parse(content: &str) -> Video2PdfResult<AppConfig> {
        toml::from_str(content).map_err(|e| Video2PdfError::Config {
            message: format!("failed to parse TOML config: {}", e),
        })
    }
}

impl AppConfig {
    /// Apply `VIDEO2PDF_*` overrides from the given lookup
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(level) = get("VIDEO2PDF_LOG_LEVEL") {
            self.log_level = level;
        }
        if let Some(dir) = get("VIDEO2PDF_DOWNLOAD_DIR") {
            self.download.dir = Some(PathBuf::from(dir));
        }
        if let Some(quality) = get("VIDEO2PDF_QUALITY") {
            self.download.quality = quality;
        }
        if let Some(proxy) = get("VIDEO2PDF_PROXY") {
            self.download.proxy = Some(proxy);
        }
        if let Some(cookies) = get("VIDEO2PDF_COOKIES") {
            self.download.cookies = Some(PathBuf::from(cookies));
        }
        if let Some(ytdlp) = get("VIDEO2PDF_YTDLP") {
            self.download.ytdlp = PathBuf::from(ytdlp);
        }
        if let Some(location) = get("VIDEO2PDF_FFMPEG_LOCATION") {
            self.trim.ffmpeg_location = Some(PathBuf::from(location));
        }
        if let Some(command) = get("VIDEO2PDF_EXTRACTOR") {
            self.extract.command = Some(PathBuf::from(command));
        }
    }
}
