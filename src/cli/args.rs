//! Command-line argument definitions

use std::path::PathBuf;

use clap::{Args, ValueEnum};
use clap_num::number_range;

use crate::adapters::AppConfig;
use crate::app::PipelineRequest;
use crate::domain::model::*;

/// Region selection mode
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegionModeArg {
    /// Use only the explicit --crop, if any
    Off,
    /// Pick the region on the first frame
    Manual,
    /// Let the detector or the frame extractor find the region
    Auto,
}

/// Borders auto-trim may remove
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrimSidesArg {
    Tb,
    All,
}

impl From<TrimSidesArg> for TrimSides {
    fn from(arg: TrimSidesArg) -> Self {
        match arg {
            TrimSidesArg::Tb => TrimSides::Tb,
            TrimSidesArg::All => TrimSides::All,
        }
    }
}

fn threshold_in_range(s: &str) -> Result<u8, String> {
    number_range(s, 1, 63)
}

/// Arguments shared by `run` and `prepare`
#[derive(Args, Debug, Clone)]
pub struct PipelineArgs {
    /// Local video path or http(s) URL
    #[arg(short, long)]
    pub input: String,

    /// Start time (SS, MM:SS or HH:MM:SS, fractional seconds allowed)
    #[arg(short, long, default_value = "", allow_hyphen_values = true)]
    pub start: String,

    /// End time (SS, MM:SS or HH:MM:SS, fractional seconds allowed)
    #[arg(short, long, default_value = "", allow_hyphen_values = true)]
    pub end: String,

    /// Output PDF path (default: video path with .pdf extension)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Directory for extracted frames (default: <video dir>/slides_phash)
    #[arg(long)]
    pub frames_dir: Option<PathBuf>,

    /// Download directory for remote inputs
    #[arg(long)]
    pub download_dir: Option<PathBuf>,

    /// Directory for trimmed clips
    #[arg(long)]
    pub segment_dir: Option<PathBuf>,

    /// Download quality: best or <height>p
    #[arg(short, long)]
    pub quality: Option<String>,

    /// Proxy URL for downloads
    #[arg(long)]
    pub proxy: Option<String>,

    /// Cookie file for downloads
    #[arg(long)]
    pub cookies: Option<PathBuf>,

    /// Allow playlist URLs (only the first entry is used)
    #[arg(long)]
    pub playlist: bool,

    /// Download and embed subtitles
    #[arg(long)]
    pub subtitles: bool,

    /// ffmpeg binary or directory
    #[arg(long)]
    pub ffmpeg_location: Option<PathBuf>,

    /// Explicit crop region x,y,w,h
    #[arg(long, default_value = "")]
    pub crop: String,

    /// Region selection mode
    #[arg(long, value_enum, default_value_t = RegionModeArg::Auto)]
    pub region_mode: RegionModeArg,

    /// Padding around an automatically detected region
    #[arg(long, default_value_t = 6)]
    pub auto_crop_pad: u32,

    /// Minimum share of the frame a detected region must cover
    #[arg(long, default_value_t = 0.05)]
    pub auto_crop_min_area: f64,

    /// Seconds between sampled frames
    #[arg(long, default_value_t = 0.5)]
    pub sample_seconds: f64,

    /// Perceptual hash distance that starts a new page (1-63)
    #[arg(long, default_value_t = 10, value_parser = threshold_in_range)]
    pub threshold: u8,

    /// Scale frames to this width
    #[arg(long)]
    pub scale_width: Option<u32>,

    /// Stop after this many pages
    #[arg(long)]
    pub max_pages: Option<u32>,

    /// Lay pages out on A4
    #[arg(long)]
    pub a4: bool,

    /// Keep white margins
    #[arg(long)]
    pub no_auto_trim: bool,

    /// Share of white pixels that marks a margin row or column
    #[arg(long, default_value_t = 0.98)]
    pub auto_trim_ratio: f64,

    /// Padding kept when trimming margins
    #[arg(long, default_value_t = 6)]
    pub auto_trim_pad: u32,

    /// Borders auto-trim may remove
    #[arg(long, value_enum, default_value_t = TrimSidesArg::Tb)]
    pub auto_trim_sides: TrimSidesArg,

    /// Render progress events as JSON lines
    #[arg(long)]
    pub json: bool,
}

impl PipelineArgs {
    /// CLI flags override file and environment values
    pub fn apply_to(&self, config: &mut AppConfig) {
        if let Some(quality) = &self.quality {
            config.download.quality = quality.clone();
        }
        if let Some(proxy) = &self.proxy {
            config.download.proxy = Some(proxy.clone());
        }
        if let Some(cookies) = &self.cookies {
            config.download.cookies = Some(cookies.clone());
        }
        if let Some(dir) = &self.download_dir {
            config.download.dir = Some(dir.clone());
        }
        if let Some(dir) = &self.segment_dir {
            config.trim.segment_dir = Some(dir.clone());
        }
        if let Some(location) = &self.ffmpeg_location {
            config.trim.ffmpeg_location = Some(location.clone());
        }
    }

    /// Build the run request from flags and the merged config
    pub fn to_request(&self, config: &AppConfig) -> PipelineRequest {
        let auto_settings = AutoCropSettings {
            pad: self.auto_crop_pad,
            min_area_ratio: self.auto_crop_min_area,
        };
        let region_mode = match self.region_mode {
            RegionModeArg::Off => RegionMode::Off,
            RegionModeArg::Manual => RegionMode::Manual,
            RegionModeArg::Auto => RegionMode::Auto(auto_settings),
        };

        PipelineRequest {
            input: self.input.clone(),
            start: self.start.clone(),
            end: self.end.clone(),
            crop_spec: self.crop.clone(),
            region_mode,
            download: DownloadOptions {
                quality: QualityTier::parse(&config.download.quality),
                cookies_path: config.download.cookies.clone(),
                proxy: config.download.proxy.clone(),
                allow_playlist: self.playlist,
                subtitles: self.subtitles,
                tool_location: config.trim.ffmpeg_location.clone(),
            },
            download_dir: config.download.dir.clone(),
            segment_dir: config.trim.segment_dir.clone(),
            extraction: ExtractionSettings {
                output_pdf: self.output.clone(),
                output_dir: self.frames_dir.clone(),
                sample_seconds: self.sample_seconds,
                threshold: self.threshold,
                scale_width: self.scale_width,
                max_pages: self.max_pages,
                a4: self.a4,
                auto_trim: AutoTrimSettings {
                    enabled: !self.no_auto_trim,
                    ratio: self.auto_trim_ratio,
                    pad: self.auto_trim_pad,
                    sides: self.auto_trim_sides.into(),
                },
            },
        }
    }
}

/// Arguments for the probe command
#[derive(Args, Debug)]
pub struct ProbeArgs {
    /// Local video path
    #[arg(short, long)]
    pub input: PathBuf,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the trim command
#[derive(Args, Debug)]
pub struct TrimArgs {
    /// Local video path
    #[arg(short, long)]
    pub input: PathBuf,

    /// Start time (SS, MM:SS or HH:MM:SS)
    #[arg(short, long, default_value = "", allow_hyphen_values = true)]
    pub start: String,

    /// End time (SS, MM:SS or HH:MM:SS)
    #[arg(short, long, default_value = "", allow_hyphen_values = true)]
    pub end: String,

    /// Output clip path (default: <input dir>/video2pdf_segments/<stem>.clip.mp4)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// ffmpeg binary or directory
    #[arg(long)]
    pub ffmpeg_location: Option<PathBuf>,
}
