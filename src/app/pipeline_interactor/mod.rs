// Pipeline interactor - Sequences acquisition, trimming, probing and region
// resolution, then hands the result to the frame extractor

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};

use crate::app::region_interactor::RegionSelector;
use crate::app::resolve_interactor::SourceResolver;
use crate::app::trim_interactor::Trimmer;
use crate::domain::model::*;
use crate::domain::rules::PathDefaults;
use crate::error::{PipelineWarning, Video2PdfError, Video2PdfResult};
use crate::ports::*;
use crate::progress::{ProgressEvent, ProgressSender};
use crate::utils::time::TimeParser;

/// Operator input for one run, as entered
#[derive(Debug, Clone)]
pub struct PipelineRequest {
    pub input: String,
    pub start: String,
    pub end: String,
    pub crop_spec: String,
    pub region_mode: RegionMode,
    pub download: DownloadOptions,
    pub download_dir: Option<PathBuf>,
    pub segment_dir: Option<PathBuf>,
    pub extraction: ExtractionSettings,
}

impl PipelineRequest {
    /// Request for a local or remote input with everything else defaulted
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            start: String::new(),
            end: String::new(),
            crop_spec: String::new(),
            region_mode: RegionMode::Off,
            download: DownloadOptions::default(),
            download_dir: None,
            segment_dir: None,
            extraction: ExtractionSettings::default(),
        }
    }
}

/// Inputs that passed validation
struct ValidatedRequest {
    source: MediaSource,
    range: TrimRange,
    explicit_crop: Option<CropRegion>,
}

/// Pipeline orchestrator
pub struct PipelineOrchestrator {
    resolver: SourceResolver,
    trimmer: Arc<Trimmer>,
    probe_port: Arc<dyn ProbePort>,
    region_selector: RegionSelector,
    extractor: Option<Arc<dyn FrameExtractorPort>>,
}

impl PipelineOrchestrator {
    pub fn new(
        resolver: SourceResolver,
        trimmer: Arc<Trimmer>,
        probe_port: Arc<dyn ProbePort>,
        region_selector: RegionSelector,
        extractor: Option<Arc<dyn FrameExtractorPort>>,
    ) -> Self {
        Self {
            resolver,
            trimmer,
            probe_port,
            region_selector,
            extractor,
        }
    }

    /// Full run: prepare, then extract when an extractor is wired in
    pub async fn run(
        &self,
        request: PipelineRequest,
        progress: &ProgressSender,
    ) -> Video2PdfResult<PipelineOutcome> {
        let result = self.prepare(&request, progress).await?;

        let document = match &self.extractor {
            Some(extractor) => {
                info!("Starting frame extraction for {}", result.final_video_path.display());
                progress.message(format!(
                    "Extracting slides from {}",
                    result.final_video_path.display()
                ));
                let document = extractor.extract(&result, progress).await?;
                progress.message(format!("Done: {}", document.display()));
                Some(document)
            }
            None => None,
        };

        Ok(PipelineOutcome { result, document })
    }

    /// Everything up to the handoff to the extractor
    pub async fn prepare(
        &self,
        request: &PipelineRequest,
        progress: &ProgressSender,
    ) -> Video2PdfResult<PipelineResult> {
        let ValidatedRequest {
            mut source,
            range,
            explicit_crop,
        } = Self::validate(request)?;

        if source.is_remote() {
            let dir = request
                .download_dir
                .clone()
                .unwrap_or_else(PathDefaults::download_dir);
            progress.message(format!("Remote input detected; downloading to {}", dir.display()));
            let path = self
                .resolver
                .resolve(source.locator(), &dir, &request.download, progress)
                .await?;
            progress.message(format!("Downloaded: {}", path.display()));
            source = MediaSource::local(path);
        }

        let mut video = source.local_path().ok_or(Video2PdfError::MissingInput)?;
        if !video.is_file() {
            return Err(Video2PdfError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("input file not found: {}", video.display()),
            )));
        }

        if range.is_bounded() {
            let clip_dir = request
                .segment_dir
                .clone()
                .unwrap_or_else(|| PathDefaults::segment_dir(&video));
            let clip = PathDefaults::clip_path(&video, &clip_dir);
            progress.emit(ProgressEvent::TrimStarted {
                start: range.start(),
                end: range.end(),
            });
            let outcome = self.trimmer.trim(&video, &clip, &range).await?;
            progress.emit(ProgressEvent::TrimFinished {
                output: outcome.output.clone(),
                strategy: outcome.strategy,
            });
            source = MediaSource::local(&outcome.output);
            video = outcome.output;
        }

        let resolution = match self.probe_port.resolution(&video).await {
            Ok(Some(resolution)) => {
                info!("Video resolution: {}", resolution);
                progress.emit(ProgressEvent::Probed {
                    width: resolution.width,
                    height: resolution.height,
                });
                Some(resolution)
            }
            Ok(None) => {
                progress.warn(PipelineWarning::Probe("no video stream".to_string()));
                None
            }
            Err(e) => {
                warn!("Probe failed for {}: {}", video.display(), e);
                progress.warn(PipelineWarning::Probe(e.to_string()));
                None
            }
        };

        let selection = self
            .region_selector
            .select(request.region_mode, &video, explicit_crop, resolution, progress)
            .await;

        let auto_crop = match request.region_mode {
            RegionMode::Auto(settings) => settings,
            _ => AutoCropSettings::default(),
        };
        let extraction = &request.extraction;
        let options = ExtractionOptions {
            output_pdf: extraction
                .output_pdf
                .clone()
                .unwrap_or_else(|| PathDefaults::pdf_path(&video)),
            output_dir: extraction
                .output_dir
                .clone()
                .unwrap_or_else(|| PathDefaults::frames_dir(&video)),
            sample_seconds: extraction.sample_seconds,
            threshold: extraction.threshold,
            scale_width: extraction.scale_width,
            max_pages: extraction.max_pages,
            a4: extraction.a4,
            auto_trim: extraction.auto_trim.enabled,
            auto_trim_ratio: extraction.auto_trim.ratio,
            auto_trim_pad: extraction.auto_trim.pad,
            auto_trim_sides: extraction.auto_trim.sides,
            auto_crop: selection.forward_auto,
            auto_crop_pad: auto_crop.pad,
            auto_crop_min_area_ratio: auto_crop.min_area_ratio,
        };

        info!("Pipeline prepared: {}", source);
        Ok(PipelineResult {
            final_video_path: video,
            resolution,
            crop: selection.crop,
            extraction_options: options.into_map()?,
        })
    }

    /// Parse and check operator input before any subprocess runs
    fn validate(request: &PipelineRequest) -> Video2PdfResult<ValidatedRequest> {
        let source = MediaSource::from_input(&request.input)?;

        let parser = TimeParser::new();
        let start = parser.parse_time("start", &request.start)?;
        let end = parser.parse_time("end", &request.end)?;
        let range = TrimRange::new(start, end)?;

        let explicit_crop = CropRegion::parse_spec(&request.crop_spec)?;

        Ok(ValidatedRequest {
            source,
            range,
            explicit_crop,
        })
    }
}
