use std::sync::Arc;

use crate::adapters::{
    AppConfig, CommandDetector, CommandExtractor, FFmpegAdapter, ProbeLibavAdapter,
    TerminalRegionPicker, YtDlpAdapter,
};
use crate::app::{
    pipeline_interactor::PipelineOrchestrator,
    region_interactor::RegionSelector,
    resolve_interactor::{SourceResolver, SourceSettings},
    runner::PipelineRunner,
    trim_interactor::Trimmer,
};
use crate::error::{Video2PdfError, Video2PdfResult};
use crate::ports::{
    DownloadPort, FrameExtractorPort, GeometryDetector, ProbePort, RegionPickerPort, TranscodePort,
};

pub trait AppContainer: Send + Sync {
    fn runner(&self) -> Arc<PipelineRunner>;
    fn trimmer(&self) -> Arc<Trimmer>;
    fn prober(&self) -> Arc<dyn ProbePort>;
}

pub struct DefaultAppContainer {
    runner: Arc<PipelineRunner>,
    trimmer: Arc<Trimmer>,
    prober: Arc<dyn ProbePort>,
}

impl DefaultAppContainer {
    /// Wire production adapters. With `with_extractor` the configured frame
    /// extractor is mandatory.
    pub fn new(config: &AppConfig, with_extractor: bool) -> Video2PdfResult<Self> {
        let download_port: Arc<dyn DownloadPort> = Arc::new(YtDlpAdapter::new(&config.download.ytdlp));
        let transcode_port: Arc<dyn TranscodePort> =
            Arc::new(FFmpegAdapter::new(config.trim.ffmpeg_location.clone()));
        let prober: Arc<dyn ProbePort> = Arc::new(ProbeLibavAdapter::new()?);
        let picker: Arc<dyn RegionPickerPort> = Arc::new(TerminalRegionPicker::new());
        let detector = config
            .extract
            .detect_command
            .as_ref()
            .map(|program| Arc::new(CommandDetector::new(program)) as Arc<dyn GeometryDetector>);

        let extractor = if with_extractor {
            let program = config.extract.command.as_ref().ok_or_else(|| Video2PdfError::Config {
                message: "no frame extractor configured; set [extract] command or VIDEO2PDF_EXTRACTOR"
                    .to_string(),
            })?;
            Some(Arc::new(CommandExtractor::new(program, config.extract.args.clone()))
                as Arc<dyn FrameExtractorPort>)
        } else {
            None
        };

        let trimmer = Arc::new(Trimmer::new(transcode_port, config.trim.reencode_profile()));
        let orchestrator = Arc::new(PipelineOrchestrator::new(
            SourceResolver::new(download_port, SourceSettings::from(&config.download)),
            Arc::clone(&trimmer),
            Arc::clone(&prober),
            RegionSelector::new(Some(picker), detector),
            extractor,
        ));

        Ok(Self {
            runner: Arc::new(PipelineRunner::new(orchestrator)),
            trimmer,
            prober,
        })
    }
}

impl AppContainer for DefaultAppContainer {
    fn runner(&self) -> Arc<PipelineRunner> {
        Arc::clone(&self.runner)
    }

    fn trimmer(&self) -> Arc<Trimmer> {
        Arc::clone(&self.trimmer)
    }

    fn prober(&self) -> Arc<dyn ProbePort> {
        Arc::clone(&self.prober)
    }
}
