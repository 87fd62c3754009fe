// Source resolver - Fetches remote media into local storage

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;

use crate::domain::model::*;
use crate::domain::rules::*;
use crate::error::Video2PdfResult;
use crate::ports::*;
use crate::progress::{ProgressEvent, ProgressSender};

/// Engine knobs that stay fixed across runs
#[derive(Debug, Clone, PartialEq)]
pub struct SourceSettings {
    pub merge_format: String,
    pub concurrent_fragments: u32,
    pub retries: u32,
    pub fragment_retries: u32,
    pub title_max: usize,
    pub subtitle_langs: Vec<String>,
}

/// Resolves a URI to a file on disk
pub struct SourceResolver {
    download_port: Arc<dyn DownloadPort>,
    settings: SourceSettings,
}

impl SourceResolver {
    pub fn new(download_port: Arc<dyn DownloadPort>, settings: SourceSettings) -> Self {
        Self {
            download_port,
            settings,
        }
    }

    /// Engine request for one fetch
    pub fn build_request(&self, uri: &str, destination: &Path, options: &DownloadOptions) -> EngineRequest {
        EngineRequest {
            url: uri.to_string(),
            output_dir: destination.to_path_buf(),
            output_template: DownloadNaming::output_template(self.settings.title_max),
            format: FormatSelector::build(&options.quality),
            merge_format: self.settings.merge_format.clone(),
            concurrent_fragments: self.settings.concurrent_fragments,
            retries: self.settings.retries,
            fragment_retries: self.settings.fragment_retries,
            subtitle_langs: self.settings.subtitle_langs.clone(),
            options: options.clone(),
        }
    }

    /// Download `uri` into `destination` and return the local file
    pub async fn resolve(
        &self,
        uri: &str,
        destination: &Path,
        options: &DownloadOptions,
        progress: &ProgressSender,
    ) -> Video2PdfResult<PathBuf> {
        tokio::fs::create_dir_all(destination).await?;

        let request = self.build_request(uri, destination, options);
        info!(
            "Downloading {} to {} (format {})",
            uri,
            destination.display(),
            request.format
        );

        let forward = |tick: EngineProgress| match tick.status.as_str() {
            "downloading" => progress.emit(ProgressEvent::Downloading {
                percent: tick.percent,
                speed: tick.speed,
                eta: tick.eta,
            }),
            "finished" => progress.emit(ProgressEvent::Finished {
                total_bytes: tick.total_bytes.or(tick.total_bytes_estimate),
            }),
            _ => {}
        };

        let metadata = self.download_port.fetch(&request, &forward).await?;
        let path = DownloadNaming::resolve_path(
            metadata.as_ref(),
            destination,
            self.settings.title_max,
            &self.settings.merge_format,
        )?;

        info!("Downloaded: {}", path.display());
        Ok(path)
    }
}
