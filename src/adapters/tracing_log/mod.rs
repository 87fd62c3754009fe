// Tracing log adapter - Structured logging using tracing crate

use serde::Deserialize;
use tracing_subscriber::EnvFilter;

use crate::error::{Video2PdfError, Video2PdfResult};

/// Log line format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Build the filter; `RUST_LOG` wins over the configured level
pub fn build_filter(level: &str) -> Video2PdfResult<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(level).map_err(|e| Video2PdfError::Config {
        message: format!("invalid log level '{}': {}", level, e),
    })
}

/// Install the global subscriber writing to stderr.
/// A subscriber that is already installed is left in place.
pub fn init_tracing(level: &str, format: LogFormat) -> Video2PdfResult<()> {
    let filter = build_filter(level)?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    let _ = match format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.try_init(),
    };
    Ok(())
}
