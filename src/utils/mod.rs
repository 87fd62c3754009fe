//! Common utilities and helpers

pub mod time;

/// Utility functions for video2pdf
pub struct Utils;

impl Utils {
    /// Human-readable size summary used for the download-finished tick
    pub fn format_megabytes(bytes: Option<u64>) -> String {
        match bytes {
            Some(total) => format!("{:.1}MB", total as f64 / 1_048_576.0),
            None => "?".to_string(),
        }
    }

    /// Whether the input text names a remote source
    pub fn is_remote(locator: &str) -> bool {
        let lowered = locator.trim().to_ascii_lowercase();
        lowered.starts_with("http://") || lowered.starts_with("https://")
    }
}
