//! video2pdf
//!
//! Prepares lecture videos for slide extraction: downloads remote sources,
//! trims them to a time range and selects the slide region.
//!
//! # Usage
//!
//! ```bash
//! video2pdf prepare --input "https://example.com/watch?v=abc" --start 01:00 --end 05:30
//! video2pdf run --input lecture.mp4 --region-mode manual
//! video2pdf probe --input lecture.mp4
//! video2pdf trim --input lecture.mp4 --start 90 --end 120
//! ```

use std::process::ExitCode;

use clap::Parser;

use video2pdf::cli::{commands, Cli};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match commands::execute(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
