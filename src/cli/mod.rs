//! CLI module for video2pdf
//!
//! This module handles command-line argument parsing and command execution.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::adapters::LogFormat;

pub mod args;
pub mod commands;

/// video2pdf
///
/// Turns a local video or a video URL into a normalized, trimmed clip and
/// hands it to a slide extractor.
#[derive(Parser, Debug)]
#[command(name = "video2pdf")]
#[command(about = "video2pdf - Prepare lecture videos for slide extraction")]
#[command(version)]
#[command(long_about = None)]
pub struct Cli {
    /// Configuration file
    #[arg(long, env = "VIDEO2PDF_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Logging level (RUST_LOG takes precedence)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Log line format
    #[arg(long, value_enum, global = true)]
    pub log_format: Option<LogFormat>,

    /// The command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the full pipeline and extract slides
    Run(args::PipelineArgs),
    /// Run the pipeline without extraction and print the result as JSON
    Prepare(args::PipelineArgs),
    /// Report the frame size of a local video
    Probe(args::ProbeArgs),
    /// Cut a time range out of a local video
    Trim(args::TrimArgs),
}

pub use args::{PipelineArgs, ProbeArgs, TrimArgs};
