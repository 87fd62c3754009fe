//! Command implementations

use std::io::Write;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Local;
use tracing::info;

use crate::adapters::{init_tracing, AppConfig, TomlConfigAdapter};
use crate::app::container::{AppContainer, DefaultAppContainer};
use crate::app::RunHandle;
use crate::cli::args::{PipelineArgs, ProbeArgs, TrimArgs};
use crate::cli::{Cli, Commands};
use crate::domain::model::{PipelineOutcome, TrimRange, TrimStrategy};
use crate::domain::rules::PathDefaults;
use crate::error::Video2PdfResult;
use crate::ports::ProbePort;
use crate::progress::ProgressEvent;
use crate::utils::time::TimeParser;
use crate::utils::Utils;

/// Load configuration, install logging and dispatch the command
pub async fn execute(cli: Cli) -> Result<ExitCode> {
    let mut config =
        TomlConfigAdapter::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    if let Some(format) = cli.log_format {
        config.log_format = format;
    }
    init_tracing(&config.log_level, config.log_format)?;

    match cli.command {
        Commands::Run(args) => {
            info!("Executing run command");
            pipeline(args, config, true).await
        }
        Commands::Prepare(args) => {
            info!("Executing prepare command");
            pipeline(args, config, false).await
        }
        Commands::Probe(args) => {
            info!("Executing probe command");
            probe(args, config).await
        }
        Commands::Trim(args) => {
            info!("Executing trim command");
            trim(args, config).await
        }
    }
}

/// `run` and `prepare`
async fn pipeline(args: PipelineArgs, mut config: AppConfig, extract: bool) -> Result<ExitCode> {
    args.apply_to(&mut config);
    let container =
        DefaultAppContainer::new(&config, extract).context("Failed to initialize pipeline")?;
    let request = args.to_request(&config);

    let mut handle = container.runner().start(request)?;

    // `prepare` keeps stdout for the JSON result
    let sink: Box<dyn Write + Send> = if extract {
        Box::new(std::io::stdout())
    } else {
        Box::new(std::io::stderr())
    };
    let mut renderer = EventRenderer::new(sink, args.json);
    let poll = Duration::from_millis(config.observer.poll_interval_ms.max(1));

    match observe(&mut handle, &mut renderer, poll).await {
        Ok(outcome) => {
            if !extract {
                println!("{}", serde_json::to_string_pretty(&outcome.result)?);
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(_) => Ok(ExitCode::FAILURE),
    }
}

/// Drain the progress stream every tick until the run completes
pub async fn observe(
    handle: &mut RunHandle,
    renderer: &mut EventRenderer,
    poll: Duration,
) -> Video2PdfResult<PipelineOutcome> {
    let mut ticker = tokio::time::interval(poll);
    loop {
        ticker.tick().await;
        for event in handle.events.drain() {
            renderer.render(&event);
        }

        if let Some(outcome) = handle.try_outcome() {
            for event in handle.events.drain() {
                renderer.render(&event);
            }
            if let Err(e) = &outcome {
                if renderer.errors_rendered() == 0 {
                    renderer.render(&ProgressEvent::Error {
                        message: e.to_string(),
                    });
                }
            }
            renderer.finish();
            return outcome;
        }
    }
}

/// `probe`
async fn probe(args: ProbeArgs, config: AppConfig) -> Result<ExitCode> {
    let container = DefaultAppContainer::new(&config, false)?;
    let resolution = container
        .prober()
        .resolution(&args.input)
        .await
        .with_context(|| format!("Failed to probe {}", args.input.display()))?;

    match (resolution, args.json) {
        (Some(resolution), true) => println!("{}", serde_json::to_string(&resolution)?),
        (Some(resolution), false) => println!("{}", resolution),
        (None, true) => println!("null"),
        (None, false) => println!("unknown"),
    }
    Ok(ExitCode::SUCCESS)
}

/// `trim`
async fn trim(args: TrimArgs, mut config: AppConfig) -> Result<ExitCode> {
    if let Some(location) = &args.ffmpeg_location {
        config.trim.ffmpeg_location = Some(location.clone());
    }

    let parser = TimeParser::new();
    let range = TrimRange::new(
        parser.parse_time("start", &args.start)?,
        parser.parse_time("end", &args.end)?,
    )?;

    if !args.input.is_file() {
        anyhow::bail!("Input file does not exist: {}", args.input.display());
    }

    let output = match &args.output {
        Some(output) => output.clone(),
        None => {
            let dir = config
                .trim
                .segment_dir
                .clone()
                .unwrap_or_else(|| PathDefaults::segment_dir(&args.input));
            PathDefaults::clip_path(&args.input, &dir)
        }
    };

    let container = DefaultAppContainer::new(&config, false)?;
    let outcome = container
        .trimmer()
        .trim(&args.input, &output, &range)
        .await
        .context("Trim failed")?;

    let strategy = match outcome.strategy {
        TrimStrategy::Copy => "stream copy",
        TrimStrategy::Reencode => "re-encode",
    };
    info!("Trim completed using {}", strategy);
    println!("{}", outcome.output.display());
    Ok(ExitCode::SUCCESS)
}

/// Renders progress events for a terminal or as JSON lines
pub struct EventRenderer {
    out: Box<dyn Write + Send>,
    json: bool,
    progress_line_open: bool,
    errors: usize,
}

impl EventRenderer {
    pub fn new(out: Box<dyn Write + Send>, json: bool) -> Self {
        Self {
            out,
            json,
            progress_line_open: false,
            errors: 0,
        }
    }

    pub fn errors_rendered(&self) -> usize {
        self.errors
    }

    /// Terminal write failures are not run failures
    pub fn render(&mut self, event: &ProgressEvent) {
        if matches!(event, ProgressEvent::Error { .. }) {
            self.errors += 1;
        }
        let _ = self.write_event(event);
    }

    /// Terminate an open carriage-return line
    pub fn finish(&mut self) {
        if self.progress_line_open {
            let _ = writeln!(self.out);
            self.progress_line_open = false;
        }
        let _ = self.out.flush();
    }

    fn write_event(&mut self, event: &ProgressEvent) -> std::io::Result<()> {
        if self.json {
            let mut value = serde_json::to_value(event).unwrap_or_default();
            if let Some(object) = value.as_object_mut() {
                object.insert("time".to_string(), Local::now().to_rfc3339().into());
            }
            writeln!(self.out, "{}", value)?;
            return self.out.flush();
        }

        if let ProgressEvent::Downloading { .. } = event {
            write!(self.out, "\r{}", describe(event))?;
            self.progress_line_open = true;
            return self.out.flush();
        }

        self.finish();
        let line = format!("[{}] {}", Local::now().format("%H:%M:%S"), describe(event));
        match event {
            ProgressEvent::Error { .. } => writeln!(std::io::stderr(), "{}", line),
            _ => writeln!(self.out, "{}", line),
        }
    }
}

/// Human-readable text for one event
pub fn describe(event: &ProgressEvent) -> String {
    let parser = TimeParser::new();
    let bound = |value: &Option<f64>| match value {
        Some(seconds) => parser.format_time(*seconds),
        None => "unspecified".to_string(),
    };

    match event {
        ProgressEvent::Downloading { percent, speed, eta } => {
            format!("[download] {} speed {} eta {}", percent, speed, eta)
        }
        ProgressEvent::Finished { total_bytes } => {
            format!("[download] finished, ~{}", Utils::format_megabytes(*total_bytes))
        }
        ProgressEvent::TrimStarted { start, end } => {
            format!("Trimming: start={} end={}", bound(start), bound(end))
        }
        ProgressEvent::TrimFinished { output, strategy } => {
            let how = match strategy {
                TrimStrategy::Copy => "stream copy",
                TrimStrategy::Reencode => "re-encode",
            };
            format!("Trimmed ({}): {}", how, output.display())
        }
        ProgressEvent::Probed { width, height } => format!("Video resolution: {} x {}", width, height),
        ProgressEvent::RegionChosen { x, y, w, h } => {
            format!("Region selected: x={}, y={}, w={}, h={}", x, y, w, h)
        }
        ProgressEvent::RegionCancelled => {
            "Region selection cancelled; continuing without it".to_string()
        }
        ProgressEvent::Message { text } => text.clone(),
        ProgressEvent::Warning { message } => format!("warning: {}", message),
        ProgressEvent::Error { message } => format!("error: {}", message),
    }
}
