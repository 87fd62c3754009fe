// Adapters - External system implementations

pub mod exec_ffmpeg;
pub mod exec_ytdlp;
pub mod extract_command;
pub mod picker_terminal;
pub mod probe_libav;
pub mod toml_config;
pub mod tracing_log;

// Re-export adapters
pub use exec_ffmpeg::FFmpegAdapter;
pub use exec_ytdlp::YtDlpAdapter;
pub use extract_command::{CommandDetector, CommandExtractor};
pub use picker_terminal::TerminalRegionPicker;
pub use probe_libav::ProbeLibavAdapter;
pub use toml_config::{AppConfig, TomlConfigAdapter};
pub use tracing_log::{init_tracing, LogFormat};
