use pod_core::{ConfigError, PipelineConfig};
use std::path::PathBuf;
use std::time::Duration;

/// Where recognised gestures go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputSinkMode {
    /// Log the rendered `input` command only.
    Log,
    /// Pipe the rendered command into a privileged shell.
    Shell,
    Off,
}

impl InputSinkMode {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "log" => Some(Self::Log),
            "shell" => Some(Self::Shell),
            "off" | "0" => Some(Self::Off),
            _ => None,
        }
    }
}

/// Daemon configuration, loaded from environment variables.
pub struct Config {
    /// Serial device of the command link (default: /dev/ttyACM0).
    pub serial_device: String,
    /// Minimum time between reopen attempts of a lost link.
    pub reconnect_interval: Duration,
    /// Landmark frame stream, newline-delimited JSON. `-` reads stdin.
    pub frame_source: String,
    pub input_sink: InputSinkMode,
    /// Command line (program and arguments) that receives `input` commands
    /// on stdin when `input_sink` is `shell`.
    pub input_shell: String,
    /// Whether to register the D-Bus status interface.
    pub dbus_enabled: bool,
    /// Optional TOML file with pipeline tuning.
    pub pipeline_config_path: Option<PathBuf>,
    pub screen_width: Option<u32>,
    pub screen_height: Option<u32>,
}

impl Config {
    /// Load configuration from `POD_*` environment variables with defaults.
    pub fn from_env() -> Self {
        let input_sink = std::env::var("POD_INPUT_SINK")
            .ok()
            .and_then(|v| {
                let mode = InputSinkMode::parse(&v);
                if mode.is_none() {
                    tracing::warn!(value = %v, "unknown POD_INPUT_SINK; using log");
                }
                mode
            })
            .unwrap_or(InputSinkMode::Log);

        Self {
            serial_device: std::env::var("POD_SERIAL_DEVICE")
                .unwrap_or_else(|_| "/dev/ttyACM0".to_string()),
            reconnect_interval: Duration::from_millis(env_u64("POD_RECONNECT_INTERVAL_MS", 1000)),
            frame_source: std::env::var("POD_FRAME_SOURCE").unwrap_or_else(|_| "-".to_string()),
            input_sink,
            input_shell: std::env::var("POD_INPUT_SHELL").unwrap_or_else(|_| "su".to_string()),
            dbus_enabled: std::env::var("POD_DBUS_ENABLED")
                .map(|v| v != "0")
                .unwrap_or(true),
            pipeline_config_path: std::env::var("POD_CONFIG").ok().map(PathBuf::from),
            screen_width: env_u32("POD_SCREEN_WIDTH"),
            screen_height: env_u32("POD_SCREEN_HEIGHT"),
        }
    }

    /// Pipeline tuning: the TOML file if configured, then screen overrides.
    pub fn pipeline(&self) -> Result<PipelineConfig, ConfigError> {
        let mut pipeline = match &self.pipeline_config_path {
            Some(path) => PipelineConfig::load(path)?,
            None => PipelineConfig::default(),
        };
        if let Some(w) = self.screen_width {
            pipeline.screen.width = w;
        }
        if let Some(h) = self.screen_height {
            pipeline.screen.height = h;
        }
        pipeline.validate()?;
        Ok(pipeline)
    }
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_u32(key: &str) -> Option<u32> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}
