//! Configuration and settings management for PaintKit
//!
//! Configuration is organized into sections:
//! - Connection settings (serial port, stroke source)
//! - Machine settings (controller buffer, homing waits)
//! - Pipeline settings (point reduction, adapter chain)
//! - Session settings (holder/pot files, tracker canvas, diagnostics)
//!
//! Files may be TOML or JSON, chosen by extension.

use paintkit_communication::{TransportConfig, DEFAULT_BAUD_RATE};
use paintkit_core::{ConfigError, Result};
use paintkit_pipeline::{AdapterKind, AdapterOptions, Preprocessor};
use paintkit_resources::PotVariant;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Where strokes come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Websocket relay fed by the drawing surface
    WebSocket,
    /// JSON-lines replay file
    File,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::WebSocket => write!(f, "websocket"),
            Self::File => write!(f, "file"),
        }
    }
}

/// Connection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionSettings {
    /// Serial port of the controller
    pub port: String,
    /// Baud rate for the serial link
    pub baud_rate: u32,
    /// Stroke source used when no replay file is given
    pub source: SourceKind,
    /// Websocket relay URL
    pub websocket_url: String,
    /// Idle poll timeout on the websocket, in milliseconds
    pub receive_timeout_ms: u64,
    /// Wait before reconnecting a dropped websocket, in milliseconds
    pub reconnect_delay_ms: u64,
    /// Replay file read when `source` is `file`
    pub replay_file: Option<PathBuf>,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            port: "/dev/ttyACM0".to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            source: SourceKind::WebSocket,
            websocket_url: "ws://127.0.0.1:8765".to_string(),
            receive_timeout_ms: 10_000,
            reconnect_delay_ms: 1_000,
            replay_file: None,
        }
    }
}

/// Pipeline settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    /// Point reduction and feed scaling
    pub preprocess: Preprocessor,
    /// Adapters applied after refill scheduling, in order
    pub adapters: Vec<AdapterKind>,
    /// Adapter tunables
    pub options: AdapterOptions,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            preprocess: Preprocessor::default(),
            adapters: vec![
                AdapterKind::StartAndEndLift,
                AdapterKind::MirrorOnY,
                AdapterKind::CheckLimits,
            ],
            options: AdapterOptions::default(),
        }
    }
}

/// Session settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// JSON list of holder stations
    pub holders_file: Option<PathBuf>,
    /// JSON list of pots; six unlabelled pots when unset
    pub pots_file: Option<PathBuf>,
    /// Pot agitation pattern
    pub pot_variant: PotVariant,
    /// Where the tracker canvas is written on shutdown
    pub canvas_path: Option<PathBuf>,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            holders_file: None,
            pots_file: None,
            pot_variant: PotVariant::default(),
            canvas_path: None,
        }
    }
}

/// Complete application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Connection settings
    pub connection: ConnectionSettings,
    /// Controller link settings
    pub machine: TransportConfig,
    /// Stroke processing settings
    pub pipeline: PipelineSettings,
    /// Session resources
    pub session: SessionSettings,
}

enum Format {
    Json,
    Toml,
}

fn format_of(path: &Path) -> std::result::Result<Format, ConfigError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => Ok(Format::Json),
        Some("toml") => Ok(Format::Toml),
        _ => Err(ConfigError::Invalid {
            reason: format!("{} must be .json or .toml", path.display()),
        }),
    }
}

impl Config {
    /// Create new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Default config location in the platform config directory
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("paintkit").join("config.toml"))
    }

    /// Load config from file (JSON or TOML)
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let format = format_of(path)?;
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let parse_error = |reason: String| ConfigError::Parse {
            path: path.display().to_string(),
            reason,
        };

        let config: Self = match format {
            Format::Json => serde_json::from_str(&content).map_err(|e| parse_error(e.to_string()))?,
            Format::Toml => toml::from_str(&content).map_err(|e| parse_error(e.to_string()))?,
        };

        config.validate()?;
        tracing::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Load from `path`, or from the default location if it exists, or defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load_from_file(path);
        }
        match Self::default_config_path() {
            Some(path) if path.exists() => Self::load_from_file(&path),
            _ => {
                tracing::debug!("No configuration file, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Save config to file (JSON or TOML)
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        self.validate()?;
        let serialize_error = |reason: String| ConfigError::Parse {
            path: path.display().to_string(),
            reason,
        };

        let content = match format_of(path)? {
            Format::Json => {
                serde_json::to_string_pretty(self).map_err(|e| serialize_error(e.to_string()))?
            }
            Format::Toml => {
                toml::to_string_pretty(self).map_err(|e| serialize_error(e.to_string()))?
            }
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Read {
                path: parent.display().to_string(),
                reason: e.to_string(),
            })?;
        }
        std::fs::write(path, content).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: &str| -> Result<()> {
            Err(ConfigError::Invalid {
                reason: reason.to_string(),
            }
            .into())
        };

        if self.connection.baud_rate == 0 {
            return invalid("Baud rate must be > 0");
        }
        if self.connection.receive_timeout_ms == 0 {
            return invalid("Receive timeout must be > 0");
        }
        if self.connection.source == SourceKind::File && self.connection.replay_file.is_none() {
            return invalid("File source needs a replay_file");
        }

        if self.machine.buffer_size < 3 {
            return invalid("Controller buffer size must be at least 3 bytes");
        }

        let pre = &self.pipeline.preprocess;
        if pre.merge_radius < 0.0 {
            return invalid("Merge radius must be >= 0");
        }
        if pre.feed_factor <= 0.0 {
            return invalid("Feed factor must be > 0");
        }

        let adapters = &self.pipeline.adapters;
        let position = |kind| adapters.iter().position(|k| *k == kind);
        if let (Some(style), Some(lead)) = (
            position(AdapterKind::Pointillism),
            position(AdapterKind::LeadIn),
        ) {
            if style < lead {
                return invalid("leadIn cannot run after pointillism");
            }
        }

        let env = &self.pipeline.options.envelope;
        if env.min_x >= env.max_x || env.min_y >= env.max_y || env.min_z >= env.max_z {
            return invalid("Bed envelope minimums must be below maximums");
        }
        if self.pipeline.options.pointillism_radius <= 0.0 {
            return invalid("Pointillism radius must be > 0");
        }

        Ok(())
    }
}
