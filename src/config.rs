//! Configuration file support for bioannot.
//!
//! Settings are stored as versioned JSON; files written by a newer version
//! are rejected instead of being half-understood.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_API_URL, EDIT_MARKER_LIMIT, HIGHLIGHT_DURATION_MS, MAX_BOUNDS_TILE_OFFSET, TILE_SIZE,
};
use crate::model::MAX_SIMPLIFY_TOLERANCE;
use crate::undo::UndoConfig;

/// Log level setting for the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Show only errors
    Error,
    /// Show errors and warnings
    Warn,
    /// Show errors, warnings, and info messages
    #[default]
    Info,
    /// Show debug-level logging
    Debug,
    /// Show all log messages including trace
    Trace,
}

impl LogLevel {
    /// Get the display name for this log level.
    pub fn name(&self) -> &'static str {
        match self {
            LogLevel::Error => "Error",
            LogLevel::Warn => "Warn",
            LogLevel::Info => "Info",
            LogLevel::Debug => "Debug",
            LogLevel::Trace => "Trace",
        }
    }

    /// Convert to log crate's LevelFilter.
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Current configuration file format version.
/// Increment this when making breaking changes to the config format.
pub const CONFIG_VERSION: u32 = 1;

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Version of the configuration file format
    pub version: u32,

    /// Base URL of the image/annotation API (tiles, masks).
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Edge length of pyramid tiles in pixels.
    #[serde(default = "default_tile_size")]
    pub tile_size: u32,

    /// Ceiling for the per-feature simplify tolerance.
    #[serde(default = "default_max_simplify_tolerance")]
    pub max_simplify_tolerance: u32,

    /// How long features restored by undo stay highlighted.
    #[serde(default = "default_highlight_duration_ms")]
    pub highlight_duration_ms: u64,

    /// Maximum number of vertex handles shown while reshaping.
    #[serde(default = "default_edit_marker_limit")]
    pub edit_marker_limit: usize,

    /// Pan slack beyond the image, in tiles.
    #[serde(default = "default_max_bounds_tile_offset")]
    pub max_bounds_tile_offset: u32,

    /// Maximum number of undo steps; unlimited when absent.
    #[serde(default)]
    pub undo_history_limit: Option<usize>,

    /// Log verbosity level
    #[serde(default)]
    pub log_level: LogLevel,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_tile_size() -> u32 {
    TILE_SIZE
}

fn default_max_simplify_tolerance() -> u32 {
    MAX_SIMPLIFY_TOLERANCE
}

fn default_highlight_duration_ms() -> u64 {
    HIGHLIGHT_DURATION_MS
}

fn default_edit_marker_limit() -> usize {
    EDIT_MARKER_LIMIT
}

fn default_max_bounds_tile_offset() -> u32 {
    MAX_BOUNDS_TILE_OFFSET
}

impl AppConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self {
            version: CONFIG_VERSION,
            api_url: default_api_url(),
            tile_size: default_tile_size(),
            max_simplify_tolerance: default_max_simplify_tolerance(),
            highlight_duration_ms: default_highlight_duration_ms(),
            edit_marker_limit: default_edit_marker_limit(),
            max_bounds_tile_offset: default_max_bounds_tile_offset(),
            undo_history_limit: None,
            log_level: LogLevel::default(),
        }
    }

    pub fn highlight_duration(&self) -> Duration {
        Duration::from_millis(self.highlight_duration_ms)
    }

    pub fn undo_config(&self) -> UndoConfig {
        UndoConfig {
            max_history: self.undo_history_limit,
        }
    }

    /// Serialize the configuration to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;

        // Validate version compatibility
        if config.version > CONFIG_VERSION {
            return Err(ConfigError::VersionTooNew {
                file_version: config.version,
                supported_version: CONFIG_VERSION,
            });
        }

        Ok(config)
    }

    /// Get the default filename for the config file.
    pub fn default_filename() -> &'static str {
        "bioannot-config.json"
    }

    /// Get the default config file path.
    pub fn default_path() -> Option<PathBuf> {
        // Try to use XDG config directory, fall back to home directory
        if let Some(config_dir) = dirs::config_dir() {
            Some(config_dir.join("bioannot").join(Self::default_filename()))
        } else {
            dirs::home_dir().map(|home_dir| {
                home_dir
                    .join(".config")
                    .join("bioannot")
                    .join(Self::default_filename())
            })
        }
    }

    /// Load configuration from `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json(&json)?;
        log::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Load from `path`, falling back to defaults when the file is missing
    /// or unusable.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            log::debug!("No config file found at {:?}", path);
            return Self::default();
        }
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Failed to load config file {:?}: {}", path, e);
                Self::default()
            }
        }
    }

    /// Load from the default path, or defaults if there is none.
    pub fn load_from_default_path() -> Self {
        match Self::default_path() {
            Some(path) => Self::load_or_default(&path),
            None => Self::default(),
        }
    }

    /// Save configuration to `path`, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = self.to_json()?;
        std::fs::write(path, json)?;
        log::info!("Saved configuration to {:?}", path);
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// JSON parsing error
    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] serde_json::Error),

    /// Configuration version is newer than supported
    #[error(
        "Configuration file version {file_version} is newer than supported version {supported_version}"
    )]
    VersionTooNew {
        file_version: u32,
        supported_version: u32,
    },

    /// I/O error when reading/writing config
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}
