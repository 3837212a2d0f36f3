//! TOML Configuration File Support
//!
//! Configuration for filling sessions, loaded from
//! `~/.config/chatflow/chatflow.toml`.
//!
//! # Configuration Priority
//!
//! Configuration values are loaded with the following priority (highest first):
//! 1. CLI arguments (via [`ConfigOverrides`])
//! 2. Environment variables
//! 3. TOML configuration file
//! 4. Default values
//!
//! # Example Configuration
//!
//! ```toml
//! [sink]
//! base_url = "https://forms.example.com"
//! submit_timeout_ms = 10000
//! output_path = "responses.jsonl"
//!
//! [session]
//! mode = "wizard"
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::traversal::FillMode;

/// Sink base URL
pub const ENV_SINK_URL: &str = "CHATFLOW_SINK_URL";
/// Submission timeout in milliseconds
pub const ENV_SUBMIT_TIMEOUT_MS: &str = "CHATFLOW_SUBMIT_TIMEOUT_MS";
/// Presentation mode
pub const ENV_MODE: &str = "CHATFLOW_MODE";

/// Default bound on one submission attempt
pub const DEFAULT_SUBMIT_TIMEOUT: Duration = Duration::from_secs(10);

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file at {path}: {source}")]
    ReadError {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse TOML config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

// =============================================================================
// Configuration Source Tracking
// =============================================================================

/// Tracks where a configuration value came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Value from command-line argument
    Cli,
    /// Value from environment variable
    Env,
    /// Value from TOML configuration file
    File,
    /// Default value
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cli => write!(f, "CLI"),
            Self::Env => write!(f, "environment"),
            Self::File => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

// =============================================================================
// TOML Configuration Structures
// =============================================================================

/// Sink section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SinkToml {
    /// ChatFlow server to post responses to
    pub base_url: Option<String>,

    /// Bound on one submission attempt in milliseconds
    pub submit_timeout_ms: Option<u64>,

    /// JSON-lines file used when no server is configured
    pub output_path: Option<PathBuf>,
}

/// Session section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionToml {
    /// Presentation mode (`chat`, `wizard` or `single`)
    pub mode: Option<String>,
}

/// Top-level TOML configuration structure
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatflowToml {
    /// Sink configuration section
    pub sink: SinkToml,

    /// Session configuration section
    pub session: SessionToml,
}

// =============================================================================
// Main Configuration Struct
// =============================================================================

/// Resolved configuration for filling sessions
#[derive(Clone, Debug)]
pub struct ChatflowConfig {
    /// Server to post responses to; `None` means write to `output_path`
    pub sink_url: Option<String>,

    /// Bound on one submission attempt
    pub submit_timeout: Duration,

    /// JSON-lines file for responses when no server is configured
    pub output_path: PathBuf,

    /// Presentation mode
    pub mode: FillMode,

    /// Path to the config file that was loaded (if any)
    pub config_file_path: Option<PathBuf>,

    /// Source of configuration values
    source: ConfigSource,
}

impl Default for ChatflowConfig {
    fn default() -> Self {
        Self {
            sink_url: None,
            submit_timeout: DEFAULT_SUBMIT_TIMEOUT,
            output_path: PathBuf::from("responses.jsonl"),
            mode: FillMode::Chat,
            config_file_path: None,
            source: ConfigSource::Default,
        }
    }
}

impl ChatflowConfig {
    /// Create a new configuration with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the primary source of this configuration
    #[must_use]
    pub fn source(&self) -> ConfigSource {
        self.source
    }

    /// Set the configuration source
    pub fn set_source(&mut self, source: ConfigSource) {
        self.source = source;
    }
}

// =============================================================================
// Configuration Loading
// =============================================================================

/// Get the default configuration file path
///
/// Returns `$XDG_CONFIG_HOME/chatflow/chatflow.toml` or
/// `~/.config/chatflow/chatflow.toml` if `XDG_CONFIG_HOME` is not set.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("chatflow").join("chatflow.toml"))
}

/// Load configuration from the default path and the environment
///
/// # Errors
///
/// Returns an error if the config file exists but cannot be parsed.
/// A missing config file is not an error (defaults are used).
pub fn load_config() -> Result<ChatflowConfig, ConfigError> {
    load_config_from_path(default_config_path())
}

/// Load configuration from a specific path and the environment
///
/// # Errors
///
/// Returns an error if the specified config file cannot be read, parsed, or
/// holds an invalid value.
pub fn load_config_from_path(path: Option<PathBuf>) -> Result<ChatflowConfig, ConfigError> {
    load_config_with_env(path, |key| std::env::var(key).ok())
}

/// Load configuration reading environment variables through `env`
///
/// # Errors
///
/// Same as [`load_config_from_path`].
pub fn load_config_with_env(
    path: Option<PathBuf>,
    env: impl Fn(&str) -> Option<String>,
) -> Result<ChatflowConfig, ConfigError> {
    let mut config = ChatflowConfig::default();

    if let Some(ref config_path) = path {
        if config_path.exists() {
            let toml_content =
                std::fs::read_to_string(config_path).map_err(|e| ConfigError::ReadError {
                    path: config_path.clone(),
                    source: e,
                })?;

            let toml_config: ChatflowToml = toml::from_str(&toml_content)?;
            apply_toml_config(&mut config, &toml_config)?;
            config.config_file_path = Some(config_path.clone());
            config.source = ConfigSource::File;

            tracing::info!(
                path = %config_path.display(),
                "Loaded configuration from file"
            );
        } else {
            tracing::debug!(
                path = %config_path.display(),
                "Config file not found, using defaults"
            );
        }
    }

    apply_env_config(&mut config, env);

    Ok(config)
}

/// Apply TOML configuration values to the config struct
fn apply_toml_config(config: &mut ChatflowConfig, toml: &ChatflowToml) -> Result<(), ConfigError> {
    if let Some(url) = &toml.sink.base_url {
        if url.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "sink.base_url must not be empty".to_string(),
            ));
        }
        config.sink_url = Some(url.clone());
    }
    if let Some(ms) = toml.sink.submit_timeout_ms {
        if ms == 0 {
            return Err(ConfigError::ValidationError(
                "sink.submit_timeout_ms must be greater than 0".to_string(),
            ));
        }
        config.submit_timeout = Duration::from_millis(ms);
    }
    if let Some(path) = &toml.sink.output_path {
        config.output_path.clone_from(path);
    }
    if let Some(mode) = &toml.session.mode {
        config.mode = mode
            .parse()
            .map_err(|e: crate::traversal::UnknownFillMode| {
                ConfigError::ValidationError(format!("session.mode: {e}"))
            })?;
    }
    Ok(())
}

/// Apply environment variable overrides to the config
///
/// Unparseable values are skipped with a warning.
fn apply_env_config(config: &mut ChatflowConfig, env: impl Fn(&str) -> Option<String>) {
    if let Some(url) = env(ENV_SINK_URL).filter(|u| !u.trim().is_empty()) {
        config.sink_url = Some(url);
        config.source = ConfigSource::Env;
    }
    if let Some(timeout) = env(ENV_SUBMIT_TIMEOUT_MS) {
        match timeout.parse::<u64>() {
            Ok(ms) if ms > 0 => {
                config.submit_timeout = Duration::from_millis(ms);
                config.source = ConfigSource::Env;
            }
            _ => tracing::warn!(value = %timeout, "Ignoring invalid {ENV_SUBMIT_TIMEOUT_MS}"),
        }
    }
    if let Some(mode) = env(ENV_MODE) {
        match mode.parse::<FillMode>() {
            Ok(mode) => {
                config.mode = mode;
                config.source = ConfigSource::Env;
            }
            Err(e) => tracing::warn!(error = %e, "Ignoring invalid {ENV_MODE}"),
        }
    }
}

// =============================================================================
// CLI Override Support
// =============================================================================

/// Builder for applying CLI overrides to configuration
///
/// Use this after [`load_config`] to apply command-line argument overrides.
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    /// Sink URL override
    pub sink_url: Option<String>,

    /// Submission timeout override (milliseconds)
    pub submit_timeout_ms: Option<u64>,

    /// Output file override
    pub output_path: Option<PathBuf>,

    /// Mode override
    pub mode: Option<FillMode>,
}

impl ConfigOverrides {
    /// Create empty overrides
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set sink URL override
    #[must_use]
    pub fn with_sink_url(mut self, url: String) -> Self {
        self.sink_url = Some(url);
        self
    }

    /// Set submission timeout override
    #[must_use]
    pub fn with_submit_timeout_ms(mut self, ms: u64) -> Self {
        self.submit_timeout_ms = Some(ms);
        self
    }

    /// Set output file override
    #[must_use]
    pub fn with_output_path(mut self, path: PathBuf) -> Self {
        self.output_path = Some(path);
        self
    }

    /// Set mode override
    #[must_use]
    pub fn with_mode(mut self, mode: FillMode) -> Self {
        self.mode = Some(mode);
        self
    }

    /// Apply overrides to a configuration
    ///
    /// Only values that are `Some` are applied. If any override is applied,
    /// the config source is set to `Cli`.
    pub fn apply(&self, config: &mut ChatflowConfig) {
        let mut applied = false;

        if let Some(ref url) = self.sink_url {
            config.sink_url = Some(url.clone());
            applied = true;
        }
        if let Some(ms) = self.submit_timeout_ms.filter(|ms| *ms > 0) {
            config.submit_timeout = Duration::from_millis(ms);
            applied = true;
        }
        if let Some(ref path) = self.output_path {
            config.output_path.clone_from(path);
            applied = true;
        }
        if let Some(mode) = self.mode {
            config.mode = mode;
            applied = true;
        }

        if applied {
            config.source = ConfigSource::Cli;
        }
    }
}
