//! TOML Configuration File Support
//!
//! Centralized configuration loading for the chat client, supporting a TOML
//! file at `~/.config/maumfit/chat.toml`.
//!
//! # Configuration Priority
//!
//! Values are loaded with the following priority (highest first):
//! 1. CLI arguments (via [`ConfigOverrides`])
//! 2. Environment variables
//! 3. TOML configuration file
//! 4. Default values
//!
//! # Example Configuration
//!
//! ```toml
//! [server]
//! base_url = "https://api.maumfit.co.kr"
//! request_timeout_secs = 120
//! channel_capacity = 100
//!
//! [chat]
//! greeting = "안녕하세요! 무엇을 도와드릴까요?"
//! reset_greeting = "대화가 초기화되었습니다. 무엇을 도와드릴까요?"
//! error_message = "죄송합니다. 오류가 발생했습니다."
//! terminal_placement = "append_separate"
//!
//! [member]
//! member_id = 42
//! lat = 37.5665
//! lng = 126.9780
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::assembler::TerminalPlacement;
use crate::backend::{GeoPoint, DEFAULT_CHANNEL_CAPACITY};

/// Greeting shown when a session opens
pub const DEFAULT_GREETING: &str = "안녕하세요! 무엇을 도와드릴까요?";
/// Greeting shown after a reset
pub const DEFAULT_RESET_GREETING: &str = "대화가 초기화되었습니다. 무엇을 도와드릴까요?";
/// Message shown when an exchange fails
pub const DEFAULT_ERROR_MESSAGE: &str = "죄송합니다. 오류가 발생했습니다.";

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

/// Tracks where configuration values came from
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

/// Server section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerToml {
    /// Service root URL
    pub base_url: Option<String>,

    /// Whole-request timeout in seconds
    pub request_timeout_secs: Option<u64>,

    /// Update channel capacity per exchange
    pub channel_capacity: Option<usize>,
}

/// Chat copy and behavior section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatToml {
    /// Greeting shown when a session opens
    pub greeting: Option<String>,

    /// Greeting shown after a reset
    pub reset_greeting: Option<String>,

    /// Message shown when an exchange fails
    pub error_message: Option<String>,

    /// Terminal event placement after partial talk
    pub terminal_placement: Option<TerminalPlacement>,
}

/// Member section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MemberToml {
    /// Logged-in member id
    pub member_id: Option<i64>,

    /// Latitude sent with requests
    pub lat: Option<f64>,

    /// Longitude sent with requests
    pub lng: Option<f64>,
}

/// Top-level TOML configuration structure
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfigToml {
    /// Server section
    pub server: ServerToml,

    /// Chat section
    pub chat: ChatToml,

    /// Member section
    pub member: MemberToml,
}

// =============================================================================
// Main Configuration Struct
// =============================================================================

/// Resolved chat client configuration
#[derive(Clone, Debug)]
pub struct ChatConfig {
    /// Service root URL
    pub base_url: String,

    /// Whole-request timeout
    pub request_timeout: Duration,

    /// Update channel capacity per exchange
    pub channel_capacity: usize,

    /// Greeting shown when a session opens
    pub greeting: String,

    /// Greeting shown after a reset
    pub reset_greeting: String,

    /// Message shown when an exchange fails
    pub error_message: String,

    /// Terminal event placement after partial talk
    pub terminal_placement: TerminalPlacement,

    /// Logged-in member id
    pub member_id: Option<i64>,

    /// Latitude sent with requests
    pub lat: Option<f64>,

    /// Longitude sent with requests
    pub lng: Option<f64>,

    /// Path to the config file that was loaded (if any)
    pub config_file_path: Option<PathBuf>,

    /// Highest-priority source that set a value
    pub source: ConfigSource,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.maumfit.co.kr".to_string(),
            request_timeout: Duration::from_secs(120),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            greeting: DEFAULT_GREETING.to_string(),
            reset_greeting: DEFAULT_RESET_GREETING.to_string(),
            error_message: DEFAULT_ERROR_MESSAGE.to_string(),
            terminal_placement: TerminalPlacement::default(),
            member_id: None,
            lat: None,
            lng: None,
            config_file_path: None,
            source: ConfigSource::Default,
        }
    }
}

impl ChatConfig {
    /// Create a new configuration with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// User location, when both coordinates are set
    #[must_use]
    pub fn location(&self) -> Option<GeoPoint> {
        match (self.lat, self.lng) {
            (Some(lat), Some(lng)) => Some(GeoPoint::new(lat, lng)),
            _ => None,
        }
    }

    /// Check value ranges and combinations
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] describing the first problem.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_url.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "base_url must not be empty".to_string(),
            ));
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::ValidationError(
                "request_timeout_secs must be greater than 0".to_string(),
            ));
        }
        if self.channel_capacity == 0 {
            return Err(ConfigError::ValidationError(
                "channel_capacity must be greater than 0".to_string(),
            ));
        }
        if self.lat.is_some() != self.lng.is_some() {
            return Err(ConfigError::ValidationError(
                "lat and lng must be set together".to_string(),
            ));
        }
        if let Some(point) = self.location() {
            if !point.is_valid() {
                return Err(ConfigError::ValidationError(format!(
                    "location out of range: lat {}, lng {}",
                    point.lat, point.lng
                )));
            }
        }
        Ok(())
    }
}

// =============================================================================
// Configuration Loading
// =============================================================================

/// Get the default configuration file path
///
/// Returns `$XDG_CONFIG_HOME/maumfit/chat.toml` or
/// `~/.config/maumfit/chat.toml` if `XDG_CONFIG_HOME` is not set.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("maumfit").join("chat.toml"))
}

/// Load configuration from all sources with proper priority
///
/// # Errors
///
/// Returns an error if the config file exists but cannot be parsed, or if the
/// merged values are invalid. A missing config file is not an error.
pub fn load_config() -> Result<ChatConfig, ConfigError> {
    load_config_from_path(default_config_path())
}

/// Load configuration from a specific path
///
/// # Arguments
///
/// * `path` - Optional path to the configuration file. If `None`, only defaults
///   and environment variables are used.
///
/// # Errors
///
/// Returns an error if the specified config file cannot be read or parsed, or
/// if the merged values are invalid.
pub fn load_config_from_path(path: Option<PathBuf>) -> Result<ChatConfig, ConfigError> {
    load_config_with_env(path, |key| std::env::var(key).ok())
}

/// Load configuration with a custom environment lookup
///
/// # Errors
///
/// Same as [`load_config_from_path`].
pub fn load_config_with_env<F>(path: Option<PathBuf>, env: F) -> Result<ChatConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    load_config_with(path, &ConfigOverrides::default(), env)
}

/// Load configuration from every source, CLI overrides included
///
/// Validation runs once, on the fully merged result, so an override can
/// complete a value the file leaves half set (e.g. `lat` without `lng`).
///
/// # Errors
///
/// Same as [`load_config_from_path`].
pub fn load_config_with<F>(
    path: Option<PathBuf>,
    overrides: &ConfigOverrides,
    env: F,
) -> Result<ChatConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = ChatConfig::default();

    if let Some(ref config_path) = path {
        if config_path.exists() {
            let toml_content =
                std::fs::read_to_string(config_path).map_err(|e| ConfigError::ReadError {
                    path: config_path.clone(),
                    source: e,
                })?;

            let toml_config: ChatConfigToml = toml::from_str(&toml_content)?;
            apply_toml_config(&mut config, &toml_config);
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
    overrides.apply(&mut config)?;

    Ok(config)
}

/// Apply TOML configuration values to the config struct
fn apply_toml_config(config: &mut ChatConfig, toml: &ChatConfigToml) {
    // Server settings
    if let Some(ref url) = toml.server.base_url {
        config.base_url.clone_from(url);
    }
    if let Some(secs) = toml.server.request_timeout_secs {
        config.request_timeout = Duration::from_secs(secs);
    }
    if let Some(capacity) = toml.server.channel_capacity {
        config.channel_capacity = capacity;
    }

    // Chat settings
    if let Some(ref greeting) = toml.chat.greeting {
        config.greeting.clone_from(greeting);
    }
    if let Some(ref greeting) = toml.chat.reset_greeting {
        config.reset_greeting.clone_from(greeting);
    }
    if let Some(ref message) = toml.chat.error_message {
        config.error_message.clone_from(message);
    }
    if let Some(placement) = toml.chat.terminal_placement {
        config.terminal_placement = placement;
    }

    // Member settings
    if toml.member.member_id.is_some() {
        config.member_id = toml.member.member_id;
    }
    if toml.member.lat.is_some() {
        config.lat = toml.member.lat;
    }
    if toml.member.lng.is_some() {
        config.lng = toml.member.lng;
    }
}

/// Apply environment variable overrides to the config
///
/// Environment variables:
/// - `MAUMFIT_BASE_URL`: Service root URL
/// - `MAUMFIT_REQUEST_TIMEOUT`: Request timeout in seconds
/// - `MAUMFIT_MEMBER_ID`: Logged-in member id
/// - `MAUMFIT_LAT` / `MAUMFIT_LNG`: User location
fn apply_env_config<F>(config: &mut ChatConfig, env: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = env("MAUMFIT_BASE_URL") {
        config.base_url = url;
        config.source = ConfigSource::Env;
    }
    if let Some(timeout) = env("MAUMFIT_REQUEST_TIMEOUT") {
        if let Ok(secs) = timeout.parse::<u64>() {
            config.request_timeout = Duration::from_secs(secs);
            config.source = ConfigSource::Env;
        }
    }
    if let Some(member) = env("MAUMFIT_MEMBER_ID") {
        if let Ok(id) = member.parse::<i64>() {
            config.member_id = Some(id);
            config.source = ConfigSource::Env;
        }
    }
    if let Some(lat) = env("MAUMFIT_LAT") {
        if let Ok(lat) = lat.parse::<f64>() {
            config.lat = Some(lat);
            config.source = ConfigSource::Env;
        }
    }
    if let Some(lng) = env("MAUMFIT_LNG") {
        if let Ok(lng) = lng.parse::<f64>() {
            config.lng = Some(lng);
            config.source = ConfigSource::Env;
        }
    }
}

// =============================================================================
// CLI Override Support
// =============================================================================

/// Builder for applying CLI overrides to configuration
///
/// Pass to [`load_config_with`] so validation sees the overrides, or apply
/// to an already loaded configuration.
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    /// Base URL override
    pub base_url: Option<String>,

    /// Member id override
    pub member_id: Option<i64>,

    /// Latitude override
    pub lat: Option<f64>,

    /// Longitude override
    pub lng: Option<f64>,

    /// Terminal placement override
    pub terminal_placement: Option<TerminalPlacement>,
}

impl ConfigOverrides {
    /// Create a new empty set of overrides
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set base URL override
    #[must_use]
    pub fn with_base_url(mut self, url: String) -> Self {
        self.base_url = Some(url);
        self
    }

    /// Set member id override
    #[must_use]
    pub fn with_member_id(mut self, id: i64) -> Self {
        self.member_id = Some(id);
        self
    }

    /// Set location override
    #[must_use]
    pub fn with_location(mut self, lat: f64, lng: f64) -> Self {
        self.lat = Some(lat);
        self.lng = Some(lng);
        self
    }

    /// Set terminal placement override
    #[must_use]
    pub fn with_terminal_placement(mut self, placement: TerminalPlacement) -> Self {
        self.terminal_placement = Some(placement);
        self
    }

    /// Whether any override is set
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.base_url.is_none()
            && self.member_id.is_none()
            && self.lat.is_none()
            && self.lng.is_none()
            && self.terminal_placement.is_none()
    }

    /// Apply overrides to a configuration and re-validate it
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] if the result is invalid.
    pub fn apply(&self, config: &mut ChatConfig) -> Result<(), ConfigError> {
        if !self.is_empty() {
            config.source = ConfigSource::Cli;
        }

        if let Some(ref url) = self.base_url {
            config.base_url.clone_from(url);
        }
        if self.member_id.is_some() {
            config.member_id = self.member_id;
        }
        if self.lat.is_some() {
            config.lat = self.lat;
        }
        if self.lng.is_some() {
            config.lng = self.lng;
        }
        if let Some(placement) = self.terminal_placement {
            config.terminal_placement = placement;
        }

        config.validate()
    }
}

// =============================================================================
// Tests
// =============================================================================
