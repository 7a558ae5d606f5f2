//! Configuration and settings management
//!
//! Loads settings from config files and environment variables and defines
//! the tunable constants of the bot.

use crate::dispatch::ActionKind;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// Application settings loaded from environment variables
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Telegram Bot API token
    pub telegram_token: String,

    /// Telegram user ID of the owner, the only sender allowed to control the bot
    pub owner_id: i64,
    /// Chat that receives captured photos (defaults to the owner's private chat)
    pub owner_chat_id: Option<i64>,

    /// BCM number of the PIR sensor output pin
    #[serde(default = "default_pir_pin")]
    pub pir_pin: u8,
    /// Seconds between two motion checks
    #[serde(default = "default_detection_period_secs")]
    pub detection_period_secs: u64,

    /// Still-capture program
    #[serde(default = "default_camera_command")]
    pub camera_command: String,
    /// Transient photo file, overwritten by every capture
    #[serde(default = "default_photo_path")]
    pub photo_path: PathBuf,
    /// Flip the image vertically
    #[serde(default = "default_true")]
    pub camera_vflip: bool,
    /// Flip the image horizontally
    #[serde(default = "default_true")]
    pub camera_hflip: bool,
    /// Exposure settle time handed to the camera program
    #[serde(default = "default_camera_warmup_ms")]
    pub camera_warmup_ms: u64,

    /// Check the owner on text commands
    #[serde(default = "default_true")]
    pub require_owner_commands: bool,
    /// Check the owner on menu button callbacks
    #[serde(default = "default_true")]
    pub require_owner_callbacks: bool,
    /// Replacement command table (command name -> action)
    pub commands: Option<HashMap<String, ActionKind>>,
    /// Replacement callback table (menu token -> action)
    pub callbacks: Option<HashMap<String, ActionKind>>,

    /// Proxy URL for the Bot API client
    pub proxy_url: Option<String>,

    /// Verbose logging
    #[serde(default)]
    pub debug_mode: bool,
}

const fn default_pir_pin() -> u8 {
    DEFAULT_PIR_PIN
}

const fn default_detection_period_secs() -> u64 {
    DETECTION_PERIOD_SECS
}

fn default_camera_command() -> String {
    "rpicam-still".to_string()
}

fn default_photo_path() -> PathBuf {
    PathBuf::from("media/tmp_photo.jpg")
}

const fn default_camera_warmup_ms() -> u64 {
    1000
}

const fn default_true() -> bool {
    true
}

/// Build the layered configuration source.
///
/// # Errors
///
/// Returns a `ConfigError` if a present source cannot be read.
pub fn build_config() -> Result<Config, ConfigError> {
    let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

    Config::builder()
        .add_source(File::with_name("config/default").required(false))
        .add_source(File::with_name(&format!("config/{run_mode}")).required(false))
        // Local overrides, not checked into git
        .add_source(File::with_name("config/local").required(false))
        // Eg.. `APP__PIR_PIN=27 ./target/app` would set the `pir_pin` key
        .add_source(Environment::with_prefix("APP").separator("__"))
        // Plain UPPER_SNAKE_CASE variables, empty ones treated as unset
        .add_source(Environment::default().ignore_empty(true))
        .build()
}

impl Settings {
    /// Create new settings by loading from environment and files
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use home_guard_bot::config::Settings;
    ///
    /// let settings = Settings::new().expect("Failed to load configuration");
    /// ```
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if loading fails or a required key is missing.
    pub fn new() -> Result<Self, ConfigError> {
        build_config()?.try_deserialize()
    }

    /// Chat that receives photos
    #[must_use]
    pub fn photo_chat_id(&self) -> i64 {
        self.owner_chat_id.unwrap_or(self.owner_id)
    }

    /// Period of the motion check, never shorter than one second
    #[must_use]
    pub fn detection_period(&self) -> Duration {
        Duration::from_secs(self.detection_period_secs.max(1))
    }
}

/// Default BCM pin for the PIR sensor
pub const DEFAULT_PIR_PIN: u8 = 17;
/// Default seconds between motion checks
pub const DETECTION_PERIOD_SECS: u64 = 5;

/// Cooldown period (seconds) between "Access Denied" messages for same user.
/// Default: zero, every denied attempt gets its rejection message.
pub const UNAUTHORIZED_COOLDOWN_SECS: u64 = 0;
/// Maximum cache capacity (number of entries).
pub const UNAUTHORIZED_CACHE_MAX_SIZE: u64 = 10_000;

/// Get unauthorized cooldown from env or default.
///
/// Environment variable: `UNAUTHORIZED_COOLDOWN_SECS`.
#[must_use]
pub fn get_unauthorized_cooldown() -> u64 {
    std::env::var("UNAUTHORIZED_COOLDOWN_SECS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(UNAUTHORIZED_COOLDOWN_SECS)
}

/// Get unauthorized cache max size from env or default.
///
/// Environment variable: `UNAUTHORIZED_CACHE_MAX_SIZE`.
#[must_use]
pub fn get_unauthorized_cache_max_size() -> u64 {
    std::env::var("UNAUTHORIZED_CACHE_MAX_SIZE")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(UNAUTHORIZED_CACHE_MAX_SIZE)
}

#[cfg(test)]
pub(crate) fn test_settings() -> Settings {
    Settings {
        telegram_token: "dummy".to_string(),
        owner_id: 42,
        owner_chat_id: None,
        pir_pin: DEFAULT_PIR_PIN,
        detection_period_secs: DETECTION_PERIOD_SECS,
        camera_command: default_camera_command(),
        photo_path: default_photo_path(),
        camera_vflip: true,
        camera_hflip: true,
        camera_warmup_ms: default_camera_warmup_ms(),
        require_owner_commands: true,
        require_owner_callbacks: true,
        commands: None,
        callbacks: None,
        proxy_url: None,
        debug_mode: false,
    }
}
