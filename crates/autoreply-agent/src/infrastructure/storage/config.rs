//! TOML-based configuration persistence for the agent.
//!
//! Reads and writes `AppConfig` to the platform-appropriate config file:
//! - Windows:  `%APPDATA%\ChatAutoReply\config.toml`
//! - Linux:    `~/.config/chat-autoreply/config.toml`
//! - macOS:    `~/Library/Application Support/ChatAutoReply/config.toml`
//!
//! Setting `AUTOREPLY_CONFIG` to a file path overrides the location.
//!
//! ```toml
//! [chat]
//! window_title = "Kim Minsu"
//! display_name = "Minji"
//! select_all = "Ctrl+A"
//!
//! [injection]
//! settle = "acknowledge"
//! ack_timeout_ms = 250
//!
//! [generation]
//! model = "gpt-3.5-turbo"
//! temperature = 0.4
//! ```
//!
//! Every field carries a `#[serde(default = ...)]`, so a missing file, a
//! missing section, or a missing key all fall back to the built-in defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use autoreply_core::{KeyChord, VirtualKey};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::chat_window::DriverSettings;
use crate::application::compose_reply::{GenerationOptions, ReplyPrompt};
use crate::application::settle::SettleStrategy;

/// Environment variable that points at an explicit config file.
pub const CONFIG_PATH_ENV: &str = "AUTOREPLY_CONFIG";

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level configuration stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    /// `tracing` filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub injection: InjectionConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
}

/// Which chat window to drive and how.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatConfig {
    /// Exact title of the chat window.  Must be set before running.
    #[serde(default)]
    pub window_title: String,
    /// The local user's name as it appears in the transcript.
    #[serde(default)]
    pub display_name: String,
    /// Language replies should be written in.
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_transcript_class")]
    pub transcript_control_class: String,
    #[serde(default = "default_input_class")]
    pub input_control_class: String,
    #[serde(default = "default_select_all")]
    pub select_all: KeyChord,
    #[serde(default = "default_copy")]
    pub copy: KeyChord,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SettleMode {
    Fixed,
    Acknowledge,
}

/// Timing of the chord sequence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InjectionConfig {
    #[serde(default = "default_settle_mode")]
    pub settle: SettleMode,
    /// Pause between chord steps in `fixed` mode.
    #[serde(default = "default_step_delay_ms")]
    pub step_delay_ms: u64,
    /// Upper bound on each acknowledgement wait in `acknowledge` mode.
    #[serde(default = "default_ack_timeout_ms")]
    pub ack_timeout_ms: u64,
    /// Pause between select-all and copy.
    #[serde(default = "default_select_settle_ms")]
    pub select_settle_ms: u64,
}

/// Text generation backend and sampling parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerationConfig {
    /// Base URL of an OpenAI-compatible API.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Name of the environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_candidates")]
    pub candidates: u32,
    #[serde(default)]
    pub stop: Vec<String>,
    #[serde(default = "default_penalty")]
    pub presence_penalty: f64,
    #[serde(default = "default_penalty")]
    pub frequency_penalty: f64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_log_level() -> String {
    "info".to_string()
}
fn default_language() -> String {
    "korean".to_string()
}
fn default_transcript_class() -> String {
    DriverSettings::default().transcript_class
}
fn default_input_class() -> String {
    DriverSettings::default().input_class
}
fn default_select_all() -> KeyChord {
    KeyChord::ctrl(VirtualKey(b'A'))
}
fn default_copy() -> KeyChord {
    KeyChord::ctrl(VirtualKey(b'C'))
}
fn default_settle_mode() -> SettleMode {
    SettleMode::Fixed
}
fn default_step_delay_ms() -> u64 {
    10
}
fn default_ack_timeout_ms() -> u64 {
    250
}
fn default_select_settle_ms() -> u64 {
    1000
}
fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}
fn default_model() -> String {
    GenerationOptions::default().model
}
fn default_system_prompt() -> String {
    GenerationOptions::default().system_prompt
}
fn default_temperature() -> f64 {
    0.4
}
fn default_max_tokens() -> u32 {
    128
}
fn default_candidates() -> u32 {
    1
}
fn default_penalty() -> f64 {
    0.1
}
fn default_timeout_secs() -> u64 {
    60
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            chat: ChatConfig::default(),
            injection: InjectionConfig::default(),
            generation: GenerationConfig::default(),
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            window_title: String::new(),
            display_name: String::new(),
            language: default_language(),
            transcript_control_class: default_transcript_class(),
            input_control_class: default_input_class(),
            select_all: default_select_all(),
            copy: default_copy(),
        }
    }
}

impl Default for InjectionConfig {
    fn default() -> Self {
        Self {
            settle: default_settle_mode(),
            step_delay_ms: default_step_delay_ms(),
            ack_timeout_ms: default_ack_timeout_ms(),
            select_settle_ms: default_select_settle_ms(),
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key_env: default_api_key_env(),
            model: default_model(),
            system_prompt: default_system_prompt(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            candidates: default_candidates(),
            stop: Vec::new(),
            presence_penalty: default_penalty(),
            frequency_penalty: default_penalty(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

// ── Conversions into application settings ─────────────────────────────────────

impl AppConfig {
    pub fn driver_settings(&self) -> DriverSettings {
        DriverSettings {
            transcript_class: self.chat.transcript_control_class.clone(),
            input_class: self.chat.input_control_class.clone(),
            select_all: self.chat.select_all.clone(),
            copy: self.chat.copy.clone(),
            select_settle: Duration::from_millis(self.injection.select_settle_ms),
        }
    }

    pub fn reply_prompt(&self) -> ReplyPrompt {
        ReplyPrompt::new(&self.chat.display_name, &self.chat.language)
    }
}

impl InjectionConfig {
    pub fn settle_strategy(&self) -> SettleStrategy {
        match self.settle {
            SettleMode::Fixed => SettleStrategy::Fixed(Duration::from_millis(self.step_delay_ms)),
            SettleMode::Acknowledge => SettleStrategy::Acknowledge {
                timeout: Duration::from_millis(self.ack_timeout_ms),
            },
        }
    }
}

impl GenerationConfig {
    pub fn options(&self) -> GenerationOptions {
        GenerationOptions {
            model: self.model.clone(),
            system_prompt: self.system_prompt.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            candidates: self.candidates,
            stop: self.stop.clone(),
            presence_penalty: self.presence_penalty,
            frequency_penalty: self.frequency_penalty,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Resolves the full path to the config file, honouring [`CONFIG_PATH_ENV`].
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] if no override is set and the
/// base directory cannot be determined.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    if let Some(path) = std::env::var_os(CONFIG_PATH_ENV) {
        return Ok(PathBuf::from(path));
    }
    Ok(platform_config_dir()
        .ok_or(ConfigError::NoPlatformConfigDir)?
        .join("config.toml"))
}

/// Loads `AppConfig` from the default location.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from(&config_file_path()?)
}

/// Loads `AppConfig` from `path`, returning `AppConfig::default()` if the
/// file does not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config_from(path: &Path) -> Result<AppConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(AppConfig::default()),
        Err(e) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Writes `AppConfig::default()` to `path` unless a file is already there.
///
/// Returns `true` if the file was created.  An existing file is never
/// touched, even when it fails to parse.
pub fn write_default_config_if_missing(path: &Path) -> Result<bool, ConfigError> {
    if path.exists() {
        return Ok(false);
    }
    save_config_to(path, &AppConfig::default())?;
    Ok(true)
}

/// Writes `config` to `path`, creating parent directories as needed.
pub fn save_config_to(path: &Path, config: &AppConfig) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("ChatAutoReply"))
    }

    #[cfg(target_os = "linux")]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("chat-autoreply"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("ChatAutoReply")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
