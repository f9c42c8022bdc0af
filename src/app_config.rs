use anyhow::{Context, Result, anyhow};
use log::{LevelFilter, warn};
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::content::{ContainerStrategy, EngineOptions, FontConfig};
use crate::content::style::{DEFAULT_FONT_FAMILY, DEFAULT_FONT_URL};
use crate::providers::gemini::DEFAULT_ENDPOINT;
use crate::translation::{DEFAULT_MODEL, DEFAULT_TONE};

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// RTL detection settings
    #[serde(default)]
    pub detection: DetectionConfig,

    /// Translation settings
    #[serde(default)]
    pub translation: TranslationConfig,

    /// Bundled font settings
    #[serde(default)]
    pub font: FontSettings,

    /// Settings store file (site lists, tone, API key, custom font)
    #[serde(default = "default_storage_path")]
    pub storage_path: String,
}

/// RTL detection configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DetectionConfig {
    // @field: Which elements receive the RTL marker
    #[serde(default)]
    pub container_strategy: ContainerStrategy,

    // @field: Clear a marker when its text loses all RTL characters
    #[serde(default = "default_true")]
    pub unmark_on_change: bool,

    // @field: Quiet period before a coalesced rescan
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            container_strategy: ContainerStrategy::default(),
            unmark_on_change: true,
            debounce_ms: default_debounce_ms(),
        }
    }
}

/// Translation service configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationConfig {
    /// Generative Language API base URL
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Model used when the settings store has none
    #[serde(default = "default_model")]
    pub model: String,

    /// Tone used when the settings store has none
    #[serde(default = "default_tone")]
    pub tone: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Retry count for transient failures
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,

    /// Backoff base for retries (in milliseconds), doubled on each retry
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Minimum word count for an element to be translated
    #[serde(default = "default_min_words")]
    pub min_words: usize,

    /// Temperature parameter for text generation (0.0 to 2.0)
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model(),
            tone: default_tone(),
            timeout_secs: default_timeout_secs(),
            retry_count: default_retry_count(),
            retry_backoff_ms: default_retry_backoff_ms(),
            min_words: default_min_words(),
            temperature: default_temperature(),
        }
    }
}

/// Bundled font configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct FontSettings {
    // @field: Family name of the bundled font
    #[serde(default = "default_bundled_family")]
    pub bundled_family: String,

    // @field: URL the bundled font is loaded from
    #[serde(default = "default_bundled_url")]
    pub bundled_url: String,
}

impl Default for FontSettings {
    fn default() -> Self {
        Self {
            bundled_family: default_bundled_family(),
            bundled_url: default_bundled_url(),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    // @returns: Matching filter for the log facade
    pub fn to_level_filter(self) -> LevelFilter {
        match self {
            Self::Error => LevelFilter::Error,
            Self::Warn => LevelFilter::Warn,
            Self::Info => LevelFilter::Info,
            Self::Debug => LevelFilter::Debug,
            Self::Trace => LevelFilter::Trace,
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "error" => Ok(Self::Error),
            "warn" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            "trace" => Ok(Self::Trace),
            _ => Err(anyhow!("Invalid log level: {}", s)),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_debounce_ms() -> u64 {
    300
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_tone() -> String {
    DEFAULT_TONE.to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_retry_count() -> u32 {
    2
}

fn default_retry_backoff_ms() -> u64 {
    1000 // 1 second base backoff time, doubled on each retry
}

fn default_min_words() -> usize {
    6
}

fn default_temperature() -> f32 {
    0.3
}

fn default_bundled_family() -> String {
    DEFAULT_FONT_FAMILY.to_string()
}

fn default_bundled_url() -> String {
    DEFAULT_FONT_URL.to_string()
}

fn default_storage_path() -> String {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("dynrtl")
        .join("storage.json")
        .to_string_lossy()
        .to_string()
}

impl Config {
    /// Load the configuration at `path`, writing a default one if missing
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            let file = File::open(path).context(format!("Failed to open config file: {}", path.display()))?;
            let reader = BufReader::new(file);
            let config: Config = serde_json::from_reader(reader)
                .context(format!("Failed to parse config file: {}", path.display()))?;
            return Ok(config);
        }

        warn!("Config file not found at '{}', creating default config.", path.display());
        let config = Config::default();
        let config_json = serde_json::to_string_pretty(&config).context("Failed to serialize default config to JSON")?;
        std::fs::write(path, config_json)
            .context(format!("Failed to write default config to file: {}", path.display()))?;
        Ok(config)
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        let endpoint = Url::parse(&self.translation.endpoint)
            .context(format!("Invalid translation endpoint: {}", self.translation.endpoint))?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(anyhow!("Translation endpoint must use http or https: {}", endpoint));
        }

        if self.translation.model.trim().is_empty() {
            return Err(anyhow!("Translation model must not be empty"));
        }
        if self.translation.tone.trim().is_empty() {
            return Err(anyhow!("Translation tone must not be empty"));
        }
        if self.translation.timeout_secs == 0 {
            return Err(anyhow!("Translation timeout must be at least one second"));
        }
        if self.translation.min_words == 0 {
            return Err(anyhow!("Minimum word count must be at least 1"));
        }
        if !(0.0..=2.0).contains(&self.translation.temperature) {
            return Err(anyhow!(
                "Temperature must be between 0.0 and 2.0, got {}",
                self.translation.temperature
            ));
        }

        if self.font.bundled_family.trim().is_empty() {
            return Err(anyhow!("Bundled font family must not be empty"));
        }
        if self.storage_path.trim().is_empty() {
            return Err(anyhow!("Storage path must not be empty"));
        }

        Ok(())
    }

    // @returns: Engine options from the detection section
    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            strategy: self.detection.container_strategy,
            unmark_on_change: self.detection.unmark_on_change,
            debounce: Duration::from_millis(self.detection.debounce_ms),
        }
    }

    // @returns: Font applied when no custom font is active
    pub fn bundled_font(&self) -> FontConfig {
        FontConfig::bundled(&self.font.bundled_family, &self.font.bundled_url)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.translation.timeout_secs)
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            log_level: LogLevel::default(),
            detection: DetectionConfig::default(),
            translation: TranslationConfig::default(),
            font: FontSettings::default(),
            storage_path: default_storage_path(),
        }
    }
}
