/*!
 * Persistent settings.
 *
 * Settings live in two key/value areas. The `sync` area holds preferences
 * that follow the user (site lists, tone, model); the `local` area holds
 * machine-local data (API key, uploaded font). Values are JSON.
 */

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use log::{debug, info};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::content::FontConfig;
use crate::errors::SettingsError;
use crate::site_policy::SitePolicy;
use crate::translation::{DEFAULT_MODEL, DEFAULT_TONE};

// Sync area keys
pub const KEY_DISABLED_SITES: &str = "disabledSites";
pub const KEY_ENABLED_SITES: &str = "enabledSites";
pub const KEY_DEFAULT_ENABLED: &str = "defaultEnabled";
pub const KEY_TRANSLATION_TONE: &str = "translationTone";
pub const KEY_TRANSLATION_MODEL: &str = "translationModel";

// Local area keys
pub const KEY_USE_CUSTOM_FONT: &str = "useCustomFont";
pub const KEY_CUSTOM_FONT_DATA: &str = "customFontData";
pub const KEY_CUSTOM_FONT_NAME: &str = "customFontName";
pub const KEY_CUSTOM_FONT_FAMILY: &str = "customFontFamily";
pub const KEY_GEMINI_API_KEY: &str = "geminiApiKey";

/// Largest accepted font upload
pub const MAX_FONT_BYTES: usize = 5 * 1024 * 1024;

/// Family name used when none can be derived from the file name
pub const FALLBACK_FONT_FAMILY: &str = "Custom Font";

/// Which storage area a key belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageArea {
    Sync,
    Local,
}

/// Key/value storage split into areas
pub trait KeyValueStore: Send + Sync {
    fn get(&self, area: StorageArea, key: &str) -> Result<Option<Value>, SettingsError>;

    fn set(&self, area: StorageArea, key: &str, value: Value) -> Result<(), SettingsError>;

    fn remove(&self, area: StorageArea, key: &str) -> Result<(), SettingsError>;
}

/// Contents of both areas
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoreData {
    #[serde(default)]
    sync: HashMap<String, Value>,
    #[serde(default)]
    local: HashMap<String, Value>,
}

impl StoreData {
    fn area(&self, area: StorageArea) -> &HashMap<String, Value> {
        match area {
            StorageArea::Sync => &self.sync,
            StorageArea::Local => &self.local,
        }
    }

    fn area_mut(&mut self, area: StorageArea) -> &mut HashMap<String, Value> {
        match area {
            StorageArea::Sync => &mut self.sync,
            StorageArea::Local => &mut self.local,
        }
    }
}

/// In-memory store
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: Mutex<StoreData>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, area: StorageArea, key: &str) -> Result<Option<Value>, SettingsError> {
        Ok(self.data.lock().area(area).get(key).cloned())
    }

    fn set(&self, area: StorageArea, key: &str, value: Value) -> Result<(), SettingsError> {
        self.data.lock().area_mut(area).insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, area: StorageArea, key: &str) -> Result<(), SettingsError> {
        self.data.lock().area_mut(area).remove(key);
        Ok(())
    }
}

/// Store backed by a single JSON file, rewritten on every change
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    data: Mutex<StoreData>,
}

impl JsonFileStore {
    /// Open the store at `path`; a missing file starts empty
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref().to_path_buf();
        let data = if path.exists() {
            let content = fs::read_to_string(&path)?;
            if content.trim().is_empty() {
                StoreData::default()
            } else {
                serde_json::from_str(&content)?
            }
        } else {
            StoreData::default()
        };
        debug!("Opened settings store at {}", path.display());
        Ok(Self {
            path,
            data: Mutex::new(data),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, data: &StoreData) -> Result<(), SettingsError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let content = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, content)?;
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, area: StorageArea, key: &str) -> Result<Option<Value>, SettingsError> {
        Ok(self.data.lock().area(area).get(key).cloned())
    }

    fn set(&self, area: StorageArea, key: &str, value: Value) -> Result<(), SettingsError> {
        let mut data = self.data.lock();
        data.area_mut(area).insert(key.to_string(), value);
        self.persist(&data)
    }

    fn remove(&self, area: StorageArea, key: &str) -> Result<(), SettingsError> {
        let mut data = self.data.lock();
        if data.area_mut(area).remove(key).is_some() {
            self.persist(&data)?;
        }
        Ok(())
    }
}

/// A validated custom font upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontUpload {
    pub file_name: String,
    pub family: String,
    pub data_uri: String,
}

impl FontUpload {
    /// Validate and encode an uploaded font file. Only TrueType files up to
    /// `MAX_FONT_BYTES` are accepted.
    pub fn from_file(file_name: &str, bytes: &[u8]) -> Result<Self, SettingsError> {
        if !file_name.to_ascii_lowercase().ends_with(".ttf") {
            return Err(SettingsError::InvalidFont(format!(
                "only .ttf files are supported: {}",
                file_name
            )));
        }
        if bytes.is_empty() {
            return Err(SettingsError::InvalidFont(format!("{} is empty", file_name)));
        }
        if bytes.len() > MAX_FONT_BYTES {
            return Err(SettingsError::InvalidFont(format!(
                "{} is {} bytes, the limit is {} bytes",
                file_name,
                bytes.len(),
                MAX_FONT_BYTES
            )));
        }

        Ok(Self {
            file_name: file_name.to_string(),
            family: derive_family_name(file_name),
            data_uri: format!("data:font/ttf;base64,{}", STANDARD.encode(bytes)),
        })
    }
}

static FONT_EXTENSION: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\.(ttf|otf)$").expect("valid extension pattern"));
static BRACKETED: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[.*?\]").expect("valid bracket pattern"));
static SEPARATORS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[_-]+").expect("valid separator pattern"));
static DISALLOWED: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-zA-Z0-9\s-]").expect("valid charset pattern"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid whitespace pattern"));

/// CSS family name for an uploaded file, e.g. `vazir-bold[wght].ttf` becomes
/// `Vazir Bold`
pub fn derive_family_name(file_name: &str) -> String {
    let name = FONT_EXTENSION.replace(file_name, "");
    let name = BRACKETED.replace_all(&name, "");
    let name = SEPARATORS.replace_all(&name, " ");
    let name = DISALLOWED.replace_all(&name, "");
    let name = WHITESPACE.replace_all(name.trim(), " ");

    let family = name
        .split(' ')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ");

    if family.is_empty() {
        FALLBACK_FONT_FAMILY.to_string()
    } else {
        family
    }
}

/// Typed view over a key/value store
#[derive(Clone)]
pub struct Settings {
    store: Arc<dyn KeyValueStore>,
    bundled_font: FontConfig,
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("bundled_font", &self.bundled_font.family)
            .finish_non_exhaustive()
    }
}

impl Settings {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            bundled_font: FontConfig::default(),
        }
    }

    /// Font used when no custom font is active
    pub fn with_bundled_font(mut self, font: FontConfig) -> Self {
        self.bundled_font = font;
        self
    }

    /// Settings over a fresh in-memory store
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// Settings persisted to a JSON file
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        Ok(Self::new(Arc::new(JsonFileStore::open(path)?)))
    }

    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    fn get_string(&self, area: StorageArea, key: &str) -> Result<Option<String>, SettingsError> {
        Ok(self
            .store
            .get(area, key)?
            .and_then(|value| value.as_str().map(str::to_string))
            .filter(|value| !value.trim().is_empty()))
    }

    fn get_list(&self, key: &str) -> Result<Vec<String>, SettingsError> {
        Ok(match self.store.get(StorageArea::Sync, key)? {
            Some(value) => serde_json::from_value(value).unwrap_or_default(),
            None => Vec::new(),
        })
    }

    /// Write missing site-policy keys with their defaults
    pub fn initialize_defaults(&self) -> Result<(), SettingsError> {
        if self.store.get(StorageArea::Sync, KEY_DISABLED_SITES)?.is_none() {
            self.store.set(StorageArea::Sync, KEY_DISABLED_SITES, Value::Array(Vec::new()))?;
        }
        if self.store.get(StorageArea::Sync, KEY_ENABLED_SITES)?.is_none() {
            self.store.set(StorageArea::Sync, KEY_ENABLED_SITES, Value::Array(Vec::new()))?;
        }
        if self.store.get(StorageArea::Sync, KEY_DEFAULT_ENABLED)?.is_none() {
            self.store.set(StorageArea::Sync, KEY_DEFAULT_ENABLED, Value::Bool(true))?;
        }
        Ok(())
    }

    pub fn site_policy(&self) -> Result<SitePolicy, SettingsError> {
        let default_enabled = self
            .store
            .get(StorageArea::Sync, KEY_DEFAULT_ENABLED)?
            .and_then(|value| value.as_bool())
            .unwrap_or(true);
        Ok(SitePolicy {
            default_enabled,
            disabled_sites: self.get_list(KEY_DISABLED_SITES)?,
            enabled_sites: self.get_list(KEY_ENABLED_SITES)?,
        })
    }

    pub fn save_site_policy(&self, policy: &SitePolicy) -> Result<(), SettingsError> {
        self.store
            .set(StorageArea::Sync, KEY_DEFAULT_ENABLED, Value::Bool(policy.default_enabled))?;
        self.store
            .set(StorageArea::Sync, KEY_DISABLED_SITES, serde_json::to_value(&policy.disabled_sites)?)?;
        self.store
            .set(StorageArea::Sync, KEY_ENABLED_SITES, serde_json::to_value(&policy.enabled_sites)?)?;
        Ok(())
    }

    /// Translation tone, defaulting to formal Persian
    pub fn tone(&self) -> Result<String, SettingsError> {
        Ok(self
            .get_string(StorageArea::Sync, KEY_TRANSLATION_TONE)?
            .unwrap_or_else(|| DEFAULT_TONE.to_string()))
    }

    pub fn set_tone(&self, tone: &str) -> Result<(), SettingsError> {
        self.store
            .set(StorageArea::Sync, KEY_TRANSLATION_TONE, Value::String(tone.trim().to_string()))
    }

    pub fn model(&self) -> Result<String, SettingsError> {
        Ok(self
            .get_string(StorageArea::Sync, KEY_TRANSLATION_MODEL)?
            .unwrap_or_else(|| DEFAULT_MODEL.to_string()))
    }

    pub fn set_model(&self, model: &str) -> Result<(), SettingsError> {
        self.store
            .set(StorageArea::Sync, KEY_TRANSLATION_MODEL, Value::String(model.trim().to_string()))
    }

    pub fn api_key(&self) -> Result<Option<String>, SettingsError> {
        self.get_string(StorageArea::Local, KEY_GEMINI_API_KEY)
    }

    /// Store the API key; a blank key removes it
    pub fn set_api_key(&self, api_key: &str) -> Result<(), SettingsError> {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            info!("Removing stored API key");
            self.store.remove(StorageArea::Local, KEY_GEMINI_API_KEY)
        } else {
            self.store
                .set(StorageArea::Local, KEY_GEMINI_API_KEY, Value::String(api_key.to_string()))
        }
    }

    /// Font to apply; the bundled font unless a custom one is enabled and stored
    pub fn font_config(&self) -> Result<FontConfig, SettingsError> {
        let use_custom = self
            .store
            .get(StorageArea::Local, KEY_USE_CUSTOM_FONT)?
            .and_then(|value| value.as_bool())
            .unwrap_or(false);
        if !use_custom {
            return Ok(self.bundled_font.clone());
        }

        let data = self.get_string(StorageArea::Local, KEY_CUSTOM_FONT_DATA)?;
        let family = self.get_string(StorageArea::Local, KEY_CUSTOM_FONT_FAMILY)?;
        Ok(match (family, data) {
            (Some(family), Some(data)) => FontConfig::embedded(&family, &data),
            _ => self.bundled_font.clone(),
        })
    }

    pub fn custom_font_name(&self) -> Result<Option<String>, SettingsError> {
        self.get_string(StorageArea::Local, KEY_CUSTOM_FONT_NAME)
    }

    /// Store an uploaded font and switch to it
    pub fn set_custom_font(&self, upload: &FontUpload) -> Result<(), SettingsError> {
        self.store
            .set(StorageArea::Local, KEY_CUSTOM_FONT_DATA, Value::String(upload.data_uri.clone()))?;
        self.store
            .set(StorageArea::Local, KEY_CUSTOM_FONT_NAME, Value::String(upload.file_name.clone()))?;
        self.store
            .set(StorageArea::Local, KEY_CUSTOM_FONT_FAMILY, Value::String(upload.family.clone()))?;
        self.store.set(StorageArea::Local, KEY_USE_CUSTOM_FONT, Value::Bool(true))?;
        info!("Stored custom font {} as '{}'", upload.file_name, upload.family);
        Ok(())
    }

    /// Switch between the stored custom font and the bundled one
    pub fn set_use_custom_font(&self, enabled: bool) -> Result<(), SettingsError> {
        self.store.set(StorageArea::Local, KEY_USE_CUSTOM_FONT, Value::Bool(enabled))
    }

    /// Drop the stored custom font and revert to the bundled one
    pub fn clear_custom_font(&self) -> Result<(), SettingsError> {
        self.store.remove(StorageArea::Local, KEY_CUSTOM_FONT_DATA)?;
        self.store.remove(StorageArea::Local, KEY_CUSTOM_FONT_NAME)?;
        self.store.remove(StorageArea::Local, KEY_CUSTOM_FONT_FAMILY)?;
        self.store.set(StorageArea::Local, KEY_USE_CUSTOM_FONT, Value::Bool(false))
    }
}
