//! Persistent appliance settings (JSON file in the user data directory).

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use voxlamp_core::actuation::lights::WakeChase;
use voxlamp_core::engine::{AssistantConfig, DEFAULT_WAKE_SENSITIVITY};
use voxlamp_core::recognition::params::ENDPOINT_DURATION_RANGE;
use voxlamp_core::recognition::KeywordModel;

pub const ACCESS_KEY_ENV: &str = "VOXLAMP_ACCESS_KEY";
pub const SETTINGS_PATH_ENV: &str = "VOXLAMP_SETTINGS";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct KeywordSetting {
    pub path: PathBuf,
    pub sensitivity: f32,
}

impl Default for KeywordSetting {
    fn default() -> Self {
        Self {
            path: PathBuf::new(),
            sensitivity: DEFAULT_WAKE_SENSITIVITY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct AppSettings {
    pub access_key: String,
    pub keywords: Vec<KeywordSetting>,
    /// `None` uses the built-in lighting context.
    pub context_path: Option<PathBuf>,
    pub intent_sensitivity: f32,
    pub endpoint_duration_secs: f32,
    pub require_endpoint: bool,
    pub preferred_input_device: Option<String>,
    /// Replay a recording instead of opening the microphone.
    pub input_wav: Option<PathBuf>,
    pub wake_chase_step_ms: u64,
    /// Print a JSON line after each console event.
    pub json_events: bool,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            access_key: String::new(),
            keywords: Vec::new(),
            context_path: None,
            intent_sensitivity: 0.5,
            endpoint_duration_secs: 1.0,
            require_endpoint: true,
            preferred_input_device: None,
            input_wav: None,
            wake_chase_step_ms: 30,
            json_events: false,
        }
    }
}

impl AppSettings {
    pub fn normalize(&mut self) {
        let (lo, hi) = ENDPOINT_DURATION_RANGE;
        self.access_key = self.access_key.trim().to_string();
        self.keywords.retain(|k| !k.path.as_os_str().is_empty());
        for keyword in &mut self.keywords {
            keyword.sensitivity = clamp_unit(keyword.sensitivity, DEFAULT_WAKE_SENSITIVITY);
        }
        self.intent_sensitivity = clamp_unit(self.intent_sensitivity, 0.5);
        self.endpoint_duration_secs = if self.endpoint_duration_secs.is_nan() {
            1.0
        } else {
            self.endpoint_duration_secs.clamp(lo, hi)
        };
        self.wake_chase_step_ms = self.wake_chase_step_ms.min(500);
        self.preferred_input_device = self
            .preferred_input_device
            .as_ref()
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());
        self.context_path = self
            .context_path
            .take()
            .filter(|p| !p.as_os_str().is_empty());
        self.input_wav = self.input_wav.take().filter(|p| !p.as_os_str().is_empty());
    }

    /// Environment wins over the file for the credential.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(key) = lookup(ACCESS_KEY_ENV).filter(|k| !k.trim().is_empty()) {
            self.access_key = key.trim().to_string();
        }
    }

    pub fn wake_chase(&self) -> WakeChase {
        WakeChase {
            step: Duration::from_millis(self.wake_chase_step_ms),
            ..WakeChase::default()
        }
    }

    /// Read the keyword and context blobs and build the core configuration.
    pub fn assistant_config(&self) -> anyhow::Result<AssistantConfig> {
        let keywords = self
            .keywords
            .iter()
            .map(|k| {
                let bytes = fs::read(&k.path)
                    .with_context(|| format!("reading keyword model {}", k.path.display()))?;
                Ok(KeywordModel::new(bytes, k.sensitivity))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        let mut config = AssistantConfig {
            access_key: self.access_key.clone(),
            keywords,
            intent_sensitivity: self.intent_sensitivity,
            endpoint_duration_secs: self.endpoint_duration_secs,
            require_endpoint: self.require_endpoint,
            ..AssistantConfig::default()
        };
        if let Some(path) = &self.context_path {
            config.context = fs::read(path)
                .with_context(|| format!("reading context {}", path.display()))?;
        }
        Ok(config)
    }
}

fn clamp_unit(value: f32, fallback: f32) -> f32 {
    if value.is_nan() {
        fallback
    } else {
        value.clamp(0.0, 1.0)
    }
}

pub fn default_settings_path() -> PathBuf {
    settings_path_from(|name| std::env::var_os(name))
}

/// `VOXLAMP_SETTINGS` wins; otherwise the platform's per-user data directory.
fn settings_path_from(lookup: impl Fn(&str) -> Option<OsString>) -> PathBuf {
    if let Some(path) = lookup(SETTINGS_PATH_ENV) {
        return PathBuf::from(path);
    }
    data_dir(&lookup).join("voxlamp").join("settings.json")
}

#[cfg(target_os = "windows")]
fn data_dir(lookup: &impl Fn(&str) -> Option<OsString>) -> PathBuf {
    lookup("APPDATA")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(target_os = "macos")]
fn data_dir(lookup: &impl Fn(&str) -> Option<OsString>) -> PathBuf {
    lookup("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("Library")
        .join("Application Support")
}

#[cfg(not(any(target_os = "windows", target_os = "macos")))]
fn data_dir(lookup: &impl Fn(&str) -> Option<OsString>) -> PathBuf {
    lookup("XDG_DATA_HOME").map(PathBuf::from).unwrap_or_else(|| {
        lookup("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("/tmp"))
            .join(".local")
            .join("share")
    })
}

/// Missing or unreadable files fall back to defaults; a missing file is
/// created so there is something to edit.
pub fn load_settings(path: &Path) -> AppSettings {
    let mut settings = match fs::read_to_string(path) {
        Ok(raw) => match serde_json::from_str::<AppSettings>(&raw) {
            Ok(settings) => settings,
            Err(e) => {
                warn!(path = %path.display(), "invalid settings file, using defaults: {e}");
                AppSettings::default()
            }
        },
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            let defaults = AppSettings::default();
            match save_settings(path, &defaults) {
                Ok(()) => info!(path = %path.display(), "wrote default settings"),
                Err(e) => warn!(path = %path.display(), "could not write default settings: {e}"),
            }
            defaults
        }
        Err(e) => {
            warn!(path = %path.display(), "unreadable settings file, using defaults: {e}");
            AppSettings::default()
        }
    };
    settings.normalize();
    settings
}

pub fn save_settings(path: &Path, settings: &AppSettings) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(settings).map_err(std::io::Error::other)?;
    fs::write(path, json)
}
