use std::{fmt, fs, path::Path};

use anyhow::Context;
use serde::Deserialize;
use tracing::warn;

pub const DEFAULT_CONFIG_FILE: &str = "get_me_out.toml";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_API_BASE_URL: &str = "https://generativelanguage.googleapis.com";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplingSettings {
    pub temperature: f32,
    pub top_k: u32,
    pub top_p: f32,
}

impl Default for SamplingSettings {
    fn default() -> Self {
        Self {
            temperature: 0.9,
            top_k: 50,
            top_p: 0.95,
        }
    }
}

#[derive(Clone, PartialEq)]
pub struct Settings {
    pub api_key: Option<String>,
    pub model: String,
    pub api_base_url: String,
    pub sampling: SamplingSettings,
    pub intro_enabled: bool,
    pub sound_enabled: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.into(),
            api_base_url: DEFAULT_API_BASE_URL.into(),
            sampling: SamplingSettings::default(),
            intro_enabled: true,
            sound_enabled: true,
        }
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("api_base_url", &self.api_base_url)
            .field("sampling", &self.sampling)
            .field("intro_enabled", &self.intro_enabled)
            .field("sound_enabled", &self.sound_enabled)
            .finish()
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    api_key: Option<String>,
    model: Option<String>,
    api_base_url: Option<String>,
    temperature: Option<f32>,
    top_k: Option<u32>,
    top_p: Option<f32>,
    intro: Option<bool>,
    sound: Option<bool>,
}

/// Defaults, then `get_me_out.toml` in the working directory if present, then
/// the process environment. A broken default file is logged and skipped.
pub fn load_settings() -> Settings {
    load_with_default_file(Path::new(DEFAULT_CONFIG_FILE), |key| {
        std::env::var(key).ok()
    })
}

/// Like [`load_settings`], but the named file must exist and parse.
pub fn load_settings_from(path: &Path) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();
    apply_file(&mut settings, read_file_settings(path)?);
    Ok(apply_env(settings, |key| std::env::var(key).ok()))
}

fn load_with_default_file(path: &Path, lookup: impl Fn(&str) -> Option<String>) -> Settings {
    let mut settings = Settings::default();
    if path.exists() {
        match read_file_settings(path) {
            Ok(file_cfg) => apply_file(&mut settings, file_cfg),
            Err(err) => warn!("ignoring settings file: {err:#}"),
        }
    }
    apply_env(settings, lookup)
}

fn read_file_settings(path: &Path) -> anyhow::Result<FileSettings> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read settings file '{}'", path.display()))?;
    toml::from_str::<FileSettings>(&raw)
        .with_context(|| format!("failed to parse settings file '{}'", path.display()))
}

fn apply_file(settings: &mut Settings, file_cfg: FileSettings) {
    if let Some(v) = file_cfg.api_key {
        settings.api_key = normalize_api_key(v);
    }
    if let Some(v) = file_cfg.model {
        settings.model = v;
    }
    if let Some(v) = file_cfg.api_base_url {
        settings.api_base_url = v;
    }
    if let Some(v) = file_cfg.temperature {
        settings.sampling.temperature = v;
    }
    if let Some(v) = file_cfg.top_k {
        settings.sampling.top_k = v;
    }
    if let Some(v) = file_cfg.top_p {
        settings.sampling.top_p = v;
    }
    if let Some(v) = file_cfg.intro {
        settings.intro_enabled = v;
    }
    if let Some(v) = file_cfg.sound {
        settings.sound_enabled = v;
    }
}

/// Applies environment overrides read through `lookup`. Later non-blank keys win.
pub fn apply_env(mut settings: Settings, lookup: impl Fn(&str) -> Option<String>) -> Settings {
    for key in ["API_KEY", "GEMINI_API_KEY", "APP__API_KEY"] {
        if let Some(v) = lookup(key).and_then(normalize_api_key) {
            settings.api_key = Some(v);
        }
    }

    if let Some(v) = lookup("APP__MODEL") {
        settings.model = v;
    }
    if let Some(v) = lookup("APP__API_BASE_URL") {
        settings.api_base_url = v;
    }

    if let Some(v) = lookup("APP__TEMPERATURE") {
        match v.parse::<f32>() {
            Ok(parsed) => settings.sampling.temperature = parsed,
            Err(_) => warn!(value = %v, "ignoring invalid APP__TEMPERATURE"),
        }
    }
    if let Some(v) = lookup("APP__TOP_K") {
        match v.parse::<u32>() {
            Ok(parsed) => settings.sampling.top_k = parsed,
            Err(_) => warn!(value = %v, "ignoring invalid APP__TOP_K"),
        }
    }
    if let Some(v) = lookup("APP__TOP_P") {
        match v.parse::<f32>() {
            Ok(parsed) => settings.sampling.top_p = parsed,
            Err(_) => warn!(value = %v, "ignoring invalid APP__TOP_P"),
        }
    }

    settings
}

fn normalize_api_key(raw: String) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
