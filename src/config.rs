//! Configuration loading for Octavia.
#![allow(dead_code)]

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::Error;
pub type Result<T> = std::result::Result<T, Error>;

/// Get the Octavia home directory (~/.octavia).
pub fn get_home_dir() -> Result<PathBuf> {
    let home = directories::UserDirs::new()
        .ok_or_else(|| Error::Config("Could not determine home directory".to_string()))?;

    Ok(home.home_dir().join(".octavia"))
}

/// Get the settings file path.
pub fn get_settings_path() -> Result<PathBuf> {
    Ok(get_home_dir()?.join("settings.json"))
}

/// Load settings from ~/.octavia/settings.json
pub fn load_settings() -> Result<Settings> {
    let path = get_settings_path()?;

    if !path.exists() {
        return Err(Error::Config(format!(
            "Settings file not found at {}. Run 'octavia setup' first.",
            path.display()
        )));
    }

    let content = std::fs::read_to_string(&path)?;
    let settings: Settings = serde_json::from_str(&content)?;

    tracing::debug!("Loaded settings from {}", path.display());
    Ok(settings)
}

/// Load settings or return defaults if no file exists.
///
/// Every credential can also arrive through the environment, so a missing
/// settings file is not an error here.
pub fn load_settings_or_default() -> Settings {
    load_settings().unwrap_or_else(|e| {
        tracing::debug!("Settings not loaded ({}), using defaults", e);
        Settings::default()
    })
}

/// Write a settings skeleton for `octavia setup`.
pub fn write_settings_skeleton() -> Result<PathBuf> {
    let path = get_settings_path()?;
    if path.exists() {
        return Ok(path);
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = serde_json::to_string_pretty(&Settings::default())?;
    std::fs::write(&path, content)?;
    Ok(path)
}

/// Inference provider configuration.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    #[serde(default = "default_gemini_model")]
    pub model: String,
}

fn default_gemini_model() -> String {
    "gemini-2.0-flash".to_string()
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_gemini_model(),
        }
    }
}

/// Deployment platform configuration.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct VercelConfig {
    pub token: Option<String>,
    #[serde(default = "default_deploy_limit")]
    pub deploy_limit: usize,
}

fn default_deploy_limit() -> usize {
    3
}

impl Default for VercelConfig {
    fn default() -> Self {
        Self {
            token: None,
            deploy_limit: default_deploy_limit(),
        }
    }
}

/// Backing store (Google Sheets) configuration.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct SheetsConfig {
    pub spreadsheet_id: Option<String>,
    pub service_account_file: Option<PathBuf>,
}

/// Audio upload polling bounds.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct AudioConfig {
    #[serde(default = "default_max_poll_attempts")]
    pub max_poll_attempts: u32,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

fn default_max_poll_attempts() -> u32 {
    40
}

fn default_poll_interval_ms() -> u64 {
    500
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            max_poll_attempts: default_max_poll_attempts(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

/// Octavia settings.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct Settings {
    #[serde(default)]
    pub gemini: GeminiConfig,

    #[serde(default)]
    pub vercel: VercelConfig,

    #[serde(default)]
    pub sheets: SheetsConfig,

    #[serde(default)]
    pub audio: AudioConfig,
}

impl Settings {
    /// Inference API key. Required for chat; absence is fatal at startup.
    pub fn gemini_api_key(&self) -> Option<String> {
        std::env::var("GEMINI_API_KEY")
            .ok()
            .filter(|k| !k.is_empty())
            .or_else(|| self.gemini.api_key.clone())
    }

    /// Deployment API token. Optional; absence degrades the feature.
    pub fn vercel_token(&self) -> Option<String> {
        std::env::var("VERCEL_TOKEN")
            .ok()
            .filter(|t| !t.is_empty())
            .or_else(|| self.vercel.token.clone())
    }

    /// Spreadsheet id of the backing store. Optional; absence degrades.
    pub fn spreadsheet_id(&self) -> Option<String> {
        std::env::var("OCTAVIA_SHEET_ID")
            .ok()
            .filter(|s| !s.is_empty())
            .or_else(|| self.sheets.spreadsheet_id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings_roundtrip() {
        let settings = Settings::default();
        let json = serde_json::to_string(&settings).unwrap();
        let back: Settings = serde_json::from_str(&json).unwrap();
        assert_eq!(back.gemini.model, "gemini-2.0-flash");
        assert_eq!(back.vercel.deploy_limit, 3);
        assert_eq!(back.audio.max_poll_attempts, 40);
        assert_eq!(back.audio.poll_interval_ms, 500);
    }

    #[test]
    fn test_partial_settings_fill_defaults() {
        let settings: Settings =
            serde_json::from_str(r#"{"gemini": {"api_key": "k"}}"#).unwrap();
        assert_eq!(settings.gemini.api_key.as_deref(), Some("k"));
        assert_eq!(settings.gemini.model, "gemini-2.0-flash");
        assert!(settings.sheets.spreadsheet_id.is_none());
    }
}
