use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::form::ChannelInput;

pub const DEFAULT_MODEL: &str = "gemini-3-flash-preview";
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Gemini API key (GEMINI_API_KEY takes precedence)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Base URL of the generative language API
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Connect timeout; the stream itself is not bounded
    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,

    /// Desktop notification when a strategy finishes
    #[serde(default)]
    pub notifications: bool,

    /// Pre-filled form values
    #[serde(default)]
    pub defaults: ChannelInput,

    /// Color overrides, e.g. `accent = "#ffc107"`
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub theme: BTreeMap<String, String>,
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_timeout() -> u64 {
    30
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            temperature: default_temperature(),
            endpoint: default_endpoint(),
            request_timeout_secs: default_timeout(),
            notifications: false,
            defaults: ChannelInput::default(),
            theme: BTreeMap::new(),
        }
    }
}

impl AppConfig {
    /// Get the config file path
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?
            .join("ytstrat");

        if let Err(e) = std::fs::create_dir_all(&config_dir) {
            tracing::warn!("Could not create config directory: {}", e);
        }

        Ok(config_dir.join("config.toml"))
    }

    /// Load config from file, or create default
    pub fn load() -> Result<Self> {
        let path = match Self::config_path() {
            Ok(p) => p,
            Err(_) => return Ok(AppConfig::default()),
        };

        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(content) => match Self::parse(&content) {
                    Ok(config) => return Ok(config),
                    Err(e) => tracing::warn!("Failed to parse config: {}", e),
                },
                Err(e) => tracing::warn!("Failed to read config: {}", e),
            }
            // Don't clobber a file the user is still editing
            return Ok(AppConfig::default());
        }

        let config = AppConfig::default();
        if let Err(e) = config.save() {
            tracing::warn!("Could not write default config: {}", e);
        }
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("invalid config.toml")
    }

    /// Save config to file
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// API key from the environment, falling back to the config file
    pub fn resolve_api_key(&self) -> Option<String> {
        let from_env = std::env::var(API_KEY_ENV).ok();
        pick_key(from_env, self.api_key.clone())
    }
}

fn pick_key(from_env: Option<String>, from_file: Option<String>) -> Option<String> {
    from_env
        .into_iter()
        .chain(from_file)
        .map(|k| k.trim().to_string())
        .find(|k| !k.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::{Capacity, Goal};

    #[test]
    fn test_config_serialization() {
        let mut config = AppConfig {
            api_key: Some("abc".to_string()),
            notifications: true,
            defaults: ChannelInput {
                topic: "Home espresso".to_string(),
                goal: Goal::Affiliate,
                capacity: Capacity::Daily,
                ..Default::default()
            },
            ..Default::default()
        };
        config.theme.insert("accent".to_string(), "#ffc107".to_string());

        let serialized = toml::to_string_pretty(&config).unwrap();
        let deserialized = AppConfig::parse(&serialized).unwrap();

        assert_eq!(config.api_key, deserialized.api_key);
        assert_eq!(config.defaults, deserialized.defaults);
        assert_eq!(config.theme, deserialized.theme);
        assert!(deserialized.notifications);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config = AppConfig::parse("model = \"gemini-2.5-pro\"\n").unwrap();
        assert_eq!(config.model, "gemini-2.5-pro");
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.request_timeout_secs, 30);
        assert!((config.temperature - 0.7).abs() < f32::EPSILON);
        assert_eq!(config.defaults, ChannelInput::default());
    }

    #[test]
    fn test_bad_option_is_an_error() {
        let err = AppConfig::parse("[defaults]\ngoal = \"fame\"\n");
        assert!(err.is_err());
    }

    #[test]
    fn test_env_key_wins_and_blanks_skip() {
        assert_eq!(
            pick_key(Some("env".into()), Some("file".into())),
            Some("env".to_string())
        );
        assert_eq!(
            pick_key(Some("  ".into()), Some("file".into())),
            Some("file".to_string())
        );
        assert_eq!(pick_key(None, None), None);
    }
}
