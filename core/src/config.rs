use crate::errors::{TripAgentError, TripAgentResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const APP_NAME: &str = "trip-agent";

/// Used when neither flag, environment nor config file names a server.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

pub const DEFAULT_WELCOME_MESSAGE: &str =
    "Hello! I'm your Trip Agent assistant. Ask me about travel destinations, attractions, and trip planning!";

pub const BASE_URL_ENV: &str = "TRIP_AGENT_API_URL";
pub const LOG_LEVEL_ENV: &str = "TRIP_AGENT_LOG_LEVEL";

/// Client configuration
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct TripAgentConfig {
    pub base_url: Option<String>,
    pub welcome_message: Option<String>,
    pub log_level: Option<String>,
    pub syntax_theme: Option<String>,
}

impl TripAgentConfig {
    /// Loads configuration from a file if it exists, otherwise returns the default config
    pub fn load_from_file(path: &Path) -> TripAgentResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .map_err(|e| TripAgentError::Config(format!("Failed to read config file: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| TripAgentError::Config(format!("Failed to parse config file: {}", e)))
    }

    /// Saves configuration to a file
    pub fn save_to_file(&self, path: &Path) -> TripAgentResult<()> {
        let content = toml::to_string(self)
            .map_err(|e| TripAgentError::Config(format!("Failed to serialize config: {}", e)))?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                TripAgentError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        fs::write(path, content)
            .map_err(|e| TripAgentError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Values taken from the process environment.
    pub fn from_env() -> Self {
        let var = |name: &str| env::var(name).ok().filter(|v| !v.trim().is_empty());
        Self {
            base_url: var(BASE_URL_ENV),
            log_level: var(LOG_LEVEL_ENV),
            ..Self::default()
        }
    }

    /// Merges this config with another config, preferring values from the other config if present
    pub fn merge(&self, other: &Self) -> Self {
        Self {
            base_url: other.base_url.clone().or_else(|| self.base_url.clone()),
            welcome_message: other
                .welcome_message
                .clone()
                .or_else(|| self.welcome_message.clone()),
            log_level: other.log_level.clone().or_else(|| self.log_level.clone()),
            syntax_theme: other
                .syntax_theme
                .clone()
                .or_else(|| self.syntax_theme.clone()),
        }
    }

    pub fn resolved_base_url(&self) -> String {
        self.base_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .unwrap_or(DEFAULT_BASE_URL)
            .to_string()
    }

    pub fn resolved_welcome_message(&self) -> &str {
        self.welcome_message
            .as_deref()
            .unwrap_or(DEFAULT_WELCOME_MESSAGE)
    }
}

/// Helper function to get default config directory
pub fn get_default_config_dir(app_name: &str) -> TripAgentResult<PathBuf> {
    let home_dir = dirs::home_dir().ok_or_else(|| {
        TripAgentError::Config("Could not determine home directory".to_string())
    })?;

    Ok(home_dir.join(".config").join(app_name))
}

/// Helper function to get default config file path
pub fn get_default_config_file(app_name: &str) -> TripAgentResult<PathBuf> {
    let config_dir = get_default_config_dir(app_name)?;
    Ok(config_dir.join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = TripAgentConfig::load_from_file(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, TripAgentConfig::default());
        assert_eq!(config.resolved_base_url(), DEFAULT_BASE_URL);
        assert_eq!(config.resolved_welcome_message(), DEFAULT_WELCOME_MESSAGE);
    }

    #[test]
    fn save_then_load_preserves_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let config = TripAgentConfig {
            base_url: Some("https://trips.example.com/api".to_string()),
            syntax_theme: Some("InspiredGitHub".to_string()),
            ..TripAgentConfig::default()
        };
        config.save_to_file(&path).unwrap();

        let loaded = TripAgentConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn malformed_file_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "base_url = [").unwrap();
        let err = TripAgentConfig::load_from_file(&path).unwrap_err();
        assert!(matches!(err, TripAgentError::Config(_)));
    }

    #[test]
    fn merge_prefers_other_values() {
        let file = TripAgentConfig {
            base_url: Some("http://file".to_string()),
            log_level: Some("info".to_string()),
            ..TripAgentConfig::default()
        };
        let flags = TripAgentConfig {
            base_url: Some("http://flag".to_string()),
            ..TripAgentConfig::default()
        };
        let merged = file.merge(&flags);
        assert_eq!(merged.base_url.as_deref(), Some("http://flag"));
        assert_eq!(merged.log_level.as_deref(), Some("info"));
    }

    #[test]
    fn blank_base_url_falls_back_to_default() {
        let config = TripAgentConfig {
            base_url: Some("   ".to_string()),
            ..TripAgentConfig::default()
        };
        assert_eq!(config.resolved_base_url(), DEFAULT_BASE_URL);
    }
}
