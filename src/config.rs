//! Application configuration (TOML)

use crate::catalog::PassphraseCatalog;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub default_locale: String,
    pub auth: AuthConfig,
    pub capture: CaptureConfig,
    pub recognizer: RecognizerConfig,
    /// Overrides the built-in passphrase catalog when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passphrases: Option<PassphraseCatalog>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_locale: "english".to_string(),
            auth: AuthConfig::default(),
            capture: CaptureConfig::default(),
            recognizer: RecognizerConfig::default(),
            passphrases: None,
        }
    }
}

/// Remote authentication service
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub base_url: String,
    /// Request timeout in seconds (0 = no client-side timeout)
    pub timeout_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Audio capture
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_name: Option<String>,
}

/// Voice command recognition (speech-to-text service)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognizerConfig {
    pub enabled: bool,
    /// Transcription endpoint; recognition is unsupported without one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub language: String,
    /// How long one listen records before transcribing (ms)
    pub listen_ms: u64,
    /// Transcription request timeout in seconds (0 = no client-side timeout)
    pub timeout_secs: u64,
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: None,
            api_key: None,
            language: "en-US".to_string(),
            listen_ms: 4000,
            timeout_secs: 30,
        }
    }
}

impl AppConfig {
    /// Load config from file or create default
    pub fn load_or_create(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = fs::read_to_string(path)?;
            let config: AppConfig = toml::from_str(&content)?;
            log::info!("Config loaded from: {}", path.display());
            Ok(config)
        } else {
            let config = Self::default();
            let toml_str = toml::to_string_pretty(&config)?;
            fs::write(path, toml_str)?;
            log::info!("Default config created at: {}", path.display());
            Ok(config)
        }
    }

    /// Configured catalog, or the built-in one
    pub fn catalog(&self) -> PassphraseCatalog {
        self.passphrases.clone().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.auth.base_url, "http://127.0.0.1:8000");
        assert_eq!(config.auth.timeout_secs, 30);
        assert_eq!(config.default_locale, "english");
        assert_eq!(config.recognizer.listen_ms, 4000);
        assert_eq!(config.recognizer.timeout_secs, 30);
        assert!(config.recognizer.endpoint.is_none());
        assert!(config.catalog().contains("hindi"));
    }

    #[test]
    fn test_load_or_create_writes_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        let created = AppConfig::load_or_create(&path).unwrap();
        assert!(path.exists());

        let loaded = AppConfig::load_or_create(&path).unwrap();
        assert_eq!(loaded.auth.base_url, created.auth.base_url);
        assert_eq!(loaded.recognizer.language, "en-US");
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
default_locale = "hindi"

[auth]
base_url = "https://auth.example.com/api/"

[passphrases]
hindi = ["एक", "दो", "तीन"]
"#,
        )
        .unwrap();

        let config = AppConfig::load_or_create(&path).unwrap();
        assert_eq!(config.default_locale, "hindi");
        assert_eq!(config.auth.base_url, "https://auth.example.com/api/");
        assert_eq!(config.auth.timeout_secs, 30);
        let catalog = config.catalog();
        assert_eq!(catalog.locales(), vec!["hindi"]);
    }

    #[test]
    fn test_invalid_catalog_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[passphrases]\nenglish = [\"only one\"]\n").unwrap();
        assert!(AppConfig::load_or_create(&path).is_err());
    }
}
