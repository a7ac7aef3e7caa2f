use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::{DashError, Result};

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
pub const API_URL_ENV: &str = "TESTREQ_API_URL";

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_API_URL.to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct UiConfig {
    #[serde(default = "default_tick_rate_ms")]
    pub tick_rate_ms: u64,
    #[serde(default = "default_show_test_badges")]
    pub show_test_badges: bool,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            tick_rate_ms: default_tick_rate_ms(),
            show_test_badges: default_show_test_badges(),
        }
    }
}

fn default_tick_rate_ms() -> u64 {
    250
}

fn default_show_test_badges() -> bool {
    true
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub ui: UiConfig,
}

pub fn config_path() -> Option<PathBuf> {
    let config_dir = dirs::config_dir()?;
    Some(config_dir.join("testreq").join("config.toml"))
}

impl Config {
    /// Load from the default location. A missing or unreadable file yields defaults.
    pub fn load() -> Self {
        let Some(path) = config_path() else {
            return Config::default();
        };

        let Ok(content) = std::fs::read_to_string(&path) else {
            return Config::default();
        };

        match toml::from_str::<Config>(&content) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring malformed config");
                Config::default()
            }
        }
    }

    /// Load from an explicit path. Unlike [`Config::load`], failures are errors.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| DashError::Config(format!("{}: {}", path.display(), e)))?;
        toml::from_str(&content).map_err(|e| DashError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Apply overrides in precedence order: CLI flag, then environment, then file.
    pub fn with_overrides(mut self, cli_api_url: Option<String>, env_api_url: Option<String>) -> Self {
        if let Some(url) = cli_api_url.or(env_api_url).filter(|u| !u.is_empty()) {
            self.api.base_url = url;
        }
        self
    }

    /// Check and normalize the backend URL.
    pub fn validate(mut self) -> Result<Self> {
        let url = self.api.base_url.trim().trim_end_matches('/').to_string();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(DashError::Config(format!(
                "api base_url must start with http:// or https://, got {:?}",
                self.api.base_url
            )));
        }
        self.api.base_url = url;
        if self.ui.tick_rate_ms == 0 {
            self.ui.tick_rate_ms = default_tick_rate_ms();
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_config() {
        let toml_str = r#"
[api]
base_url = "https://dash.internal:9000/"

[ui]
tick_rate_ms = 100
show_test_badges = false
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.api.base_url, "https://dash.internal:9000/");
        assert_eq!(config.ui.tick_rate_ms, 100);
        assert!(!config.ui.show_test_badges);
    }

    #[test]
    fn parse_empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.api.base_url, DEFAULT_API_URL);
        assert_eq!(config.ui.tick_rate_ms, 250);
        assert!(config.ui.show_test_badges);
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let config: Config = toml::from_str("[ui]\nshow_test_badges = false\n").unwrap();
        assert_eq!(config.ui.tick_rate_ms, 250);
        assert_eq!(config.api.base_url, DEFAULT_API_URL);
    }

    #[test]
    fn cli_override_beats_env() {
        let config = Config::default().with_overrides(
            Some("http://cli:1".to_string()),
            Some("http://env:2".to_string()),
        );
        assert_eq!(config.api.base_url, "http://cli:1");
    }

    #[test]
    fn env_override_beats_file() {
        let config = Config::default().with_overrides(None, Some("http://env:2".to_string()));
        assert_eq!(config.api.base_url, "http://env:2");
    }

    #[test]
    fn empty_override_is_ignored() {
        let config = Config::default().with_overrides(None, Some(String::new()));
        assert_eq!(config.api.base_url, DEFAULT_API_URL);
    }

    #[test]
    fn validate_trims_trailing_slash() {
        let mut config = Config::default();
        config.api.base_url = "http://localhost:8000/".to_string();
        let config = config.validate().unwrap();
        assert_eq!(config.api.base_url, "http://localhost:8000");
    }

    #[test]
    fn validate_rejects_missing_scheme() {
        let mut config = Config::default();
        config.api.base_url = "localhost:8000".to_string();
        assert!(matches!(config.validate(), Err(DashError::Config(_))));
    }

    #[test]
    fn load_from_missing_path_is_an_error() {
        let result = Config::load_from(Path::new("/nonexistent/testreq/config.toml"));
        assert!(matches!(result, Err(DashError::Config(_))));
    }
}
