use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

pub const API_URL_ENV: &str = "REVIEW_INSIGHT_API_URL";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub polling: PollingConfig,
    pub reviews: ReviewsConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub request_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5001/api".to_string(),
            request_timeout_secs: 30,
        }
    }
}

impl ApiConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    pub interval_ms: u64,
    pub tip_interval_ms: u64,
    /// Consecutive transient poll failures tolerated before the job errors out
    pub max_consecutive_failures: u32,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: 2000,
            tip_interval_ms: 5000,
            max_consecutive_failures: 3,
        }
    }
}

impl PollingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn tip_interval(&self) -> Duration {
        Duration::from_millis(self.tip_interval_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewsConfig {
    pub page_size: usize,
    pub cache_ttl_secs: u64,
}

impl Default for ReviewsConfig {
    fn default() -> Self {
        Self {
            page_size: 5,
            cache_ttl_secs: 5 * 60,
        }
    }
}

impl ReviewsConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => ConfigError::FileNotFound {
                path: path.display().to_string(),
            },
            _ => ConfigError::Read {
                path: path.display().to_string(),
                source: e,
            },
        })?;
        info!("Loaded configuration from {}", path.display());
        Self::from_toml_str(&raw)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var(API_URL_ENV) {
            if !url.trim().is_empty() {
                debug!("Using API base URL from {}", API_URL_ENV);
                self.api.base_url = url.trim().to_string();
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let base_url = self.api.base_url.trim();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ConfigError::InvalidValue {
                field: "api.base_url".to_string(),
                value: self.api.base_url.clone(),
            });
        }

        let zero_field = [
            ("api.request_timeout_secs", self.api.request_timeout_secs == 0),
            ("polling.interval_ms", self.polling.interval_ms == 0),
            ("polling.tip_interval_ms", self.polling.tip_interval_ms == 0),
            ("reviews.page_size", self.reviews.page_size == 0),
            ("reviews.cache_ttl_secs", self.reviews.cache_ttl_secs == 0),
        ]
        .into_iter()
        .find(|(_, is_zero)| *is_zero);

        if let Some((field, _)) = zero_field {
            return Err(ConfigError::ValidationFailed {
                reason: format!("{} must be greater than zero", field),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.polling.interval(), Duration::from_secs(2));
        assert_eq!(config.polling.tip_interval(), Duration::from_secs(5));
        assert_eq!(config.reviews.cache_ttl(), Duration::from_secs(300));
        assert_eq!(config.reviews.page_size, 5);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config = AppConfig::from_toml_str(
            r#"
            [api]
            base_url = "https://reviews.example.com/api"

            [polling]
            interval_ms = 500
            "#,
        )
        .unwrap();

        assert_eq!(config.api.base_url, "https://reviews.example.com/api");
        assert_eq!(config.api.request_timeout_secs, 30);
        assert_eq!(config.polling.interval_ms, 500);
        assert_eq!(config.polling.tip_interval_ms, 5000);
    }

    #[test]
    fn test_rejects_zero_page_size() {
        let result = AppConfig::from_toml_str("[reviews]\npage_size = 0\n");
        assert!(matches!(result, Err(ConfigError::ValidationFailed { .. })));
    }

    #[test]
    fn test_rejects_non_http_base_url() {
        let result = AppConfig::from_toml_str("[api]\nbase_url = \"ftp://host\"\n");
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_parse_error() {
        let result = AppConfig::from_toml_str("[polling\ninterval_ms = 1");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_missing_file() {
        let result = AppConfig::load(Path::new("/nonexistent/review-insight.toml"));
        assert!(matches!(result, Err(ConfigError::FileNotFound { .. })));
    }

    #[test]
    fn test_unreadable_path_is_not_reported_missing() {
        let dir = std::env::temp_dir();
        let result = AppConfig::load(&dir);
        match result {
            Err(ConfigError::Read { path, .. }) => assert_eq!(path, dir.display().to_string()),
            other => panic!("expected a read error, got {:?}", other),
        }
    }
}
