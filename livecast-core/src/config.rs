use config::{Config as ConfigBuilder, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::models::{CreateBroadcastRequest, DEFAULT_PREVIEW_HEIGHT, DEFAULT_PREVIEW_WIDTH};
use crate::Result;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub service: ServiceConfig,
    pub broadcast: BroadcastConfig,
    pub comments: CommentsConfig,
    pub session: SessionConfig,
    pub logging: LoggingConfig,
}

/// Remote streaming service connection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub base_url: String,
    /// Authorization token of the logged-in account
    pub session_token: Option<String>,
    pub user_agent: String,
    pub connect_timeout_seconds: u64,
    pub request_timeout_seconds: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080/api/v1".to_string(),
            session_token: None,
            user_agent: concat!("livecast/", env!("CARGO_PKG_VERSION")).to_string(),
            connect_timeout_seconds: 10,
            request_timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BroadcastConfig {
    pub preview_width: u32,
    pub preview_height: u32,
    pub message: Option<String>,
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            preview_width: DEFAULT_PREVIEW_WIDTH,
            preview_height: DEFAULT_PREVIEW_HEIGHT,
            message: None,
        }
    }
}

impl BroadcastConfig {
    #[must_use]
    pub fn request(&self) -> CreateBroadcastRequest {
        CreateBroadcastRequest {
            preview_width: self.preview_width,
            preview_height: self.preview_height,
            message: self.message.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CommentsConfig {
    pub poll_interval_ms: u64,
    /// Maximum comments kept in memory
    pub buffer_capacity: usize,
}

impl Default for CommentsConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 2000,
            buffer_capacity: 200,
        }
    }
}

impl CommentsConfig {
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Stored login session, removed on logout
    pub session_file: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_file: "./session.json".to_string(),
        }
    }
}

/// Log output encoding
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per event, for log shipping
    Json,
    /// Human-readable multi-line output
    #[default]
    Pretty,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// trace, debug, info, warn or error. `RUST_LOG` takes precedence.
    pub level: String,
    pub format: LogFormat,
    /// Append to this file instead of writing to stderr
    pub file_path: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            file_path: None,
        }
    }
}

impl Config {
    /// Layer defaults, then `config_file` when it exists, then `LIVECAST_*`
    /// environment variables. Later sources win.
    pub fn load(config_file: Option<&str>) -> Result<Self> {
        let mut builder = ConfigBuilder::builder();

        if let Some(path) = config_file {
            if Path::new(path).exists() {
                builder = builder.add_source(File::with_name(path));
            }
        }

        // LIVECAST_SERVICE__BASE_URL, LIVECAST_COMMENTS__POLL_INTERVAL_MS, ...
        builder = builder.add_source(
            Environment::with_prefix("LIVECAST")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }

    pub fn from_env() -> Result<Self> {
        Self::load(None)
    }

    pub fn from_file(path: &str) -> Result<Self> {
        Self::load(Some(path))
    }

    /// Check for misconfigurations, returning every problem found
    pub fn validate(&self) -> std::result::Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.service.base_url.trim().is_empty() {
            errors.push("service.base_url must not be empty".to_string());
        } else if !self.service.base_url.starts_with("http://")
            && !self.service.base_url.starts_with("https://")
        {
            errors.push(format!(
                "service.base_url must be an http(s) URL, got {}",
                self.service.base_url
            ));
        }

        if self.service.request_timeout_seconds == 0 {
            errors.push("service.request_timeout_seconds must be greater than 0".to_string());
        }

        if !self.broadcast.request().is_portrait() {
            errors.push(format!(
                "broadcast preview must be 9:16, got {}x{}",
                self.broadcast.preview_width, self.broadcast.preview_height
            ));
        }

        if self.comments.poll_interval_ms == 0 {
            errors.push("comments.poll_interval_ms must be greater than 0".to_string());
        }

        if self.comments.buffer_capacity == 0 {
            errors.push("comments.buffer_capacity must be greater than 0".to_string());
        }

        if !matches!(
            self.logging.level.to_lowercase().as_str(),
            "trace" | "debug" | "info" | "warn" | "warning" | "error"
        ) {
            errors.push(format!("logging.level is not a log level: {}", self.logging.level));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.broadcast.preview_width, 720);
        assert_eq!(config.broadcast.preview_height, 1280);
        assert_eq!(config.comments.poll_interval(), Duration::from_secs(2));
    }

    #[test]
    fn test_validate_collects_all_errors() {
        let mut config = Config::default();
        config.service.base_url = String::new();
        config.broadcast.preview_width = 1920;
        config.broadcast.preview_height = 1080;
        config.comments.poll_interval_ms = 0;
        config.logging.level = "loud".to_string();

        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors.iter().any(|e| e.contains("9:16")));
    }

    #[test]
    fn test_validate_rejects_non_http_base_url() {
        let mut config = Config::default();
        config.service.base_url = "ftp://example.com".to_string();
        let errors = config.validate().unwrap_err();
        assert!(errors[0].contains("http(s)"));
    }

    #[test]
    fn test_broadcast_request_from_config() {
        let config = BroadcastConfig {
            message: Some("hello".to_string()),
            ..BroadcastConfig::default()
        };
        let request = config.request();
        assert!(request.is_portrait());
        assert_eq!(request.message.as_deref(), Some("hello"));
    }

    #[test]
    fn test_load_from_file_with_partial_sections() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[service]\nbase_url = \"https://live.example.com/api/v1\"\n\n[comments]\npoll_interval_ms = 500"
        )
        .unwrap();

        let path = file.path().to_str().unwrap().to_string();
        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.service.base_url, "https://live.example.com/api/v1");
        assert_eq!(config.comments.poll_interval_ms, 500);
        // Untouched fields keep their defaults
        assert_eq!(config.comments.buffer_capacity, 200);
        assert_eq!(config.service.request_timeout_seconds, 30);
    }

    #[test]
    fn test_log_format_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[logging]\nformat = \"json\"\nlevel = \"debug\"").unwrap();

        let path = file.path().to_str().unwrap().to_string();
        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = Config::load(Some("/nonexistent/livecast.yaml")).unwrap();
        assert_eq!(config.broadcast.preview_height, 1280);
    }
}
