//! # Configuration File Parser
//!
//! Reads `pseudogen.toml`, the optional per-project settings file. Every key
//! is optional; flags and environment variables take precedence over it.
//!
//! - `[server]`: generator service URL and request timeout
//! - `[preview]`: preview row cap, debounce delay and watch poll interval
//! - `[sample]`: default seed for the offline sample engine
//!
//! Example `pseudogen.toml`:
//!
//! ```toml
//! [server]
//! url = "http://localhost:8000"
//! timeout_secs = 30
//!
//! [preview]
//! rows = 25
//! debounce_ms = 300
//! poll_ms = 500
//!
//! [sample]
//! seed = 42
//! ```

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::client::{DEFAULT_PREVIEW_ROWS, DEFAULT_SERVER_URL, DEFAULT_TIMEOUT};
use crate::error::{PseudoGenError, Result};
use crate::preview::DEFAULT_DEBOUNCE;

/// Default config file name.
pub const CONFIG_FILE_NAME: &str = "pseudogen.toml";

/// How often `preview --watch` checks the rule file for changes.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Top-level pseudogen.toml structure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PseudoGenConfig {
    pub server: ServerConfig,
    pub preview: PreviewConfig,
    pub sample: SampleConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Base URL of the generator service.
    pub url: Option<String>,
    /// Request timeout in seconds.
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    /// Largest number of rows a preview asks for.
    pub rows: Option<u64>,
    /// Delay between the last change and the preview request.
    pub debounce_ms: Option<u64>,
    /// Watch mode poll interval.
    pub poll_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SampleConfig {
    /// Fixed seed for `pseudogen sample`.
    pub seed: Option<u64>,
}

/// Read and parse pseudogen.toml from the given directory.
///
/// Returns `None` if the file doesn't exist (config is optional).
/// Returns an error if the file exists but can't be parsed or holds values
/// that make no sense.
pub fn read_config(dir: &Path) -> Result<Option<PseudoGenConfig>> {
    let path = dir.join(CONFIG_FILE_NAME);
    if !path.exists() {
        return Ok(None);
    }

    let content = std::fs::read_to_string(&path).map_err(|e| PseudoGenError::Config {
        message: format!("Failed to read {}: {}", path.display(), e),
    })?;

    let config: PseudoGenConfig = toml::from_str(&content).map_err(|e| PseudoGenError::Config {
        message: format!("Failed to parse {}: {}", path.display(), e),
    })?;

    config.validate()?;
    tracing::debug!("Loaded {}", path.display());

    Ok(Some(config))
}

impl PseudoGenConfig {
    /// Validate constraints that serde cannot enforce.
    pub fn validate(&self) -> Result<()> {
        if let Some(url) = &self.server.url {
            url::Url::parse(url).map_err(|e| PseudoGenError::Config {
                message: format!(
                    "[server] url = \"{}\" is not a valid URL ({}). \
                     Use a full address such as http://localhost:8000.",
                    url, e
                ),
            })?;
        }
        if self.server.timeout_secs == Some(0) {
            return Err(PseudoGenError::Config {
                message: "[server] timeout_secs must be at least 1.".to_string(),
            });
        }
        if self.preview.rows == Some(0) {
            return Err(PseudoGenError::Config {
                message: "[preview] rows must be at least 1.".to_string(),
            });
        }
        if self.preview.poll_ms == Some(0) {
            return Err(PseudoGenError::Config {
                message: "[preview] poll_ms must be at least 1.".to_string(),
            });
        }
        Ok(())
    }

    /// Service URL: `explicit` (flag or environment) first, then the file,
    /// then the built-in default.
    pub fn server_url(&self, explicit: Option<&str>) -> String {
        explicit
            .map(str::to_string)
            .or_else(|| self.server.url.clone())
            .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string())
    }

    pub fn timeout(&self) -> Duration {
        self.server
            .timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TIMEOUT)
    }

    pub fn preview_rows(&self) -> u64 {
        self.preview.rows.unwrap_or(DEFAULT_PREVIEW_ROWS)
    }

    pub fn debounce(&self) -> Duration {
        self.preview
            .debounce_ms
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_DEBOUNCE)
    }

    pub fn poll_interval(&self) -> Duration {
        self.preview
            .poll_ms
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_POLL_INTERVAL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
[server]
url = "http://generator.internal:9000"
timeout_secs = 10

[preview]
rows = 50
debounce_ms = 150
poll_ms = 250

[sample]
seed = 42
"#;

        let config: PseudoGenConfig = toml::from_str(toml).unwrap();
        config.validate().unwrap();

        assert_eq!(config.server_url(None), "http://generator.internal:9000");
        assert_eq!(config.timeout(), Duration::from_secs(10));
        assert_eq!(config.preview_rows(), 50);
        assert_eq!(config.debounce(), Duration::from_millis(150));
        assert_eq!(config.poll_interval(), Duration::from_millis(250));
        assert_eq!(config.sample.seed, Some(42));
    }

    #[test]
    fn test_parse_empty_config_uses_defaults() {
        let config: PseudoGenConfig = toml::from_str("").unwrap();
        assert_eq!(config.server_url(None), DEFAULT_SERVER_URL);
        assert_eq!(config.timeout(), DEFAULT_TIMEOUT);
        assert_eq!(config.preview_rows(), 25);
        assert_eq!(config.debounce(), Duration::from_millis(300));
        assert!(config.sample.seed.is_none());
    }

    #[test]
    fn test_explicit_url_wins() {
        let config: PseudoGenConfig =
            toml::from_str("[server]\nurl = \"http://from-file:1\"\n").unwrap();
        assert_eq!(
            config.server_url(Some("http://from-flag:2")),
            "http://from-flag:2"
        );
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let bad_url: PseudoGenConfig = toml::from_str("[server]\nurl = \"nope\"\n").unwrap();
        assert!(bad_url.validate().is_err());

        let zero_rows: PseudoGenConfig = toml::from_str("[preview]\nrows = 0\n").unwrap();
        let err = zero_rows.validate().unwrap_err();
        assert!(err.to_string().contains("[preview] rows"));
    }

    #[test]
    fn test_read_config_nonexistent() {
        let result = read_config(Path::new("/nonexistent/dir"));
        assert!(result.is_ok());
        assert!(result.unwrap().is_none());
    }

    #[test]
    fn test_read_config_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "[preview]\nrows = 10\n",
        )
        .unwrap();

        let config = read_config(dir.path()).unwrap().unwrap();
        assert_eq!(config.preview_rows(), 10);
    }

    #[test]
    fn test_read_config_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "[preview\nrows = 10\n").unwrap();

        let err = read_config(dir.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse"));
    }
}
