use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::backend::DEFAULT_TEMPERATURE;
use crate::error::{RagDeskError, Result};

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/api/v1";

/// Client configuration as stored in `config.toml`.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct ClientConfig {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Directory for persisted conversations; platform data dir when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
    /// Per-request timeout for non-streaming calls, in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub poll: PollConfig,
}

/// Upload status polling schedule.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct PollConfig {
    #[serde(default = "default_initial_interval_ms")]
    pub initial_interval_ms: u64,
    #[serde(default = "default_max_interval_ms")]
    pub max_interval_ms: u64,
    #[serde(default = "default_max_consecutive_failures")]
    pub max_consecutive_failures: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_temperature() -> f32 {
    DEFAULT_TEMPERATURE
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_initial_interval_ms() -> u64 {
    2_000
}

fn default_max_interval_ms() -> u64 {
    5_000
}

fn default_max_consecutive_failures() -> u32 {
    5
}

fn default_timeout_secs() -> u64 {
    20 * 60
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            temperature: default_temperature(),
            data_dir: None,
            request_timeout_secs: default_request_timeout_secs(),
            poll: PollConfig::default(),
        }
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            initial_interval_ms: default_initial_interval_ms(),
            max_interval_ms: default_max_interval_ms(),
            max_consecutive_failures: default_max_consecutive_failures(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ClientConfig {
    /// Rejects values the client cannot operate with.
    pub fn validate(&self) -> Result<()> {
        let url = self.api_base_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(RagDeskError::config(format!(
                "api_base_url must be an http(s) URL, got '{}'",
                self.api_base_url
            )));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(RagDeskError::config(format!(
                "temperature must be within 0.0..=2.0, got {}",
                self.temperature
            )));
        }
        self.poll.validate()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl PollConfig {
    pub fn validate(&self) -> Result<()> {
        if self.initial_interval_ms == 0 || self.initial_interval_ms > self.max_interval_ms {
            return Err(RagDeskError::config(
                "poll.initial_interval_ms must be positive and not exceed poll.max_interval_ms",
            ));
        }
        if self.timeout_secs == 0 {
            return Err(RagDeskError::config("poll.timeout_secs must be positive"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: ClientConfig = toml::from_str(
            r#"
            api_base_url = "https://rag.example.com/api/v1"

            [poll]
            timeout_secs = 60
            "#,
        )
        .unwrap();
        assert_eq!(config.api_base_url, "https://rag.example.com/api/v1");
        assert_eq!(config.temperature, DEFAULT_TEMPERATURE);
        assert_eq!(config.poll.initial_interval_ms, 2_000);
        assert_eq!(config.poll.timeout_secs, 60);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = ClientConfig::default();
        config.api_base_url = "localhost:8000".to_string();
        assert!(config.validate().is_err());

        let mut config = ClientConfig::default();
        config.poll.initial_interval_ms = 10_000;
        assert!(config.validate().is_err());
    }
}
