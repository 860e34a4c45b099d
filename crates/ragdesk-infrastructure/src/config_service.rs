//! Configuration service implementation.
//!
//! This module provides a ConfigService that loads the client configuration
//! from the configuration file (~/.config/ragdesk/config.toml) and applies
//! environment overrides.

use std::path::{Path, PathBuf};

use ragdesk_core::config::ClientConfig;
use ragdesk_core::error::{RagDeskError, Result};

use crate::paths::RagDeskPaths;
use crate::storage::AtomicFile;

/// Overrides `api_base_url`.
pub const ENV_API_BASE_URL: &str = "RAGDESK_API_BASE_URL";
/// Overrides `data_dir`.
pub const ENV_DATA_DIR: &str = "RAGDESK_DATA_DIR";

/// Loads the client configuration.
///
/// A missing file is created with the defaults so users have something to
/// edit. Environment overrides are applied after parsing and the result is
/// validated before it is returned.
#[derive(Debug, Clone)]
pub struct ConfigService {
    path: PathBuf,
}

impl ConfigService {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Creates a service for the platform config file.
    pub fn default_location() -> Result<Self> {
        let path = RagDeskPaths::config_file().map_err(|e| RagDeskError::config(e.to_string()))?;
        Ok(Self::new(path))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the configuration using the process environment for overrides.
    pub fn load(&self) -> Result<ClientConfig> {
        self.load_with_env(|key| std::env::var(key).ok())
    }

    /// Loads the configuration with a custom environment lookup.
    pub fn load_with_env<F>(&self, env: F) -> Result<ClientConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file = AtomicFile::new(self.path.clone());
        let content = file
            .load()
            .map_err(|e| RagDeskError::config(format!("Failed to read {:?}: {}", self.path, e)))?;

        let config = match content {
            Some(content) => Self::parse(&content)?,
            None => {
                let config = ClientConfig::default();
                Self::write_default(&file, &config);
                config
            }
        };

        let config = apply_env_overrides(config, env);
        config.validate()?;
        tracing::debug!("Loaded configuration from {:?}", self.path);
        Ok(config)
    }

    /// Parses TOML content into a configuration.
    pub fn parse(content: &str) -> Result<ClientConfig> {
        Ok(toml::from_str(content)?)
    }

    fn write_default(file: &AtomicFile, config: &ClientConfig) {
        let rendered = match toml::to_string_pretty(config) {
            Ok(rendered) => rendered,
            Err(e) => {
                tracing::warn!("Failed to render default configuration: {}", e);
                return;
            }
        };
        match file.save(&rendered) {
            Ok(()) => tracing::info!("Created default configuration at {:?}", file.path()),
            Err(e) => tracing::warn!("Failed to write default configuration: {}", e),
        }
    }
}

/// Applies `RAGDESK_*` environment overrides; empty values are ignored.
pub fn apply_env_overrides<F>(mut config: ClientConfig, env: F) -> ClientConfig
where
    F: Fn(&str) -> Option<String>,
{
    let non_empty = |key: &str| env(key).filter(|value| !value.trim().is_empty());

    if let Some(url) = non_empty(ENV_API_BASE_URL) {
        config.api_base_url = url.trim().to_string();
    }
    if let Some(dir) = non_empty(ENV_DATA_DIR) {
        config.data_dir = Some(PathBuf::from(dir));
    }
    config
}
