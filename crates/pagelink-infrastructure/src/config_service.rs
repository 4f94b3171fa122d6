//! Configuration service implementation.
//!
//! Loads `PagelinkConfig` from config.toml (~/.config/pagelink/config.toml)
//! and layers environment overrides on top.

use crate::paths::PagelinkPaths;
use pagelink_core::config::PagelinkConfig;
use pagelink_core::{PagelinkError, Result};
use std::path::Path;
use std::sync::{Arc, RwLock};

pub const APP_ID_ENV: &str = "PAGELINK_APP_ID";
pub const BACKEND_URL_ENV: &str = "PAGELINK_BACKEND_URL";
pub const GRAPH_BASE_URL_ENV: &str = "PAGELINK_GRAPH_BASE_URL";

/// Configuration service that loads and caches the configuration.
#[derive(Debug, Clone)]
pub struct ConfigService {
    paths: PagelinkPaths,
    /// Cached configuration, loaded lazily.
    config: Arc<RwLock<Option<PagelinkConfig>>>,
}

impl ConfigService {
    pub fn new(base_path: Option<&Path>) -> Self {
        Self {
            paths: PagelinkPaths::new(base_path),
            config: Arc::new(RwLock::new(None)),
        }
    }

    /// Gets the configuration, loading from file if not cached.
    ///
    /// A missing file is created with defaults. A malformed file is an error.
    pub fn get_config(&self) -> Result<PagelinkConfig> {
        {
            let read_lock = self.config.read().unwrap_or_else(|e| e.into_inner());
            if let Some(ref cached) = *read_lock {
                return Ok(cached.clone());
            }
        }

        let mut loaded = self.load_config()?;
        apply_env_overrides(&mut loaded, |key| std::env::var(key).ok());

        {
            let mut write_lock = self.config.write().unwrap_or_else(|e| e.into_inner());
            *write_lock = Some(loaded.clone());
        }

        Ok(loaded)
    }

    fn load_config(&self) -> Result<PagelinkConfig> {
        let config_path = self
            .paths
            .config_file()
            .map_err(|e| PagelinkError::config(e.to_string()))?;

        if !config_path.exists() {
            let default_config = PagelinkConfig::default();
            if let Some(parent) = config_path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let contents = toml::to_string_pretty(&default_config)
                .map_err(|e| PagelinkError::config(e.to_string()))?;
            std::fs::write(&config_path, contents)?;
            tracing::info!(
                "[ConfigService] Wrote default configuration to {}",
                config_path.display()
            );
            return Ok(default_config);
        }

        let contents = std::fs::read_to_string(&config_path)?;
        let config: PagelinkConfig = toml::from_str(&contents)?;
        tracing::debug!("[ConfigService] Loaded {}", config_path.display());
        Ok(config)
    }
}

impl Default for ConfigService {
    fn default() -> Self {
        Self::new(None)
    }
}

/// Applies environment overrides; `lookup` resolves a variable name.
pub fn apply_env_overrides<F>(config: &mut PagelinkConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(app_id) = non_empty(APP_ID_ENV) {
        config.platform.app_id = Some(app_id);
    }
    if let Some(url) = non_empty(BACKEND_URL_ENV) {
        config.backend.base_url = url;
    }
    if let Some(url) = non_empty(GRAPH_BASE_URL_ENV) {
        config.platform.graph_base_url = url;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_missing_file_is_created_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let service = ConfigService::new(Some(dir.path()));

        let config = service.load_config().unwrap();
        assert_eq!(config, PagelinkConfig::default());
        assert!(dir.path().join("config.toml").exists());

        // The written file parses back to the same values
        let reloaded = service.load_config().unwrap();
        assert_eq!(reloaded, config);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("config.toml"), "[platform\napp_id = ").unwrap();
        let service = ConfigService::new(Some(dir.path()));

        let err = service.load_config().unwrap_err();
        assert!(matches!(err, PagelinkError::Serialization { .. }));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = PagelinkConfig::default();
        let env: HashMap<&str, &str> = HashMap::from([
            (APP_ID_ENV, "987654321"),
            (BACKEND_URL_ENV, "  "),
        ]);
        apply_env_overrides(&mut config, |key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.platform.app_id.as_deref(), Some("987654321"));
        assert_eq!(
            config.backend.base_url,
            pagelink_core::config::DEFAULT_BACKEND_URL
        );
    }
}
