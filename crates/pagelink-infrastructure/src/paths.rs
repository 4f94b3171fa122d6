//! Unified path management for pagelink configuration files.
//!
//! All configuration and secrets live in one directory, resolved in this order:
//! an explicit base path, the `PAGELINK_CONFIG_DIR` environment variable, then
//! the platform config directory from the `dirs` crate.

use std::path::{Path, PathBuf};

/// Environment variable that relocates the configuration directory.
pub const CONFIG_DIR_ENV: &str = "PAGELINK_CONFIG_DIR";

const APP_DIR_NAME: &str = "pagelink";
const CONFIG_FILE_NAME: &str = "config.toml";
const SECRET_FILE_NAME: &str = "secret.json";

/// Errors that can occur during path resolution.
#[derive(Debug)]
pub enum PathError {
    /// Platform config directory could not be determined.
    ConfigDirNotFound,
}

impl std::fmt::Display for PathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathError::ConfigDirNotFound => write!(f, "Cannot find config directory"),
        }
    }
}

impl std::error::Error for PathError {}

/// Unified path management for pagelink.
///
/// # Directory Structure
///
/// ```text
/// ~/.config/pagelink/          # Config directory
/// ├── config.toml              # Application configuration
/// └── secret.json              # Backend token, platform user token
/// ```
#[derive(Debug, Clone)]
pub struct PagelinkPaths {
    base_path: Option<PathBuf>,
}

impl PagelinkPaths {
    /// Creates a resolver. `base_path` overrides every other source.
    pub fn new(base_path: Option<&Path>) -> Self {
        Self {
            base_path: base_path.map(Path::to_path_buf),
        }
    }

    /// Returns the pagelink configuration directory.
    ///
    /// # Returns
    ///
    /// - `Ok(PathBuf)`: Path to config directory (e.g., `~/.config/pagelink/`)
    /// - `Err(PathError::ConfigDirNotFound)`: Could not determine directory
    pub fn config_dir(&self) -> Result<PathBuf, PathError> {
        if let Some(base) = &self.base_path {
            return Ok(base.clone());
        }
        if let Some(dir) = std::env::var_os(CONFIG_DIR_ENV).filter(|v| !v.is_empty()) {
            return Ok(PathBuf::from(dir));
        }
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR_NAME))
            .ok_or(PathError::ConfigDirNotFound)
    }

    /// Returns the path to config.toml.
    pub fn config_file(&self) -> Result<PathBuf, PathError> {
        Ok(self.config_dir()?.join(CONFIG_FILE_NAME))
    }

    /// Returns the path to the secrets file.
    ///
    /// # Security Note
    ///
    /// Ensure this file has appropriate permissions (e.g., 600) to prevent
    /// unauthorized access.
    pub fn secret_file(&self) -> Result<PathBuf, PathError> {
        Ok(self.config_dir()?.join(SECRET_FILE_NAME))
    }

    /// Ensures the secret file exists, creating it with a template if it doesn't.
    ///
    /// # Security Note
    ///
    /// This function sets file permissions to 600 (user read/write only) on Unix systems.
    pub fn ensure_secret_file(&self) -> Result<PathBuf, std::io::Error> {
        let secret_path = self
            .secret_file()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::NotFound, e.to_string()))?;

        if secret_path.exists() {
            return Ok(secret_path);
        }

        if let Some(parent) = secret_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        use pagelink_core::config::{BackendSecret, PlatformSecret, SecretConfig};

        let template_config = SecretConfig {
            backend: Some(BackendSecret {
                api_token: String::new(),
            }),
            platform: Some(PlatformSecret {
                user_access_token: None,
            }),
        };

        let template_json =
            serde_json::to_string_pretty(&template_config).map_err(std::io::Error::other)?;
        std::fs::write(&secret_path, template_json)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let permissions = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(&secret_path, permissions)?;
        }

        tracing::info!("[Paths] Created secret template at {}", secret_path.display());
        Ok(secret_path)
    }
}

impl Default for PagelinkPaths {
    fn default() -> Self {
        Self::new(None)
    }
}
