//! Secret service implementation.
//!
//! Reads credentials from secret.json and lets environment variables take
//! precedence over the file.

use crate::paths::PagelinkPaths;
use anyhow::Result;
use pagelink_core::config::{BackendSecret, PlatformSecret, SecretConfig};
use pagelink_core::secret::SecretService;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

pub const BACKEND_TOKEN_ENV: &str = "PAGELINK_BACKEND_TOKEN";
pub const USER_ACCESS_TOKEN_ENV: &str = "PAGELINK_USER_ACCESS_TOKEN";

/// Service for managing secret configuration.
///
/// Secrets are cached after the first successful load.
///
/// # Example
///
/// ```ignore
/// use pagelink_infrastructure::SecretServiceImpl;
/// use pagelink_core::secret::SecretService;
///
/// let service = SecretServiceImpl::new(None)?;
/// let secrets = service.load_secrets().await?;
/// ```
#[derive(Clone)]
pub struct SecretServiceImpl {
    secrets: Arc<RwLock<Option<SecretConfig>>>,
    file_path: PathBuf,
}

impl SecretServiceImpl {
    /// Creates a new SecretServiceImpl, writing a template secret.json
    /// (mode 600) when none exists.
    pub fn new(base_path: Option<&Path>) -> Result<Self> {
        let file_path = PagelinkPaths::new(base_path)
            .ensure_secret_file()
            .map_err(|e| anyhow::anyhow!("Failed to prepare secret file: {}", e))?;

        Ok(Self {
            secrets: Arc::new(RwLock::new(None)),
            file_path,
        })
    }

    async fn load_secrets_internal(&self) -> Result<SecretConfig, String> {
        {
            let read_lock = self.secrets.read().unwrap_or_else(|e| e.into_inner());
            if let Some(ref cached) = *read_lock {
                return Ok(cached.clone());
            }
        }

        let contents = tokio::fs::read_to_string(&self.file_path)
            .await
            .map_err(|e| format!("Failed to read secret file: {}", e.kind()))?;
        // serde errors may echo input; keep only the position
        let mut loaded: SecretConfig = serde_json::from_str(&contents).map_err(|e| {
            format!(
                "Failed to parse secret file at line {} column {}",
                e.line(),
                e.column()
            )
        })?;
        apply_env_secrets(&mut loaded, |key| std::env::var(key).ok());

        {
            let mut write_lock = self.secrets.write().unwrap_or_else(|e| e.into_inner());
            *write_lock = Some(loaded.clone());
        }

        Ok(loaded)
    }
}

#[async_trait::async_trait]
impl SecretService for SecretServiceImpl {
    async fn load_secrets(&self) -> Result<SecretConfig, String> {
        self.load_secrets_internal().await
    }

    async fn secret_file_exists(&self) -> bool {
        tokio::fs::try_exists(&self.file_path).await.unwrap_or(false)
    }
}

/// Environment credentials override the file.
pub fn apply_env_secrets<F>(secrets: &mut SecretConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(token) = lookup(BACKEND_TOKEN_ENV).filter(|v| !v.trim().is_empty()) {
        secrets.backend = Some(BackendSecret { api_token: token });
    }
    if let Some(token) = lookup(USER_ACCESS_TOKEN_ENV).filter(|v| !v.trim().is_empty()) {
        secrets.platform = Some(PlatformSecret {
            user_access_token: Some(token),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_secret_service_creates_template() {
        let dir = tempfile::tempdir().unwrap();
        let service = SecretServiceImpl::new(Some(dir.path())).unwrap();

        assert!(service.secret_file_exists().await);
        let secrets = service.load_secrets().await.unwrap();
        let api_token = secrets.backend.map(|b| b.api_token).unwrap_or_default();
        // Template token is empty unless the environment provides one
        if std::env::var(BACKEND_TOKEN_ENV).is_err() {
            assert!(api_token.is_empty());
        }
    }

    #[tokio::test]
    async fn test_secret_service_reads_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("secret.json"),
            r#"{"backend": {"api_token": "tok-123"}, "platform": {"user_access_token": "EAAB"}}"#,
        )
        .unwrap();
        let service = SecretServiceImpl::new(Some(dir.path())).unwrap();

        let secrets = service.load_secrets().await.unwrap();
        let user_token = secrets.platform.and_then(|p| p.user_access_token);
        if std::env::var(USER_ACCESS_TOKEN_ENV).is_err() {
            assert_eq!(user_token.as_deref(), Some("EAAB"));
        }
    }

    #[tokio::test]
    async fn test_parse_error_does_not_leak_contents() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("secret.json"), r#"{"backend": "tok-secret"#).unwrap();
        let service = SecretServiceImpl::new(Some(dir.path())).unwrap();

        let err = service.load_secrets().await.unwrap_err();
        assert!(!err.contains("tok-secret"));
    }

    #[test]
    fn test_env_secrets_override_file() {
        let mut secrets = SecretConfig {
            backend: Some(BackendSecret {
                api_token: "from-file".into(),
            }),
            platform: None,
        };
        apply_env_secrets(&mut secrets, |key| match key {
            BACKEND_TOKEN_ENV => Some("from-env".into()),
            _ => None,
        });

        assert_eq!(secrets.backend.unwrap().api_token, "from-env");
        assert!(secrets.platform.is_none());
    }
}
