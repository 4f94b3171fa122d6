//! Configuration types.
//!
//! `PagelinkConfig` mirrors `config.toml`; every field has a default so a
//! missing or partial file still yields a usable configuration.
//! Credentials live separately in `SecretConfig` (`secret.json`).

use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_GRAPH_BASE_URL: &str = "https://graph.facebook.com";
pub const DEFAULT_GRAPH_API_VERSION: &str = "v19.0";
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000/api";

/// App ids that are clearly template values rather than real ids.
const PLACEHOLDER_APP_IDS: [&str; 5] = ["your_app_id", "your-app-id", "app_id", "changeme", "0"];

/// Returns true when `app_id` is blank or a known placeholder.
pub fn is_placeholder_app_id(app_id: &str) -> bool {
    let normalized = app_id.trim().to_ascii_lowercase();
    normalized.is_empty()
        || PLACEHOLDER_APP_IDS.contains(&normalized.as_str())
        || normalized.chars().all(|c| c == 'x')
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PagelinkConfig {
    #[serde(default)]
    pub platform: PlatformSettings,
    #[serde(default)]
    pub backend: BackendSettings,
    #[serde(default)]
    pub timing: TimingSettings,
    #[serde(default)]
    pub history: HistorySettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformSettings {
    /// Platform application id. There is no built-in fallback.
    #[serde(default)]
    pub app_id: Option<String>,
    #[serde(default = "default_graph_base_url")]
    pub graph_base_url: String,
    #[serde(default = "default_graph_api_version")]
    pub api_version: String,
    /// Extra scopes requested on top of the defaults
    #[serde(default)]
    pub extra_scopes: Vec<String>,
}

fn default_graph_base_url() -> String {
    DEFAULT_GRAPH_BASE_URL.to_string()
}

fn default_graph_api_version() -> String {
    DEFAULT_GRAPH_API_VERSION.to_string()
}

impl Default for PlatformSettings {
    fn default() -> Self {
        Self {
            app_id: None,
            graph_base_url: default_graph_base_url(),
            api_version: default_graph_api_version(),
            extra_scopes: Vec::new(),
        }
    }
}

impl PlatformSettings {
    /// Login scopes: the defaults followed by any configured extras.
    pub fn scopes(&self) -> Vec<String> {
        let mut scopes: Vec<String> = crate::platform::DEFAULT_LOGIN_SCOPES
            .iter()
            .map(|s| s.to_string())
            .collect();
        for extra in &self.extra_scopes {
            if !scopes.contains(extra) {
                scopes.push(extra.clone());
            }
        }
        scopes
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendSettings {
    #[serde(default = "default_backend_url")]
    pub base_url: String,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_backend_url() -> String {
    DEFAULT_BACKEND_URL.to_string()
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            base_url: default_backend_url(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl BackendSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Timers of the connection subsystem, all in milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingSettings {
    pub sdk_init_timeout_ms: u64,
    pub sdk_call_timeout_ms: u64,
    pub rematch_initial_delay_ms: u64,
    pub rematch_backoff_factor: u32,
    pub rematch_max_attempts: u32,
    pub history_reload_delay_ms: u64,
    pub unauthorized_grace_ms: u64,
}

impl Default for TimingSettings {
    fn default() -> Self {
        Self {
            sdk_init_timeout_ms: 10_000,
            sdk_call_timeout_ms: 30_000,
            rematch_initial_delay_ms: 3_000,
            rematch_backoff_factor: 2,
            rematch_max_attempts: 3,
            history_reload_delay_ms: 2_000,
            unauthorized_grace_ms: 1_500,
        }
    }
}

impl TimingSettings {
    pub fn sdk_init_timeout(&self) -> Duration {
        Duration::from_millis(self.sdk_init_timeout_ms)
    }

    pub fn sdk_call_timeout(&self) -> Duration {
        Duration::from_millis(self.sdk_call_timeout_ms)
    }

    pub fn history_reload_delay(&self) -> Duration {
        Duration::from_millis(self.history_reload_delay_ms)
    }

    pub fn unauthorized_grace(&self) -> Duration {
        Duration::from_millis(self.unauthorized_grace_ms)
    }

    pub fn rematch_policy(&self) -> RematchPolicy {
        RematchPolicy {
            initial_delay: Duration::from_millis(self.rematch_initial_delay_ms),
            backoff_factor: self.rematch_backoff_factor.max(1),
            max_attempts: self.rematch_max_attempts,
        }
    }
}

/// Bounded retry-with-backoff for the deferred re-match.
///
/// `max_attempts = 1` is a single deferred re-match after `initial_delay`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RematchPolicy {
    pub initial_delay: Duration,
    pub backoff_factor: u32,
    pub max_attempts: u32,
}

impl RematchPolicy {
    /// Delay to wait before each attempt.
    pub fn delays(&self) -> Vec<Duration> {
        let factor = self.backoff_factor.max(1);
        let mut next = self.initial_delay;
        (0..self.max_attempts)
            .map(|_| {
                let current = next;
                next = next.saturating_mul(factor);
                current
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistorySettings {
    /// Posts fetched per page
    pub limit: usize,
    /// Size of the list shown in both views when nothing classifies
    pub degraded_cap: usize,
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self {
            limit: 50,
            degraded_cap: 10,
        }
    }
}

/// Root structure of secret.json
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SecretConfig {
    #[serde(default)]
    pub backend: Option<BackendSecret>,
    #[serde(default)]
    pub platform: Option<PlatformSecret>,
}

/// Backend API credentials
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BackendSecret {
    pub api_token: String,
}

/// Platform credentials used by the headless login flow
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlatformSecret {
    #[serde(default)]
    pub user_access_token: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: PagelinkConfig = toml::from_str(
            r#"
            [platform]
            app_id = "1234567890"

            [timing]
            rematch_max_attempts = 1
            "#,
        )
        .unwrap();

        assert_eq!(config.platform.app_id.as_deref(), Some("1234567890"));
        assert_eq!(config.platform.graph_base_url, DEFAULT_GRAPH_BASE_URL);
        assert_eq!(config.timing.rematch_max_attempts, 1);
        assert_eq!(config.timing.sdk_init_timeout_ms, 10_000);
        assert_eq!(config.history.limit, 50);
    }

    #[test]
    fn test_rematch_delays_back_off() {
        let policy = RematchPolicy {
            initial_delay: Duration::from_millis(100),
            backoff_factor: 2,
            max_attempts: 3,
        };
        let delays = policy.delays();
        assert_eq!(
            delays,
            vec![
                Duration::from_millis(100),
                Duration::from_millis(200),
                Duration::from_millis(400)
            ]
        );
    }

    #[test]
    fn test_placeholder_app_ids() {
        assert!(is_placeholder_app_id(""));
        assert!(is_placeholder_app_id("YOUR_APP_ID"));
        assert!(is_placeholder_app_id("xxxxxxxx"));
        assert!(!is_placeholder_app_id("1234567890"));
    }

    #[test]
    fn test_scopes_include_extras_once() {
        let settings = PlatformSettings {
            extra_scopes: vec!["email".into(), "instagram_basic".into()],
            ..Default::default()
        };
        let scopes = settings.scopes();
        assert_eq!(scopes.iter().filter(|s| *s == "email").count(), 1);
        assert_eq!(scopes.last().map(String::as_str), Some("instagram_basic"));
    }
}
