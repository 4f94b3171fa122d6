//! GraphApiSdk - platform SDK backed by the graph HTTP API.
//!
//! Headless stand-in for the browser SDK: `login` authorizes with a
//! configured user access token instead of showing a dialog.

use async_trait::async_trait;
use pagelink_core::config::PlatformSettings;
use pagelink_core::page::AccessToken;
use pagelink_core::platform::{ApiParams, LoginStatus, PlatformSdk};
use pagelink_core::{PagelinkError, Result};
use reqwest::Client;
use serde::Deserialize;
use std::sync::RwLock;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Default)]
struct SdkState {
    app_id: Option<String>,
    session_token: Option<AccessToken>,
}

pub struct GraphApiSdk {
    client: Client,
    base_url: String,
    api_version: String,
    user_access_token: Option<AccessToken>,
    state: RwLock<SdkState>,
}

#[derive(Debug, Deserialize)]
struct GraphErrorEnvelope {
    error: GraphError,
}

#[derive(Debug, Deserialize)]
struct GraphError {
    message: String,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    code: Option<i64>,
}

impl GraphError {
    /// OAuth errors mean the token itself was rejected.
    fn is_oauth(&self) -> bool {
        self.kind.as_deref() == Some("OAuthException") || self.code == Some(190)
    }
}

impl GraphApiSdk {
    pub fn new(
        base_url: impl Into<String>,
        api_version: impl Into<String>,
        user_access_token: Option<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_version: api_version.into(),
            user_access_token: user_access_token
                .map(AccessToken::new)
                .filter(|t| !t.is_empty()),
            state: RwLock::new(SdkState::default()),
        }
    }

    pub fn from_settings(settings: &PlatformSettings, user_access_token: Option<String>) -> Self {
        Self::new(
            settings.graph_base_url.clone(),
            settings.api_version.clone(),
            user_access_token,
        )
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}/{}",
            self.base_url,
            self.api_version,
            path.trim_start_matches('/')
        )
    }

    fn session_token(&self) -> Option<AccessToken> {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        state.session_token.clone()
    }

    async fn get(&self, path: &str, params: &ApiParams) -> std::result::Result<serde_json::Value, GraphCallError> {
        let response = self
            .client
            .get(self.endpoint(path))
            .query(params)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| GraphCallError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GraphCallError::Transport(e.to_string()))?;

        if status.is_success() {
            return serde_json::from_str(&body).map_err(|e| GraphCallError::Transport(e.to_string()));
        }

        match serde_json::from_str::<GraphErrorEnvelope>(&body) {
            Ok(envelope) => Err(GraphCallError::Graph(envelope.error)),
            Err(_) => Err(GraphCallError::Transport(format!(
                "graph returned {}",
                status.as_u16()
            ))),
        }
    }
}

enum GraphCallError {
    Graph(GraphError),
    Transport(String),
}

impl From<GraphCallError> for PagelinkError {
    fn from(err: GraphCallError) -> Self {
        match err {
            GraphCallError::Graph(e) => PagelinkError::Sdk(e.message),
            GraphCallError::Transport(message) => PagelinkError::Sdk(message),
        }
    }
}

#[async_trait]
impl PlatformSdk for GraphApiSdk {
    async fn init(&self, app_id: &str) -> Result<()> {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        state.app_id = Some(app_id.to_string());
        tracing::debug!("[GraphApiSdk] Initialized for app {}", app_id);
        Ok(())
    }

    fn is_ready(&self) -> bool {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        state.app_id.is_some()
    }

    async fn login(&self, scopes: &[String]) -> Result<LoginStatus> {
        if !self.is_ready() {
            return Err(PagelinkError::sdk_load("SDK is not initialized"));
        }
        let Some(token) = self.user_access_token.clone() else {
            tracing::info!("[GraphApiSdk] No user access token configured, login dismissed");
            return Ok(LoginStatus::Unknown);
        };

        tracing::debug!("[GraphApiSdk] Logging in with {} scope(s)", scopes.len());

        let mut params = ApiParams::new();
        params.insert("fields".into(), "id".into());
        params.insert("access_token".into(), token.expose().to_string());

        match self.get("me", &params).await {
            Ok(_) => {
                let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
                state.session_token = Some(token.clone());
                Ok(LoginStatus::Connected {
                    access_token: token,
                })
            }
            Err(GraphCallError::Graph(e)) if e.is_oauth() => {
                tracing::warn!("[GraphApiSdk] Token rejected: {}", e.message);
                Ok(LoginStatus::NotAuthorized)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn api(&self, path: &str, params: &ApiParams) -> Result<serde_json::Value> {
        if !self.is_ready() {
            return Err(PagelinkError::sdk_load("SDK is not initialized"));
        }
        let mut params = params.clone();
        if !params.contains_key("access_token")
            && let Some(token) = self.session_token()
        {
            params.insert("access_token".into(), token.expose().to_string());
        }
        Ok(self.get(path, &params).await?)
    }

    async fn logout(&self) -> Result<()> {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        state.session_token = None;
        Ok(())
    }

    async fn teardown(&self) {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        *state = SdkState::default();
        tracing::debug!("[GraphApiSdk] Torn down");
    }
}
