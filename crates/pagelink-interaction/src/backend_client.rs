//! HttpBackendClient - reqwest implementation of the backend contract.
//!
//! Every call carries the bearer API token and a per-request timeout.
//! Non-success responses are decoded into `BackendError::Status` with the
//! first message the backend provides (`message`, `detail` or `error`).

use async_trait::async_trait;
use pagelink_core::automation::{AutomationKind, AutomationRule, AutomationRulePatch};
use pagelink_core::backend::{
    BackendApi, BackendError, BackendResult, BackendUser, ConnectionStatus, CreatedPost,
    GeneratedImage, GeneratedText, ImagePlacement, LinkAccountRequest, LinkAccountResponse,
    LinkedAccount, Platform,
};
use pagelink_core::config::BackendSettings;
use pagelink_core::post::RawPost;
use pagelink_core::publish::PublishRequest;
use pagelink_core::secret::SecretService;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Backend client speaking the REST API.
#[derive(Clone)]
pub struct HttpBackendClient {
    client: Client,
    base_url: String,
    api_token: Option<String>,
    timeout: Duration,
}

/// Lists come back bare or wrapped under a collection key.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ListEnvelope<T> {
    Bare(Vec<T>),
    Wrapped {
        #[serde(alias = "accounts", alias = "posts", alias = "rules", alias = "data")]
        items: Vec<T>,
    },
}

impl<T> ListEnvelope<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            ListEnvelope::Bare(items) | ListEnvelope::Wrapped { items } => items,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<serde_json::Value>,
    #[serde(default)]
    detail: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<serde_json::Value>,
    #[serde(default)]
    code: Option<serde_json::Value>,
}

fn code_string(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[derive(Debug, Serialize)]
struct GenerateTextRequest<'a> {
    prompt: &'a str,
}

#[derive(Debug, Serialize)]
struct GenerateImageRequest<'a> {
    prompt: &'a str,
    placement: ImagePlacement,
}

/// Pulls a readable message (and an optional code) out of a JSON value
/// that is either a string or an object carrying `message`/`code`.
fn message_and_code(value: &serde_json::Value) -> Option<(String, Option<String>)> {
    match value {
        serde_json::Value::String(s) if !s.trim().is_empty() => Some((s.clone(), None)),
        serde_json::Value::Object(map) => {
            let message = map
                .get("message")
                .or_else(|| map.get("msg"))
                .and_then(|m| m.as_str())?
                .to_string();
            let code = map.get("code").and_then(code_string);
            Some((message, code))
        }
        serde_json::Value::Array(items) => items.iter().find_map(message_and_code),
        _ => None,
    }
}

/// Builds a `BackendError::Status` from a failed response body.
pub(crate) fn status_error(status: u16, body: &str) -> BackendError {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();

    let extracted = [&parsed.message, &parsed.detail, &parsed.error]
        .into_iter()
        .flatten()
        .find_map(message_and_code);

    let (message, nested_code) = match extracted {
        Some((message, code)) => (message, code),
        None if !body.trim().is_empty() && parsed.code.is_none() => {
            (body.trim().chars().take(200).collect(), None)
        }
        None => (
            reqwest::StatusCode::from_u16(status)
                .ok()
                .and_then(|s| s.canonical_reason())
                .unwrap_or("Request failed")
                .to_string(),
            None,
        ),
    };

    BackendError::Status {
        status,
        message,
        code: parsed.code.as_ref().and_then(code_string).or(nested_code),
    }
}

impl HttpBackendClient {
    /// Creates a client with explicit configuration.
    pub fn new(base_url: impl Into<String>, api_token: Option<String>, timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_token,
            timeout,
        }
    }

    pub fn from_settings(settings: &BackendSettings, api_token: Option<String>) -> Self {
        Self::new(settings.base_url.clone(), api_token, settings.request_timeout())
    }

    /// Builds a client from backend settings and the token held by the
    /// secret service (secret.json or `PAGELINK_BACKEND_TOKEN`).
    ///
    /// Returns error if no API token is configured.
    pub async fn from_secrets(
        settings: &BackendSettings,
        secrets: &dyn SecretService,
    ) -> Result<Self, String> {
        tracing::debug!("[BackendClient] from_secrets: Starting credential lookup");

        let loaded = secrets.load_secrets().await?;
        let api_token = loaded
            .backend
            .map(|b| b.api_token)
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| {
                "No backend API token found in secret.json or PAGELINK_BACKEND_TOKEN".to_string()
            })?;

        tracing::info!(
            "[BackendClient] Initialized with URL: {}, API token: present",
            settings.base_url
        );

        Ok(Self::from_settings(settings, Some(api_token)))
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Makes an authenticated request to the backend.
    fn auth_request(&self, request: RequestBuilder) -> RequestBuilder {
        let request = request.timeout(self.timeout);
        if let Some(api_token) = &self.api_token {
            request.header("Authorization", format!("Bearer {}", api_token))
        } else {
            request
        }
    }

    async fn execute(&self, request: RequestBuilder) -> BackendResult<String> {
        let response = self
            .auth_request(request)
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        if status.is_success() {
            Ok(body)
        } else {
            let err = status_error(status.as_u16(), &body);
            tracing::debug!("[BackendClient] {}", err);
            Err(err)
        }
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> BackendResult<T> {
        let body = self.execute(request).await?;
        serde_json::from_str(&body).map_err(|e| BackendError::Decode(e.to_string()))
    }

    async fn send_list<T: DeserializeOwned>(&self, request: RequestBuilder) -> BackendResult<Vec<T>> {
        let envelope: ListEnvelope<T> = self.send(request).await?;
        Ok(envelope.into_vec())
    }
}

#[async_trait]
impl BackendApi for HttpBackendClient {
    async fn get_connection_status(&self) -> BackendResult<ConnectionStatus> {
        self.send(self.client.get(self.url("/social/facebook/status")))
            .await
    }

    async fn list_linked_accounts(&self) -> BackendResult<Vec<LinkedAccount>> {
        let request = self
            .client
            .get(self.url("/social/accounts"))
            .query(&[("platform", Platform::Facebook.as_str())]);
        self.send_list(request).await
    }

    async fn link_account(
        &self,
        request: &LinkAccountRequest,
    ) -> BackendResult<LinkAccountResponse> {
        tracing::debug!(
            "[BackendClient] Linking {} with {} page(s)",
            request.platform_user_id,
            request.pages.len()
        );
        self.send(self.client.post(self.url("/social/facebook/link")).json(request))
            .await
    }

    async fn unlink_account(&self) -> BackendResult<()> {
        self.execute(self.client.delete(self.url("/social/facebook/link")))
            .await
            .map(|_| ())
    }

    async fn list_posts(
        &self,
        platform: Platform,
        limit: usize,
        account_id: &str,
    ) -> BackendResult<Vec<RawPost>> {
        let limit = limit.to_string();
        let request = self.client.get(self.url("/social/posts")).query(&[
            ("platform", platform.as_str()),
            ("limit", limit.as_str()),
            ("account_id", account_id),
        ]);
        self.send_list(request).await
    }

    async fn create_post(
        &self,
        page_id: &str,
        request: &PublishRequest,
    ) -> BackendResult<CreatedPost> {
        let url = self.url(&format!("/social/pages/{}/posts", page_id));
        self.send(self.client.post(url).json(request)).await
    }

    async fn generate_text_content(&self, prompt: &str) -> BackendResult<GeneratedText> {
        let body = GenerateTextRequest { prompt };
        self.send(self.client.post(self.url("/ai/generate/text")).json(&body))
            .await
    }

    async fn generate_image(
        &self,
        prompt: &str,
        placement: ImagePlacement,
    ) -> BackendResult<GeneratedImage> {
        let body = GenerateImageRequest { prompt, placement };
        self.send(self.client.post(self.url("/ai/generate/image")).json(&body))
            .await
    }

    async fn list_automation_rules(
        &self,
        platform: Platform,
        kind: AutomationKind,
    ) -> BackendResult<Vec<AutomationRule>> {
        let request = self
            .client
            .get(self.url("/automation/rules"))
            .query(&[("platform", platform.as_str()), ("kind", kind.as_str())]);
        self.send_list(request).await
    }

    async fn update_automation_rule(
        &self,
        id: &str,
        patch: &AutomationRulePatch,
    ) -> BackendResult<AutomationRule> {
        let url = self.url(&format!("/automation/rules/{}", id));
        self.send(self.client.patch(url).json(patch)).await
    }

    async fn delete_scheduled_post(&self, id: &str) -> BackendResult<()> {
        let url = self.url(&format!("/social/scheduled-posts/{}", id));
        self.execute(self.client.delete(url)).await.map(|_| ())
    }

    async fn get_current_user(&self) -> BackendResult<BackendUser> {
        self.send(self.client.get(self.url("/auth/me"))).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagelink_core::config::{BackendSecret, SecretConfig};

    #[test]
    fn test_status_error_prefers_message() {
        let err = status_error(400, r#"{"message": "Page not found", "code": "not_found"}"#);
        assert_eq!(err.message(), "Page not found");
        assert_eq!(err.code(), Some("not_found"));
    }

    #[test]
    fn test_status_error_reads_detail_object() {
        let err = status_error(
            502,
            r#"{"detail": {"message": "Token exchange failed", "code": "token_exchange_failed"}}"#,
        );
        assert_eq!(err.message(), "Token exchange failed");
        assert_eq!(err.code(), Some("token_exchange_failed"));
        assert_eq!(err.status(), Some(502));
    }

    #[test]
    fn test_status_error_falls_back_to_reason() {
        let err = status_error(401, "");
        assert_eq!(err.message(), "Unauthorized");
        assert!(err.is_unauthorized());
    }

    #[test]
    fn test_status_error_uses_plain_text_body() {
        let err = status_error(500, "upstream exploded");
        assert_eq!(err.message(), "upstream exploded");
    }

    struct FixedSecrets(SecretConfig);

    #[async_trait]
    impl SecretService for FixedSecrets {
        async fn load_secrets(&self) -> Result<SecretConfig, String> {
            Ok(self.0.clone())
        }

        async fn secret_file_exists(&self) -> bool {
            true
        }
    }

    #[tokio::test]
    async fn test_from_secrets_requires_token() {
        let settings = BackendSettings::default();

        let blank = FixedSecrets(SecretConfig {
            backend: Some(BackendSecret {
                api_token: "  ".into(),
            }),
            ..Default::default()
        });
        assert!(HttpBackendClient::from_secrets(&settings, &blank).await.is_err());

        let present = FixedSecrets(SecretConfig {
            backend: Some(BackendSecret {
                api_token: "backend-token".into(),
            }),
            ..Default::default()
        });
        let client = HttpBackendClient::from_secrets(&settings, &present).await.unwrap();
        assert_eq!(client.api_token.as_deref(), Some("backend-token"));
    }
}
