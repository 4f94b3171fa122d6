//! SdkGateway - the only owner of the platform SDK handle.
//!
//! Wraps every SDK call with a timeout and the gateway's cancellation
//! token, and decodes graph payloads into domain types.

use pagelink_core::config::{TimingSettings, is_placeholder_app_id};
use pagelink_core::page::{AccessToken, PageAccount};
use pagelink_core::platform::{
    ApiParams, GraphList, LoginStatus, PageDescriptor, PermissionGrant, PlatformIdentity,
    PlatformSdk, granted_permissions,
};
use pagelink_core::{PagelinkError, Result};
use serde::de::DeserializeOwned;
use std::collections::HashSet;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const PAGE_FIELDS: &str = "id,name,category,access_token,tasks,followers_count";
const PAGE_LIMIT: &str = "100";

pub struct SdkGateway {
    sdk: Arc<dyn PlatformSdk>,
    app_id: Option<String>,
    init_timeout: Duration,
    call_timeout: Duration,
    /// Serializes `load` so concurrent callers initialize once
    load_lock: tokio::sync::Mutex<()>,
    cancel: Mutex<CancellationToken>,
}

impl SdkGateway {
    pub fn new(sdk: Arc<dyn PlatformSdk>, app_id: Option<String>, timing: &TimingSettings) -> Self {
        Self {
            sdk,
            app_id,
            init_timeout: timing.sdk_init_timeout(),
            call_timeout: timing.sdk_call_timeout(),
            load_lock: tokio::sync::Mutex::new(()),
            cancel: Mutex::new(CancellationToken::new()),
        }
    }

    fn current_token(&self) -> CancellationToken {
        self.cancel
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Cancels every in-flight SDK call and arms a fresh token.
    pub fn cancel_pending(&self) {
        let mut guard = self.cancel.lock().unwrap_or_else(|e| e.into_inner());
        guard.cancel();
        *guard = CancellationToken::new();
    }

    async fn guarded<T, F>(&self, operation: &str, future: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let cancel = self.current_token();
        tokio::select! {
            _ = cancel.cancelled() => Err(PagelinkError::Cancelled),
            outcome = tokio::time::timeout(self.call_timeout, future) => match outcome {
                Ok(result) => result,
                Err(_) => {
                    tracing::warn!("[SdkGateway] {} timed out", operation);
                    Err(PagelinkError::timeout(operation, self.call_timeout))
                }
            },
        }
    }

    async fn call<T: DeserializeOwned>(&self, path: &str, params: ApiParams) -> Result<T> {
        let value = self
            .guarded(path, self.sdk.api(path, &params))
            .await?;
        serde_json::from_value(value)
            .map_err(|e| PagelinkError::Sdk(format!("Unexpected payload from {}: {}", path, e)))
    }

    /// Loads the SDK. Returns immediately when it is already usable.
    pub async fn load(&self) -> Result<()> {
        let _load = self.load_lock.lock().await;
        if self.sdk.is_ready() {
            return Ok(());
        }

        let app_id = match self.app_id.as_deref() {
            Some(id) if !is_placeholder_app_id(id) => id,
            Some(_) => return Err(PagelinkError::sdk_load("App id is a placeholder value")),
            None => return Err(PagelinkError::sdk_load("App id is not configured")),
        };

        // Stale handles from an earlier failed load would shadow the new one
        self.sdk.teardown().await;

        match tokio::time::timeout(self.init_timeout, self.sdk.init(app_id)).await {
            Ok(Ok(())) if self.sdk.is_ready() => {
                tracing::info!("[SdkGateway] SDK loaded");
                Ok(())
            }
            Ok(Ok(())) => Err(PagelinkError::sdk_load(
                "SDK initialized but is not functional",
            )),
            Ok(Err(e)) => Err(PagelinkError::sdk_load(e.to_string())),
            Err(_) => {
                self.sdk.teardown().await;
                Err(PagelinkError::sdk_load(format!(
                    "SDK did not initialize within {}ms",
                    self.init_timeout.as_millis()
                )))
            }
        }
    }

    /// Runs platform login and returns the user access token.
    pub async fn login(&self, scopes: &[String]) -> Result<AccessToken> {
        match self.guarded("login", self.sdk.login(scopes)).await? {
            LoginStatus::Connected { access_token } => Ok(access_token),
            LoginStatus::NotAuthorized => Err(PagelinkError::AuthNotAuthorized),
            LoginStatus::Unknown => Err(PagelinkError::AuthCancelled),
        }
    }

    /// Permissions currently granted to the app.
    pub async fn fetch_permissions(&self, token: &AccessToken) -> Result<HashSet<String>> {
        let grants: GraphList<PermissionGrant> =
            self.call("me/permissions", token_params(token)).await?;
        Ok(granted_permissions(&grants.data))
    }

    pub async fn fetch_identity(&self, token: &AccessToken) -> Result<PlatformIdentity> {
        let mut params = token_params(token);
        params.insert("fields".into(), "id,name,email".into());
        self.call("me", params).await
    }

    /// Pages the user manages, with capabilities derived from task grants.
    pub async fn fetch_pages(&self, token: &AccessToken) -> Result<Vec<PageAccount>> {
        let mut params = token_params(token);
        params.insert("fields".into(), PAGE_FIELDS.into());
        params.insert("limit".into(), PAGE_LIMIT.into());
        let pages: GraphList<PageDescriptor> = self.call("me/accounts", params).await?;
        tracing::debug!("[SdkGateway] Platform reported {} page(s)", pages.data.len());
        Ok(pages
            .data
            .into_iter()
            .map(PageDescriptor::into_page_account)
            .collect())
    }

    pub async fn logout(&self) -> Result<()> {
        if !self.sdk.is_ready() {
            return Ok(());
        }
        match tokio::time::timeout(self.call_timeout, self.sdk.logout()).await {
            Ok(result) => result,
            Err(_) => Err(PagelinkError::timeout("logout", self.call_timeout)),
        }
    }

    pub async fn teardown(&self) {
        self.cancel_pending();
        self.sdk.teardown().await;
    }
}

fn token_params(token: &AccessToken) -> ApiParams {
    let mut params = ApiParams::new();
    params.insert("access_token".into(), token.expose().to_string());
    params
}

#[cfg(test)]
#[path = "sdk_gateway_test.rs"]
mod tests;
