//! Third-party platform SDK surface.
//!
//! The SDK is injected as a `PlatformSdk` trait object owned by the
//! gateway; orchestration code never talks to it directly. Graph payload
//! types live here so every SDK implementation decodes them identically.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use crate::error::Result;
use crate::page::{AccessToken, PageAccount, PageCapabilities};

/// Permissions without which pages cannot be listed or posted to.
pub const REQUIRED_PERMISSIONS: [&str; 2] = ["pages_show_list", "pages_manage_posts"];

/// Scopes requested at login.
pub const DEFAULT_LOGIN_SCOPES: [&str; 6] = [
    "public_profile",
    "email",
    "pages_show_list",
    "pages_manage_posts",
    "pages_read_engagement",
    "pages_manage_engagement",
];

/// Query parameters for a graph call.
pub type ApiParams = BTreeMap<String, String>;

/// Result of the platform login dialog.
#[derive(Debug, Clone)]
pub enum LoginStatus {
    /// The user logged in and authorized the app
    Connected { access_token: AccessToken },
    /// The user logged in but did not authorize the app
    NotAuthorized,
    /// The user closed or declined the dialog
    Unknown,
}

/// Thin async contract of the platform SDK.
#[async_trait]
pub trait PlatformSdk: Send + Sync {
    /// Initializes the SDK for `app_id`; resolves once it is usable.
    async fn init(&self, app_id: &str) -> Result<()>;

    /// Whether the SDK handle is initialized and functional.
    fn is_ready(&self) -> bool;

    /// Runs the platform login flow for the given scopes.
    async fn login(&self, scopes: &[String]) -> Result<LoginStatus>;

    /// Performs a graph API call and returns the raw JSON payload.
    async fn api(&self, path: &str, params: &ApiParams) -> Result<serde_json::Value>;

    /// Ends the platform login session.
    async fn logout(&self) -> Result<()>;

    /// Drops the SDK handle so a later `init` starts from scratch.
    async fn teardown(&self);
}

/// The logged-in platform user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformIdentity {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// Generic `{ "data": [...] }` graph list envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct GraphList<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
}

/// One row of `/me/permissions`.
#[derive(Debug, Clone, Deserialize)]
pub struct PermissionGrant {
    pub permission: String,
    pub status: String,
}

/// Collects the permissions whose status is `granted`.
pub fn granted_permissions(grants: &[PermissionGrant]) -> HashSet<String> {
    grants
        .iter()
        .filter(|g| g.status.eq_ignore_ascii_case("granted"))
        .map(|g| g.permission.clone())
        .collect()
}

/// Required permissions absent from `granted`, in declaration order.
pub fn missing_permissions(granted: &HashSet<String>) -> Vec<&'static str> {
    REQUIRED_PERMISSIONS
        .iter()
        .copied()
        .filter(|p| !granted.contains(*p))
        .collect()
}

/// Raw page descriptor as returned by `/me/accounts`.
#[derive(Debug, Clone, Deserialize)]
pub struct PageDescriptor {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub tasks: Vec<String>,
    #[serde(default, alias = "fan_count")]
    pub followers_count: Option<u64>,
}

impl PageDescriptor {
    pub fn capabilities(&self) -> PageCapabilities {
        PageCapabilities::from_tasks(&self.tasks)
    }

    pub fn into_page_account(self) -> PageAccount {
        let capabilities = self.capabilities();
        let mut page = PageAccount::new(self.id, self.name)
            .with_capabilities(capabilities)
            .with_follower_count(self.followers_count.unwrap_or(0));
        if let Some(category) = self.category {
            page = page.with_category(category);
        }
        if let Some(token) = self.access_token.filter(|t| !t.is_empty()) {
            page = page.with_token(AccessToken::new(token));
        }
        page
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_permissions() {
        let json = serde_json::json!({
            "data": [
                {"permission": "pages_show_list", "status": "granted"},
                {"permission": "pages_manage_posts", "status": "declined"},
                {"permission": "email", "status": "granted"}
            ]
        });
        let list: GraphList<PermissionGrant> = serde_json::from_value(json).unwrap();
        let granted = granted_permissions(&list.data);

        assert_eq!(missing_permissions(&granted), vec!["pages_manage_posts"]);
    }

    #[test]
    fn test_page_descriptor_conversion() {
        let json = serde_json::json!({
            "id": "123",
            "name": "Corner Bakery",
            "category": "Bakery",
            "access_token": "page-token",
            "tasks": ["ANALYZE", "CREATE_CONTENT"],
            "followers_count": 42
        });
        let descriptor: PageDescriptor = serde_json::from_value(json).unwrap();
        let page = descriptor.into_page_account();

        assert_eq!(page.external_id, "123");
        assert!(page.capabilities.can_post);
        assert!(!page.capabilities.can_comment);
        assert_eq!(page.follower_count, 42);
        assert!(page.ephemeral_token.is_some());
        assert!(!page.is_reconciled());
    }
}
