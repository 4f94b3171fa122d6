use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Social platform the backend federates with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    #[default]
    Facebook,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Facebook => "facebook",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Backend view of the current federation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionStatus {
    #[serde(default)]
    pub connected: bool,
    #[serde(default)]
    pub account_name: Option<String>,
    #[serde(default)]
    pub platform_user_id: Option<String>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

/// A canonical account record owned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkedAccount {
    /// Backend internal id
    pub id: String,
    /// Platform id of the page/profile this record federates
    #[serde(alias = "platformUserId", alias = "external_id")]
    pub platform_user_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub platform: Option<Platform>,
}

impl LinkedAccount {
    pub fn new(id: impl Into<String>, platform_user_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            platform_user_id: platform_user_id.into(),
            name: None,
            platform: Some(Platform::Facebook),
        }
    }
}

/// Page summary sent along with a link request.
#[derive(Debug, Clone, Serialize)]
pub struct LinkPagePayload {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
}

/// Body of `linkAccount`.
#[derive(Debug, Clone, Serialize)]
pub struct LinkAccountRequest {
    pub access_token: String,
    pub platform_user_id: String,
    pub user_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub pages: Vec<LinkPagePayload>,
}

/// Raw `linkAccount` response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LinkAccountResponse {
    #[serde(default)]
    pub accounts: Vec<LinkedAccount>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub expires_in: Option<i64>,
}

/// Token kind reported by a link response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    ShortLived,
    LongLivedUser,
}

/// Wire value of the long-lived token variant.
pub const LONG_LIVED_USER_TOKEN: &str = "long_lived_user_token";

impl LinkAccountResponse {
    pub fn token_kind(&self) -> TokenKind {
        match self.token_type.as_deref() {
            Some(LONG_LIVED_USER_TOKEN) => TokenKind::LongLivedUser,
            _ => TokenKind::ShortLived,
        }
    }

    /// Absolute expiry, from `expires_at` or `now + expires_in`.
    /// An `expires_in` past the representable range counts as unknown.
    pub fn expiry(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.expires_at.or_else(|| {
            self.expires_in
                .filter(|secs| *secs > 0)
                .and_then(chrono::Duration::try_seconds)
                .and_then(|lifetime| now.checked_add_signed(lifetime))
        })
    }
}

/// Acknowledgement of `createPost`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CreatedPost {
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub scheduled_for: Option<DateTime<Utc>>,
}

/// Result of `generateTextContent`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GeneratedText {
    #[serde(alias = "text")]
    pub content: String,
}

/// Result of `generateImage`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedImage {
    #[serde(alias = "image_url")]
    pub url: String,
    pub filename: String,
}

/// Where a generated image will be shown; drives its aspect ratio.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImagePlacement {
    #[default]
    Feed,
    Story,
}

/// The backend user the API token belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BackendUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_long_lived_token_variant() {
        let json = serde_json::json!({
            "accounts": [{"id": "acc-1", "platform_user_id": "p1"}],
            "token_type": "long_lived_user_token",
            "expires_in": 3600
        });
        let response: LinkAccountResponse = serde_json::from_value(json).unwrap();
        let now = Utc::now();

        assert_eq!(response.token_kind(), TokenKind::LongLivedUser);
        assert_eq!(response.expiry(now), Some(now + chrono::Duration::seconds(3600)));
        assert_eq!(response.accounts[0].platform_user_id, "p1");
    }

    #[test]
    fn test_out_of_range_lifetime_has_no_expiry() {
        let response = LinkAccountResponse {
            token_type: Some(LONG_LIVED_USER_TOKEN.to_string()),
            expires_in: Some(i64::MAX),
            ..Default::default()
        };
        assert_eq!(response.expiry(Utc::now()), None);

        let response = LinkAccountResponse {
            expires_in: Some(0),
            ..Default::default()
        };
        assert_eq!(response.expiry(Utc::now()), None);
    }

    #[test]
    fn test_linked_account_accepts_camel_case_alias() {
        let json = serde_json::json!({"id": "acc-1", "platformUserId": "p9"});
        let account: LinkedAccount = serde_json::from_value(json).unwrap();
        assert_eq!(account.platform_user_id, "p9");
    }
}
