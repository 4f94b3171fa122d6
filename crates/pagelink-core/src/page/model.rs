use serde::{Deserialize, Serialize};
use std::fmt;

/// Short-lived platform credential.
///
/// Lives only in session memory: `Debug` is redacted and the value is
/// skipped wherever a `PageAccount` is serialized.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Exposes the raw token for an outgoing request.
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

/// What the operator may do on a page, derived from platform task grants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageCapabilities {
    pub can_post: bool,
    pub can_comment: bool,
}

impl PageCapabilities {
    /// Full capabilities, used for the personal profile.
    pub fn full() -> Self {
        Self {
            can_post: true,
            can_comment: true,
        }
    }

    /// Derives capabilities from the platform's task list.
    ///
    /// `MANAGE` implies both; `CREATE_CONTENT` grants posting and
    /// `MODERATE` grants commenting.
    pub fn from_tasks<S: AsRef<str>>(tasks: &[S]) -> Self {
        let has = |name: &str| tasks.iter().any(|t| t.as_ref().eq_ignore_ascii_case(name));
        let manage = has("MANAGE");
        Self {
            can_post: manage || has("CREATE_CONTENT"),
            can_comment: manage || has("MODERATE"),
        }
    }
}

/// A page or profile the operator controls on the platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageAccount {
    /// Platform-assigned id, stable and unique within a page list
    pub external_id: String,
    /// Backend-assigned id; `None` until reconciled
    internal_id: Option<String>,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub capabilities: PageCapabilities,
    pub follower_count: u64,
    #[serde(skip)]
    pub ephemeral_token: Option<AccessToken>,
}

/// Category label of the synthesized personal-profile entry.
pub const PERSONAL_PROFILE_CATEGORY: &str = "Personal profile";

impl PageAccount {
    pub fn new(external_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            external_id: external_id.into(),
            internal_id: None,
            name: name.into(),
            category: None,
            capabilities: PageCapabilities::default(),
            follower_count: 0,
            ephemeral_token: None,
        }
    }

    /// Builds the entry that stands in for the user's own profile when
    /// the platform reports no managed pages.
    pub fn personal_profile(
        external_id: impl Into<String>,
        name: impl Into<String>,
        token: Option<AccessToken>,
    ) -> Self {
        Self {
            category: Some(PERSONAL_PROFILE_CATEGORY.to_string()),
            capabilities: PageCapabilities::full(),
            ephemeral_token: token,
            ..Self::new(external_id, name)
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_capabilities(mut self, capabilities: PageCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn with_follower_count(mut self, follower_count: u64) -> Self {
        self.follower_count = follower_count;
        self
    }

    pub fn with_token(mut self, token: AccessToken) -> Self {
        self.ephemeral_token = Some(token);
        self
    }

    pub fn internal_id(&self) -> Option<&str> {
        self.internal_id.as_deref()
    }

    pub fn is_reconciled(&self) -> bool {
        self.internal_id.is_some()
    }

    pub fn is_personal_profile(&self) -> bool {
        self.category.as_deref() == Some(PERSONAL_PROFILE_CATEGORY)
    }

    /// Records the backend id. Once set it is immutable for the session;
    /// returns `false` when the call did not change anything.
    pub fn resolve_internal_id(&mut self, internal_id: &str) -> bool {
        match &self.internal_id {
            None => {
                self.internal_id = Some(internal_id.to_string());
                true
            }
            Some(existing) if existing != internal_id => {
                tracing::warn!(
                    "[Reconciliation] Ignoring internal id change for page {} ({} -> {})",
                    self.external_id,
                    existing,
                    internal_id
                );
                false
            }
            Some(_) => false,
        }
    }
}
