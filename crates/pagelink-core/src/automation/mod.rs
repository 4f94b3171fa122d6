//! Automation rule domain types.

use serde::{Deserialize, Serialize};

/// Kind of auto-reply policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutomationKind {
    /// Replies to comments; always active, informational here
    CommentAutoReply,
    /// Replies to direct messages; user-togglable
    MessageAutoReply,
}

impl AutomationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AutomationKind::CommentAutoReply => "comment_auto_reply",
            AutomationKind::MessageAutoReply => "message_auto_reply",
        }
    }

    pub fn is_togglable(&self) -> bool {
        matches!(self, AutomationKind::MessageAutoReply)
    }
}

impl std::fmt::Display for AutomationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A backend-persisted auto-reply policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutomationRule {
    pub id: String,
    pub kind: AutomationKind,
    pub is_active: bool,
    #[serde(default)]
    pub template: String,
    #[serde(default, alias = "targetAccountInternalId", alias = "account_id")]
    pub target_account_internal_id: Option<String>,
}

impl AutomationRule {
    pub fn targets(&self, internal_id: &str) -> bool {
        self.target_account_internal_id.as_deref() == Some(internal_id)
    }
}

/// Partial update sent to `updateAutomationRule`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AutomationRulePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
}

impl AutomationRulePatch {
    pub fn set_active(is_active: bool) -> Self {
        Self {
            is_active: Some(is_active),
            template: None,
        }
    }
}

/// Rules shown for the selected page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AutomationState {
    pub comment_reply: Option<AutomationRule>,
    pub message_reply: Option<AutomationRule>,
    /// False while the page has no internal id or no message rule exists
    pub toggle_enabled: bool,
}

impl AutomationState {
    /// Picks the first rule of each kind that targets `internal_id`.
    pub fn matching(
        internal_id: &str,
        comment_rules: &[AutomationRule],
        message_rules: &[AutomationRule],
    ) -> Self {
        let comment_reply = comment_rules.iter().find(|r| r.targets(internal_id)).cloned();
        let message_reply = message_rules.iter().find(|r| r.targets(internal_id)).cloned();
        let toggle_enabled = message_reply.is_some();
        Self {
            comment_reply,
            message_reply,
            toggle_enabled,
        }
    }
}
