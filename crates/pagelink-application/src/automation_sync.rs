//! AutomationRuleSync - per-page auto-reply rules.

use pagelink_core::automation::{
    AutomationKind, AutomationRule, AutomationRulePatch, AutomationState,
};
use pagelink_core::backend::{BackendApi, Platform};
use pagelink_core::page::PageAccount;
use pagelink_core::{PagelinkError, Result};
use std::sync::Arc;

pub struct AutomationRuleSync {
    backend: Arc<dyn BackendApi>,
    platform: Platform,
}

impl AutomationRuleSync {
    pub fn new(backend: Arc<dyn BackendApi>) -> Self {
        Self {
            backend,
            platform: Platform::Facebook,
        }
    }

    /// Loads the rules targeting `page`. An unreconciled page matches
    /// nothing and fetches nothing.
    pub async fn load(&self, page: &PageAccount) -> Result<AutomationState> {
        let Some(internal_id) = page.internal_id() else {
            tracing::debug!(
                "[AutomationSync] {} has no backend id, toggle disabled",
                page.external_id
            );
            return Ok(AutomationState::default());
        };

        let (comment_rules, message_rules) = tokio::join!(
            self.backend
                .list_automation_rules(self.platform, AutomationKind::CommentAutoReply),
            self.backend
                .list_automation_rules(self.platform, AutomationKind::MessageAutoReply),
        );
        let comment_rules =
            comment_rules.map_err(|e| PagelinkError::AutomationSync(e.message().to_string()))?;
        let message_rules =
            message_rules.map_err(|e| PagelinkError::AutomationSync(e.message().to_string()))?;

        Ok(AutomationState::matching(
            internal_id,
            &comment_rules,
            &message_rules,
        ))
    }

    /// Persists the inverted `is_active` of `rule` and returns the
    /// backend's acknowledged rule.
    pub async fn toggle(&self, page: &PageAccount, rule: &AutomationRule) -> Result<AutomationRule> {
        if !rule.kind.is_togglable() {
            return Err(PagelinkError::AutomationSync(format!(
                "{} cannot be toggled",
                rule.kind
            )));
        }
        let internal_id = page
            .internal_id()
            .ok_or_else(|| PagelinkError::reconciliation_gap(&page.external_id))?;
        if !rule.targets(internal_id) {
            return Err(PagelinkError::AutomationSync(format!(
                "Rule {} does not target page {}",
                rule.id, page.external_id
            )));
        }

        let patch = AutomationRulePatch::set_active(!rule.is_active);
        let acknowledged = self
            .backend
            .update_automation_rule(&rule.id, &patch)
            .await
            .map_err(|e| PagelinkError::AutomationSync(e.message().to_string()))?;

        tracing::info!(
            "[AutomationSync] {} for {} is now {}",
            acknowledged.kind,
            page.external_id,
            if acknowledged.is_active { "on" } else { "off" }
        );
        Ok(acknowledged)
    }
}
