//! ReconciliationEngine - merges platform pages with backend accounts.
//!
//! The matching rule itself lives in `pagelink_core::page`; this engine
//! adds the fetch side and the deferred re-match with backoff.

use crate::linker::classify_link_error;
use pagelink_core::backend::{BackendApi, LinkedAccount};
use pagelink_core::config::RematchPolicy;
use pagelink_core::page::{
    AccessToken, PageAccount, ReconcileReport, build_page_list, initial_selection, reconcile,
};
use pagelink_core::platform::PlatformIdentity;
use pagelink_core::{PagelinkError, Result};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Page list after a fresh match.
#[derive(Debug, Clone)]
pub struct MatchedPages {
    pub pages: Vec<PageAccount>,
    pub selected: Option<String>,
    pub report: ReconcileReport,
}

/// How a deferred re-match ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RematchOutcome {
    /// Every page carries an internal id
    Complete { attempts: u32 },
    /// Attempts ran out; these pages stay unmatched for the session
    Exhausted { unmatched: Vec<String> },
    /// The session this re-match belonged to is gone
    Discarded,
    /// The backend rejected the session credentials; no further attempts
    Unauthorized { message: String },
}

pub struct ReconciliationEngine {
    backend: Arc<dyn BackendApi>,
    policy: RematchPolicy,
}

impl ReconciliationEngine {
    pub fn new(backend: Arc<dyn BackendApi>, policy: RematchPolicy) -> Self {
        Self { backend, policy }
    }

    pub async fn fetch_accounts(&self) -> Result<Vec<LinkedAccount>> {
        self.backend
            .list_linked_accounts()
            .await
            .map_err(classify_link_error)
    }

    /// Deduplicated page list for a new identity; the personal profile
    /// stands in when the platform reports no pages.
    pub fn page_list(
        &self,
        discovered: Vec<PageAccount>,
        identity: &PlatformIdentity,
        user_token: Option<AccessToken>,
    ) -> Vec<PageAccount> {
        build_page_list(discovered, identity, user_token)
    }

    /// Matches a fresh page list and applies the selection policy.
    pub fn fresh_match(&self, mut pages: Vec<PageAccount>, accounts: &[LinkedAccount]) -> MatchedPages {
        let report = reconcile(&mut pages, accounts);
        let selected = initial_selection(&pages);

        tracing::info!(
            "[Reconciliation] {} page(s), {} matched, {} awaiting backend id",
            pages.len(),
            report.matched.len(),
            report.unmatched.len()
        );

        MatchedPages {
            pages,
            selected,
            report,
        }
    }

    /// Re-fetches accounts on the backoff schedule and hands each result
    /// to `apply`, which re-applies the matching rule to the live page
    /// list. `apply` returns `None` once that list belongs to a stale
    /// session. Stops as soon as every page is matched.
    pub async fn rematch<F>(&self, cancel: &CancellationToken, mut apply: F) -> RematchOutcome
    where
        F: FnMut(&[LinkedAccount]) -> Option<ReconcileReport> + Send,
    {
        let mut unmatched = Vec::new();

        for (index, delay) in self.policy.delays().into_iter().enumerate() {
            let attempt = index as u32 + 1;
            tokio::select! {
                _ = cancel.cancelled() => return RematchOutcome::Discarded,
                _ = tokio::time::sleep(delay) => {}
            }

            let accounts = match self.fetch_accounts().await {
                Ok(accounts) => accounts,
                Err(PagelinkError::LinkUnauthorized { message }) => {
                    tracing::warn!("[Reconciliation] Re-match attempt {} rejected: {}", attempt, message);
                    return RematchOutcome::Unauthorized { message };
                }
                Err(e) => {
                    tracing::warn!("[Reconciliation] Re-match attempt {} failed: {}", attempt, e);
                    continue;
                }
            };

            if cancel.is_cancelled() {
                return RematchOutcome::Discarded;
            }

            let Some(report) = apply(accounts.as_slice()) else {
                return RematchOutcome::Discarded;
            };

            tracing::debug!(
                "[Reconciliation] Re-match attempt {} resolved {} page(s)",
                attempt,
                report.newly_resolved
            );

            if report.is_complete() {
                return RematchOutcome::Complete { attempts: attempt };
            }
            unmatched = report.unmatched;
        }

        tracing::warn!(
            "[Reconciliation] Pages still without backend id after {} attempt(s): {:?}",
            self.policy.max_attempts,
            unmatched
        );
        RematchOutcome::Exhausted { unmatched }
    }
}

#[cfg(test)]
#[path = "reconciliation_test.rs"]
mod tests;
