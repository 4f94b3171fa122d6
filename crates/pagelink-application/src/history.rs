//! PostHistoryLoader - fetches and classifies a page's prior posts.

use pagelink_core::backend::{BackendApi, Platform};
use pagelink_core::config::HistorySettings;
use pagelink_core::page::PageAccount;
use pagelink_core::post::PostHistory;
use pagelink_core::{PagelinkError, Result};
use std::sync::Arc;

pub struct PostHistoryLoader {
    backend: Arc<dyn BackendApi>,
    platform: Platform,
    settings: HistorySettings,
}

impl PostHistoryLoader {
    pub fn new(backend: Arc<dyn BackendApi>, settings: HistorySettings) -> Self {
        Self {
            backend,
            platform: Platform::Facebook,
            settings,
        }
    }

    /// Loads history for `page`. Posts are keyed by the backend id, so an
    /// unreconciled page reports a gap instead of fetching.
    pub async fn load(&self, page: &PageAccount) -> Result<PostHistory> {
        let internal_id = page
            .internal_id()
            .ok_or_else(|| PagelinkError::reconciliation_gap(&page.external_id))?;

        let raw = self
            .backend
            .list_posts(self.platform, self.settings.limit, internal_id)
            .await
            .map_err(|e| PagelinkError::HistoryLoad(e.message().to_string()))?;

        let history = PostHistory::from_raw(raw, self.settings.limit, self.settings.degraded_cap);
        tracing::debug!(
            "[PostHistory] {}: {} generated, {} manual of {}",
            page.external_id,
            history.generated.len(),
            history.manual.len(),
            history.total
        );
        Ok(history)
    }
}
