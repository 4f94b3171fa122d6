pub mod auto_reply;
pub mod connect;
pub mod disconnect;
pub mod draft;
pub mod history;
pub mod publish;
pub mod status;

use anyhow::{Context as _, Result, bail};
use pagelink_application::{ConnectionSession, SessionEvent, SessionState};
use pagelink_core::config::PagelinkConfig;
use pagelink_core::page::PageAccount;
use pagelink_core::secret::SecretService;
use pagelink_infrastructure::{ConfigService, SecretServiceImpl};
use pagelink_interaction::{GraphApiSdk, HttpBackendClient};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// A wired session plus the task that logs its events.
pub struct Context {
    pub session: Arc<ConnectionSession>,
    config: PagelinkConfig,
    event_log: JoinHandle<()>,
}

impl Context {
    pub async fn open(config_dir: Option<&Path>) -> Result<Self> {
        let config = ConfigService::new(config_dir)
            .get_config()
            .context("Failed to load config.toml")?;

        let secrets = SecretServiceImpl::new(config_dir)?;
        let backend = HttpBackendClient::from_secrets(&config.backend, &secrets)
            .await
            .map_err(anyhow::Error::msg)?;
        let user_token = secrets
            .load_secrets()
            .await
            .map_err(anyhow::Error::msg)?
            .platform
            .and_then(|p| p.user_access_token);
        let sdk = GraphApiSdk::from_settings(&config.platform, user_token);

        let (session, mut events) =
            ConnectionSession::new(Arc::new(sdk), Arc::new(backend), &config);

        let event_log = tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                match event {
                    SessionEvent::StatusChanged(message) => {
                        tracing::debug!(target: "pagelink::session", "{}", message)
                    }
                    other => tracing::debug!(target: "pagelink::session", "{:?}", other),
                }
            }
        });

        Ok(Self {
            session,
            config,
            event_log,
        })
    }

    /// Restores the linked pages and resolves the page a command acts on.
    pub async fn restore_selected(&self, page: Option<&str>) -> Result<PageAccount> {
        self.session.mount().await?;
        let state = self.session.snapshot();
        if !state.connected {
            bail!("{}", state.status_message);
        }
        if let Some(page) = page {
            self.session.select_page(page).await?;
        }

        let state = self.session.snapshot();
        match state.selected_page() {
            Some(selected) => Ok(selected.clone()),
            None => bail!(
                "Several pages are linked; choose one with --page ({})",
                page_ids(&state)
            ),
        }
    }

    /// Waits for the background re-match to link the remaining pages,
    /// at most as long as its whole schedule.
    pub async fn settle(&self) {
        let budget: Duration = self
            .config
            .timing
            .rematch_policy()
            .delays()
            .iter()
            .sum::<Duration>()
            + Duration::from_secs(1);
        let deadline = tokio::time::Instant::now() + budget;

        while tokio::time::Instant::now() < deadline {
            let state = self.session.snapshot();
            if state.pages.iter().all(PageAccount::is_reconciled) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(500)).await;
        }
    }

    pub async fn close(self) {
        self.session.shutdown().await;
        self.event_log.abort();
    }
}

fn page_ids(state: &SessionState) -> String {
    state
        .pages
        .iter()
        .map(|p| p.external_id.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn print_pages(state: &SessionState) {
    for page in &state.pages {
        let marker = if state.selected.as_deref() == Some(page.external_id.as_str()) {
            "*"
        } else {
            " "
        };
        println!(
            "{} {:<28} {:<20} {}",
            marker,
            page.name,
            page.external_id,
            page.internal_id().unwrap_or("not linked")
        );
    }
}
