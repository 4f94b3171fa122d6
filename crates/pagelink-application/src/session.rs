//! ConnectionSession - top-level coordinator of the connection lifecycle.
//!
//! Owns the state every view reads: the page list, the selection, the
//! selected page's history and automation rules, and the pending schedule.
//! Background work (deferred re-match, delayed history reload, the
//! unauthorized redirect) is bound to a lifetime token and a generation
//! counter, so results from a torn-down session never land in a new one.
//!
//! Changes are announced on an unbounded [`SessionEvent`] channel.

use crate::automation_sync::AutomationRuleSync;
use crate::history::PostHistoryLoader;
use crate::linker::{BackendLinker, classify_link_error};
use crate::publish::{PublishOrchestrator, PublishReceipt, ScheduledPost};
use crate::reconciliation::{ReconciliationEngine, RematchOutcome};
use crate::sdk_gateway::SdkGateway;
use chrono::{DateTime, Utc};
use pagelink_core::automation::{AutomationRule, AutomationState};
use pagelink_core::backend::{BackendApi, BackendUser, GeneratedImage, ImagePlacement};
use pagelink_core::config::PagelinkConfig;
use pagelink_core::page::{
    PageAccount, ReconcileReport, initial_selection, pages_from_accounts, reconcile,
};
use pagelink_core::platform::{PlatformIdentity, PlatformSdk, missing_permissions};
use pagelink_core::post::PostHistory;
use pagelink_core::publish::ComposeMode;
use pagelink_core::{PagelinkError, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M UTC";

/// Notifications emitted as the session changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    StatusChanged(String),
    PagesChanged,
    SelectionChanged(Option<String>),
    HistoryUpdated,
    AutomationUpdated,
    /// The session was torn down (logout, disconnect or expiry)
    TornDown,
    /// The platform session expired; the caller should show the login entry point
    RedirectToLogin,
}

/// Per-operation loading indicators. Every operation clears its own flag
/// on success, failure and cancellation alike.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadingFlags {
    pub connecting: bool,
    pub history: bool,
    pub automation: bool,
    pub publishing: bool,
}

#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub connected: bool,
    pub identity: Option<PlatformIdentity>,
    pub pages: Vec<PageAccount>,
    /// External id of the selected page
    pub selected: Option<String>,
    pub status_message: String,
    pub token_expires_at: Option<DateTime<Utc>>,
    pub history: PostHistory,
    pub automation: AutomationState,
    pub scheduled: Option<ScheduledPost>,
    pub loading: LoadingFlags,
    generation: u64,
}

impl SessionState {
    pub fn selected_page(&self) -> Option<&PageAccount> {
        let selected = self.selected.as_deref()?;
        self.pages.iter().find(|p| p.external_id == selected)
    }

    fn is_selected(&self, external_id: &str) -> bool {
        self.selected.as_deref() == Some(external_id)
    }
}

pub struct ConnectionSession {
    gateway: SdkGateway,
    linker: BackendLinker,
    engine: ReconciliationEngine,
    history: PostHistoryLoader,
    automation: AutomationRuleSync,
    publisher: PublishOrchestrator,
    backend: Arc<dyn BackendApi>,
    scopes: Vec<String>,
    history_reload_delay: Duration,
    unauthorized_grace: Duration,
    state: RwLock<SessionState>,
    /// Cancelled whenever the session is rebuilt or torn down
    lifetime: Mutex<CancellationToken>,
    redirect_pending: AtomicBool,
    events: mpsc::UnboundedSender<SessionEvent>,
}

impl ConnectionSession {
    /// Wires every component around the given SDK and backend.
    pub fn new(
        sdk: Arc<dyn PlatformSdk>,
        backend: Arc<dyn BackendApi>,
        config: &PagelinkConfig,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<SessionEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let timing = &config.timing;
        let session = Self {
            gateway: SdkGateway::new(sdk, config.platform.app_id.clone(), timing),
            linker: BackendLinker::new(backend.clone()),
            engine: ReconciliationEngine::new(backend.clone(), timing.rematch_policy()),
            history: PostHistoryLoader::new(backend.clone(), config.history.clone()),
            automation: AutomationRuleSync::new(backend.clone()),
            publisher: PublishOrchestrator::new(backend.clone()),
            backend,
            scopes: config.platform.scopes(),
            history_reload_delay: timing.history_reload_delay(),
            unauthorized_grace: timing.unauthorized_grace(),
            state: RwLock::new(SessionState::default()),
            lifetime: Mutex::new(CancellationToken::new()),
            redirect_pending: AtomicBool::new(false),
            events,
        };
        (Arc::new(session), receiver)
    }

    // ============================================================================
    // State access
    // ============================================================================

    fn read_state(&self) -> RwLockReadGuard<'_, SessionState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, SessionState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    pub fn snapshot(&self) -> SessionState {
        self.read_state().clone()
    }

    pub fn status_message(&self) -> String {
        self.read_state().status_message.clone()
    }

    /// The compose forms and publish guard.
    pub fn compose(&self) -> &PublishOrchestrator {
        &self.publisher
    }

    fn emit(&self, event: SessionEvent) {
        // No receiver simply means nobody is listening
        let _ = self.events.send(event);
    }

    fn set_status(&self, message: impl Into<String>) {
        let message = message.into();
        self.write_state().status_message = message.clone();
        self.emit(SessionEvent::StatusChanged(message));
    }

    fn set_loading(&self, update: impl FnOnce(&mut LoadingFlags)) {
        update(&mut self.write_state().loading);
    }

    /// Runs `update` only while `generation` is still the live session.
    fn update_if_current<R>(
        &self,
        generation: u64,
        update: impl FnOnce(&mut SessionState) -> R,
    ) -> Option<R> {
        let mut state = self.write_state();
        if state.generation != generation {
            return None;
        }
        Some(update(&mut state))
    }

    fn selected_page(&self) -> Option<(u64, PageAccount)> {
        let state = self.read_state();
        state
            .selected_page()
            .cloned()
            .map(|page| (state.generation, page))
    }

    fn lifetime_token(&self) -> CancellationToken {
        self.lifetime
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Cancels the previous session's background work and starts a new
    /// generation with empty page data. The status message survives, and so
    /// do the `connecting` and `publishing` flags, which their callers clear.
    /// History and automation loads of the old generation can no longer
    /// land, so their flags are cleared here.
    fn reset_session(&self) -> (u64, CancellationToken) {
        let cancel = {
            let mut lifetime = self.lifetime.lock().unwrap_or_else(|e| e.into_inner());
            lifetime.cancel();
            *lifetime = CancellationToken::new();
            lifetime.clone()
        };

        let mut state = self.write_state();
        let generation = state.generation + 1;
        let status_message = std::mem::take(&mut state.status_message);
        let loading = LoadingFlags {
            history: false,
            automation: false,
            ..state.loading
        };
        *state = SessionState {
            status_message,
            loading,
            generation,
            ..SessionState::default()
        };
        (generation, cancel)
    }

    fn report_error(self: &Arc<Self>, err: &PagelinkError) {
        if err.requires_logout() {
            self.handle_unauthorized(err);
            return;
        }
        if err.is_cancelled() {
            tracing::debug!("[ConnectionSession] Discarded stale operation");
            return;
        }
        tracing::warn!("[ConnectionSession] {}", err);
        self.set_status(err.to_string());
    }

    // ============================================================================
    // Lifecycle
    // ============================================================================

    /// Restores a federation linked in an earlier run from the backend.
    ///
    /// Pages come from the backend records, so they are reconciled by
    /// construction but carry no platform token.
    pub async fn mount(self: &Arc<Self>) -> Result<()> {
        self.set_loading(|l| l.connecting = true);
        let result = self.restore().await;
        self.set_loading(|l| l.connecting = false);
        if let Err(e) = &result {
            self.report_error(e);
        }
        result
    }

    async fn restore(self: &Arc<Self>) -> Result<()> {
        let (user, status) = tokio::join!(
            self.backend.get_current_user(),
            self.backend.get_connection_status()
        );
        let user = user.map_err(classify_link_error)?;
        let status = status.map_err(classify_link_error)?;

        if !status.connected {
            self.set_status(format!(
                "Signed in as {}. No platform account connected yet.",
                display_name(&user)
            ));
            return Ok(());
        }

        let accounts = self.engine.fetch_accounts().await?;
        let pages = pages_from_accounts(&accounts);
        let selected = initial_selection(&pages);
        let page_count = pages.len();

        let (generation, _) = self.reset_session();
        self.update_if_current(generation, |state| {
            state.connected = true;
            state.pages = pages;
            state.selected = selected.clone();
            state.token_expires_at = status.expires_at;
        });

        let who = status
            .account_name
            .clone()
            .unwrap_or_else(|| display_name(&user).to_string());
        let mut message = format!("Connected as {}: {} page(s)", who, page_count);
        if let Some(at) = status.expires_at {
            message.push_str(&format!(". Access valid until {}", at.format(TIMESTAMP_FORMAT)));
        }
        tracing::info!("[ConnectionSession] Restored {} page(s)", page_count);

        self.emit(SessionEvent::PagesChanged);
        self.emit(SessionEvent::SelectionChanged(selected.clone()));
        self.set_status(message);
        if selected.is_some() {
            self.refresh_selected().await;
        }
        Ok(())
    }

    /// Runs the full connect flow: SDK load, login, discovery, link and
    /// matching. Unmatched pages are re-matched in the background.
    pub async fn connect(self: &Arc<Self>) -> Result<ReconcileReport> {
        self.set_loading(|l| l.connecting = true);
        self.set_status("Connecting to the platform");
        let result = self.establish().await;
        self.set_loading(|l| l.connecting = false);
        if let Err(e) = &result {
            self.report_error(e);
        }
        result
    }

    async fn establish(self: &Arc<Self>) -> Result<ReconcileReport> {
        self.gateway.load().await?;
        let token = self.gateway.login(&self.scopes).await?;
        let (generation, cancel) = self.reset_session();
        tracing::info!(
            "[ConnectionSession] Login succeeded, starting session {}",
            generation
        );

        let missing = match self.gateway.fetch_permissions(&token).await {
            Ok(granted) => missing_permissions(&granted),
            Err(e) => {
                tracing::warn!("[ConnectionSession] Could not read permissions: {}", e);
                Vec::new()
            }
        };

        let (identity, discovered) = tokio::join!(
            self.gateway.fetch_identity(&token),
            self.gateway.fetch_pages(&token)
        );
        let identity = identity?;
        let pages = self
            .engine
            .page_list(discovered?, &identity, Some(token.clone()));

        let outcome = self.linker.link(&token, &identity, &pages).await?;
        let matched = self.engine.fresh_match(pages, &outcome.accounts);
        let report = matched.report.clone();
        let selected = matched.selected.clone();
        let message = connected_message(&identity.name, &report, outcome.expires_at, &missing);

        self.update_if_current(generation, |state| {
            state.connected = true;
            state.identity = Some(identity);
            state.pages = matched.pages;
            state.selected = matched.selected;
            state.token_expires_at = outcome.expires_at;
        })
        .ok_or(PagelinkError::Cancelled)?;

        self.emit(SessionEvent::PagesChanged);
        self.emit(SessionEvent::SelectionChanged(selected.clone()));
        self.set_status(message);

        if selected.is_some() {
            self.refresh_selected().await;
        }
        if !report.is_complete() {
            self.spawn_rematch(generation, cancel);
        }
        Ok(report)
    }

    fn spawn_rematch(self: &Arc<Self>, generation: u64, cancel: CancellationToken) {
        let session = Arc::clone(self);
        tokio::spawn(async move {
            let outcome = session
                .engine
                .rematch(&cancel, |accounts| {
                    let report = {
                        let mut state = session.write_state();
                        if state.generation != generation {
                            return None;
                        }
                        reconcile(&mut state.pages, accounts)
                    };
                    if report.newly_resolved > 0 {
                        session.emit(SessionEvent::PagesChanged);
                    }
                    Some(report)
                })
                .await;

            match outcome {
                RematchOutcome::Complete { attempts } => {
                    tracing::info!(
                        "[ConnectionSession] All pages linked after {} re-match attempt(s)",
                        attempts
                    );
                    session.set_status("All pages are linked to the backend");
                    session.refresh_selected().await;
                }
                RematchOutcome::Exhausted { unmatched } => {
                    if session.read_state().generation == generation {
                        session.set_status(format!(
                            "{} page(s) are still not linked to the backend: {}",
                            unmatched.len(),
                            unmatched.join(", ")
                        ));
                    }
                }
                RematchOutcome::Unauthorized { message } => {
                    if session.read_state().generation == generation {
                        session.report_error(&PagelinkError::LinkUnauthorized { message });
                    }
                }
                RematchOutcome::Discarded => {
                    tracing::debug!("[ConnectionSession] Re-match for session {} discarded", generation);
                }
            }
        });
    }

    /// Changes the selected page and loads its history and automation rules.
    pub async fn select_page(self: &Arc<Self>, external_id: &str) -> Result<()> {
        {
            let mut state = self.write_state();
            if !state.pages.iter().any(|p| p.external_id == external_id) {
                return Err(PagelinkError::UnknownPage {
                    external_id: external_id.to_string(),
                });
            }
            state.selected = Some(external_id.to_string());
            state.history = PostHistory::default();
            state.automation = AutomationState::default();
        }
        self.emit(SessionEvent::SelectionChanged(Some(external_id.to_string())));
        self.refresh_selected().await;
        Ok(())
    }

    /// Reloads history and automation rules of the selected page
    /// concurrently. Results for a page that is no longer selected are
    /// dropped.
    pub async fn refresh_selected(&self) {
        let Some((generation, page)) = self.selected_page() else {
            return;
        };
        self.set_loading(|l| {
            l.history = true;
            l.automation = true;
        });
        let (history, automation) =
            tokio::join!(self.history.load(&page), self.automation.load(&page));
        self.apply_history(generation, &page, history);
        self.apply_automation(generation, &page, automation);
    }

    async fn reload_history(&self, generation: u64) {
        let Some((current, page)) = self.selected_page() else {
            return;
        };
        if current != generation {
            return;
        }
        self.set_loading(|l| l.history = true);
        let result = self.history.load(&page).await;
        self.apply_history(generation, &page, result);
    }

    fn apply_history(&self, generation: u64, page: &PageAccount, result: Result<PostHistory>) {
        let applied = self
            .update_if_current(generation, |state| {
                state.loading.history = false;
                let current = state.is_selected(&page.external_id);
                if current {
                    state.history = result.as_ref().cloned().unwrap_or_default();
                }
                current
            })
            .unwrap_or(false);
        if !applied {
            tracing::debug!("[ConnectionSession] Dropping stale history for {}", page.external_id);
            return;
        }

        self.emit(SessionEvent::HistoryUpdated);
        match result {
            Ok(_) => {}
            Err(e) if e.is_reconciliation_gap() => self.set_status(format!(
                "{} is not linked to the backend yet; its history and automation are unavailable",
                page.name
            )),
            Err(e) => self.set_status(e.to_string()),
        }
    }

    fn apply_automation(
        &self,
        generation: u64,
        page: &PageAccount,
        result: Result<AutomationState>,
    ) {
        let applied = self
            .update_if_current(generation, |state| {
                state.loading.automation = false;
                let current = state.is_selected(&page.external_id);
                if current {
                    state.automation = result.as_ref().cloned().unwrap_or_default();
                }
                current
            })
            .unwrap_or(false);
        if !applied {
            return;
        }

        self.emit(SessionEvent::AutomationUpdated);
        if let Err(e) = result {
            self.set_status(e.to_string());
        }
    }

    fn schedule_history_reload(self: &Arc<Self>, generation: u64) {
        let session = Arc::clone(self);
        let cancel = self.lifetime_token();
        let delay = self.history_reload_delay;
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = tokio::time::sleep(delay) => {}
            }
            session.reload_history(generation).await;
        });
    }

    // ============================================================================
    // Publishing
    // ============================================================================

    /// Publishes the `mode` form to the selected page, now or at
    /// `scheduled_for`. History is reloaded shortly after a success.
    pub async fn publish(
        self: &Arc<Self>,
        mode: ComposeMode,
        scheduled_for: Option<DateTime<Utc>>,
    ) -> Result<PublishReceipt> {
        let Some((generation, page)) = self.selected_page() else {
            let err = PagelinkError::NoPageSelected;
            self.report_error(&err);
            return Err(err);
        };

        self.set_loading(|l| l.publishing = true);
        let result = self.publisher.publish(&page, mode, scheduled_for).await;
        let still_publishing = self.publisher.is_publishing();
        self.set_loading(|l| l.publishing = still_publishing);

        match &result {
            Ok(receipt) => {
                let message = match &receipt.scheduled {
                    Some(scheduled) => format!(
                        "Scheduled on {} for {}",
                        page.name,
                        scheduled.scheduled_for.format(TIMESTAMP_FORMAT)
                    ),
                    None => format!("Published to {}", page.name),
                };
                if let Some(scheduled) = receipt.scheduled.clone() {
                    self.update_if_current(generation, |state| {
                        state.scheduled = Some(scheduled);
                    });
                }
                self.set_status(message);
                self.schedule_history_reload(generation);
            }
            Err(e) => self.report_error(e),
        }
        result
    }

    pub async fn generate_text(self: &Arc<Self>, prompt: &str) -> Result<String> {
        let result = self.publisher.generate_text(prompt).await;
        if let Err(e) = &result {
            self.report_error(e);
        }
        result
    }

    pub async fn generate_image(
        self: &Arc<Self>,
        prompt: &str,
        placement: ImagePlacement,
    ) -> Result<GeneratedImage> {
        let result = self.publisher.generate_image(prompt, placement).await;
        if let Err(e) = &result {
            self.report_error(e);
        }
        result
    }

    /// Cancels the pending scheduled post on the backend.
    pub async fn cancel_scheduled_post(self: &Arc<Self>) -> Result<()> {
        let result = self.delete_pending_schedule().await;
        if let Err(e) = &result {
            self.report_error(e);
        }
        result
    }

    async fn delete_pending_schedule(self: &Arc<Self>) -> Result<()> {
        let (generation, scheduled) = {
            let state = self.read_state();
            (state.generation, state.scheduled.clone())
        };
        let scheduled = scheduled.ok_or(PagelinkError::NoScheduledPost)?;

        self.backend
            .delete_scheduled_post(&scheduled.id)
            .await
            .map_err(|e| PagelinkError::PublishBackend {
                message: e.message().to_string(),
            })?;

        self.update_if_current(generation, |state| {
            if state.scheduled.as_ref().is_some_and(|s| s.id == scheduled.id) {
                state.scheduled = None;
            }
        });
        tracing::info!("[ConnectionSession] Cancelled scheduled post {}", scheduled.id);
        self.set_status("Scheduled post cancelled");
        self.schedule_history_reload(generation);
        Ok(())
    }

    // ============================================================================
    // Automation
    // ============================================================================

    /// Flips the message auto-reply rule of the selected page. Local state
    /// changes only from the backend's acknowledgement.
    pub async fn toggle_message_auto_reply(self: &Arc<Self>) -> Result<AutomationRule> {
        let result = self.toggle_selected().await;
        if let Err(e) = &result {
            self.report_error(e);
        }
        result
    }

    async fn toggle_selected(&self) -> Result<AutomationRule> {
        let (generation, page) = self.selected_page().ok_or(PagelinkError::NoPageSelected)?;
        if !page.is_reconciled() {
            return Err(PagelinkError::reconciliation_gap(&page.external_id));
        }
        let rule = self
            .read_state()
            .automation
            .message_reply
            .clone()
            .ok_or_else(|| {
                PagelinkError::AutomationSync(format!(
                    "{} has no message auto-reply rule",
                    page.name
                ))
            })?;

        self.set_loading(|l| l.automation = true);
        let result = self.automation.toggle(&page, &rule).await;
        self.update_if_current(generation, |state| {
            state.loading.automation = false;
            if let Ok(acknowledged) = &result
                && state
                    .automation
                    .message_reply
                    .as_ref()
                    .is_some_and(|r| r.id == acknowledged.id)
            {
                state.automation.message_reply = Some(acknowledged.clone());
            }
        });

        let acknowledged = result?;
        self.emit(SessionEvent::AutomationUpdated);
        self.set_status(format!(
            "Message auto-reply is now {} for {}",
            if acknowledged.is_active { "on" } else { "off" },
            page.name
        ));
        Ok(acknowledged)
    }

    // ============================================================================
    // Teardown
    // ============================================================================

    /// Ends the session locally and at the platform. A platform logout
    /// failure is logged and otherwise ignored.
    pub async fn logout(&self) {
        self.reset_session();
        self.gateway.cancel_pending();
        self.set_loading(|l| *l = LoadingFlags::default());
        self.emit(SessionEvent::TornDown);

        if let Err(e) = self.gateway.logout().await {
            tracing::warn!("[ConnectionSession] Platform logout failed: {}", e);
        }
        tracing::info!("[ConnectionSession] Logged out");
        self.set_status("Logged out");
    }

    /// Removes the federation on the backend, then logs out.
    pub async fn disconnect(self: &Arc<Self>) -> Result<()> {
        if let Err(e) = self.linker.unlink().await {
            self.report_error(&e);
            return Err(e);
        }
        self.logout().await;
        self.set_status("Disconnected from the platform");
        Ok(())
    }

    /// Drops everything, including the SDK handle.
    pub async fn shutdown(&self) {
        self.reset_session();
        self.gateway.teardown().await;
        self.emit(SessionEvent::TornDown);
    }

    /// Shows the expiry, then logs out and redirects after a short grace
    /// period. Repeated failures during the grace period are coalesced.
    fn handle_unauthorized(self: &Arc<Self>, err: &PagelinkError) {
        tracing::warn!("[ConnectionSession] {}, logging out", err);
        self.set_status("Your platform session has expired. Please log in again.");
        if self.redirect_pending.swap(true, Ordering::SeqCst) {
            return;
        }

        let session = Arc::clone(self);
        let grace = self.unauthorized_grace;
        tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            session.logout().await;
            session.redirect_pending.store(false, Ordering::SeqCst);
            session.emit(SessionEvent::RedirectToLogin);
        });
    }
}

fn display_name(user: &BackendUser) -> &str {
    user.name
        .as_deref()
        .or(user.email.as_deref())
        .unwrap_or(&user.id)
}

fn connected_message(
    name: &str,
    report: &ReconcileReport,
    expires_at: Option<DateTime<Utc>>,
    missing: &[&str],
) -> String {
    let total = report.matched.len() + report.unmatched.len();
    let mut message = format!("Connected as {}: {} page(s)", name, total);
    if !report.unmatched.is_empty() {
        message.push_str(&format!(
            ", {} awaiting backend link",
            report.unmatched.len()
        ));
    }
    if let Some(at) = expires_at {
        message.push_str(&format!(". Access valid until {}", at.format(TIMESTAMP_FORMAT)));
    }
    if !missing.is_empty() {
        message.push_str(&format!(". Missing permissions: {}", missing.join(", ")));
    }
    message
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
