//! PublishOrchestrator - turns compose form state into one publish request.
//!
//! Owns both compose forms. At most one publish is in flight at a time;
//! the guard is released on every completion path.

use chrono::{DateTime, Utc};
use pagelink_core::backend::{BackendApi, CreatedPost, GeneratedImage, ImagePlacement};
use pagelink_core::page::PageAccount;
use pagelink_core::publish::{ComposeForms, ComposeMode, PublishIntent};
use pagelink_core::{PagelinkError, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// A publish the backend accepted for later execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledPost {
    pub id: String,
    pub page_external_id: String,
    pub scheduled_for: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct PublishReceipt {
    pub post: CreatedPost,
    pub mode: ComposeMode,
    pub scheduled: Option<ScheduledPost>,
}

/// Holds the in-flight flag until dropped.
struct InFlightGuard<'a>(&'a AtomicBool);

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self> {
        if flag.swap(true, Ordering::SeqCst) {
            return Err(PagelinkError::PublishInFlight);
        }
        Ok(Self(flag))
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct PublishOrchestrator {
    backend: Arc<dyn BackendApi>,
    forms: Mutex<ComposeForms>,
    in_flight: AtomicBool,
}

impl PublishOrchestrator {
    pub fn new(backend: Arc<dyn BackendApi>) -> Self {
        Self {
            backend,
            forms: Mutex::new(ComposeForms::default()),
            in_flight: AtomicBool::new(false),
        }
    }

    /// Snapshot of both forms.
    pub fn forms(&self) -> ComposeForms {
        self.forms.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn update_forms<R>(&self, update: impl FnOnce(&mut ComposeForms) -> R) -> R {
        let mut forms = self.forms.lock().unwrap_or_else(|e| e.into_inner());
        update(&mut forms)
    }

    pub fn is_publishing(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Publishes the `mode` form to `page`.
    ///
    /// Validation and the scheduling precondition run before any network
    /// call. On success only the active form is reset; on failure both
    /// forms are left as they were.
    ///
    /// No idempotency key is sent: a publish whose response is lost and
    /// is then retried creates a second post.
    pub async fn publish(
        &self,
        page: &PageAccount,
        mode: ComposeMode,
        scheduled_for: Option<DateTime<Utc>>,
    ) -> Result<PublishReceipt> {
        let _guard = InFlightGuard::acquire(&self.in_flight)?;
        let attempt = Uuid::new_v4();

        let intent = PublishIntent::from_forms(&self.forms(), mode).scheduled_for(scheduled_for);
        intent.validate()?;
        if scheduled_for.is_some() && !page.is_reconciled() {
            return Err(PagelinkError::reconciliation_gap(&page.external_id));
        }
        let request = intent.into_request(page.internal_id())?;

        tracing::info!(
            "[PublishOrchestrator] Attempt {} publishing {} post to {}",
            attempt,
            mode,
            page.external_id
        );

        let post = self
            .backend
            .create_post(&page.external_id, &request)
            .await
            .map_err(|e| {
                tracing::warn!("[PublishOrchestrator] Attempt {} failed: {}", attempt, e);
                PagelinkError::PublishBackend {
                    message: e.message().to_string(),
                }
            })?;

        self.update_forms(|forms| forms.reset(mode));

        let scheduled = scheduled_for.map(|at| ScheduledPost {
            id: post.id.clone(),
            page_external_id: page.external_id.clone(),
            scheduled_for: post.scheduled_for.unwrap_or(at),
        });

        tracing::info!(
            "[PublishOrchestrator] Attempt {} accepted as post {}",
            attempt,
            post.id
        );

        Ok(PublishReceipt {
            post,
            mode,
            scheduled,
        })
    }

    /// Asks the backend to draft text and puts it in the generated form.
    pub async fn generate_text(&self, prompt: &str) -> Result<String> {
        let generated = self
            .backend
            .generate_text_content(prompt)
            .await
            .map_err(|e| PagelinkError::PublishBackend {
                message: e.message().to_string(),
            })?;
        self.update_forms(|forms| {
            forms.generated.content = Some(generated.content.clone());
            forms.generated.content_prompt = Some(prompt.to_string());
        });
        Ok(generated.content)
    }

    /// Asks the backend for an image and attaches it to the generated form.
    pub async fn generate_image(
        &self,
        prompt: &str,
        placement: ImagePlacement,
    ) -> Result<GeneratedImage> {
        let image = self
            .backend
            .generate_image(prompt, placement)
            .await
            .map_err(|e| PagelinkError::PublishBackend {
                message: e.message().to_string(),
            })?;
        self.update_forms(|forms| {
            forms.generated.generated_image = Some(image.clone());
            forms.generated.image_prompt = Some(prompt.to_string());
        });
        Ok(image)
    }
}

#[cfg(test)]
#[path = "publish_test.rs"]
mod tests;
