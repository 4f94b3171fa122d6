//! Backend service contract.
//!
//! The remote backend is consumed, not re-specified: this module declares
//! the operations the subsystem calls and the shapes it exchanges.

mod model;

pub use model::{
    BackendUser, ConnectionStatus, CreatedPost, GeneratedImage, GeneratedText, ImagePlacement,
    LONG_LIVED_USER_TOKEN, LinkAccountRequest, LinkAccountResponse, LinkPagePayload,
    LinkedAccount, Platform, TokenKind,
};

use async_trait::async_trait;
use thiserror::Error;

use crate::automation::{AutomationKind, AutomationRule, AutomationRulePatch};
use crate::post::RawPost;
use crate::publish::PublishRequest;

/// Failure of a backend call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// Non-success HTTP status with the backend-provided message
    #[error("Backend returned {status}: {message}")]
    Status {
        status: u16,
        message: String,
        code: Option<String>,
    },

    /// Request never produced a response
    #[error("Backend request failed: {0}")]
    Transport(String),

    /// Response body did not match the expected shape
    #[error("Failed to decode backend response: {0}")]
    Decode(String),
}

impl BackendError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Status { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    /// The human-readable message, without the status prefix.
    pub fn message(&self) -> &str {
        match self {
            Self::Status { message, .. } => message,
            Self::Transport(message) | Self::Decode(message) => message,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }
}

pub type BackendResult<T> = std::result::Result<T, BackendError>;

/// Operations consumed from the backend service.
#[async_trait]
pub trait BackendApi: Send + Sync {
    async fn get_connection_status(&self) -> BackendResult<ConnectionStatus>;

    async fn list_linked_accounts(&self) -> BackendResult<Vec<LinkedAccount>>;

    async fn link_account(&self, request: &LinkAccountRequest)
    -> BackendResult<LinkAccountResponse>;

    async fn unlink_account(&self) -> BackendResult<()>;

    async fn list_posts(
        &self,
        platform: Platform,
        limit: usize,
        account_id: &str,
    ) -> BackendResult<Vec<RawPost>>;

    async fn create_post(&self, page_id: &str, request: &PublishRequest)
    -> BackendResult<CreatedPost>;

    async fn generate_text_content(&self, prompt: &str) -> BackendResult<GeneratedText>;

    async fn generate_image(
        &self,
        prompt: &str,
        placement: ImagePlacement,
    ) -> BackendResult<GeneratedImage>;

    async fn list_automation_rules(
        &self,
        platform: Platform,
        kind: AutomationKind,
    ) -> BackendResult<Vec<AutomationRule>>;

    async fn update_automation_rule(
        &self,
        id: &str,
        patch: &AutomationRulePatch,
    ) -> BackendResult<AutomationRule>;

    async fn delete_scheduled_post(&self, id: &str) -> BackendResult<()>;

    async fn get_current_user(&self) -> BackendResult<BackendUser>;
}
