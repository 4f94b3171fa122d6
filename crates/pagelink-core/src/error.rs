//! Error types for the Pagelink application.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::publish::PublishField;

/// A shared error type for the entire Pagelink application.
///
/// Variants follow the connection subsystem's failure taxonomy: each one
/// tells the caller whether the failure is local (caught before any network
/// effect), recoverable by retry, or terminal for the session.
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
pub enum PagelinkError {
    /// The platform SDK could not be initialized
    #[error("SDK load error: {reason}")]
    SdkLoad { reason: String },

    /// The user declined the platform login dialog
    #[error("Login was cancelled")]
    AuthCancelled,

    /// The user logged in but withheld the requested permissions
    #[error("Login was not authorized")]
    AuthNotAuthorized,

    /// The backend rejected the link with 401; the platform session is no longer valid
    #[error("Link unauthorized: {message}")]
    LinkUnauthorized { message: String },

    /// Exchanging the short-lived token for a long-lived one failed
    #[error("Token exchange failed: {message}")]
    TokenExchangeFailed { message: String },

    /// Generic link failure
    #[error("Link failed: {message}")]
    LinkFailed { message: String },

    /// A page has no backend internal id yet
    #[error("Page '{external_id}' is not reconciled with a backend account yet")]
    ReconciliationGap { external_id: String },

    /// Publish request rejected locally before any network call
    #[error("Missing required field(s): {}", format_fields(.missing))]
    PublishValidation { missing: Vec<PublishField> },

    /// Upload is neither an image nor a video
    #[error("Unsupported media type '{mime_type}' for {filename}")]
    UnsupportedMedia { filename: String, mime_type: String },

    /// Backend refused or failed the publish
    #[error("Publish failed: {message}")]
    PublishBackend { message: String },

    /// Another publish is still pending for this session
    #[error("A publish is already in progress")]
    PublishInFlight,

    /// Post history could not be loaded
    #[error("History load error: {0}")]
    HistoryLoad(String),

    /// Automation rule load/toggle failed
    #[error("Automation sync error: {0}")]
    AutomationSync(String),

    /// An operation needs a selected page
    #[error("No page selected")]
    NoPageSelected,

    /// Selection names a page the session does not list
    #[error("Unknown page '{external_id}'")]
    UnknownPage { external_id: String },

    /// Cancellation requested with no pending schedule
    #[error("No scheduled post to cancel")]
    NoScheduledPost,

    /// Platform graph call failed
    #[error("SDK error: {0}")]
    Sdk(String),

    /// Operation did not complete in time
    #[error("Operation '{operation}' timed out after {millis}ms")]
    Timeout { operation: String, millis: u64 },

    /// Operation was discarded because its session was torn down
    #[error("Operation cancelled")]
    Cancelled,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization { format: String, message: String },

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

fn format_fields(fields: &[PublishField]) -> String {
    fields
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl PagelinkError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates an SdkLoad error
    pub fn sdk_load(reason: impl Into<String>) -> Self {
        Self::SdkLoad {
            reason: reason.into(),
        }
    }

    /// Creates a ReconciliationGap error
    pub fn reconciliation_gap(external_id: impl Into<String>) -> Self {
        Self::ReconciliationGap {
            external_id: external_id.into(),
        }
    }

    /// Creates a Timeout error
    pub fn timeout(operation: impl Into<String>, duration: std::time::Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            millis: duration.as_millis() as u64,
        }
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates an IO error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    /// Check if this error must terminate the session (logout + redirect)
    pub fn requires_logout(&self) -> bool {
        matches!(self, Self::LinkUnauthorized { .. })
    }

    /// Check if this is a reconciliation gap
    pub fn is_reconciliation_gap(&self) -> bool {
        matches!(self, Self::ReconciliationGap { .. })
    }

    /// Check if this error was raised before any network effect
    pub fn is_local_validation(&self) -> bool {
        matches!(
            self,
            Self::PublishValidation { .. }
                | Self::UnsupportedMedia { .. }
                | Self::PublishInFlight
                | Self::NoPageSelected
        )
    }

    /// Check if the user can simply retry the same operation
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::TokenExchangeFailed { .. }
                | Self::PublishBackend { .. }
                | Self::HistoryLoad(_)
                | Self::AutomationSync(_)
                | Self::Timeout { .. }
                | Self::Sdk(_)
        )
    }

    /// Check if this is a cancellation of a stale operation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for PagelinkError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for PagelinkError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for PagelinkError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

/// Conversion from anyhow::Error (used at the CLI edge)
impl From<anyhow::Error> for PagelinkError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// A type alias for `Result<T, PagelinkError>`.
pub type Result<T> = std::result::Result<T, PagelinkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_names_fields() {
        let err = PagelinkError::PublishValidation {
            missing: vec![PublishField::Text, PublishField::Media],
        };
        assert_eq!(err.to_string(), "Missing required field(s): text, media");
        assert!(err.is_local_validation());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_only_unauthorized_link_requires_logout() {
        assert!(
            PagelinkError::LinkUnauthorized {
                message: "expired".into()
            }
            .requires_logout()
        );
        assert!(
            !PagelinkError::LinkFailed {
                message: "boom".into()
            }
            .requires_logout()
        );
        assert!(
            PagelinkError::TokenExchangeFailed {
                message: "retry".into()
            }
            .is_retryable()
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.png");
        let err: PagelinkError = io.into();
        assert!(matches!(err, PagelinkError::Io { .. }));
        assert!(err.to_string().contains("missing.png"));
    }
}
