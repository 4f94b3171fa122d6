//! BackendLinker - persists the federation between a platform identity
//! and the backend's account records.

use chrono::{DateTime, Utc};
use pagelink_core::backend::{
    BackendApi, BackendError, LinkAccountRequest, LinkPagePayload, LinkedAccount, TokenKind,
};
use pagelink_core::page::{AccessToken, PageAccount};
use pagelink_core::platform::PlatformIdentity;
use pagelink_core::{PagelinkError, Result};
use std::sync::Arc;

/// Error code the backend uses when the long-lived token exchange fails.
pub const TOKEN_EXCHANGE_FAILED_CODE: &str = "token_exchange_failed";

/// Result of a successful link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkOutcome {
    pub accounts: Vec<LinkedAccount>,
    pub token_kind: TokenKind,
    /// Known only for long-lived user tokens
    pub expires_at: Option<DateTime<Utc>>,
}

pub struct BackendLinker {
    backend: Arc<dyn BackendApi>,
}

impl BackendLinker {
    pub fn new(backend: Arc<dyn BackendApi>) -> Self {
        Self { backend }
    }

    pub async fn link(
        &self,
        access_token: &AccessToken,
        identity: &PlatformIdentity,
        pages: &[PageAccount],
    ) -> Result<LinkOutcome> {
        let request = LinkAccountRequest {
            access_token: access_token.expose().to_string(),
            platform_user_id: identity.id.clone(),
            user_name: identity.name.clone(),
            email: identity.email.clone(),
            pages: pages
                .iter()
                .map(|page| LinkPagePayload {
                    id: page.external_id.clone(),
                    name: page.name.clone(),
                    category: page.category.clone(),
                    access_token: page
                        .ephemeral_token
                        .as_ref()
                        .map(|t| t.expose().to_string()),
                })
                .collect(),
        };

        tracing::info!(
            "[BackendLinker] Linking {} with {} page(s)",
            identity.id,
            request.pages.len()
        );

        let response = self
            .backend
            .link_account(&request)
            .await
            .map_err(classify_link_error)?;

        let token_kind = response.token_kind();
        let expires_at = match token_kind {
            TokenKind::LongLivedUser => response.expiry(Utc::now()),
            TokenKind::ShortLived => None,
        };

        tracing::info!(
            "[BackendLinker] Linked, backend returned {} account(s), token: {:?}",
            response.accounts.len(),
            token_kind
        );

        Ok(LinkOutcome {
            accounts: response.accounts,
            token_kind,
            expires_at,
        })
    }

    pub async fn unlink(&self) -> Result<()> {
        self.backend
            .unlink_account()
            .await
            .map_err(classify_link_error)?;
        tracing::info!("[BackendLinker] Unlinked");
        Ok(())
    }
}

/// Maps a backend failure onto the link failure taxonomy.
pub fn classify_link_error(err: BackendError) -> PagelinkError {
    if err.is_unauthorized() {
        return PagelinkError::LinkUnauthorized {
            message: err.message().to_string(),
        };
    }

    let exchange_failed = err.code() == Some(TOKEN_EXCHANGE_FAILED_CODE)
        || err.message().to_ascii_lowercase().contains("token exchange");
    if exchange_failed {
        PagelinkError::TokenExchangeFailed {
            message: err.message().to_string(),
        }
    } else {
        PagelinkError::LinkFailed {
            message: err.message().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{MockBackend, status_error};
    use pagelink_core::backend::LinkAccountResponse;

    fn identity() -> PlatformIdentity {
        PlatformIdentity {
            id: "u1".into(),
            name: "Ada".into(),
            email: None,
        }
    }

    #[tokio::test]
    async fn test_long_lived_link_carries_expiry() {
        let backend = Arc::new(MockBackend::new());
        *backend.link_result.lock().unwrap() = Ok(LinkAccountResponse {
            accounts: vec![LinkedAccount::new("acc-1", "p1")],
            token_type: Some("long_lived_user_token".into()),
            expires_in: Some(3600),
            ..Default::default()
        });
        let linker = BackendLinker::new(backend);

        let outcome = linker
            .link(&AccessToken::new("t"), &identity(), &[PageAccount::new("p1", "Bakery")])
            .await
            .unwrap();

        assert_eq!(outcome.token_kind, TokenKind::LongLivedUser);
        assert!(outcome.expires_at.is_some_and(|at| at > Utc::now()));
        assert_eq!(outcome.accounts.len(), 1);
    }

    #[tokio::test]
    async fn test_short_lived_link_has_no_expiry() {
        let backend = Arc::new(MockBackend::linking(vec![]));
        let linker = BackendLinker::new(backend);

        let outcome = linker
            .link(&AccessToken::new("t"), &identity(), &[])
            .await
            .unwrap();

        assert_eq!(outcome.token_kind, TokenKind::ShortLived);
        assert!(outcome.expires_at.is_none());
    }

    #[test]
    fn test_link_error_taxonomy() {
        assert!(classify_link_error(status_error(401, "expired")).requires_logout());

        let exchange = BackendError::Status {
            status: 502,
            message: "Could not extend token".into(),
            code: Some(TOKEN_EXCHANGE_FAILED_CODE.into()),
        };
        assert!(matches!(
            classify_link_error(exchange),
            PagelinkError::TokenExchangeFailed { .. }
        ));

        assert!(matches!(
            classify_link_error(status_error(500, "Token exchange with platform failed")),
            PagelinkError::TokenExchangeFailed { .. }
        ));

        match classify_link_error(BackendError::Transport("connection refused".into())) {
            PagelinkError::LinkFailed { message } => assert_eq!(message, "connection refused"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
