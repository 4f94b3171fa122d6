use super::*;
use crate::test_support::{MockBackend, status_error};
use std::time::Duration;

fn policy(max_attempts: u32) -> RematchPolicy {
    RematchPolicy {
        initial_delay: Duration::from_secs(3),
        backoff_factor: 2,
        max_attempts,
    }
}

fn identity() -> PlatformIdentity {
    PlatformIdentity {
        id: "u1".into(),
        name: "Ada".into(),
        email: None,
    }
}

fn pages(ids: &[&str]) -> Vec<PageAccount> {
    ids.iter().map(|id| PageAccount::new(*id, format!("Page {id}"))).collect()
}

#[test]
fn test_fresh_match_three_pages_two_accounts() {
    let engine = ReconciliationEngine::new(Arc::new(MockBackend::new()), policy(3));
    let accounts = vec![LinkedAccount::new("acc-1", "p1"), LinkedAccount::new("acc-3", "p3")];

    let list = engine.page_list(pages(&["p1", "p2", "p3"]), &identity(), None);
    let matched = engine.fresh_match(list, &accounts);

    assert_eq!(matched.report.matched, vec!["p1", "p3"]);
    assert_eq!(matched.report.unmatched, vec!["p2"]);
    assert_eq!(matched.pages[1].internal_id(), None);
    assert_eq!(matched.selected, None);
}

#[test]
fn test_fresh_match_without_pages_selects_personal_profile() {
    let engine = ReconciliationEngine::new(Arc::new(MockBackend::new()), policy(3));

    let list = engine.page_list(Vec::new(), &identity(), None);
    let matched = engine.fresh_match(list, &[]);

    assert_eq!(matched.pages.len(), 1);
    assert!(matched.pages[0].is_personal_profile());
    assert_eq!(matched.pages[0].follower_count, 0);
    assert_eq!(matched.selected.as_deref(), Some("u1"));
}

#[tokio::test(start_paused = true)]
async fn test_rematch_stops_once_complete() {
    let backend = Arc::new(MockBackend::new());
    backend.set_accounts(vec![
        vec![],
        vec![LinkedAccount::new("acc-2", "p2")],
    ]);
    let engine = ReconciliationEngine::new(backend.clone(), policy(3));
    let mut live = pages(&["p2"]);

    let started = tokio::time::Instant::now();
    let outcome = engine
        .rematch(&CancellationToken::new(), |accounts| Some(reconcile(&mut live, accounts)))
        .await;

    assert_eq!(outcome, RematchOutcome::Complete { attempts: 2 });
    assert_eq!(backend.count("list_linked_accounts"), 2);
    // 3s then 6s
    assert_eq!(started.elapsed(), Duration::from_secs(9));
    assert_eq!(live[0].internal_id(), Some("acc-2"));
}

#[tokio::test(start_paused = true)]
async fn test_rematch_exhausts_attempts() {
    let backend = Arc::new(MockBackend::new());
    let engine = ReconciliationEngine::new(backend.clone(), policy(3));
    let mut live = pages(&["p1"]);

    let outcome = engine
        .rematch(&CancellationToken::new(), |accounts| Some(reconcile(&mut live, accounts)))
        .await;

    assert_eq!(
        outcome,
        RematchOutcome::Exhausted {
            unmatched: vec!["p1".to_string()]
        }
    );
    assert_eq!(backend.count("list_linked_accounts"), 3);
}

#[tokio::test(start_paused = true)]
async fn test_single_attempt_policy() {
    let backend = Arc::new(MockBackend::new());
    let engine = ReconciliationEngine::new(backend.clone(), policy(1));
    let mut live = pages(&["p1"]);

    engine
        .rematch(&CancellationToken::new(), |accounts| Some(reconcile(&mut live, accounts)))
        .await;

    assert_eq!(backend.count("list_linked_accounts"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_rematch_never_applies() {
    let backend = Arc::new(MockBackend::new());
    backend.set_accounts(vec![vec![LinkedAccount::new("acc-1", "p1")]]);
    let engine = ReconciliationEngine::new(backend.clone(), policy(3));
    let cancel = CancellationToken::new();
    cancel.cancel();

    let mut applied = false;
    let outcome = engine
        .rematch(&cancel, |_| {
            applied = true;
            None
        })
        .await;

    assert_eq!(outcome, RematchOutcome::Discarded);
    assert!(!applied);
    assert_eq!(backend.count("list_linked_accounts"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_stale_session_discards() {
    let backend = Arc::new(MockBackend::new());
    backend.set_accounts(vec![vec![LinkedAccount::new("acc-1", "p1")]]);
    let engine = ReconciliationEngine::new(backend.clone(), policy(3));

    let outcome = engine.rematch(&CancellationToken::new(), |_| None).await;

    assert_eq!(outcome, RematchOutcome::Discarded);
    assert_eq!(backend.count("list_linked_accounts"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_rematch_stops_when_backend_rejects_session() {
    let backend = Arc::new(MockBackend::new());
    *backend.accounts_error.lock().unwrap() = Some(status_error(401, "Session expired"));
    let engine = ReconciliationEngine::new(backend.clone(), policy(3));
    let mut live = pages(&["p1"]);

    let outcome = engine
        .rematch(&CancellationToken::new(), |accounts| Some(reconcile(&mut live, accounts)))
        .await;

    assert_eq!(
        outcome,
        RematchOutcome::Unauthorized {
            message: "Session expired".to_string()
        }
    );
    assert_eq!(backend.count("list_linked_accounts"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_rematch_retries_after_server_error() {
    let backend = Arc::new(MockBackend::new());
    *backend.accounts_error.lock().unwrap() = Some(status_error(503, "Maintenance"));
    let engine = ReconciliationEngine::new(backend.clone(), policy(3));
    let mut live = pages(&["p1"]);

    let outcome = engine
        .rematch(&CancellationToken::new(), |accounts| Some(reconcile(&mut live, accounts)))
        .await;

    assert!(matches!(outcome, RematchOutcome::Exhausted { .. }));
    assert_eq!(backend.count("list_linked_accounts"), 3);
}

#[tokio::test]
async fn test_fetch_accounts_classifies_unauthorized() {
    let backend = Arc::new(MockBackend::new());
    *backend.accounts_error.lock().unwrap() = Some(status_error(401, "Session expired"));
    let engine = ReconciliationEngine::new(backend, policy(3));

    let err = engine.fetch_accounts().await.unwrap_err();

    assert!(err.requires_logout());
}
