//! Page reconciliation.
//!
//! Matches pages observed through the platform SDK against the backend's
//! canonical account records. Matching is a pure function of
//! `external_id == platform_user_id`; applying it twice with unchanged
//! inputs changes nothing.

use std::collections::{HashMap, HashSet};

use super::model::{AccessToken, PageAccount, PageCapabilities};
use crate::backend::LinkedAccount;
use crate::platform::PlatformIdentity;

/// Outcome of one matching pass over a page list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Pages that carry an internal id after this pass
    pub matched: Vec<String>,
    /// Pages still without an internal id
    pub unmatched: Vec<String>,
    /// Pages whose platform id maps to several different backend accounts
    pub ambiguous: Vec<String>,
    /// How many pages received their internal id during this pass
    pub newly_resolved: usize,
}

impl ReconcileReport {
    pub fn is_complete(&self) -> bool {
        self.unmatched.is_empty()
    }
}

enum Candidate<'a> {
    Unique(&'a str),
    Ambiguous,
}

fn index_accounts(accounts: &[LinkedAccount]) -> HashMap<&str, Candidate<'_>> {
    let mut index: HashMap<&str, Candidate<'_>> = HashMap::new();
    for account in accounts {
        index
            .entry(account.platform_user_id.as_str())
            .and_modify(|existing| {
                if let Candidate::Unique(id) = existing
                    && *id != account.id.as_str()
                {
                    *existing = Candidate::Ambiguous;
                }
            })
            .or_insert(Candidate::Unique(account.id.as_str()));
    }
    index
}

/// Applies the matching rule to `pages` in place.
///
/// Only `internal_id` is touched. Pages already reconciled keep their id.
pub fn reconcile(pages: &mut [PageAccount], accounts: &[LinkedAccount]) -> ReconcileReport {
    let index = index_accounts(accounts);
    let mut report = ReconcileReport::default();

    for page in pages.iter_mut() {
        match index.get(page.external_id.as_str()) {
            Some(Candidate::Unique(internal_id)) => {
                if page.resolve_internal_id(internal_id) {
                    report.newly_resolved += 1;
                }
            }
            Some(Candidate::Ambiguous) => {
                tracing::warn!(
                    "[Reconciliation] Page {} matches several backend accounts, leaving unresolved",
                    page.external_id
                );
                report.ambiguous.push(page.external_id.clone());
            }
            None => {}
        }

        if page.is_reconciled() {
            report.matched.push(page.external_id.clone());
        } else {
            report.unmatched.push(page.external_id.clone());
        }
    }

    report
}

/// Drops pages whose `external_id` was already seen (first one wins).
pub fn dedupe_pages(pages: Vec<PageAccount>) -> Vec<PageAccount> {
    let mut seen = HashSet::new();
    pages
        .into_iter()
        .filter(|page| {
            let fresh = seen.insert(page.external_id.clone());
            if !fresh {
                tracing::debug!(
                    "[Reconciliation] Dropping duplicate page {}",
                    page.external_id
                );
            }
            fresh
        })
        .collect()
}

/// Builds the displayed page list from what the SDK discovered.
///
/// With no managed pages, the user's own profile stands in as the only entry.
pub fn build_page_list(
    discovered: Vec<PageAccount>,
    identity: &PlatformIdentity,
    user_token: Option<AccessToken>,
) -> Vec<PageAccount> {
    let pages = dedupe_pages(discovered);
    if pages.is_empty() {
        return vec![PageAccount::personal_profile(
            identity.id.clone(),
            identity.name.clone(),
            user_token,
        )];
    }
    pages
}

/// Selection policy after a fresh match: a single entry is auto-selected,
/// several entries require an explicit choice.
pub fn initial_selection(pages: &[PageAccount]) -> Option<String> {
    match pages {
        [only] => Some(only.external_id.clone()),
        _ => None,
    }
}

/// Rebuilds a page list from the backend's records alone, for restoring
/// a federation that was linked in an earlier run. Every entry is
/// reconciled by construction; no platform token is available.
pub fn pages_from_accounts(accounts: &[LinkedAccount]) -> Vec<PageAccount> {
    let pages = accounts
        .iter()
        .map(|account| {
            let name = account
                .name
                .clone()
                .unwrap_or_else(|| account.platform_user_id.clone());
            let mut page = PageAccount::new(account.platform_user_id.clone(), name)
                .with_capabilities(PageCapabilities::full());
            page.resolve_internal_id(&account.id);
            page
        })
        .collect();
    dedupe_pages(pages)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(id: &str, platform_user_id: &str) -> LinkedAccount {
        LinkedAccount::new(id, platform_user_id)
    }

    fn identity() -> PlatformIdentity {
        PlatformIdentity {
            id: "user-1".to_string(),
            name: "Dana".to_string(),
            email: None,
        }
    }

    #[test]
    fn test_three_pages_two_accounts() {
        let mut pages = vec![
            PageAccount::new("p1", "One"),
            PageAccount::new("p2", "Two"),
            PageAccount::new("p3", "Three"),
        ];
        let accounts = vec![account("acc-1", "p1"), account("acc-3", "p3")];

        let report = reconcile(&mut pages, &accounts);

        assert_eq!(report.matched, vec!["p1", "p3"]);
        assert_eq!(report.unmatched, vec!["p2"]);
        assert_eq!(report.newly_resolved, 2);
        assert_eq!(pages[0].internal_id(), Some("acc-1"));
        assert_eq!(pages[1].internal_id(), None);
        assert_eq!(pages[2].internal_id(), Some("acc-3"));
    }

    #[test]
    fn test_reconcile_is_idempotent() {
        let mut pages = vec![PageAccount::new("p1", "One"), PageAccount::new("p2", "Two")];
        let accounts = vec![account("acc-1", "p1"), account("acc-x", "unrelated")];

        let first = reconcile(&mut pages, &accounts);
        let snapshot = pages.clone();
        let second = reconcile(&mut pages, &accounts);

        assert_eq!(pages, snapshot);
        assert_eq!(first.matched, second.matched);
        assert_eq!(second.newly_resolved, 0);
    }

    #[test]
    fn test_ambiguous_platform_id_stays_unmatched() {
        let mut pages = vec![PageAccount::new("p1", "One")];
        let accounts = vec![account("acc-1", "p1"), account("acc-2", "p1")];

        let report = reconcile(&mut pages, &accounts);

        assert_eq!(report.ambiguous, vec!["p1"]);
        assert!(!pages[0].is_reconciled());
    }

    #[test]
    fn test_duplicate_account_rows_with_same_id_still_match() {
        let mut pages = vec![PageAccount::new("p1", "One")];
        let accounts = vec![account("acc-1", "p1"), account("acc-1", "p1")];

        reconcile(&mut pages, &accounts);

        assert_eq!(pages[0].internal_id(), Some("acc-1"));
    }

    #[test]
    fn test_selection_for_zero_pages_is_personal_profile() {
        let pages = build_page_list(vec![], &identity(), None);
        assert_eq!(pages.len(), 1);
        assert!(pages[0].is_personal_profile());
        assert!(pages[0].capabilities.can_post && pages[0].capabilities.can_comment);
        assert_eq!(pages[0].follower_count, 0);
        assert_eq!(initial_selection(&pages), Some("user-1".to_string()));
    }

    #[test]
    fn test_selection_for_one_and_many_pages() {
        let one = build_page_list(vec![PageAccount::new("p1", "One")], &identity(), None);
        assert_eq!(initial_selection(&one), Some("p1".to_string()));

        let many = build_page_list(
            vec![PageAccount::new("p1", "One"), PageAccount::new("p2", "Two")],
            &identity(),
            None,
        );
        assert_eq!(initial_selection(&many), None);
    }

    #[test]
    fn test_duplicate_pages_are_dropped() {
        let pages = build_page_list(
            vec![
                PageAccount::new("p1", "First"),
                PageAccount::new("p1", "Second"),
            ],
            &identity(),
            None,
        );
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].name, "First");
        // A duplicate collapsing to one entry auto-selects it
        assert_eq!(initial_selection(&pages), Some("p1".to_string()));
    }

    #[test]
    fn test_restored_pages_are_reconciled() {
        let mut named = account("acc-1", "p1");
        named.name = Some("Bakery".to_string());
        let pages = pages_from_accounts(&[named, account("acc-2", "p2")]);

        assert_eq!(pages[0].name, "Bakery");
        assert_eq!(pages[0].internal_id(), Some("acc-1"));
        assert_eq!(pages[1].name, "p2");
        assert!(pages.iter().all(|p| p.ephemeral_token.is_none()));
    }
}
