//! Page domain module.
//!
//! - `model`: `PageAccount`, capabilities and the session-only access token
//! - `reconcile`: matching SDK pages to backend accounts and the selection policy

mod model;
mod reconcile;

pub use model::{AccessToken, PERSONAL_PROFILE_CATEGORY, PageAccount, PageCapabilities};
pub use reconcile::{
    ReconcileReport, build_page_list, dedupe_pages, initial_selection, pages_from_accounts,
    reconcile,
};
