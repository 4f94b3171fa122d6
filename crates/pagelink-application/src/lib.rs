//! Application layer for Pagelink.
//!
//! Coordinates the platform SDK and the backend to connect an operator's
//! pages, keep them reconciled with backend accounts, and publish to them.
//! `ConnectionSession` is the entry point; the other components are usable
//! on their own.

pub mod automation_sync;
pub mod history;
pub mod linker;
pub mod publish;
pub mod reconciliation;
pub mod sdk_gateway;
pub mod session;

#[cfg(test)]
pub(crate) mod test_support;

pub use automation_sync::AutomationRuleSync;
pub use history::PostHistoryLoader;
pub use linker::{BackendLinker, LinkOutcome};
pub use publish::{PublishOrchestrator, PublishReceipt, ScheduledPost};
pub use reconciliation::{MatchedPages, ReconciliationEngine, RematchOutcome};
pub use sdk_gateway::SdkGateway;
pub use session::{ConnectionSession, LoadingFlags, SessionEvent, SessionState};
