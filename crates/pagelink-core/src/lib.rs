//! Domain layer of Pagelink.
//!
//! Models, pure algorithms (page reconciliation, publish intent
//! resolution, post classification) and the traits of the collaborators
//! the application layer orchestrates.

pub mod automation;
pub mod backend;
pub mod config;
pub mod error;
pub mod page;
pub mod platform;
pub mod post;
pub mod publish;
pub mod secret;

// Re-export common error type
pub use error::{PagelinkError, Result};
