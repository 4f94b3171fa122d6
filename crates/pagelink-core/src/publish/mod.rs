//! Publish domain module.
//!
//! - `form`: compose modes, drafts and upload slots
//! - `intent`: precedence rules, validation and the wire request

mod form;
mod intent;

pub use form::{ComposeForms, ComposeMode, GeneratedDraft, ManualDraft, UploadSlot, UploadedFile};
pub use intent::{MediaKind, MediaSource, PublishField, PublishIntent, PublishRequest, TextSource};
