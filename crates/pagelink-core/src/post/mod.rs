//! Post history domain module.

mod classify;
mod model;

pub use classify::{PostHistory, classify};
pub use model::{PostOrigin, PostRecord, PostStatus, RawPost};
