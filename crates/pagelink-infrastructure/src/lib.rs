//! Local persistence and filesystem adapters for Pagelink.

pub mod config_service;
pub mod paths;
pub mod secret_service;
pub mod upload;

pub use config_service::ConfigService;
pub use paths::{PagelinkPaths, PathError};
pub use secret_service::SecretServiceImpl;
pub use upload::load_upload;
