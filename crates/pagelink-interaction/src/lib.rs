//! HTTP adapters for the platform graph API and the Pagelink backend.

pub mod backend_client;
pub mod graph_sdk;

pub use backend_client::HttpBackendClient;
pub use graph_sdk::GraphApiSdk;
