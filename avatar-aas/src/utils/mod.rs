pub mod config;
pub mod error;
pub(crate) mod http_client;
pub mod tracing;
