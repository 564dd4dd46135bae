//! Logging and request tracing for the knowledge-graph services.
//!
//! - `tracing` subscriber setup with pretty or JSON output
//! - actix-web middleware that logs each request with an id and its latency

pub mod init;
pub mod middleware;

pub use init::*;
pub use middleware::*;
