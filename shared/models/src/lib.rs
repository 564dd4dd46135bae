//! Shared wire and storage types for the knowledge-graph backend.

pub mod auth;
pub mod chat;
pub mod de;
pub mod graph;
pub mod import;
pub mod response;

pub use graph::*;
pub use import::*;
pub use response::ApiResponse;

/// Domain assigned to records that do not name one.
pub const DEFAULT_DOMAIN: &str = "default";

/// Pseudo-domain selecting every domain in read/export/save operations.
pub const ALL_DOMAINS: &str = "all";
