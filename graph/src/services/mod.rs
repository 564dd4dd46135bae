pub mod graph_service;
pub mod seed;

pub use graph_service::{ClearedGraph, EntityDeletion, GraphService};
pub use seed::SeedSummary;
