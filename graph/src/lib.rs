//! Knowledge-graph services: CRUD, import/merge, maintenance and chat.

pub mod chat;
pub mod errors;
pub mod handlers;
pub mod import;
pub mod services;

pub use chat::ChatService;
pub use errors::{GraphError, GraphResult};
pub use handlers::configure;
pub use import::ImportService;
pub use services::{GraphService, SeedSummary};
