//! User accounts: registration, profile management and cookie-session login.

pub mod errors;
pub mod handlers;
pub mod services;

pub use errors::{AuthError, AuthResult};
pub use handlers::{configure, SESSION_USER_KEY};
pub use services::UserService;
