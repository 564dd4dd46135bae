//! HTTP server and admin CLI wiring for the knowledge-graph backend.

pub mod admin;
pub mod routes;
pub mod state;

pub use routes::configure_routes;
pub use state::AppState;

use actix_session::{storage::CookieSessionStore, SessionMiddleware};
use actix_web::cookie::Key;
use sha2::{Digest, Sha512};

/// Cookie sessions signed with a key derived from `secret`; sessions survive
/// restarts as long as the secret does.
pub fn session_middleware(secret: &str, secure: bool) -> SessionMiddleware<CookieSessionStore> {
    let key = Key::from(Sha512::digest(secret.as_bytes()).as_slice());
    SessionMiddleware::builder(CookieSessionStore::default(), key)
        .cookie_name("kgviz_session".to_string())
        .cookie_secure(secure)
        .build()
}
