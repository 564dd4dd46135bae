pub mod users;

pub use users::*;

use actix_web::{web, Scope};

/// Prefixes the user API is served under. Older visualizer builds call the
/// routes nested in the graph API.
pub const USER_API_PREFIXES: [&str; 2] = ["/api/users", "/api/kg/users"];

fn user_scope(prefix: &str) -> Scope {
    web::scope(prefix)
        .service(
            web::resource("/users/")
                .route(web::get().to(list_users))
                .route(web::post().to(create_user)),
        )
        .service(
            web::resource("/users/{id}/")
                .route(web::get().to(get_user))
                .route(web::put().to(update_user))
                .route(web::delete().to(delete_user)),
        )
        .route("/login/", web::post().to(login))
        .route("/logout/", web::post().to(logout))
        .route("/stats/", web::get().to(user_stats))
}

/// Mounts the user API under every prefix in [`USER_API_PREFIXES`]. Expects
/// `UserService` as app data and a session middleware on the app.
pub fn configure(cfg: &mut web::ServiceConfig) {
    for prefix in USER_API_PREFIXES {
        cfg.service(user_scope(prefix));
    }
}
