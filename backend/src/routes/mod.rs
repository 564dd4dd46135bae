pub mod health;

use actix_web::{error::InternalError, web, HttpResponse};
use kgviz_models::ApiResponse;

use crate::state::AppState;

const JSON_LIMIT: usize = 16 * 1024 * 1024;

/// Graph uploads can be large; unreadable bodies answer with the error envelope.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(JSON_LIMIT)
        .error_handler(|err, req| {
            tracing::debug!(path = %req.path(), error = %err, "Rejected request body");
            let response = HttpResponse::Ok().json(ApiResponse::error("Invalid JSON"));
            InternalError::from_response(err, response).into()
        })
}

/// Scopes match in registration order, so the user API (which is also served
/// under `/api/kg/users`) goes in before the `/api/kg` graph scope.
pub fn configure_routes(cfg: &mut web::ServiceConfig, state: &AppState) {
    cfg.app_data(web::Data::new(state.clone()))
        .app_data(web::Data::new(state.graph.clone()))
        .app_data(web::Data::new(state.import.clone()))
        .app_data(web::Data::new(state.chat.clone()))
        .app_data(web::Data::new(state.users.clone()))
        .app_data(json_config())
        .route("/health", web::get().to(health::health_check));

    if state.user_management {
        cfg.configure(kgviz_auth::configure);
    }

    cfg.configure(kgviz_graph::configure);
}
