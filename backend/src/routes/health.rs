use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::state::AppState;

pub async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    let database = match state.db.ping().await {
        Ok(()) => "connected",
        Err(e) => {
            tracing::warn!(error = %e, "Health check could not reach the database");
            "unavailable"
        }
    };
    let status = if database == "connected" { "healthy" } else { "degraded" };

    HttpResponse::Ok().json(json!({
        "status": status,
        "service": "kgviz-backend",
        "version": env!("CARGO_PKG_VERSION"),
        "database": database,
        "external_chat": state.chat.external_available(),
    }))
}
