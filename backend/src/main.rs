use actix_cors::Cors;
use actix_web::{http::header, web, App, HttpResponse, HttpServer};
use anyhow::Context;
use kgviz_config::AppConfig;
use kgviz_database::Database;
use kgviz_models::ApiResponse;
use kgviz_observability::{init_tracing, RequestLogging, TracingConfig};

use kgviz_backend::{configure_routes, session_middleware, AppState};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env();

    let mut tracing_config = TracingConfig::for_service("kgviz-backend");
    if config.is_production() {
        tracing_config = tracing_config.json();
    }
    init_tracing(tracing_config);

    config.validate().context("invalid configuration")?;
    tracing::info!(env_mode = %config.server.env_mode, "Starting knowledge graph backend");

    let db = Database::connect(&config.database)
        .await
        .context("failed to connect to the database")?;
    db.migrate().await.context("failed to run migrations")?;

    let state = AppState::new(db, &config);
    if !state.user_management {
        tracing::warn!("User management disabled via feature toggles");
    }

    let secret = config.server.secret_key.clone();
    let secure_cookies = config.is_production();
    let bind = (config.server.host.clone(), config.server.port);
    tracing::info!(host = %bind.0, port = bind.1, "Starting HTTP server");

    HttpServer::new(move || {
        App::new()
            .wrap(session_middleware(&secret, secure_cookies))
            .wrap(RequestLogging::for_service("kgviz-backend"))
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allowed_methods(vec!["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"])
                    .allowed_headers(vec![header::CONTENT_TYPE, header::ACCEPT])
                    .max_age(3600),
            )
            .configure(|cfg| configure_routes(cfg, &state))
            .default_service(web::to(|| async {
                HttpResponse::NotFound().json(ApiResponse::error("not found"))
            }))
    })
    .bind(bind)
    .context("failed to bind HTTP listener")?
    .run()
    .await
    .context("HTTP server stopped with an error")
}
