pub mod chat_handler;
pub mod entity_handler;
pub mod graph_handler;
pub mod relationship_handler;

pub use chat_handler::*;
pub use entity_handler::*;
pub use graph_handler::*;
pub use relationship_handler::*;

use actix_web::web;

/// Mounts the knowledge-graph API under `/api/kg`. Expects `GraphService`,
/// `ImportService` and `ChatService` as app data.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/kg")
            .route("/data", web::get().to(get_graph_data))
            .route("/entity", web::post().to(add_entity))
            .service(
                web::resource("/entities")
                    .route(web::get().to(list_entities))
                    .route(web::post().to(create_entity)),
            )
            .service(
                web::resource("/entities/{id}")
                    .route(web::get().to(get_entity))
                    .route(web::put().to(update_entity))
                    .route(web::patch().to(update_entity))
                    .route(web::delete().to(delete_entity)),
            )
            .service(
                web::resource("/relationships")
                    .route(web::get().to(list_relationships))
                    .route(web::post().to(create_relationship)),
            )
            .service(
                web::resource("/relationships/{id}")
                    .route(web::get().to(get_relationship))
                    .route(web::put().to(update_relationship))
                    .route(web::patch().to(update_relationship))
                    .route(web::delete().to(delete_relationship)),
            )
            .route("/export", web::get().to(export_graph))
            .route("/import", web::post().to(import_graph))
            .route("/ai-chat", web::post().to(ai_chat))
            .route("/clear-all", web::post().to(clear_all))
            .route("/save-data", web::post().to(save_data)),
    );
}
