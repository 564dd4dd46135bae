use actix_web::{web, HttpResponse};
use kgviz_models::chat::ChatRequest;
use kgviz_models::ApiResponse;

use crate::chat::ChatService;
use crate::errors::GraphResult;

pub async fn ai_chat(
    chat: web::Data<ChatService>,
    body: web::Json<ChatRequest>,
) -> GraphResult<HttpResponse> {
    let (answer, source) = chat.answer(&body).await?;
    tracing::debug!(?source, nodes = body.graph_data.nodes.len(), "Chat answered");
    Ok(HttpResponse::Ok().json(ApiResponse::empty().field("response", answer)))
}
