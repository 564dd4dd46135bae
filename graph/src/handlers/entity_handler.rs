use actix_web::{web, HttpResponse};
use kgviz_models::{
    ApiResponse, DomainQuery, EntityFilter, NodeRecord, NodeView, UpdateEntityRequest,
};

use crate::errors::GraphResult;
use crate::services::GraphService;

pub async fn list_entities(
    service: web::Data<GraphService>,
    query: web::Query<EntityFilter>,
) -> GraphResult<HttpResponse> {
    let entities = service.list_entities(&query).await?;
    let data: Vec<NodeView> = entities.iter().map(NodeView::from).collect();
    Ok(HttpResponse::Ok().json(ApiResponse::success(data)))
}

pub async fn create_entity(
    service: web::Data<GraphService>,
    body: web::Json<NodeRecord>,
) -> GraphResult<HttpResponse> {
    service.create_entity(&body).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok("created")))
}

/// Older clients post single entities here and expect `"success"`.
pub async fn add_entity(
    service: web::Data<GraphService>,
    body: web::Json<NodeRecord>,
) -> GraphResult<HttpResponse> {
    service.create_entity(&body).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok("success")))
}

pub async fn get_entity(
    service: web::Data<GraphService>,
    path: web::Path<String>,
    query: web::Query<DomainQuery>,
) -> GraphResult<HttpResponse> {
    let entity = service.get_entity(&path, query.selected()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(NodeView::from(&entity))))
}

pub async fn update_entity(
    service: web::Data<GraphService>,
    path: web::Path<String>,
    query: web::Query<DomainQuery>,
    body: web::Json<UpdateEntityRequest>,
) -> GraphResult<HttpResponse> {
    service.update_entity(&path, query.selected(), &body).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok("updated")))
}

pub async fn delete_entity(
    service: web::Data<GraphService>,
    path: web::Path<String>,
    query: web::Query<DomainQuery>,
) -> GraphResult<HttpResponse> {
    let deletion = service.delete_entity(&path, query.selected()).await?;
    Ok(HttpResponse::Ok().json(
        ApiResponse::ok("deleted").field("deleted_relationships", deletion.deleted_relationships),
    ))
}
