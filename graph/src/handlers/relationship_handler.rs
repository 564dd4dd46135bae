use actix_web::{web, HttpResponse};
use kgviz_models::{ApiResponse, LinkRecord, LinkView, RelationshipFilter, UpdateRelationshipRequest};
use serde_json::json;

use crate::errors::GraphResult;
use crate::services::GraphService;

pub async fn list_relationships(
    service: web::Data<GraphService>,
    query: web::Query<RelationshipFilter>,
) -> GraphResult<HttpResponse> {
    let relationships = service.list_relationships(&query).await?;
    let data: Vec<LinkView> = relationships.iter().map(LinkView::from).collect();
    Ok(HttpResponse::Ok().json(ApiResponse::success(data)))
}

pub async fn create_relationship(
    service: web::Data<GraphService>,
    body: web::Json<LinkRecord>,
) -> GraphResult<HttpResponse> {
    let id = service.create_relationship(&body).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(json!({ "id": id })).message("created")))
}

pub async fn get_relationship(
    service: web::Data<GraphService>,
    path: web::Path<i64>,
) -> GraphResult<HttpResponse> {
    let relationship = service.get_relationship(*path).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(LinkView::from(&relationship))))
}

pub async fn update_relationship(
    service: web::Data<GraphService>,
    path: web::Path<i64>,
    body: web::Json<UpdateRelationshipRequest>,
) -> GraphResult<HttpResponse> {
    let changed = service.update_relationship(*path, &body).await?;
    let msg = if changed { "updated" } else { "no changes" };
    Ok(HttpResponse::Ok().json(ApiResponse::ok(msg)))
}

pub async fn delete_relationship(
    service: web::Data<GraphService>,
    path: web::Path<i64>,
) -> GraphResult<HttpResponse> {
    service.delete_relationship(*path).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok("deleted")))
}
