use actix_web::{web, HttpResponse};
use kgviz_models::{ApiResponse, DomainQuery, ImportRequest, SaveDataRequest};

use crate::errors::{GraphError, GraphResult};
use crate::import::ImportService;
use crate::services::GraphService;

fn to_value<T: serde::Serialize>(value: &T) -> GraphResult<serde_json::Value> {
    serde_json::to_value(value).map_err(|e| GraphError::Internal(e.to_string()))
}

/// Nodes and links for the visualizer.
pub async fn get_graph_data(
    service: web::Data<GraphService>,
    query: web::Query<DomainQuery>,
) -> GraphResult<HttpResponse> {
    let data = service.graph_data(query.selected()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(data).field("domain", query.label())))
}

pub async fn export_graph(
    service: web::Data<GraphService>,
    query: web::Query<DomainQuery>,
) -> GraphResult<HttpResponse> {
    let data = service.graph_data(query.selected()).await?;
    tracing::info!(
        domain = query.label(),
        nodes = data.nodes.len(),
        links = data.links.len(),
        "Graph exported"
    );
    Ok(HttpResponse::Ok().json(ApiResponse::success(data).field("domain", query.label())))
}

pub async fn import_graph(
    service: web::Data<ImportService>,
    body: web::Json<ImportRequest>,
) -> GraphResult<HttpResponse> {
    let report = service.import(&body).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(report).message("import completed")))
}

pub async fn clear_all(service: web::Data<GraphService>) -> GraphResult<HttpResponse> {
    let cleared = service.clear_all().await?;
    Ok(HttpResponse::Ok().json(
        ApiResponse::empty()
            .field("success", true)
            .field("message", "all data cleared")
            .field("backup_data", to_value(&cleared.backup)?)
            .field("deleted_count", to_value(&cleared.deleted)?),
    ))
}

pub async fn save_data(
    service: web::Data<GraphService>,
    body: web::Json<SaveDataRequest>,
) -> GraphResult<HttpResponse> {
    let summary = service.save_data(&body).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(summary).message("data saved")))
}
