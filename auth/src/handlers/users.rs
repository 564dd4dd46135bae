use actix_session::Session;
use actix_web::{web, HttpResponse};
use kgviz_models::auth::{
    LoginRequest, RegisterRequest, SessionUser, UpdateUserRequest, UserListQuery, UserProfile,
};
use kgviz_models::ApiResponse;
use serde_json::json;

use crate::errors::{AuthError, AuthResult};
use crate::services::UserService;

/// Session key holding the logged-in user's id.
pub const SESSION_USER_KEY: &str = "user_id";

fn current_user(session: &Session) -> AuthResult<Option<i64>> {
    session
        .get::<i64>(SESSION_USER_KEY)
        .map_err(|e| AuthError::Session(e.to_string()))
}

pub async fn list_users(
    service: web::Data<UserService>,
    query: web::Query<UserListQuery>,
) -> AuthResult<HttpResponse> {
    let users = service.list(&query).await?;
    let data: Vec<UserProfile> = users.iter().map(UserProfile::from).collect();
    Ok(HttpResponse::Ok().json(ApiResponse::success(data)))
}

pub async fn create_user(
    service: web::Data<UserService>,
    body: web::Json<RegisterRequest>,
) -> AuthResult<HttpResponse> {
    let user = service.register(&body).await?;
    Ok(HttpResponse::Ok().json(
        ApiResponse::success(json!({
            "id": user.id,
            "username": user.username,
            "email": user.email,
        }))
        .message("user created"),
    ))
}

pub async fn get_user(
    service: web::Data<UserService>,
    path: web::Path<i64>,
) -> AuthResult<HttpResponse> {
    let user = service.get(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(UserProfile::from(&user))))
}

pub async fn update_user(
    service: web::Data<UserService>,
    path: web::Path<i64>,
    body: web::Json<UpdateUserRequest>,
) -> AuthResult<HttpResponse> {
    let user = service.update(path.into_inner(), &body).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(UserProfile::from(&user)).message("user updated")))
}

pub async fn delete_user(
    service: web::Data<UserService>,
    session: Session,
    path: web::Path<i64>,
) -> AuthResult<HttpResponse> {
    let acting_user = current_user(&session)?;
    service.delete(path.into_inner(), acting_user).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok("user deleted")))
}

pub async fn login(
    service: web::Data<UserService>,
    session: Session,
    body: web::Json<LoginRequest>,
) -> AuthResult<HttpResponse> {
    let user = service.login(&body).await?;

    session.renew();
    session
        .insert(SESSION_USER_KEY, user.id)
        .map_err(|e| AuthError::Session(e.to_string()))?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(SessionUser::from(&user)).message("login successful")))
}

pub async fn logout(session: Session) -> HttpResponse {
    if let Ok(Some(user_id)) = session.get::<i64>(SESSION_USER_KEY) {
        tracing::info!(user_id, "User logged out");
    }
    session.purge();
    HttpResponse::Ok().json(ApiResponse::ok("logged out"))
}

pub async fn user_stats(service: web::Data<UserService>) -> AuthResult<HttpResponse> {
    let stats = service.stats().await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(stats)))
}
