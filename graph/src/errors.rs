use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use kgviz_database::DbError;
use kgviz_models::ApiResponse;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(DbError),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type GraphResult<T> = Result<T, GraphError>;

impl GraphError {
    pub fn validation(msg: impl Into<String>) -> Self {
        GraphError::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        GraphError::NotFound(msg.into())
    }
}

impl From<DbError> for GraphError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::AlreadyExists(what) => GraphError::Conflict(format!("{} already exists", what)),
            other => GraphError::Database(other),
        }
    }
}

impl From<kgviz_database::sqlx::Error> for GraphError {
    fn from(err: kgviz_database::sqlx::Error) -> Self {
        GraphError::Database(DbError::Sqlx(err))
    }
}

// Client-side problems are reported in the envelope with HTTP 200; only
// storage and internal failures change the status.
impl ResponseError for GraphError {
    fn status_code(&self) -> StatusCode {
        match self {
            GraphError::Database(_) | GraphError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::OK,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if self.status_code().is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }
        HttpResponse::build(self.status_code()).json(ApiResponse::error(self.to_string()))
    }
}
