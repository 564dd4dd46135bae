use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use kgviz_database::DbError;
use kgviz_models::ApiResponse;
use thiserror::Error;
use validator::ValidationErrors;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("{0}")]
    Forbidden(String),

    #[error("Database error: {0}")]
    Database(DbError),

    #[error("Session error: {0}")]
    Session(String),
}

pub type AuthResult<T> = Result<T, AuthError>;

impl From<DbError> for AuthError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::AlreadyExists(what) => AuthError::Conflict(format!("{} already exists", what)),
            other => AuthError::Database(other),
        }
    }
}

impl From<ValidationErrors> for AuthError {
    fn from(errors: ValidationErrors) -> Self {
        let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
        fields.sort_by(|a, b| a.0.cmp(&b.0));

        let messages: Vec<String> = fields
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| match &e.message {
                    Some(msg) => msg.to_string(),
                    None => format!("{} is invalid", field),
                })
            })
            .collect();
        AuthError::Validation(messages.join("; "))
    }
}

impl ResponseError for AuthError {
    fn status_code(&self) -> StatusCode {
        match self {
            AuthError::Database(_) | AuthError::Session(_) => StatusCode::INTERNAL_SERVER_ERROR,
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
