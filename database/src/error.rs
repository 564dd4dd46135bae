use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("{0} already exists")]
    AlreadyExists(String),

    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("password hashing failed: {0}")]
    Hash(#[from] bcrypt::BcryptError),
}

pub type DbResult<T> = Result<T, DbError>;

impl DbError {
    /// Maps a unique-constraint violation to `AlreadyExists(what)`.
    pub(crate) fn unique(err: sqlx::Error, what: impl Into<String>) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                DbError::AlreadyExists(what.into())
            }
            _ => DbError::Sqlx(err),
        }
    }
}
