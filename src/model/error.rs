use thiserror::Error;

pub type DatabaseResult<T> = std::result::Result<T, DatabaseError>;

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("sqlx migrate error: {0}")]
    SqlxMigrateError(#[from] sqlx::migrate::MigrateError),
    #[error("sqlx error: {0}")]
    SqlxError(#[from] sqlx::Error),
    #[error("json error: {0}")]
    SerdeError(#[from] serde_json::Error),
    #[error("access to this resource is forbidden")]
    Forbidden,
    #[error("resource already exists: {0}")]
    Conflict(&'static str),
    #[error("validation failed: {0}")]
    Validation(String),
}

impl DatabaseError {
    /// Turns unique constraint violations into [`DatabaseError::Conflict`].
    pub fn unique_as_conflict(error: sqlx::Error, what: &'static str) -> Self {
        match error.as_database_error() {
            Some(db) if db.is_unique_violation() => Self::Conflict(what),
            _ => Self::SqlxError(error),
        }
    }

    pub fn validation<S: Into<String>>(msg: S) -> Self {
        Self::Validation(msg.into())
    }
}
