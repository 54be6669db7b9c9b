use axum::http::StatusCode;
use thiserror::Error;

/// Errors surfaced by the calculator and the snapshot store.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid input for `{field}`: {reason}")]
    InvalidInput { field: &'static str, reason: String },

    #[error("snapshot {0} not found")]
    NotFound(i64),

    #[error("persistence error: {0}")]
    Persistence(String),

    #[error("snapshot {id} was modified: expected revision {expected}, found {actual}")]
    Conflict { id: i64, expected: i64, actual: i64 },

    #[error("snapshot updates are disabled in append-only mode")]
    UpdatesDisabled,
}

impl CoreError {
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            field,
            reason: reason.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            CoreError::InvalidInput { .. } => StatusCode::BAD_REQUEST,
            CoreError::NotFound(_) => StatusCode::NOT_FOUND,
            CoreError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
            CoreError::Conflict { .. } => StatusCode::CONFLICT,
            CoreError::UpdatesDisabled => StatusCode::METHOD_NOT_ALLOWED,
        }
    }

    pub fn is_server_error(&self) -> bool {
        self.status().is_server_error()
    }
}

impl From<sqlx::Error> for CoreError {
    fn from(e: sqlx::Error) -> Self {
        CoreError::Persistence(e.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for CoreError {
    fn from(e: sqlx::migrate::MigrateError) -> Self {
        CoreError::Persistence(e.to_string())
    }
}

/// Maps a core error to the `(status, message)` pair the handlers return,
/// logging it on the way out.
pub fn reject(e: CoreError) -> (StatusCode, String) {
    let status = e.status();
    if e.is_server_error() {
        tracing::error!(error = %e, %status, "request failed");
    } else {
        tracing::warn!(error = %e, %status, "request rejected");
    }
    (status, e.to_string())
}
