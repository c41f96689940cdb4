use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use snip_core::StorageError;
use thiserror::Error;
use tracing::error;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("missing `{0}` cookie")]
    Unauthorized(&'static str),

    #[error("bad request: {0}")]
    BadRequest(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Storage(err) => match err {
                StorageError::EmptyInput => StatusCode::BAD_REQUEST,
                StorageError::Conflict(_) => StatusCode::CONFLICT,
                StorageError::NotFound(_) => StatusCode::NOT_FOUND,
                StorageError::Deleted(_) => StatusCode::GONE,
                StorageError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
                StorageError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                StorageError::Query(_)
                | StorageError::InvalidData(_)
                | StorageError::RecoveryLog(_)
                | StorageError::TokenExhausted(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, status = status.as_u16(), "request failed");
        }
        (status, self.to_string()).into_response()
    }
}
