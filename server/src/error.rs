//! Mapping of handler failures onto HTTP responses.
//!
//! `NotFound` from the store becomes 404. Every other failure is logged and
//! answered with a bare 500 so internal details stay out of the page.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use todo_core::StoreError;
use tracing::{error, warn};

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("error rendering template: {0}")]
    Render(#[from] askama::Error),

    #[error("blocking task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Store(StoreError::NotFound(id)) => {
                warn!(id, "todo not found");
                (StatusCode::NOT_FOUND, "Not Found").into_response()
            }
            other => {
                error!(error = %other, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Error").into_response()
            }
        }
    }
}
