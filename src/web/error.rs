use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::data::FetchError;

/// Errors surfaced to HTTP clients as plain-text 500 responses
#[derive(thiserror::Error, Debug)]
pub enum HandlerError {
    #[error("fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("marshal error: {0}")]
    Marshal(#[from] serde_json::Error),
}

impl IntoResponse for HandlerError {
    fn into_response(self) -> Response {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            self.to_string(),
        )
            .into_response()
    }
}
