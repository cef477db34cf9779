//! HTTP Query/Answer API for the legal RAG engine.

pub mod http;
pub mod metrics;
pub mod state;

pub use http::create_router;
pub use metrics::init_metrics;
pub use state::AppState;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use legal_rag_retrieval::{ErrorEnvelope, RetrievalError};
use thiserror::Error;

/// Caller-visible error taxonomy for the HTTP surface. Thin wrapper over
/// `RetrievalError` plus the request-validation cases that never reach the
/// retrieval engine.
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Retrieval(#[from] RetrievalError),
}

impl ServerError {
    fn envelope(&self) -> ErrorEnvelope {
        match self {
            ServerError::BadRequest(msg) => ErrorEnvelope {
                kind: "BadRequest",
                message: msg.clone(),
                retry_after: None,
            },
            ServerError::Retrieval(err) => ErrorEnvelope::from(err),
        }
    }

    pub(crate) fn status_code(&self) -> StatusCode {
        match self {
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Retrieval(RetrievalError::BadInput(_)) => StatusCode::BAD_REQUEST,
            ServerError::Retrieval(RetrievalError::Unavailable) => StatusCode::SERVICE_UNAVAILABLE,
            ServerError::Retrieval(RetrievalError::Timeout(_)) => StatusCode::GATEWAY_TIMEOUT,
            ServerError::Retrieval(RetrievalError::Internal(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "internal error serving request");
        } else {
            tracing::warn!(error = %self, "request rejected");
        }
        (status, Json(self.envelope())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_request_maps_to_400() {
        let err = ServerError::BadRequest("empty query".into());
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn unavailable_maps_to_503() {
        let err = ServerError::Retrieval(RetrievalError::Unavailable);
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
