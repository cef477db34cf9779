//! Retrieval-crate error taxonomy.

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum EmbeddingError {
    #[error("text exceeds model token ceiling: {0} tokens")]
    TooLong(usize),
    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },
    #[error("transient upstream error: {0}")]
    Transient(String),
    #[error("invalid request: {0}")]
    Invalid(String),
}

#[derive(Error, Debug, Clone)]
pub enum RetrievalError {
    #[error("bad input: {0}")]
    BadInput(String),

    #[error("retrieval backend unavailable")]
    Unavailable,

    #[error("request timed out after {0}ms")]
    Timeout(u64),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<EmbeddingError> for RetrievalError {
    fn from(err: EmbeddingError) -> Self {
        match err {
            EmbeddingError::TooLong(_) | EmbeddingError::Invalid(_) => {
                RetrievalError::BadInput(err.to_string())
            }
            EmbeddingError::RateLimited { .. } | EmbeddingError::Transient(_) => {
                RetrievalError::Unavailable
            }
        }
    }
}

impl From<RetrievalError> for legal_rag_core::Error {
    fn from(err: RetrievalError) -> Self {
        match err {
            RetrievalError::BadInput(msg) => legal_rag_core::Error::BadInput(msg),
            RetrievalError::Unavailable => {
                legal_rag_core::Error::Upstream("retrieval backend unavailable".into())
            }
            RetrievalError::Timeout(ms) => {
                legal_rag_core::Error::Upstream(format!("timed out after {ms}ms"))
            }
            RetrievalError::Internal(msg) => legal_rag_core::Error::internal(msg),
        }
    }
}

/// The `{kind, message, retry_after?}` error envelope returned to callers.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ErrorEnvelope {
    pub kind: &'static str,
    pub message: String,
    pub retry_after: Option<u64>,
}

impl From<&RetrievalError> for ErrorEnvelope {
    fn from(err: &RetrievalError) -> Self {
        match err {
            RetrievalError::BadInput(msg) => ErrorEnvelope {
                kind: "BadRequest",
                message: msg.clone(),
                retry_after: None,
            },
            RetrievalError::Unavailable => ErrorEnvelope {
                kind: "Unavailable",
                message: "retrieval backend unavailable".into(),
                retry_after: Some(1),
            },
            RetrievalError::Timeout(ms) => ErrorEnvelope {
                kind: "Timeout",
                message: format!("exceeded deadline of {ms}ms"),
                retry_after: Some(1),
            },
            RetrievalError::Internal(msg) => ErrorEnvelope {
                kind: "Internal",
                message: msg.clone(),
                retry_after: None,
            },
        }
    }
}
