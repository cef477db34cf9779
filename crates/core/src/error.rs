//! Shared error taxonomy for the legal RAG workspace.
//!
//! Each crate defines its own error enum for its own concerns (embedding,
//! retrieval, server) and converts into this crate's `Error` only at the
//! boundary where a caller-visible, correlation-id-bearing error is needed.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error kind surfaced across crate boundaries.
///
/// BadInput / Upstream / Validation / Integrity / Internal.
#[derive(Error, Debug)]
pub enum Error {
    #[error("bad input: {0}")]
    BadInput(String),

    #[error("upstream unavailable: {0}")]
    Upstream(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("integrity check failed: {0}")]
    Integrity(String),

    #[error("internal error (correlation_id={correlation_id}): {message}")]
    Internal {
        message: String,
        correlation_id: uuid::Uuid,
    },

    #[error("retrieval error: {0}")]
    Retrieval(String),

    #[error("config error: {0}")]
    Config(String),
}

impl Error {
    pub fn internal(message: impl Into<String>) -> Self {
        let correlation_id = uuid::Uuid::new_v4();
        let message = message.into();
        tracing::error!(%correlation_id, %message, "internal error");
        Error::Internal {
            message,
            correlation_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_error_carries_correlation_id() {
        let err = Error::internal("boom");
        match err {
            Error::Internal { correlation_id, .. } => {
                assert_ne!(correlation_id, uuid::Uuid::nil());
            }
            _ => panic!("expected internal variant"),
        }
    }
}
