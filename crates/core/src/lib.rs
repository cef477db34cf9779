//! Core data model and error types for the legal RAG workspace.
//!
//! This crate provides the foundational types shared across the
//! retrieval and server crates:
//! - The chunk/query/answer data model
//! - The shared error taxonomy

pub mod error;
pub mod model;

pub use error::{Error, Result};
pub use model::*;
