//! Configuration management for the legal RAG engine.
//!
//! Supports loading configuration from:
//! - Built-in defaults
//! - TOML/YAML files
//! - Environment variables (`LEGAL_RAG_` prefix)

pub mod legal_data;
pub mod retrieval;
pub mod settings;

pub use legal_data::{LegacyMappingRow, LegacyMappingTable, LEGAL_SYNONYMS, OFFENSE_SECTION_GUESSES};
pub use retrieval::RetrievalConfig;
pub use settings::{load_settings, ServerConfig, Settings};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Environment error: {0}")]
    Environment(String),
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}
