//! Hybrid retrieval, answer assembly, and verification for the legal RAG
//! engine.
//!
//! Covers every component except the raw chunk store client (a narrow
//! trait this crate depends on, implemented elsewhere):
//! - Tokenizer & embedding client
//! - Cache layer
//! - Dense + lexical search adapters
//! - Query analyzer
//! - Temporal reasoner
//! - Hybrid retrieval engine: fan-out, resolvers, fusion, rerank, MMR
//! - Answer assembler
//! - Verifier

pub mod assembler;
pub mod cache;
pub mod chunk_store;
pub mod embeddings;
pub mod error;
pub mod fusion;
pub mod mmr;
pub mod query_analysis;
pub mod reranker;
pub mod resolvers;
pub mod retriever;
pub mod temporal;
pub mod tokenizer;
pub mod verifier;

pub use assembler::{assemble_answer, AnswerMode, AssemblerInput};
pub use cache::{CacheBackend, InMemoryCacheBackend, TieredCache};
pub use chunk_store::{CaseFilter, ChunkStore, InMemoryChunkStore, StatuteFilter};
pub use embeddings::{EmbeddingClient, RemoteEmbeddingClient, EMBEDDING_DIM};
pub use error::{EmbeddingError, ErrorEnvelope, RetrievalError};
pub use query_analysis::{analyze_query, clarifying_question, should_refuse};
pub use reranker::{CrossEncoder, CrossEncoderReranker};
pub use retriever::{HybridRetrievalEngine, RetrievalOutcome};
pub use tokenizer::count_tokens;
pub use verifier::{verify_answer, VerificationOutcome};

#[cfg(feature = "onnx")]
pub use embeddings::OnnxEmbeddingClient;
