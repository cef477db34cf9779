//! Application state.
//!
//! Holds the wired `HybridRetrievalEngine` plus the loaded settings.
//! Config is loaded once at process start; no hot-reload path is needed
//! here, so this holds a plain `Arc<Settings>` rather than a
//! read-write-locked one (see DESIGN.md).

use std::sync::Arc;

use legal_rag_config::{LegacyMappingTable, Settings};
use legal_rag_retrieval::{
    ChunkStore, CrossEncoderReranker, EmbeddingClient, HybridRetrievalEngine, InMemoryChunkStore,
    TieredCache,
};
use metrics_exporter_prometheus::PrometheusHandle;

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub engine: Arc<HybridRetrievalEngine>,
    pub metrics_handle: PrometheusHandle,
}

impl AppState {
    /// Wires the reference in-memory chunk store and a reranker/cache-free
    /// engine. A production deployment swaps `store`/`embedder` for a
    /// Qdrant/Tantivy-backed `ChunkStore` and a real embedding endpoint
    /// without touching the rest of this struct.
    pub fn new(settings: Settings) -> Self {
        let store: Arc<dyn ChunkStore> = Arc::new(InMemoryChunkStore::default());
        Self::with_store(settings, store, None, None)
    }

    pub fn with_store(
        settings: Settings,
        store: Arc<dyn ChunkStore>,
        embedder: Option<Arc<dyn EmbeddingClient>>,
        reranker: Option<Arc<CrossEncoderReranker>>,
    ) -> Self {
        let embedder = embedder.unwrap_or_else(|| Arc::new(NullEmbeddingClient));
        let engine = HybridRetrievalEngine::new(
            store,
            embedder,
            reranker,
            None::<Arc<TieredCache>>,
            settings.retrieval.clone(),
            LegacyMappingTable::default(),
        );
        Self {
            settings: Arc::new(settings),
            engine: Arc::new(engine),
            metrics_handle: crate::metrics::init_metrics(),
        }
    }
}

/// Placeholder embedder used when no remote embedding endpoint is
/// configured; every vector comes back zeroed, so only the lexical and
/// resolver search paths contribute candidates. Swapped for a
/// `RemoteEmbeddingClient` once an endpoint/key is configured.
struct NullEmbeddingClient;

#[async_trait::async_trait]
impl EmbeddingClient for NullEmbeddingClient {
    async fn embed_batch(
        &self,
        texts: &[String],
    ) -> Result<Vec<Vec<f32>>, legal_rag_retrieval::EmbeddingError> {
        Ok(texts
            .iter()
            .map(|_| vec![0.0; legal_rag_retrieval::EMBEDDING_DIM])
            .collect())
    }
}
