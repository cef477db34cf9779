//! Cache layer.
//!
//! A small in-process LRU fronts a remote `CacheBackend` so repeated
//! lookups within a single process don't round-trip to Redis. Core
//! documents (constitution / BNS / BNSS / BSA) get a longer TTL since
//! they are re-requested across nearly every query.
use std::num::NonZeroUsize;
use std::sync::Arc;

use async_trait::async_trait;
use lru::LruCache;
use parking_lot::Mutex;

const CORE_DOC_PREFIXES: &[&str] = &["CONSTITUTION:", "BNS:2023:", "BNSS:2023:", "BSA:2023:"];

pub fn is_core_document(doc_id: &str) -> bool {
    CORE_DOC_PREFIXES.iter().any(|p| doc_id.starts_with(p))
}

pub fn query_embedding_key(query_sha256: &str) -> String {
    format!("query_emb:{query_sha256}")
}

pub fn search_results_key(query_sha256: &str, as_on: &str) -> String {
    format!("search_results:{query_sha256}:{as_on}")
}

pub fn doc_embedding_key(doc_id: &str) -> String {
    format!("doc_emb:{doc_id}")
}

pub fn retrieval_payload_key(request_id: &str) -> String {
    format!("retrieval_payload:{request_id}")
}

#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &str) -> Option<Vec<u8>>;
    async fn set(&self, key: &str, value: Vec<u8>, ttl_secs: u64);
    async fn delete(&self, key: &str);
}

/// Bounded in-process LRU used either standalone (tests) or as a first
/// tier in front of a remote `CacheBackend`.
pub struct InMemoryCacheBackend {
    inner: Mutex<LruCache<String, Vec<u8>>>,
}

impl InMemoryCacheBackend {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap();
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
        }
    }
}

#[async_trait]
impl CacheBackend for InMemoryCacheBackend {
    async fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.inner.lock().get(key).cloned()
    }

    async fn set(&self, key: &str, value: Vec<u8>, _ttl_secs: u64) {
        self.inner.lock().put(key.to_string(), value);
    }

    async fn delete(&self, key: &str) {
        self.inner.lock().pop(key);
    }
}

/// Redis-backed remote tier, gated behind the `redis-cache` feature so
/// the core retrieval path compiles without a Redis client present.
#[cfg(feature = "redis-cache")]
pub struct RedisCacheBackend {
    client: redis::Client,
}

#[cfg(feature = "redis-cache")]
impl RedisCacheBackend {
    pub fn new(redis_url: &str) -> Result<Self, redis::RedisError> {
        Ok(Self {
            client: redis::Client::open(redis_url)?,
        })
    }
}

#[cfg(feature = "redis-cache")]
#[async_trait]
impl CacheBackend for RedisCacheBackend {
    async fn get(&self, key: &str) -> Option<Vec<u8>> {
        let mut conn = self.client.get_multiplexed_async_connection().await.ok()?;
        redis::AsyncCommands::get(&mut conn, key).await.ok()
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl_secs: u64) {
        if let Ok(mut conn) = self.client.get_multiplexed_async_connection().await {
            let _: Result<(), _> = redis::AsyncCommands::set_ex(&mut conn, key, value, ttl_secs).await;
        }
    }

    async fn delete(&self, key: &str) {
        if let Ok(mut conn) = self.client.get_multiplexed_async_connection().await {
            let _: Result<(), _> = redis::AsyncCommands::del(&mut conn, key).await;
        }
    }
}

/// Two-tier cache: a bounded local LRU in front of a remote backend.
/// `ttl_for` applies the core-document TTL multiplier.
pub struct TieredCache {
    local: InMemoryCacheBackend,
    remote: Arc<dyn CacheBackend>,
    result_ttl_secs: u64,
    document_ttl_secs: u64,
    core_doc_ttl_multiplier: u64,
}

impl TieredCache {
    pub fn new(
        remote: Arc<dyn CacheBackend>,
        local_capacity: usize,
        result_ttl_secs: u64,
        document_ttl_secs: u64,
        core_doc_ttl_multiplier: u64,
    ) -> Self {
        Self {
            local: InMemoryCacheBackend::new(local_capacity),
            remote,
            result_ttl_secs,
            document_ttl_secs,
            core_doc_ttl_multiplier,
        }
    }

    pub async fn get(&self, key: &str) -> Option<Vec<u8>> {
        if let Some(v) = self.local.get(key).await {
            return Some(v);
        }
        let v = self.remote.get(key).await?;
        self.local.set(key, v.clone(), 0).await;
        Some(v)
    }

    pub async fn set_search_results(&self, key: &str, value: Vec<u8>) {
        self.local.set(key, value.clone(), 0).await;
        self.remote.set(key, value, self.result_ttl_secs).await;
    }

    pub async fn set_document(&self, doc_id: &str, key: &str, value: Vec<u8>) {
        let ttl = if is_core_document(doc_id) {
            self.document_ttl_secs * self.core_doc_ttl_multiplier
        } else {
            self.document_ttl_secs
        };
        self.local.set(key, value.clone(), 0).await;
        self.remote.set(key, value, ttl).await;
    }
}
