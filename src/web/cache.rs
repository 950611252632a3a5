use axum::{
    body::Bytes,
    http::header,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use serde::Serialize;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

use crate::error::ApiError;

/// Serialized JSON listings, shared between requests until they expire.
pub struct ResponseCache {
    ttl: Duration,
    entries: DashMap<String, CachedEntry>,
}

#[derive(Clone)]
struct CachedEntry {
    body: Bytes,
    stored_at: Instant,
}

/// A pre-serialized JSON body.
#[derive(Debug, Clone)]
pub struct CachedJson(pub Bytes);

impl IntoResponse for CachedJson {
    fn into_response(self) -> Response {
        ([(header::CONTENT_TYPE, "application/json")], self.0).into_response()
    }
}

impl ResponseCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: DashMap::new(),
        }
    }

    /// Returns the cached body for `key`, or runs `load`, serializes its
    /// output and caches it. Failed loads are not cached.
    pub async fn get_or_load<F, Fut, T, E>(&self, key: &str, load: F) -> Result<CachedJson, ApiError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        T: Serialize,
        ApiError: From<E>,
    {
        if let Some(entry) = self.entries.get(key) {
            if entry.stored_at.elapsed() < self.ttl {
                debug!("Cache hit for {}", key);
                return Ok(CachedJson(entry.body.clone()));
            }
        }

        debug!("Cache miss for {}", key);
        self.evict_expired();
        let value = load().await?;
        let body = Bytes::from(
            serde_json::to_vec(&value).map_err(|e| ApiError::Internal(e.to_string()))?,
        );

        self.entries.insert(
            key.to_string(),
            CachedEntry {
                body: body.clone(),
                stored_at: Instant::now(),
            },
        );
        Ok(CachedJson(body))
    }

    fn evict_expired(&self) {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.stored_at.elapsed() < self.ttl);
        let evicted = before.saturating_sub(self.entries.len());
        if evicted > 0 {
            debug!("Evicted {} expired listings", evicted);
        }
    }

    pub fn invalidate(&self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    pub fn invalidate_all(&self) -> usize {
        let count = self.entries.len();
        self.entries.clear();
        count
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
