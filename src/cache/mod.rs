//! In-process cache for rendered listing and detail views, plus the stale-view signal
//! that mutations raise after they commit.

use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: String,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn new(value: String, ttl: Option<Duration>) -> Self {
        Self {
            value,
            expires_at: ttl.map(|d| Instant::now() + d),
        }
    }

    fn is_expired(&self) -> bool {
        self.expires_at
            .map(|expires_at| Instant::now() > expires_at)
            .unwrap_or(false)
    }
}

#[async_trait::async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CacheError>;
    async fn delete(&self, key: &str) -> Result<(), CacheError>;
}

/// Expired entries are swept on every `SWEEP_EVERY`th write.
const SWEEP_EVERY: usize = 64;

#[derive(Debug, Clone, Default)]
pub struct InMemoryCache {
    store: Arc<RwLock<HashMap<String, CacheEntry>>>,
    writes: Arc<AtomicUsize>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops every expired entry and returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        sweep(&mut *self.store.write().await)
    }
}

fn sweep(store: &mut HashMap<String, CacheEntry>) -> usize {
    let before = store.len();
    store.retain(|_, entry| !entry.is_expired());
    let removed = before - store.len();
    if removed > 0 {
        debug!(removed, "Swept expired cache entries");
    }
    removed
}

#[async_trait::async_trait]
impl CacheBackend for InMemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        {
            let store = self.store.read().await;
            match store.get(key) {
                Some(entry) if !entry.is_expired() => return Ok(Some(entry.value.clone())),
                Some(_) => {}
                None => return Ok(None),
            }
        }
        self.store.write().await.remove(key);
        Ok(None)
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CacheError> {
        let mut store = self.store.write().await;
        if (self.writes.fetch_add(1, Ordering::Relaxed) + 1) % SWEEP_EVERY == 0 {
            sweep(&mut store);
        }
        store.insert(key.to_string(), CacheEntry::new(value.to_string(), ttl));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.store.write().await.remove(key);
        Ok(())
    }
}

/// A cached view that goes stale when the data behind it changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewPath {
    RequestDetail(Uuid),
    ShopListing { organization_id: Uuid },
    AllRequests { organization_id: Uuid },
    UserRequests { user_id: Uuid },
    UserInventory { user_id: Uuid },
    TicketDetail(Uuid),
    TicketListing { organization_id: Uuid },
}

impl ViewPath {
    pub fn cache_key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ViewPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewPath::RequestDetail(id) => write!(f, "view:requests:{}", id),
            ViewPath::ShopListing { organization_id } => {
                write!(f, "view:shop:{}", organization_id)
            }
            ViewPath::AllRequests { organization_id } => {
                write!(f, "view:requests:org:{}", organization_id)
            }
            ViewPath::UserRequests { user_id } => write!(f, "view:requests:user:{}", user_id),
            ViewPath::UserInventory { user_id } => write!(f, "view:inventory:user:{}", user_id),
            ViewPath::TicketDetail(id) => write!(f, "view:tickets:{}", id),
            ViewPath::TicketListing { organization_id } => {
                write!(f, "view:tickets:org:{}", organization_id)
            }
        }
    }
}

/// Receives "these views are now stale" notifications after a successful mutation.
#[async_trait::async_trait]
pub trait ViewInvalidator: Send + Sync {
    async fn invalidate(&self, paths: &[ViewPath]);
}

/// JSON view cache keyed by [`ViewPath`].
///
/// Every invalidation bumps `epoch`. A load that overlapped an invalidation is returned
/// to its caller but never written back, so a view read before a commit cannot outlive
/// the stale-view signal raised after it.
#[derive(Clone)]
pub struct ViewCache {
    backend: Arc<dyn CacheBackend>,
    ttl: Option<Duration>,
    epoch: Arc<Mutex<u64>>,
}

fn encode<T: Serialize>(value: &T) -> Result<String, CacheError> {
    Ok(serde_json::to_string(value)?)
}

fn decode<T: DeserializeOwned>(raw: &str) -> Result<T, CacheError> {
    Ok(serde_json::from_str(raw)?)
}

impl ViewCache {
    pub fn new(backend: Arc<dyn CacheBackend>, ttl: Option<Duration>) -> Self {
        Self {
            backend,
            ttl,
            epoch: Arc::new(Mutex::new(0)),
        }
    }

    pub fn in_memory(ttl: Duration) -> Self {
        Self::new(Arc::new(InMemoryCache::new()), Some(ttl))
    }

    /// Returns the cached view, or runs `load` and caches its result.
    /// Cache failures degrade to a plain load.
    pub async fn read_through<T, E, F, Fut>(&self, path: ViewPath, load: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let key = path.cache_key();

        match self.backend.get(&key).await {
            Ok(Some(raw)) => match decode(&raw) {
                Ok(value) => {
                    debug!(key = %key, "View cache hit");
                    return Ok(value);
                }
                Err(e) => warn!(key = %key, error = %e, "Discarding undecodable cached view"),
            },
            Ok(None) => {}
            Err(e) => warn!(key = %key, error = %e, "View cache read failed"),
        }

        let seen = *self.epoch.lock().await;
        let value = load().await?;
        let raw = match encode(&value) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(key = %key, error = %e, "View is not serializable");
                return Ok(value);
            }
        };

        // held across the write so no invalidation can slip in between check and set
        let epoch = self.epoch.lock().await;
        if *epoch != seen {
            debug!(key = %key, "View invalidated while loading; not caching it");
            return Ok(value);
        }
        if let Err(e) = self.backend.set(&key, &raw, self.ttl).await {
            warn!(key = %key, error = %e, "View cache write failed");
        }
        drop(epoch);

        Ok(value)
    }
}

#[async_trait::async_trait]
impl ViewInvalidator for ViewCache {
    async fn invalidate(&self, paths: &[ViewPath]) {
        let mut epoch = self.epoch.lock().await;
        let next = epoch.wrapping_add(1);
        *epoch = next;

        let deletions = paths.iter().map(|path| async move {
            let key = path.cache_key();
            if let Err(e) = self.backend.delete(&key).await {
                warn!(key = %key, error = %e, "Failed to invalidate cached view");
            }
        });
        futures::future::join_all(deletions).await;
        drop(epoch);
        debug!(count = paths.len(), "Invalidated cached views");
    }
}
