//! Listing Cache Implementation
//!
//! TTL cache for traversed structures and shallow folder listings using Moka.
//! The two namespaces live in separate caches so one can never satisfy the other.
//! Entries are keyed by `(generation, id)`; clearing bumps the generation so a
//! fetch that started before the clear can never answer a later lookup.

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use moka::future::Cache;
use serde::Serialize;
use tracing::{debug, trace};

use crate::tree::Node;

/// Cache key: a node id within one of the two namespaces
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// Full recursive structure below a root
    Structure(String),
    /// One level below a folder
    Folder(String),
}

impl CacheKey {
    pub fn id(&self) -> &str {
        match self {
            CacheKey::Structure(id) | CacheKey::Folder(id) => id,
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKey::Structure(id) => write!(f, "structure:{}", id),
            CacheKey::Folder(id) => write!(f, "folder:{}", id),
        }
    }
}

/// A captured listing. Replaced as a whole, never mutated.
#[derive(Clone, Debug)]
pub struct CachedListing {
    pub nodes: Arc<Vec<Node>>,
    /// When this listing was fetched
    pub captured_at: Instant,
    /// Branches that failed during traversal (always 0 for shallow listings)
    pub degraded_branches: usize,
}

impl CachedListing {
    pub fn new(nodes: Vec<Node>, degraded_branches: usize) -> Self {
        Self {
            nodes: Arc::new(nodes),
            captured_at: Instant::now(),
            degraded_branches,
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded_branches > 0
    }
}

/// Cache statistics
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Percentage of lookups served from cache
    pub hit_rate: f64,
    pub structure_entries: u64,
    pub folder_entries: u64,
    pub ttl_secs: u64,
}

type Slot = (u64, String);

/// Listing cache with TTL support
pub struct ListingCache {
    /// Full structures by root id
    structure_cache: Cache<Slot, CachedListing>,
    /// Shallow listings by folder id
    folder_cache: Cache<Slot, CachedListing>,
    ttl: Duration,
    /// Bumped by `invalidate_all`
    generation: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ListingCache {
    /// Create a cache whose entries expire `ttl` after insertion
    pub fn new(ttl: Duration) -> Self {
        let structure_cache = Cache::builder()
            .time_to_live(ttl)
            .name("structure_cache")
            .build();

        let folder_cache = Cache::builder()
            .time_to_live(ttl)
            .name("folder_cache")
            .build();

        Self {
            structure_cache,
            folder_cache,
            ttl,
            generation: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    fn namespace(&self, key: &CacheKey) -> &Cache<Slot, CachedListing> {
        match key {
            CacheKey::Structure(_) => &self.structure_cache,
            CacheKey::Folder(_) => &self.folder_cache,
        }
    }

    fn slot(&self, key: &CacheKey) -> Slot {
        (self.generation.load(Ordering::Acquire), key.id().to_string())
    }

    /// Get a live listing from cache
    ///
    /// Returns None when absent or expired. Updates hit/miss counters.
    pub async fn get(&self, key: &CacheKey) -> Option<CachedListing> {
        self.lookup(key, &self.slot(key)).await
    }

    async fn lookup(&self, key: &CacheKey, slot: &Slot) -> Option<CachedListing> {
        match self.namespace(key).get(slot).await {
            Some(cached) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                let age_ms = cached.captured_at.elapsed().as_millis() as u64;
                trace!(key = %key, age_ms = age_ms, "Cache HIT");
                Some(cached)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                trace!(key = %key, "Cache MISS");
                None
            }
        }
    }

    /// Get a live listing, or run `fetch` and store its result
    ///
    /// Concurrent callers missing on the same key share one `fetch`.
    /// A failed fetch stores nothing; every waiting caller gets the same error.
    /// A fetch overtaken by `invalidate_all` still answers its own callers but
    /// is not kept.
    pub async fn get_or_try_fetch<F, E>(
        &self,
        key: &CacheKey,
        fetch: F,
    ) -> Result<CachedListing, Arc<E>>
    where
        F: Future<Output = Result<CachedListing, E>>,
        E: Send + Sync + 'static,
    {
        let slot = self.slot(key);
        if let Some(cached) = self.lookup(key, &slot).await {
            return Ok(cached);
        }

        let cache = self.namespace(key);
        let listing = cache.try_get_with(slot.clone(), fetch).await?;

        if self.generation.load(Ordering::Acquire) != slot.0 {
            cache.invalidate(&slot).await;
            debug!(key = %key, "Dropped listing fetched before clear");
        } else {
            debug!(key = %key, nodes = listing.nodes.len(), "Cached listing");
        }
        Ok(listing)
    }

    /// Store a listing, replacing any previous entry for the key
    #[cfg(test)]
    pub async fn insert(&self, key: &CacheKey, listing: CachedListing) {
        self.namespace(key).insert(self.slot(key), listing).await;
        debug!(key = %key, "Stored listing");
    }

    /// Drop a single key
    pub async fn invalidate(&self, key: &CacheKey) {
        self.namespace(key).invalidate(&self.slot(key)).await;
        debug!(key = %key, "Invalidated listing");
    }

    /// Drop every entry in both namespaces
    pub fn invalidate_all(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.structure_cache.invalidate_all();
        self.folder_cache.invalidate_all();
        debug!("Cleared all listing caches");
    }

    /// Get cache statistics
    pub async fn stats(&self) -> CacheStats {
        self.structure_cache.run_pending_tasks().await;
        self.folder_cache.run_pending_tasks().await;

        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        let hit_rate = if total > 0 {
            (hits as f64 / total as f64) * 100.0
        } else {
            0.0
        };

        CacheStats {
            hits,
            misses,
            hit_rate,
            structure_entries: self.structure_cache.entry_count(),
            folder_entries: self.folder_cache.entry_count(),
            ttl_secs: self.ttl.as_secs(),
        }
    }
}
