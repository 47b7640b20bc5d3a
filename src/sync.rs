//! Tree cache synchronisation
//!
//! `TreeCacheSync` turns the upstream one-level listing primitive into cached
//! full course structures and cached shallow folder listings. It owns the
//! listing cache; nothing else mutates it.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use crate::cache::{CacheKey, CacheStats, CachedListing, ListingCache};
use crate::config::{Config, ConfigError};
use crate::drive::{DriveError, FolderLister, UpstreamHealth};
use crate::tree::{Node, Traversal};

/// Errors returned by `TreeCacheSync`
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Upstream listing of {folder_id} failed: {source}")]
    Upstream {
        folder_id: String,
        #[source]
        source: Arc<DriveError>,
    },
}

/// Tuning for `TreeCacheSync`
#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub ttl: Duration,
    /// Upper bound on in-flight listing calls across all requests
    pub max_concurrent_listings: usize,
    /// Keep trees with failed branches in the cache
    pub cache_degraded: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for SyncOptions {
    fn from(config: &Config) -> Self {
        Self {
            ttl: config.cache_ttl,
            max_concurrent_listings: config.traversal_concurrency,
            cache_degraded: config.cache_degraded,
        }
    }
}

/// Cache and upstream state for the status endpoint
#[derive(Debug, Clone, Serialize)]
pub struct SyncStatus {
    pub upstream: UpstreamHealth,
    pub cache: CacheStats,
}

/// Cached view of the upstream folder hierarchy
pub struct TreeCacheSync {
    lister: Arc<dyn FolderLister>,
    cache: ListingCache,
    permits: Arc<Semaphore>,
    cache_degraded: bool,
}

impl TreeCacheSync {
    pub fn new(lister: Arc<dyn FolderLister>, options: SyncOptions) -> Self {
        info!(
            ttl_secs = options.ttl.as_secs(),
            max_concurrent = options.max_concurrent_listings,
            cache_degraded = options.cache_degraded,
            "Tree cache initialized"
        );

        Self {
            lister,
            cache: ListingCache::new(options.ttl),
            permits: Arc::new(Semaphore::new(options.max_concurrent_listings.max(1))),
            cache_degraded: options.cache_degraded,
        }
    }

    fn traversal(&self) -> Traversal {
        Traversal::new(Arc::clone(&self.lister), Arc::clone(&self.permits))
    }

    /// Full structure below `root_id`
    ///
    /// Served from cache while fresh; otherwise traverses the whole hierarchy.
    /// Fails only when the root itself cannot be listed, in which case nothing
    /// is cached. Folders that failed deeper down come back empty and flagged
    /// `degraded`.
    pub async fn get_complete_structure(&self, root_id: &str) -> Result<Arc<Vec<Node>>, SyncError> {
        let root_id = require_id(root_id)?;
        let key = CacheKey::Structure(root_id.to_string());

        let listing = self
            .cache
            .get_or_try_fetch(&key, async {
                let snapshot = self.traversal().run(root_id).await?;
                Ok::<_, DriveError>(CachedListing::new(
                    snapshot.nodes,
                    snapshot.degraded_branches,
                ))
            })
            .await
            .map_err(|source| upstream_error(&key, source))?;

        if listing.is_degraded() && !self.cache_degraded {
            warn!(
                key = %key,
                degraded = listing.degraded_branches,
                "Serving partial tree without caching it"
            );
            self.cache.invalidate(&key).await;
        }

        Ok(listing.nodes)
    }

    /// Immediate children of `folder_id`, never recursing
    pub async fn get_folder_contents(&self, folder_id: &str) -> Result<Arc<Vec<Node>>, SyncError> {
        let folder_id = require_id(folder_id)?;
        let key = CacheKey::Folder(folder_id.to_string());

        let listing = self
            .cache
            .get_or_try_fetch(&key, async {
                let nodes = self.traversal().shallow(folder_id).await?;
                Ok::<_, DriveError>(CachedListing::new(nodes, 0))
            })
            .await
            .map_err(|source| upstream_error(&key, source))?;

        Ok(listing.nodes)
    }

    /// Drop every cached structure and folder listing
    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
        info!("Tree cache cleared");
    }

    pub async fn status(&self) -> SyncStatus {
        SyncStatus {
            upstream: self.lister.health(),
            cache: self.cache.stats().await,
        }
    }
}

fn require_id(id: &str) -> Result<&str, ConfigError> {
    let id = id.trim();
    if id.is_empty() {
        return Err(ConfigError::Missing("folder id"));
    }
    Ok(id)
}

fn upstream_error(key: &CacheKey, source: Arc<DriveError>) -> SyncError {
    error!(key = %key, error = %source, "Upstream listing failed");
    SyncError::Upstream {
        folder_id: key.id().to_string(),
        source,
    }
}
