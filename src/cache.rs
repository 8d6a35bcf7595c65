//! Result caches for the query adapters.
//!
//! Each adapter kind owns one [`AdapterCache`], handed out by an explicit
//! [`CacheManager`] built once from the configuration. Keys are composites
//! of every query parameter: the same text queried in another language is a
//! distinct entry. Empty result sets are cached like any other value so a
//! query known to yield nothing is not re-issued before its entry expires.
//!
//! Lookup and population go through [`ResultCache::get_or_fetch`], which
//! coalesces concurrent identical misses into a single in-flight remote
//! call; all waiters receive the same result. Errors are never cached.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use oxrdf::Triple;

use crate::config::{CacheConfig, Config};
use crate::error::{ResolverError, Result};
use crate::types::{QueryMode, ResourceRecord, ResourceType, SearchOption, Suggestion};

/// Which adapter a cache entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdapterKind {
    GeonamesCountry,
    GeonamesCity,
    WikidataItem,
}

/// Composite cache key.
///
/// Two keys are equal iff every component is equal; language and options
/// included.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    kind: AdapterKind,
    resource_type: ResourceType,
    /// Raw query text for searches, resource id for fetches.
    term: String,
    mode: Option<QueryMode>,
    language: Option<String>,
    options: Vec<SearchOption>,
}

impl CacheKey {
    /// Key for a `search` call.
    pub fn search(
        kind: AdapterKind,
        resource_type: &ResourceType,
        query: &str,
        mode: QueryMode,
        language: Option<&str>,
        options: &[SearchOption],
    ) -> Self {
        Self {
            kind,
            resource_type: resource_type.clone(),
            term: query.to_string(),
            mode: Some(mode),
            language: language.map(str::to_string),
            options: options.to_vec(),
        }
    }

    /// Key for a `fetch_resource` or `fetch_external_model` call.
    pub fn resource(
        kind: AdapterKind,
        resource_type: &ResourceType,
        resource_id: &str,
        language: Option<&str>,
    ) -> Self {
        Self {
            kind,
            resource_type: resource_type.clone(),
            term: resource_id.to_string(),
            mode: None,
            language: language.map(str::to_string),
            options: Vec::new(),
        }
    }
}

/// TTL-bounded keyed store for one result shape.
#[derive(Clone)]
pub struct ResultCache<V> {
    inner: Cache<CacheKey, V>,
}

impl<V> ResultCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Create a cache from per-adapter configuration. Entries expire when
    /// either their age or their idle time exceeds the configured TTL, and
    /// the store evicts when `max_entries` is exceeded.
    pub fn new(config: &CacheConfig) -> Self {
        let ttl = Duration::from_secs(config.ttl_secs);
        let inner = Cache::builder()
            .max_capacity(config.max_entries)
            .time_to_live(ttl)
            .time_to_idle(ttl)
            .build();
        Self { inner }
    }

    /// Get a cached value.
    pub async fn get(&self, key: &CacheKey) -> Option<V> {
        self.inner.get(key).await
    }

    /// Get a cached value, or run `init` to produce and cache it.
    ///
    /// Concurrent callers with an equal key share one `init` execution.
    /// A failed `init` is reported to every waiter and nothing is cached.
    pub async fn get_or_fetch<F>(&self, key: CacheKey, init: F) -> Result<V>
    where
        F: Future<Output = Result<V>>,
    {
        self.inner
            .try_get_with(key, init)
            .await
            .map_err(ResolverError::shared)
    }

    /// Number of live entries (approximate until pending tasks run).
    pub fn entry_count(&self) -> u64 {
        self.inner.entry_count()
    }

    /// Run cache maintenance (cleanup expired entries).
    pub async fn run_pending_tasks(&self) {
        self.inner.run_pending_tasks().await;
    }
}

/// The caches owned by one adapter kind, one per result shape.
pub struct AdapterCache {
    /// Search results, including empty ones.
    pub searches: ResultCache<Arc<Vec<Suggestion>>>,
    /// Descriptive records; `None` is cached for ids known to be absent.
    pub resources: ResultCache<Arc<Option<ResourceRecord>>>,
    /// Filtered linked-data statement sets.
    pub models: ResultCache<Arc<Vec<Triple>>>,
}

impl AdapterCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            searches: ResultCache::new(config),
            resources: ResultCache::new(config),
            models: ResultCache::new(config),
        }
    }
}

/// Explicit owner of the per-adapter caches.
///
/// Construct once, then hand [`CacheManager::geonames`] to every geonames
/// adapter (country and city instances share one store, distinguished by
/// [`AdapterKind`] inside the key) and [`CacheManager::wikidata`] to the
/// knowledge-item adapter.
pub struct CacheManager {
    geonames: Arc<AdapterCache>,
    wikidata: Arc<AdapterCache>,
}

impl CacheManager {
    pub fn new(config: &Config) -> Self {
        Self {
            geonames: Arc::new(AdapterCache::new(&config.geonames.cache)),
            wikidata: Arc::new(AdapterCache::new(&config.wikidata.cache)),
        }
    }

    pub fn geonames(&self) -> Arc<AdapterCache> {
        self.geonames.clone()
    }

    pub fn wikidata(&self) -> Arc<AdapterCache> {
        self.wikidata.clone()
    }
}
