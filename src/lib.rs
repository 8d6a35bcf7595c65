//! Lodhound: canonical entity resolution over external knowledge services.
//!
//! Resolves free-text autocomplete queries into canonical external entities
//! (geographic places via the geonames APIs, general knowledge-base items
//! via wikidata) and fetches descriptive records for previously resolved
//! entities. The backing services are third-party and rate-limited, so the
//! interesting parts live in the resolution layer: retry/fallback search
//! heuristics, a shared TTL-bounded result cache keyed by the full query
//! parameter set, and a filter that narrows remote linked-data documents
//! down to the statements about exactly one subject.
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use lodhound::{
//!     CacheManager, Config, GeonamesAdapter, PlaceKind, QueryEndpoint, QueryMode,
//!     RelativeUriBuilder, ResourceType,
//! };
//!
//! # async fn run() -> lodhound::Result<()> {
//! let config = Config::default();
//! let caches = CacheManager::new(&config);
//! let cities = GeonamesAdapter::new(
//!     PlaceKind::City,
//!     &config.geonames,
//!     caches.geonames(),
//!     Arc::new(RelativeUriBuilder),
//! )?;
//!
//! let suggestions = cities
//!     .search(
//!         &ResourceType::new("schema:City"),
//!         "Halen,Belgium",
//!         QueryMode::Full,
//!         Some("nl"),
//!         10,
//!         &[],
//!     )
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod geonames;
pub mod rdf;
pub mod types;
pub mod vocab;
pub mod wikidata;

pub use cache::{AdapterCache, AdapterKind, CacheKey, CacheManager, ResultCache};
pub use config::{CacheConfig, Config, GeonamesConfig, WikidataConfig};
pub use endpoint::QueryEndpoint;
pub use error::{ConfigError, ResolverError, Result};
pub use geonames::{GeonamesAdapter, PlaceKind};
pub use types::{
    resource_id_from_uri, Class, Property, QueryMode, RelativeUriBuilder, ResourceRecord,
    ResourceType, ResourceUriBuilder, SearchOption, Suggestion,
};
pub use wikidata::WikidataAdapter;
