//! Configuration for the resolution layer.
//!
//! Constructed once by the caller and passed into adapters; there is no
//! process-wide mutable state. The only required credential is the geonames
//! account name.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Public account used when no geonames username is configured. Heavily
/// rate-limited; fine for tests, not for production traffic.
pub const DEMO_GEONAMES_USERNAME: &str = "demo";

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub geonames: GeonamesConfig,
    pub wikidata: WikidataConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            geonames: GeonamesConfig::default(),
            wikidata: WikidataConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content =
            std::fs::read_to_string(path.as_ref()).map_err(ConfigError::ReadFile)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.geonames.username.is_empty() {
            return Err(ConfigError::MissingField("geonames.username".to_string()).into());
        }
        if self.geonames.username == DEMO_GEONAMES_USERNAME {
            tracing::warn!(
                "No geonames username configured, using the public '{}' account; \
                 expect aggressive rate limits",
                DEMO_GEONAMES_USERNAME
            );
        }
        if self.geonames.timeout_secs == 0 || self.wikidata.timeout_secs == 0 {
            return Err(ConfigError::Invalid("timeout_secs must be > 0".to_string()).into());
        }
        if self.wikidata.wiki_sites.is_empty() {
            return Err(ConfigError::Invalid(
                "wikidata.wiki_sites must list at least one site".to_string(),
            )
            .into());
        }
        Ok(())
    }
}

/// Geonames service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeonamesConfig {
    /// Geonames account name sent with every request.
    pub username: String,
    /// Base URL of the search/detail API.
    pub base_url: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Row cap for the postal-code fallback search.
    pub postal_max_rows: u32,
    /// Result cache sizing and expiry.
    pub cache: CacheConfig,
}

impl Default for GeonamesConfig {
    fn default() -> Self {
        Self {
            username: DEMO_GEONAMES_USERNAME.to_string(),
            base_url: "http://api.geonames.org".to_string(),
            timeout_secs: 30,
            postal_max_rows: 20,
            cache: CacheConfig {
                max_entries: 100,
                ttl_secs: 60 * 60,
            },
        }
    }
}

/// Wikidata service configuration. No credential is required.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WikidataConfig {
    /// The wikibase action API endpoint.
    pub api_endpoint: String,
    /// The public SPARQL query service.
    pub sparql_endpoint: String,
    /// Canonical entity URI prefix (http scheme; this is the subject URI
    /// used in the linked-data documents).
    pub entity_base: String,
    /// Human-facing item page prefix, used when no site-link exists.
    pub page_base: String,
    /// Wikipedia sites queried for per-language label/site-link tuples.
    pub wiki_sites: Vec<String>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Result cache sizing and expiry.
    pub cache: CacheConfig,
}

impl Default for WikidataConfig {
    fn default() -> Self {
        Self {
            api_endpoint: "https://www.wikidata.org/w/api.php".to_string(),
            sparql_endpoint: "https://query.wikidata.org/sparql".to_string(),
            entity_base: "http://www.wikidata.org/entity/".to_string(),
            page_base: "https://www.wikidata.org/wiki/".to_string(),
            wiki_sites: vec!["en".to_string(), "fr".to_string(), "nl".to_string()],
            timeout_secs: 30,
            cache: CacheConfig {
                max_entries: 100,
                ttl_secs: 24 * 60 * 60,
            },
        }
    }
}

/// Sizing and expiry for one adapter's result cache. Entries expire when
/// either their age or their idle time exceeds `ttl_secs`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of cached results.
    pub max_entries: u64,
    /// Time-to-live and time-to-idle, in seconds.
    pub ttl_secs: u64,
}
