//! Error types for the lodhound resolution layer.

use std::sync::Arc;

use thiserror::Error;

use crate::types::QueryMode;

/// Main error type for resolver operations.
#[derive(Error, Debug)]
pub enum ResolverError {
    /// The adapter does not implement the requested query mode.
    #[error("Unsupported query mode {0:?}")]
    UnsupportedQuery(QueryMode),

    /// A remote service answered with a non-success HTTP status.
    #[error("External service returned status {status} while {context}")]
    ExternalService { status: u16, context: String },

    /// One result item in a remote batch could not be decoded.
    ///
    /// Adapters log this and skip the item; it only surfaces to callers
    /// when a whole payload is unusable.
    #[error("Failed to decode result item: {0}")]
    ItemParse(String),

    /// A failure inside the deeper city-search heuristic. Always caught
    /// and logged by the geonames adapter, never returned to callers.
    #[error("Fallback search failed: {0}")]
    Fallback(String),

    /// A response payload did not have the expected overall shape.
    #[error("Malformed response payload: {0}")]
    Payload(String),

    /// A linked-data document could not be imported.
    #[error("RDF import error: {0}")]
    Rdf(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// An error produced by a coalesced in-flight request and shared
    /// between all callers that were waiting on it.
    #[error("{0}")]
    Shared(Arc<ResolverError>),
}

impl ResolverError {
    /// Build an [`ResolverError::ExternalService`] from a reqwest status.
    pub fn external(status: reqwest::StatusCode, context: impl Into<String>) -> Self {
        Self::ExternalService {
            status: status.as_u16(),
            context: context.into(),
        }
    }

    /// Unwrap a shared error when this caller is the only one left holding
    /// it, otherwise keep the shared form.
    pub(crate) fn shared(err: Arc<ResolverError>) -> Self {
        match Arc::try_unwrap(err) {
            Ok(inner) => inner,
            Err(shared) => Self::Shared(shared),
        }
    }
}

/// Configuration-related errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Missing required field: {0}")]
    MissingField(String),
}

/// Result type alias for resolver operations.
pub type Result<T> = std::result::Result<T, ResolverError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ResolverError::ExternalService {
            status: 503,
            context: "searching for 'Halen'".to_string(),
        };
        assert!(err.to_string().contains("503"));
        assert!(err.to_string().contains("Halen"));
    }

    #[test]
    fn test_config_error_conversion() {
        let err: ResolverError = ConfigError::MissingField("geonames.username".to_string()).into();
        assert!(matches!(err, ResolverError::Config(_)));
        assert!(err.to_string().contains("geonames.username"));
    }

    #[test]
    fn test_shared_unwraps_unique_arc() {
        let arc = Arc::new(ResolverError::Payload("broken".to_string()));
        let err = ResolverError::shared(arc);
        assert!(matches!(err, ResolverError::Payload(_)));
    }

    #[test]
    fn test_shared_keeps_contended_arc() {
        let arc = Arc::new(ResolverError::Payload("broken".to_string()));
        let _other = arc.clone();
        let err = ResolverError::shared(arc);
        assert!(matches!(err, ResolverError::Shared(_)));
        assert!(err.to_string().contains("broken"));
    }
}
