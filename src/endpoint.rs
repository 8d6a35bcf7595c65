//! The shared query-adapter contract.

use async_trait::async_trait;
use oxrdf::Triple;

use crate::error::Result;
use crate::types::{
    Class, Property, QueryMode, ResourceRecord, ResourceType, SearchOption, Suggestion,
};

/// Operations every external query adapter implements, consumed by the host
/// platform's resolution front end.
///
/// All network-bound operations are async and may be invoked concurrently
/// from multiple tasks; adapters share no mutable state beyond their result
/// caches.
#[async_trait]
pub trait QueryEndpoint: Send + Sync {
    /// Resolve free text into autocomplete suggestions.
    ///
    /// An empty `query` returns an empty set without touching the network.
    /// A query mode the adapter does not support fails with
    /// [`crate::ResolverError::UnsupportedQuery`].
    async fn search(
        &self,
        resource_type: &ResourceType,
        query: &str,
        mode: QueryMode,
        language: Option<&str>,
        max_results: usize,
        options: &[SearchOption],
    ) -> Result<Vec<Suggestion>>;

    /// Fetch the descriptive record for a previously resolved entity.
    ///
    /// An empty `resource_id` returns `None` without touching the network.
    async fn fetch_resource(
        &self,
        resource_type: &ResourceType,
        resource_id: &str,
        language: Option<&str>,
    ) -> Result<Option<ResourceRecord>>;

    /// Ordered label-candidate properties for the given resource type.
    /// Static per adapter; computed once per instance.
    fn label_candidates(&self, resource_type: &ResourceType) -> &[Property];

    /// Deterministic mapping from a resource id to the canonical external
    /// URI. No network call.
    fn external_identifier(&self, resource_id: &str, language: Option<&str>) -> String;

    /// Fetch the entity's linked-data document and keep only the statements
    /// whose subject is the canonical external URI.
    async fn fetch_external_model(
        &self,
        resource_type: &ResourceType,
        resource_id: &str,
        language: Option<&str>,
    ) -> Result<Vec<Triple>>;

    /// The external vocabulary class equivalent to the given resource type.
    fn external_equivalent_class(&self, resource_type: &ResourceType) -> Class;

    /// Whether this adapter is backed by a remote service. The contract
    /// permits local-backed implementations; both adapters in this crate
    /// return `true`.
    fn is_external(&self) -> bool;
}
