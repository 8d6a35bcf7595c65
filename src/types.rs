//! Shared value objects for the resolution layer.
//!
//! Everything here is a plain data type with no back-references: adapters
//! produce [`Suggestion`]s and [`ResourceRecord`]s fresh per call, and the
//! host platform seam ([`ResourceUriBuilder`]) is consumed as an opaque
//! function.

use std::fmt;

use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};

/// Matching strategy applied to the external search API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryMode {
    /// Match names starting with the query text.
    Prefix,
    /// Match the exact name.
    Name,
    /// Free-text match over all indexed fields.
    Full,
}

/// An opaque extra search option, passed through to the adapter and taken
/// into account when composing cache keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SearchOption {
    pub name: String,
    pub value: String,
}

impl SearchOption {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Resource-type tag assigned by the host platform (typically a curie such
/// as `schema:City`). Opaque to this layer; it is injected into results and
/// participates in cache keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceType(String);

impl ResourceType {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single autocomplete match candidate.
///
/// Built fresh per search call; carries no cross-call identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Suggestion {
    /// Opaque value identifier, usually the relative resource URI.
    pub value: String,
    /// Display title.
    pub title: String,
    /// Display subtitle (disambiguation text).
    pub subtitle: String,
    /// The resource type this suggestion resolves to.
    pub resource_type: ResourceType,
}

/// Full descriptive record for one resolved external entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRecord {
    /// Relative resource URI assigned by the host platform.
    pub resource_uri: String,
    /// The resource type this record resolves to.
    pub resource_type: ResourceType,
    /// Human-readable label.
    pub label: String,
    /// External landing page for the entity.
    pub link: String,
    /// Optional image URL.
    pub image: Option<String>,
    /// Language the record was requested in.
    pub language: Option<String>,
}

/// A property of an external vocabulary, identified by namespace and local
/// name. Interface-level only; the catalogs live in [`crate::vocab`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Property {
    pub namespace: &'static str,
    pub local_name: &'static str,
}

impl Property {
    pub const fn new(namespace: &'static str, local_name: &'static str) -> Self {
        Self {
            namespace,
            local_name,
        }
    }

    /// Full URI of the property.
    pub fn uri(&self) -> String {
        format!("{}{}", self.namespace, self.local_name)
    }
}

/// A class of an external vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Class {
    pub namespace: &'static str,
    pub local_name: &'static str,
}

impl Class {
    pub const fn new(namespace: &'static str, local_name: &'static str) -> Self {
        Self {
            namespace,
            local_name,
        }
    }

    /// Full URI of the class.
    pub fn uri(&self) -> String {
        format!("{}{}", self.namespace, self.local_name)
    }
}

/// Host platform seam: builds the relative URI under which a resolved
/// external entity is addressed locally.
pub trait ResourceUriBuilder: Send + Sync {
    fn relative_resource_uri(&self, resource_type: &ResourceType, resource_id: &str) -> String;
}

/// Path-shaped default implementation (`/resource/{type}/{id}`), useful for
/// tests and hosts without their own addressing scheme.
#[derive(Debug, Clone, Copy, Default)]
pub struct RelativeUriBuilder;

impl ResourceUriBuilder for RelativeUriBuilder {
    fn relative_resource_uri(&self, resource_type: &ResourceType, resource_id: &str) -> String {
        format!("/resource/{}/{}", resource_type, resource_id)
    }
}

/// Extract the trailing identifier segment from a resource URI.
///
/// Accepts bare identifiers (`"Q42"`), relative URIs (`"/resource/City/123"`)
/// and absolute URIs with a trailing slash (`"http://sws.geonames.org/123/"`).
pub fn resource_id_from_uri(resource: &str) -> &str {
    let trimmed = resource.trim_end_matches('/');
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}

/// Percent-decode an identifier or title embedded in a URI.
pub(crate) fn percent_decoded(value: &str) -> String {
    percent_decode_str(value).decode_utf8_lossy().into_owned()
}
