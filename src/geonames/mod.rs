//! Place resolution against the geonames APIs.
//!
//! One [`GeonamesAdapter`] instance resolves one [`PlaceKind`] (country or
//! city). Search goes through the JSON search endpoint; when a city query
//! shaped like `"city,zip,country"` comes back empty, a deeper heuristic
//! consults the postal-code index for the canonical place name and retries.
//! Detail records come from the XML place endpoint, linked-data statements
//! from the entity's canonical `sws.geonames.org` URI.

mod decode;

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use oxrdf::Triple;
use reqwest::Client;
use serde_json::Value;
use tracing::{error, info, warn};

use crate::cache::{AdapterCache, AdapterKind, CacheKey};
use crate::config::GeonamesConfig;
use crate::endpoint::QueryEndpoint;
use crate::error::{ResolverError, Result};
use crate::rdf;
use crate::types::{
    resource_id_from_uri, Class, Property, QueryMode, ResourceRecord, ResourceType,
    ResourceUriBuilder, SearchOption, Suggestion,
};
use crate::vocab;

/// Canonical URI prefix for geonames entities. Fetching it serves the
/// entity's RDF document (via its about page).
const GEONAMES_URI_PREFIX: &str = "http://sws.geonames.org/";

/// The place category an adapter instance resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlaceKind {
    Country,
    City,
}

/// How results of one place kind are filtered and rendered.
pub(crate) struct PlaceKindSpec {
    /// Feature-class filters sent with every search.
    pub feature_classes: &'static [&'static str],
    /// Feature-code filters sent with every search.
    pub feature_codes: &'static [&'static str],
    /// Which suggestion shape to decode result items into.
    pub shape: SuggestionShape,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SuggestionShape {
    Country,
    City,
}

// Classification codes per the geonames ontology mapping
// (http://www.geonames.org/ontology/mappings_v3.01.rdf): the values whose
// OWL restrictions map to schema:Country resp. schema:City.
const COUNTRY_SPEC: PlaceKindSpec = PlaceKindSpec {
    feature_classes: &["A"],
    feature_codes: &[
        // independent political entity
        "PCLI",
        // historical political entity
        "PCLH",
    ],
    shape: SuggestionShape::Country,
};

const CITY_SPEC: PlaceKindSpec = PlaceKindSpec {
    feature_classes: &["P"],
    feature_codes: &[
        "PPL", "PPLA", "PPLA2", "PPLA3", "PPLA4", "PPLC", "PPLF", "PPLG", "PPLL", "PPLS", "PPLX",
    ],
    shape: SuggestionShape::City,
};

impl PlaceKind {
    pub(crate) fn spec(self) -> &'static PlaceKindSpec {
        match self {
            PlaceKind::Country => &COUNTRY_SPEC,
            PlaceKind::City => &CITY_SPEC,
        }
    }

    fn adapter_kind(self) -> AdapterKind {
        match self {
            PlaceKind::Country => AdapterKind::GeonamesCountry,
            PlaceKind::City => AdapterKind::GeonamesCity,
        }
    }
}

/// Build the canonical external URI for a geonames id.
pub fn to_geonames_uri(geoname_id: &str) -> String {
    format!("{}{}/", GEONAMES_URI_PREFIX, geoname_id)
}

/// Query adapter for the geonames place APIs.
pub struct GeonamesAdapter {
    kind: PlaceKind,
    config: GeonamesConfig,
    client: Client,
    cache: Arc<AdapterCache>,
    uri_builder: Arc<dyn ResourceUriBuilder>,
    label_props: OnceLock<Vec<Property>>,
}

impl GeonamesAdapter {
    /// Create an adapter for one place kind. The cache is shared between
    /// the country and city instances; keys carry the kind.
    pub fn new(
        kind: PlaceKind,
        config: &GeonamesConfig,
        cache: Arc<AdapterCache>,
        uri_builder: Arc<dyn ResourceUriBuilder>,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            kind,
            config: config.clone(),
            client,
            cache,
            uri_builder,
            label_props: OnceLock::new(),
        })
    }

    /// One remote search round: query the search endpoint, decode items,
    /// and fall through to the deeper city heuristic when nothing matched.
    async fn search_remote(
        &self,
        resource_type: &ResourceType,
        query: &str,
        mode: QueryMode,
        language: Option<&str>,
        max_results: usize,
        options: &[SearchOption],
    ) -> Result<Vec<Suggestion>> {
        let spec = self.kind.spec();

        // See http://www.geonames.org/export/geonames-search.html for the
        // parameter set. FULL verbosity is needed to get the admin parent
        // names the city subtitle disambiguates with.
        let mut params: Vec<(&str, String)> = vec![
            ("username", self.config.username.clone()),
            ("style", "FULL".to_string()),
            ("maxRows", max_results.to_string()),
            ("type", "json".to_string()),
        ];
        let query_field = match mode {
            QueryMode::Prefix => "name_startsWith",
            QueryMode::Name => "name",
            // 'q' searches over everything (capital, continent, ...) which
            // is often too broad, but it understands "Halen,Belgium".
            QueryMode::Full => "q",
        };
        params.push((query_field, query.to_string()));
        for class in spec.feature_classes {
            params.push(("featureClass", (*class).to_string()));
        }
        for code in spec.feature_codes {
            params.push(("featureCode", (*code).to_string()));
        }
        if let Some(lang) = language {
            params.push(("lang", lang.to_string()));
        }

        let url = format!("{}/search", self.config.base_url);
        let response = self.client.get(&url).query(&params).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ResolverError::external(
                status,
                format!("searching geonames for '{}'", query),
            ));
        }

        let body: Value = response.json().await?;
        let mut suggestions = decode::search_suggestions(
            &body,
            spec.shape,
            resource_type,
            self.uri_builder.as_ref(),
            query,
        );

        // No result: for cities we can search a little deeper.
        if suggestions.is_empty() && self.kind == PlaceKind::City {
            suggestions = self
                .deeper_city_search(resource_type, query, mode, language, max_results, options)
                .await;
        }

        Ok(suggestions)
    }

    /// Deeper search for `"city,zip,country"` queries whose city name does
    /// not match the official place name for that postal code. Failures in
    /// here never ruin the outer search call: they are logged and treated
    /// as "no additional results".
    async fn deeper_city_search(
        &self,
        resource_type: &ResourceType,
        query: &str,
        mode: QueryMode,
        language: Option<&str>,
        max_results: usize,
        options: &[SearchOption],
    ) -> Vec<Suggestion> {
        match self
            .try_deeper_city_search(resource_type, query, mode, language, max_results, options)
            .await
        {
            Ok(suggestions) => suggestions,
            Err(e) => {
                let e = ResolverError::Fallback(format!("deeper search for '{}': {}", query, e));
                error!("{}", e);
                Vec::new()
            }
        }
    }

    async fn try_deeper_city_search(
        &self,
        resource_type: &ResourceType,
        query: &str,
        mode: QueryMode,
        language: Option<&str>,
        max_results: usize,
        options: &[SearchOption],
    ) -> Result<Vec<Suggestion>> {
        let Some(parts) = decode::parse_city_zip_country(query) else {
            return Ok(Vec::new());
        };

        let mut suggestions = Vec::new();
        match decode::country_code(&parts.country) {
            Some(country_code) => {
                info!(
                    "No geonames city result for '{}', searching deeper via the postal code",
                    query
                );
                if let Some(place_name) = self
                    .postal_place_name(&parts.city, &parts.zip, country_code, language)
                    .await?
                {
                    // Re-launch a full top-level search with the canonical
                    // place name. Bounded by construction: the new query
                    // has no zip component, so it can never re-match the
                    // "city,zip,country" pattern.
                    let retry = format!("{},{}", place_name, country_code);
                    suggestions = QueryEndpoint::search(
                        self,
                        resource_type,
                        &retry,
                        mode,
                        language,
                        max_results,
                        options,
                    )
                    .await?;
                }
            }
            None => {
                warn!(
                    "Unknown country '{}'; cannot derive a code for the postal code search",
                    parts.country
                );
            }
        }

        // Last try: drop the postal code and search once more.
        if suggestions.is_empty() {
            let retry = format!("{},{}", parts.city, parts.country);
            suggestions = QueryEndpoint::search(
                self,
                resource_type,
                &retry,
                mode,
                language,
                max_results,
                options,
            )
            .await?;
        }

        Ok(suggestions)
    }

    /// Query the postal-code index for the official place name matching the
    /// given zip. Two-step because the postal-code endpoint does not return
    /// geonames ids.
    async fn postal_place_name(
        &self,
        city: &str,
        zip: &str,
        country_code: &str,
        language: Option<&str>,
    ) -> Result<Option<String>> {
        let mut params: Vec<(&str, String)> = vec![
            ("username", self.config.username.clone()),
            ("placename", city.to_string()),
            ("country", country_code.to_string()),
            ("maxRows", self.config.postal_max_rows.to_string()),
            ("type", "json".to_string()),
        ];
        if let Some(lang) = language {
            params.push(("lang", lang.to_string()));
        }

        let url = format!("{}/postalCodeSearch", self.config.base_url);
        let response = self.client.get(&url).query(&params).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ResolverError::external(
                status,
                format!("searching postal codes for '{}'", city),
            ));
        }

        let body: Value = response.json().await?;
        Ok(decode::matching_postal_place(&body, zip))
    }

    async fn fetch_resource_remote(
        &self,
        resource_type: &ResourceType,
        resource_id: &str,
        language: Option<&str>,
    ) -> Result<Option<ResourceRecord>> {
        let geoname_id = resource_id_from_uri(resource_id);

        let mut params: Vec<(&str, String)> = vec![
            ("username", self.config.username.clone()),
            ("geonameId", geoname_id.to_string()),
            ("style", "FULL".to_string()),
        ];
        if let Some(lang) = language {
            params.push(("lang", lang.to_string()));
        }

        // The place-detail endpoint answers in XML only.
        let url = format!("{}/get", self.config.base_url);
        let response = self.client.get(&url).query(&params).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ResolverError::external(
                status,
                format!("fetching geonames place '{}'", geoname_id),
            ));
        }

        let xml = response.text().await?;
        let record =
            decode::place_record(&xml, resource_type, language, self.uri_builder.as_ref())?;
        Ok(Some(record))
    }

    async fn fetch_external_model_remote(
        &self,
        resource_id: &str,
        language: Option<&str>,
    ) -> Result<Vec<Triple>> {
        let subject = self.external_identifier(resource_id, language);

        let response = self
            .client
            .get(&subject)
            .header(reqwest::header::ACCEPT, "application/rdf+xml")
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ResolverError::external(
                status,
                format!("fetching the linked-data model for '{}'", resource_id),
            ));
        }

        let document = response.text().await?;
        // The document also describes the about page it redirects through;
        // keep only the statements about the entity itself.
        rdf::statements_about(&document, &subject, &subject)
    }
}

#[async_trait]
impl QueryEndpoint for GeonamesAdapter {
    async fn search(
        &self,
        resource_type: &ResourceType,
        query: &str,
        mode: QueryMode,
        language: Option<&str>,
        max_results: usize,
        options: &[SearchOption],
    ) -> Result<Vec<Suggestion>> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let key = CacheKey::search(
            self.kind.adapter_kind(),
            resource_type,
            query,
            mode,
            language,
            options,
        );
        let cached = self
            .cache
            .searches
            .get_or_fetch(key, async {
                let suggestions = self
                    .search_remote(resource_type, query, mode, language, max_results, options)
                    .await?;
                Ok(Arc::new(suggestions))
            })
            .await?;

        Ok((*cached).clone())
    }

    async fn fetch_resource(
        &self,
        resource_type: &ResourceType,
        resource_id: &str,
        language: Option<&str>,
    ) -> Result<Option<ResourceRecord>> {
        if resource_id.trim().is_empty() {
            return Ok(None);
        }

        let key = CacheKey::resource(
            self.kind.adapter_kind(),
            resource_type,
            resource_id,
            language,
        );
        let cached = self
            .cache
            .resources
            .get_or_fetch(key, async {
                let record = self
                    .fetch_resource_remote(resource_type, resource_id, language)
                    .await?;
                Ok(Arc::new(record))
            })
            .await?;

        Ok((*cached).clone())
    }

    fn label_candidates(&self, _resource_type: &ResourceType) -> &[Property] {
        self.label_props
            .get_or_init(|| {
                vec![
                    vocab::geonames::OFFICIAL_NAME,
                    vocab::geonames::NAME,
                    vocab::geonames::ALTERNATE_NAME,
                ]
            })
            .as_slice()
    }

    fn external_identifier(&self, resource_id: &str, _language: Option<&str>) -> String {
        to_geonames_uri(resource_id_from_uri(resource_id))
    }

    async fn fetch_external_model(
        &self,
        resource_type: &ResourceType,
        resource_id: &str,
        language: Option<&str>,
    ) -> Result<Vec<Triple>> {
        if resource_id.trim().is_empty() {
            return Ok(Vec::new());
        }

        let key = CacheKey::resource(
            self.kind.adapter_kind(),
            resource_type,
            resource_id,
            language,
        );
        let cached = self
            .cache
            .models
            .get_or_fetch(key, async {
                let statements = self
                    .fetch_external_model_remote(resource_id, language)
                    .await?;
                Ok(Arc::new(statements))
            })
            .await?;

        Ok((*cached).clone())
    }

    fn external_equivalent_class(&self, _resource_type: &ResourceType) -> Class {
        vocab::geonames::FEATURE
    }

    fn is_external(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheManager;
    use crate::config::Config;
    use crate::types::RelativeUriBuilder;

    fn adapter(kind: PlaceKind) -> GeonamesAdapter {
        let config = Config::default();
        let caches = CacheManager::new(&config);
        GeonamesAdapter::new(
            kind,
            &config.geonames,
            caches.geonames(),
            Arc::new(RelativeUriBuilder),
        )
        .unwrap()
    }

    #[test]
    fn test_place_kind_table() {
        let country = PlaceKind::Country.spec();
        assert_eq!(country.feature_classes, &["A"]);
        assert!(country.feature_codes.contains(&"PCLI"));
        assert_eq!(country.shape, SuggestionShape::Country);

        let city = PlaceKind::City.spec();
        assert_eq!(city.feature_classes, &["P"]);
        assert!(city.feature_codes.contains(&"PPLC"));
        assert_eq!(city.shape, SuggestionShape::City);
    }

    #[test]
    fn test_external_identifier() {
        let adapter = adapter(PlaceKind::City);
        assert_eq!(
            adapter.external_identifier("/resource/schema:City/2795542", None),
            "http://sws.geonames.org/2795542/"
        );
        assert_eq!(
            adapter.external_identifier("2795542", Some("nl")),
            "http://sws.geonames.org/2795542/"
        );
    }

    #[test]
    fn test_label_candidates_order() {
        let adapter = adapter(PlaceKind::Country);
        let resource_type = ResourceType::new("schema:Country");
        let props = adapter.label_candidates(&resource_type);
        assert_eq!(
            props,
            &[
                vocab::geonames::OFFICIAL_NAME,
                vocab::geonames::NAME,
                vocab::geonames::ALTERNATE_NAME,
            ]
        );
        // cached for the adapter's lifetime
        assert_eq!(props.as_ptr(), adapter.label_candidates(&resource_type).as_ptr());
    }

    #[test]
    fn test_is_external() {
        assert!(adapter(PlaceKind::City).is_external());
    }

    #[tokio::test]
    async fn test_empty_query_returns_empty_without_network() {
        let adapter = adapter(PlaceKind::City);
        let resource_type = ResourceType::new("schema:City");

        let results = adapter
            .search(&resource_type, "", QueryMode::Full, Some("nl"), 10, &[])
            .await
            .unwrap();
        assert!(results.is_empty());
        // nothing was cached either
        assert_eq!(adapter.cache.searches.entry_count(), 0);
    }

    #[tokio::test]
    async fn test_empty_resource_id_is_absent_without_network() {
        let adapter = adapter(PlaceKind::City);
        let resource_type = ResourceType::new("schema:City");

        let record = adapter
            .fetch_resource(&resource_type, "", None)
            .await
            .unwrap();
        assert!(record.is_none());

        let model = adapter
            .fetch_external_model(&resource_type, "  ", None)
            .await
            .unwrap();
        assert!(model.is_empty());
    }

    #[test]
    fn test_external_equivalent_class() {
        let adapter = adapter(PlaceKind::Country);
        assert_eq!(
            adapter
                .external_equivalent_class(&ResourceType::new("schema:Country"))
                .uri(),
            "http://www.geonames.org/ontology#Feature"
        );
    }
}
