//! Knowledge-item resolution against wikidata.
//!
//! Search goes through the `wbsearchentities` action API, optionally
//! narrowed by an instance-of class restriction evaluated in one batched
//! graph-pattern query. Descriptive records are assembled from per-language
//! (label, image, site-link) tuples fetched from the public query service,
//! with a deterministic language-preference chain. Linked-data statements
//! come from the item's canonical entity URI.

mod sparql;

use std::collections::HashSet;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use oxrdf::Triple;
use reqwest::redirect::Policy;
use reqwest::Client;
use serde_json::Value;
use tracing::{error, warn};
use url::Url;

use crate::cache::{AdapterCache, AdapterKind, CacheKey};
use crate::config::WikidataConfig;
use crate::endpoint::QueryEndpoint;
use crate::error::{ResolverError, Result};
use crate::rdf;
use crate::types::{
    percent_decoded, resource_id_from_uri, Class, Property, QueryMode, ResourceRecord,
    ResourceType, ResourceUriBuilder, SearchOption, Suggestion,
};
use crate::vocab;

/// Query adapter for wikidata items.
pub struct WikidataAdapter {
    config: WikidataConfig,
    /// When set, search results are narrowed to items that are an
    /// instance of one of these classes (e.g. `Q5` for humans). Costs one
    /// extra graph-pattern query per search.
    instance_classes: Option<Vec<String>>,
    client: Client,
    cache: Arc<AdapterCache>,
    uri_builder: Arc<dyn ResourceUriBuilder>,
    label_props: OnceLock<Vec<Property>>,
}

impl WikidataAdapter {
    pub fn new(
        config: &WikidataConfig,
        cache: Arc<AdapterCache>,
        uri_builder: Arc<dyn ResourceUriBuilder>,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            // the entity endpoint answers with at most one redirect
            .redirect(Policy::limited(1))
            .build()?;

        Ok(Self {
            config: config.clone(),
            instance_classes: None,
            client,
            cache,
            uri_builder,
            label_props: OnceLock::new(),
        })
    }

    /// Restrict search results to instances of the given classes.
    pub fn with_instance_classes(mut self, classes: Vec<String>) -> Self {
        self.instance_classes = Some(classes);
        self
    }

    async fn search_remote(
        &self,
        resource_type: &ResourceType,
        query: &str,
        language: Option<&str>,
        max_results: usize,
    ) -> Result<Vec<Suggestion>> {
        let params: Vec<(&str, String)> = vec![
            ("action", "wbsearchentities".to_string()),
            ("format", "json".to_string()),
            ("language", language.unwrap_or("en").to_string()),
            ("type", "item".to_string()),
            ("continue", "0".to_string()),
            ("limit", max_results.to_string()),
            ("search", query.to_string()),
        ];

        let response = self
            .client
            .get(&self.config.api_endpoint)
            .query(&params)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ResolverError::external(
                status,
                format!("searching wikidata for '{}'", query),
            ));
        }

        let body: Value = response.json().await?;
        let candidates = self.search_candidates(&body, resource_type, query);

        match &self.instance_classes {
            Some(classes) if !candidates.is_empty() => {
                let ids: Vec<&str> = candidates.iter().map(|(id, _)| id.as_str()).collect();
                let membership = sparql::class_membership_query(&ids, classes);
                let rows = self.run_sparql(&membership).await?;

                let confirmed: HashSet<&str> = rows
                    .iter()
                    .filter_map(|row| row.get("item"))
                    .map(|uri| resource_id_from_uri(uri))
                    .collect();

                Ok(candidates
                    .into_iter()
                    .filter(|(id, _)| confirmed.contains(id.as_str()))
                    .map(|(_, suggestion)| suggestion)
                    .collect())
            }
            _ => Ok(candidates
                .into_iter()
                .map(|(_, suggestion)| suggestion)
                .collect()),
        }
    }

    /// Decode every match of an entity-search response. A malformed item
    /// is logged and skipped without suppressing the rest of the batch.
    fn search_candidates(
        &self,
        body: &Value,
        resource_type: &ResourceType,
        query: &str,
    ) -> Vec<(String, Suggestion)> {
        let mut candidates = Vec::new();
        for item in body
            .get("search")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default()
        {
            match self.search_suggestion(item, resource_type) {
                Ok(candidate) => candidates.push(candidate),
                Err(e) => error!("Skipping wikidata result for '{}': {}", query, e),
            }
        }
        candidates
    }

    fn search_suggestion(
        &self,
        item: &Value,
        resource_type: &ResourceType,
    ) -> Result<(String, Suggestion)> {
        let id = item
            .get("id")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                ResolverError::ItemParse("entity search result without an id".to_string())
            })?;
        let id = percent_decoded(id);

        let label = item
            .get("label")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let description = item
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or_default();

        let suggestion = Suggestion {
            value: self.uri_builder.relative_resource_uri(resource_type, &id),
            title: label.to_string(),
            subtitle: description.to_string(),
            resource_type: resource_type.clone(),
        };
        Ok((id, suggestion))
    }

    async fn run_sparql(&self, query: &str) -> Result<Vec<sparql::BindingRow>> {
        let response = self
            .client
            .get(&self.config.sparql_endpoint)
            .query(&[("query", query), ("format", "json")])
            .header(reqwest::header::ACCEPT, "application/sparql-results+json")
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ResolverError::external(
                status,
                "evaluating a wikidata graph-pattern query".to_string(),
            ));
        }

        let body: Value = response.json().await?;
        sparql::select_bindings(&body)
    }

    /// Determine the canonical item id behind a resource id.
    ///
    /// Ids carrying a wikipedia authority are site-title references and are
    /// resolved through the entity-by-site-title lookup; anything else is
    /// taken to already hold the item id in its trailing segment.
    async fn resolve_item_id(
        &self,
        resource_id: &str,
        language: Option<&str>,
    ) -> Result<Option<String>> {
        if let Ok(url) = Url::parse(resource_id) {
            if url.host_str().is_some_and(|host| host.contains("wikipedia")) {
                let title = percent_decoded(resource_id_from_uri(resource_id));
                return self.item_for_site_title(&title, language).await;
            }
        }
        Ok(Some(percent_decoded(resource_id_from_uri(resource_id))))
    }

    /// Resolve a site title to its item id via `wbgetentities`.
    async fn item_for_site_title(
        &self,
        title: &str,
        language: Option<&str>,
    ) -> Result<Option<String>> {
        let site = format!("{}wiki", language.unwrap_or("en"));
        let params: Vec<(&str, String)> = vec![
            ("action", "wbgetentities".to_string()),
            ("sites", site),
            ("format", "json".to_string()),
            ("titles", title.to_string()),
        ];

        let response = self
            .client
            .get(&self.config.api_endpoint)
            .query(&params)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ResolverError::external(
                status,
                format!("resolving site title '{}'", title),
            ));
        }

        let body: Value = response.json().await?;
        let entity_id = body
            .get("entities")
            .and_then(Value::as_object)
            .and_then(|entities| entities.keys().next())
            .cloned();

        match entity_id {
            Some(id) if !id.starts_with('-') => Ok(Some(id)),
            _ => {
                warn!("No wikibase item found for site title '{}'", title);
                Ok(None)
            }
        }
    }

    async fn fetch_resource_remote(
        &self,
        resource_type: &ResourceType,
        resource_id: &str,
        language: Option<&str>,
    ) -> Result<Option<ResourceRecord>> {
        let Some(item_id) = self.resolve_item_id(resource_id, language).await? else {
            return Ok(None);
        };

        let tuples_query = sparql::entity_tuples_query(&item_id, &self.config.wiki_sites);
        let rows = self.run_sparql(&tuples_query).await?;
        let tuples = sparql::collect_language_tuples(&rows);
        let chosen = sparql::resolve_language(&tuples, language.unwrap_or("en"));

        // Link to the wikipedia page in the chosen language when one
        // exists, else to the language-independent item page. The label
        // degrades to the raw item id.
        let link = chosen
            .and_then(|tuple| tuple.site_link.clone())
            .unwrap_or_else(|| format!("{}{}", self.config.page_base, item_id));
        let label = chosen
            .and_then(|tuple| tuple.label.clone())
            .unwrap_or_else(|| item_id.clone());
        let image = chosen.and_then(|tuple| tuple.image.clone());

        Ok(Some(ResourceRecord {
            resource_uri: self
                .uri_builder
                .relative_resource_uri(resource_type, &item_id),
            resource_type: resource_type.clone(),
            label,
            link,
            image,
            language: language.map(str::to_string),
        }))
    }

    async fn fetch_external_model_remote(
        &self,
        resource_id: &str,
        language: Option<&str>,
    ) -> Result<Vec<Triple>> {
        let subject = self.external_identifier(resource_id, language);
        // Query the https endpoint directly; the statements themselves keep
        // http-scheme subjects.
        let fetch_url = subject.replacen("http://", "https://", 1);

        let response = self
            .client
            .get(&fetch_url)
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
        rdf::statements_about(&document, &fetch_url, &subject)
    }
}

#[async_trait]
impl QueryEndpoint for WikidataAdapter {
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
        // wbsearchentities is a prefix matcher; an exact-name search cannot
        // be expressed against it.
        if mode == QueryMode::Name {
            return Err(ResolverError::UnsupportedQuery(mode));
        }

        let key = CacheKey::search(
            AdapterKind::WikidataItem,
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
                    .search_remote(resource_type, query, language, max_results)
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
            AdapterKind::WikidataItem,
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
            .get_or_init(|| vec![vocab::skos::PREF_LABEL, vocab::skos::ALT_LABEL])
            .as_slice()
    }

    fn external_identifier(&self, resource_id: &str, _language: Option<&str>) -> String {
        format!(
            "{}{}",
            self.config.entity_base,
            percent_decoded(resource_id_from_uri(resource_id))
        )
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
            AdapterKind::WikidataItem,
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
        vocab::wikibase::ITEM
    }

    fn is_external(&self) -> bool {
        true
    }
}
