//! Integration tests for the lodhound adapters.
//!
//! The contract tests run offline. Tests hitting the live geonames and
//! wikidata services are marked `#[ignore]` because both are rate-limited
//! (the geonames tests use the public `demo` account). Run them with:
//!
//! ```bash
//! cargo test --test integration -- --ignored
//! ```

use std::sync::Arc;

use lodhound::{
    CacheManager, Config, GeonamesAdapter, PlaceKind, QueryEndpoint, QueryMode,
    RelativeUriBuilder, ResolverError, ResourceType, WikidataAdapter,
};

fn init_logging() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn city_type() -> ResourceType {
    ResourceType::new("schema:City")
}

fn country_type() -> ResourceType {
    ResourceType::new("schema:Country")
}

fn item_type() -> ResourceType {
    ResourceType::new("xv:Thing")
}

fn geonames_adapter(kind: PlaceKind) -> GeonamesAdapter {
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

fn wikidata_adapter() -> WikidataAdapter {
    let config = Config::default();
    let caches = CacheManager::new(&config);
    WikidataAdapter::new(
        &config.wikidata,
        caches.wikidata(),
        Arc::new(RelativeUriBuilder),
    )
    .unwrap()
}

#[tokio::test]
async fn empty_queries_short_circuit_on_every_adapter() {
    let adapters: Vec<Box<dyn QueryEndpoint>> = vec![
        Box::new(geonames_adapter(PlaceKind::Country)),
        Box::new(geonames_adapter(PlaceKind::City)),
        Box::new(wikidata_adapter()),
    ];

    for adapter in &adapters {
        let suggestions = adapter
            .search(&city_type(), "", QueryMode::Full, Some("nl"), 10, &[])
            .await
            .unwrap();
        assert!(suggestions.is_empty());

        let record = adapter.fetch_resource(&city_type(), "", None).await.unwrap();
        assert!(record.is_none());
    }
}

#[tokio::test]
async fn wikidata_rejects_exact_name_queries() {
    let result = wikidata_adapter()
        .search(&item_type(), "Tank", QueryMode::Name, None, 15, &[])
        .await;
    assert!(matches!(result, Err(ResolverError::UnsupportedQuery(_))));
}

#[test]
fn adapters_report_external_backing() {
    assert!(geonames_adapter(PlaceKind::Country).is_external());
    assert!(geonames_adapter(PlaceKind::City).is_external());
    assert!(wikidata_adapter().is_external());
}

#[test]
fn external_identifiers_are_deterministic() {
    let cities = geonames_adapter(PlaceKind::City);
    assert_eq!(
        cities.external_identifier("/resource/schema:City/2795542", Some("nl")),
        cities.external_identifier("2795542", None),
    );

    let items = wikidata_adapter();
    assert_eq!(
        items.external_identifier("/resource/xv:Thing/Q42", Some("fr")),
        "http://www.wikidata.org/entity/Q42"
    );
}

// -------------------------------------------------------------------------
// Live-service tests below. Rate-limited; run explicitly with --ignored.
// -------------------------------------------------------------------------

#[tokio::test]
#[ignore = "hits the live geonames service"]
async fn live_geonames_country_search() {
    init_logging();
    let countries = geonames_adapter(PlaceKind::Country);
    let suggestions = countries
        .search(&country_type(), "Belgium", QueryMode::Full, Some("en"), 5, &[])
        .await
        .unwrap();

    assert!(!suggestions.is_empty());
    assert!(suggestions.iter().any(|s| s.title.contains("Belgium")));
}

#[tokio::test]
#[ignore = "hits the live geonames service"]
async fn live_geonames_city_fallback_search() {
    init_logging();
    let cities = geonames_adapter(PlaceKind::City);
    // The primary search yields nothing for this shape; the postal-code
    // fallback resolves the official place name behind zip 6305.
    let suggestions = cities
        .search(
            &city_type(),
            "Valkenburg,6305,Netherlands",
            QueryMode::Full,
            None,
            10,
            &[],
        )
        .await
        .unwrap();

    assert!(!suggestions.is_empty());
}

#[tokio::test]
#[ignore = "hits the live geonames service"]
async fn live_geonames_fetch_resource() {
    init_logging();
    let cities = geonames_adapter(PlaceKind::City);
    let record = cities
        .fetch_resource(&city_type(), "2795542", Some("nl"))
        .await
        .unwrap()
        .expect("Halen should resolve");

    assert!(!record.label.is_empty());
    assert_eq!(record.language.as_deref(), Some("nl"));
}

#[tokio::test]
#[ignore = "hits the live wikidata service"]
async fn live_wikidata_search() {
    init_logging();
    let items = wikidata_adapter();
    let suggestions = items
        .search(&item_type(), "Douglas Adams", QueryMode::Full, Some("en"), 15, &[])
        .await
        .unwrap();

    assert!(!suggestions.is_empty());
    assert!(suggestions.iter().any(|s| s.value.ends_with("Q42")));
}

#[tokio::test]
#[ignore = "hits the live wikidata service"]
async fn live_wikidata_fetch_resource_language_chain() {
    init_logging();
    let items = wikidata_adapter();
    let record = items
        .fetch_resource(&item_type(), "Q42", Some("nl"))
        .await
        .unwrap()
        .expect("Q42 should resolve");

    assert!(!record.label.is_empty());
    assert!(record.link.starts_with("https://"));
}

#[tokio::test]
#[ignore = "hits the live wikidata service"]
async fn live_wikidata_external_model_is_subject_filtered() {
    init_logging();
    let items = wikidata_adapter();
    let statements = items
        .fetch_external_model(&item_type(), "Q42", None)
        .await
        .unwrap();

    assert!(!statements.is_empty());
    for statement in &statements {
        assert_eq!(
            statement.subject.to_string(),
            "<http://www.wikidata.org/entity/Q42>"
        );
    }
}
