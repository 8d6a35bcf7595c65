//! Graph-pattern query construction and result decoding for the wikidata
//! query service.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::error::{ResolverError, Result};

/// One row of a SPARQL SELECT result, variable name to plain value.
pub(crate) type BindingRow = BTreeMap<String, String>;

/// Per-language (label, image, site-link) tuple for one item.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct LanguageTuple {
    pub label: Option<String>,
    pub image: Option<String>,
    pub site_link: Option<String>,
}

/// Build the batched class-membership query: one `UNION` arm per candidate
/// item, each testing `wdt:P31` membership against the allowed-class VALUES
/// set.
pub(crate) fn class_membership_query(candidates: &[&str], allowed_classes: &[String]) -> String {
    let mut query = String::from("SELECT ?item WHERE { VALUES ?values {");
    for class in allowed_classes {
        query.push_str(" wd:");
        query.push_str(class);
    }
    query.push_str(" } ");

    for (i, candidate) in candidates.iter().enumerate() {
        if i > 0 {
            query.push_str(" UNION");
        }
        query.push_str(" { BIND (wd:");
        query.push_str(candidate);
        query.push_str(" as ?item) ?item wdt:P31 ?values }");
    }
    query.push_str(" }");
    query
}

/// Build the per-language tuple query for one item: one `UNION` arm per
/// wikipedia site, each binding the site-link, its language, and a label
/// through the wikibase label service, plus the optional `wdt:P18` image.
pub(crate) fn entity_tuples_query(item_id: &str, sites: &[String]) -> String {
    let mut query = format!(
        "PREFIX schema: <http://schema.org/> \
         SELECT ?dataLabel ?sitelink ?pic ?lang WHERE {{ BIND(wd:{} AS ?data)",
        item_id
    );

    for (i, site) in sites.iter().enumerate() {
        if i > 0 {
            query.push_str(" UNION");
        }
        query.push_str(&format!(
            " {{ ?sitelink schema:about ?data . \
               ?sitelink schema:isPartOf <https://{site}.wikipedia.org/> . \
               ?sitelink schema:inLanguage ?lang . \
               SERVICE wikibase:label {{ bd:serviceParam wikibase:language \"{site}\". }} }}",
            site = site
        ));
    }

    query.push_str(" OPTIONAL { ?data wdt:P18 ?pic } }");
    query
}

/// Decode a SPARQL JSON results document into binding rows.
pub(crate) fn select_bindings(body: &Value) -> Result<Vec<BindingRow>> {
    let bindings = body
        .get("results")
        .and_then(|results| results.get("bindings"))
        .and_then(Value::as_array)
        .ok_or_else(|| {
            ResolverError::Payload("SPARQL response without results.bindings".to_string())
        })?;

    let mut rows = Vec::with_capacity(bindings.len());
    for binding in bindings {
        let Some(vars) = binding.as_object() else {
            return Err(ResolverError::Payload(
                "SPARQL binding is not an object".to_string(),
            ));
        };
        let mut row = BindingRow::new();
        for (name, value) in vars {
            if let Some(plain) = value.get("value").and_then(Value::as_str) {
                row.insert(name.clone(), plain.to_string());
            }
        }
        rows.push(row);
    }
    Ok(rows)
}

/// Group tuple-query rows by language tag. A later row for the same
/// language replaces the earlier one.
pub(crate) fn collect_language_tuples(rows: &[BindingRow]) -> BTreeMap<String, LanguageTuple> {
    let mut tuples = BTreeMap::new();
    for row in rows {
        let Some(lang) = row.get("lang") else {
            continue;
        };
        tuples.insert(
            lang.clone(),
            LanguageTuple {
                label: row.get("dataLabel").cloned(),
                image: row.get("pic").cloned(),
                site_link: row.get("sitelink").cloned(),
            },
        );
    }
    tuples
}

/// Choose the best localized tuple: exact language match, else English,
/// else the lexicographically smallest remaining language tag.
pub(crate) fn resolve_language<'a>(
    tuples: &'a BTreeMap<String, LanguageTuple>,
    requested: &str,
) -> Option<&'a LanguageTuple> {
    tuples
        .get(requested)
        .or_else(|| tuples.get("en"))
        .or_else(|| tuples.values().next())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_class_membership_query_shape() {
        let query =
            class_membership_query(&["Q42", "Q64"], &["Q5".to_string(), "Q515".to_string()]);

        assert!(query.starts_with("SELECT ?item WHERE { VALUES ?values { wd:Q5 wd:Q515 }"));
        assert!(query.contains("{ BIND (wd:Q42 as ?item) ?item wdt:P31 ?values }"));
        assert!(query.contains("UNION { BIND (wd:Q64 as ?item) ?item wdt:P31 ?values }"));
        assert_eq!(query.matches("UNION").count(), 1);
        assert!(query.ends_with("} }"));
    }

    #[test]
    fn test_entity_tuples_query_one_arm_per_site() {
        let sites = vec!["en".to_string(), "fr".to_string(), "nl".to_string()];
        let query = entity_tuples_query("Q40744", &sites);

        assert!(query.contains("BIND(wd:Q40744 AS ?data)"));
        for site in &sites {
            assert!(query.contains(&format!("<https://{}.wikipedia.org/>", site)));
        }
        assert_eq!(query.matches("UNION").count(), 2);
        assert!(query.contains("OPTIONAL { ?data wdt:P18 ?pic }"));
    }

    #[test]
    fn test_select_bindings() {
        let body = json!({
            "head": {"vars": ["item"]},
            "results": {"bindings": [
                {"item": {"type": "uri", "value": "http://www.wikidata.org/entity/Q42"}},
                {"item": {"type": "uri", "value": "http://www.wikidata.org/entity/Q64"}},
            ]}
        });

        let rows = select_bindings(&body).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(
            rows[0].get("item").map(String::as_str),
            Some("http://www.wikidata.org/entity/Q42")
        );
    }

    #[test]
    fn test_select_bindings_rejects_malformed_payload() {
        let result = select_bindings(&json!({"unexpected": true}));
        assert!(matches!(result, Err(ResolverError::Payload(_))));
    }

    fn tuples(languages: &[&str]) -> BTreeMap<String, LanguageTuple> {
        languages
            .iter()
            .map(|lang| {
                (
                    lang.to_string(),
                    LanguageTuple {
                        label: Some(format!("label-{}", lang)),
                        image: None,
                        site_link: Some(format!("https://{}.wikipedia.org/wiki/X", lang)),
                    },
                )
            })
            .collect()
    }

    #[test]
    fn test_resolve_language_prefers_exact_match() {
        let tuples = tuples(&["en", "fr", "nl"]);
        let chosen = resolve_language(&tuples, "fr").unwrap();
        assert_eq!(chosen.label.as_deref(), Some("label-fr"));
    }

    #[test]
    fn test_resolve_language_falls_back_to_english() {
        let tuples = tuples(&["en", "fr"]);
        let chosen = resolve_language(&tuples, "nl").unwrap();
        assert_eq!(chosen.label.as_deref(), Some("label-en"));
    }

    #[test]
    fn test_resolve_language_deterministic_last_resort() {
        let tuples = tuples(&["nl", "fr"]);
        let chosen = resolve_language(&tuples, "de").unwrap();
        // smallest language tag wins
        assert_eq!(chosen.label.as_deref(), Some("label-fr"));
    }

    #[test]
    fn test_resolve_language_empty() {
        let tuples = BTreeMap::new();
        assert!(resolve_language(&tuples, "en").is_none());
    }

    #[test]
    fn test_collect_language_tuples_later_row_wins() {
        let rows = vec![
            BindingRow::from([
                ("lang".to_string(), "en".to_string()),
                ("dataLabel".to_string(), "first".to_string()),
            ]),
            BindingRow::from([
                ("lang".to_string(), "en".to_string()),
                ("dataLabel".to_string(), "second".to_string()),
                ("pic".to_string(), "https://commons.example/p.jpg".to_string()),
            ]),
        ];

        let tuples = collect_language_tuples(&rows);
        assert_eq!(tuples.len(), 1);
        let tuple = &tuples["en"];
        assert_eq!(tuple.label.as_deref(), Some("second"));
        assert!(tuple.image.is_some());
    }
}
