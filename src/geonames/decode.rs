//! Explicit decoders for geonames API payloads.
//!
//! One decode function per response shape; a malformed item yields an
//! [`ResolverError::ItemParse`] the adapter logs and skips without aborting
//! the rest of the batch.

use std::sync::LazyLock;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use regex::Regex;
use serde_json::Value;

use crate::error::{ResolverError, Result};
use crate::types::{ResourceRecord, ResourceType, ResourceUriBuilder, Suggestion};

use super::SuggestionShape;

/// A `"city,zip,country"` query, the shape that unlocks the postal-code
/// fallback search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CityZipCountry {
    pub city: String,
    pub zip: String,
    pub country: String,
}

static CITY_ZIP_COUNTRY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([^,]*),(\d+),(.*)$").expect("Invalid regex"));

/// Match a query against the `"city,zip,country"` pattern.
pub(crate) fn parse_city_zip_country(query: &str) -> Option<CityZipCountry> {
    let captures = CITY_ZIP_COUNTRY.captures(query)?;
    Some(CityZipCountry {
        city: captures[1].to_string(),
        zip: captures[2].to_string(),
        country: captures[3].to_string(),
    })
}

/// Map a free-text country name to its 2-letter code.
///
/// Covers the countries the postal-code fallback is used for; anything else
/// skips the postal path. See <http://www.geonames.org/countries/>.
pub(crate) fn country_code(country: &str) -> Option<&'static str> {
    match country {
        "Belgium" => Some("BE"),
        "Netherlands" => Some("NL"),
        "France" => Some("FR"),
        "Germany" => Some("DE"),
        "United Kingdom" => Some("GB"),
        "Hungary" => Some("HU"),
        _ => None,
    }
}

/// Scan a postal-code search response for an entry matching `zip` and
/// return its canonical place name. The last matching entry wins.
pub(crate) fn matching_postal_place(body: &Value, zip: &str) -> Option<String> {
    let mut place = None;
    for entry in body.get("postalCodes")?.as_array()? {
        if entry.get("postalCode").and_then(Value::as_str) == Some(zip) {
            if let Some(name) = entry.get("placeName").and_then(Value::as_str) {
                place = Some(name.to_string());
            }
        }
    }
    place
}

/// Decode every item of a search response. A malformed item is logged and
/// skipped; it never suppresses the remaining valid items.
pub(crate) fn search_suggestions(
    body: &Value,
    shape: SuggestionShape,
    resource_type: &ResourceType,
    uri_builder: &dyn ResourceUriBuilder,
    query: &str,
) -> Vec<Suggestion> {
    let mut suggestions = Vec::new();
    for item in body
        .get("geonames")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
    {
        match suggestion(shape, item, resource_type, uri_builder) {
            Ok(decoded) => suggestions.push(decoded),
            Err(e) => tracing::error!("Skipping geonames result for '{}': {}", query, e),
        }
    }
    suggestions
}

/// Decode one search-result item into a suggestion of the given shape.
///
/// The resource type is injected out-of-band; it is not part of the remote
/// payload.
pub(crate) fn suggestion(
    shape: SuggestionShape,
    item: &Value,
    resource_type: &ResourceType,
    uri_builder: &dyn ResourceUriBuilder,
) -> Result<Suggestion> {
    let geoname_id = geoname_id(item)?;
    let name = required_field(item, "name")?;

    let (title, subtitle) = match shape {
        SuggestionShape::Country => (country_title(item, &name), field(item, "toponymName")),
        SuggestionShape::City => (name.clone(), city_subtitle(item, &name)),
    };

    Ok(Suggestion {
        value: uri_builder.relative_resource_uri(resource_type, &geoname_id),
        title,
        subtitle,
        resource_type: resource_type.clone(),
    })
}

/// Country title: the official country name can differ completely from the
/// searched-for localized name, so render both when they disagree.
fn country_title(item: &Value, name: &str) -> String {
    match item.get("countryName").and_then(Value::as_str) {
        Some(country) if !country.is_empty() && country != name => {
            format!("{} ({})", country, name)
        }
        _ => name.to_string(),
    }
}

/// City subtitle: a short disambiguating path of administrative parents,
/// most specific first, capped at two levels, skipping empty values and
/// duplicates (including the city name itself), then the country.
fn city_subtitle(item: &Value, name: &str) -> String {
    const MAX_SPECIFIC_LEVEL: usize = 2;

    let mut parents: Vec<&str> = Vec::new();
    let mut seen: Vec<&str> = vec![name];
    for key in [
        "toponymName",
        "adminName5",
        "adminName4",
        "adminName3",
        "adminName2",
        "adminName1",
    ] {
        if parents.len() >= MAX_SPECIFIC_LEVEL {
            break;
        }
        if let Some(value) = item.get(key).and_then(Value::as_str) {
            if !value.is_empty() && !seen.contains(&value) {
                parents.push(value);
                seen.push(value);
            }
        }
    }

    let country = item
        .get("countryName")
        .and_then(Value::as_str)
        .filter(|v| !v.is_empty())
        .or_else(|| item.get("countryCode").and_then(Value::as_str))
        .unwrap_or_default();

    let mut parts = parents;
    if !country.is_empty() {
        parts.push(country);
    }
    parts.join(", ")
}

/// Decode the place-detail XML response into a resource record.
///
/// Label precedence: official name, then name, then the first alternate
/// name. The `lang="link"` alternate entry, when present, supplies the
/// external landing page.
pub(crate) fn place_record(
    xml: &str,
    resource_type: &ResourceType,
    language: Option<&str>,
    uri_builder: &dyn ResourceUriBuilder,
) -> Result<ResourceRecord> {
    let detail = parse_place_detail(xml)?;

    let geoname_id = detail
        .geoname_id
        .ok_or_else(|| ResolverError::ItemParse("place record without a geonameId".to_string()))?;

    let label = detail
        .official_name
        .or(detail.name)
        .or_else(|| detail.alternate_names.first().map(|(_, v)| v.clone()))
        .ok_or_else(|| ResolverError::ItemParse("place record without a label".to_string()))?;

    let resource_uri = uri_builder.relative_resource_uri(resource_type, &geoname_id);
    let link = detail
        .alternate_names
        .iter()
        .find(|(lang, _)| lang.as_deref() == Some(LINK_LANGUAGE))
        .map(|(_, value)| value.clone())
        .unwrap_or_else(|| resource_uri.clone());

    Ok(ResourceRecord {
        resource_uri,
        resource_type: resource_type.clone(),
        label,
        link,
        image: None,
        language: language.map(str::to_string),
    })
}

/// Special `lang` value geonames uses for external documentation links.
const LINK_LANGUAGE: &str = "link";

#[derive(Debug, Default)]
struct PlaceDetail {
    geoname_id: Option<String>,
    name: Option<String>,
    official_name: Option<String>,
    alternate_names: Vec<(Option<String>, String)>,
}

fn parse_place_detail(xml: &str) -> Result<PlaceDetail> {
    let mut reader = Reader::from_str(xml);
    let mut detail = PlaceDetail::default();
    loop {
        match reader.read_event() {
            Ok(Event::Start(element)) => match element.name().as_ref() {
                b"geonameId" => detail.geoname_id = Some(element_text(&mut reader, &element)?),
                b"name" => detail.name = Some(element_text(&mut reader, &element)?),
                b"officialName" => {
                    detail.official_name = Some(element_text(&mut reader, &element)?)
                }
                b"alternateName" => {
                    let lang = attribute(&element, "lang")?;
                    let value = element_text(&mut reader, &element)?;
                    detail.alternate_names.push((lang, value));
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(ResolverError::ItemParse(format!(
                    "invalid place detail XML: {}",
                    e
                )))
            }
        }
    }
    Ok(detail)
}

fn element_text(reader: &mut Reader<&[u8]>, element: &BytesStart<'_>) -> Result<String> {
    reader
        .read_text(element.name())
        .map(|text| text.into_owned())
        .map_err(|e| ResolverError::ItemParse(format!("invalid place detail XML: {}", e)))
}

fn attribute(element: &BytesStart<'_>, name: &str) -> Result<Option<String>> {
    element
        .try_get_attribute(name)
        .map_err(|e| ResolverError::ItemParse(format!("invalid place detail XML: {}", e)))?
        .map(|attr| {
            attr.unescape_value()
                .map(|value| value.into_owned())
                .map_err(|e| ResolverError::ItemParse(format!("invalid place detail XML: {}", e)))
        })
        .transpose()
}

fn geoname_id(item: &Value) -> Result<String> {
    match item.get("geonameId") {
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
        _ => Err(ResolverError::ItemParse(
            "search result without a geonameId".to_string(),
        )),
    }
}

fn required_field(item: &Value, key: &str) -> Result<String> {
    let value = field(item, key);
    if value.is_empty() {
        return Err(ResolverError::ItemParse(format!(
            "search result without a '{}'",
            key
        )));
    }
    Ok(value)
}

fn field(item: &Value, key: &str) -> String {
    item.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}
