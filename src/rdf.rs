//! Import and filtering of remote linked-data documents.
//!
//! Remote RDF endpoints wrap the statements we want in redirect/about-page
//! noise. [`statements_about`] narrows an imported document down to the
//! statements describing exactly one subject, compared by canonicalized URI
//! string equality. This works together with each adapter's
//! `external_identifier`, so the kept subjects can later be queried back
//! with that same URI.

use oxrdf::{Subject, Triple};
use oxrdfxml::RdfXmlParser;

use crate::error::{ResolverError, Result};

/// Import an RDF/XML document into a statement list.
pub fn parse_rdf_xml(document: &str, base_iri: &str) -> Result<Vec<Triple>> {
    let parser = RdfXmlParser::new()
        .with_base_iri(base_iri)
        .map_err(|e| ResolverError::Rdf(format!("invalid base IRI '{}': {}", base_iri, e)))?;

    let mut statements = Vec::new();
    for triple in parser.for_reader(document.as_bytes()) {
        statements.push(triple.map_err(|e| ResolverError::Rdf(e.to_string()))?);
    }
    Ok(statements)
}

/// Import a document and keep only the statements whose subject equals
/// `subject` exactly.
pub fn statements_about(document: &str, base_iri: &str, subject: &str) -> Result<Vec<Triple>> {
    Ok(parse_rdf_xml(document, base_iri)?
        .into_iter()
        .filter(|statement| subject_is(statement, subject))
        .collect())
}

fn subject_is(statement: &Triple, subject: &str) -> bool {
    match &statement.subject {
        Subject::NamedNode(node) => node.as_str() == subject,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOCUMENT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"
         xmlns:gn="http://www.geonames.org/ontology#"
         xmlns:foaf="http://xmlns.com/foaf/0.1/">
  <rdf:Description rdf:about="http://sws.geonames.org/2802361/">
    <gn:name>Belgium</gn:name>
    <gn:officialName xml:lang="nl">Koninkrijk Belgi&#235;</gn:officialName>
  </rdf:Description>
  <rdf:Description rdf:about="http://sws.geonames.org/2802361/about.rdf">
    <foaf:primaryTopic rdf:resource="http://sws.geonames.org/2802361/"/>
  </rdf:Description>
</rdf:RDF>"#;

    #[test]
    fn test_parse_rdf_xml() {
        let statements =
            parse_rdf_xml(DOCUMENT, "http://sws.geonames.org/2802361/").unwrap();
        assert_eq!(statements.len(), 3);
    }

    #[test]
    fn test_statements_about_drops_about_page() {
        let statements = statements_about(
            DOCUMENT,
            "http://sws.geonames.org/2802361/",
            "http://sws.geonames.org/2802361/",
        )
        .unwrap();

        assert_eq!(statements.len(), 2);
        for statement in &statements {
            match &statement.subject {
                Subject::NamedNode(node) => {
                    assert_eq!(node.as_str(), "http://sws.geonames.org/2802361/")
                }
                other => panic!("unexpected subject {:?}", other),
            }
        }
    }

    #[test]
    fn test_statements_about_unknown_subject_is_empty() {
        let statements = statements_about(
            DOCUMENT,
            "http://sws.geonames.org/2802361/",
            "http://sws.geonames.org/999/",
        )
        .unwrap();
        assert!(statements.is_empty());
    }

    #[test]
    fn test_malformed_document_is_an_error() {
        let result = statements_about(
            "<rdf:RDF",
            "http://sws.geonames.org/2802361/",
            "http://sws.geonames.org/2802361/",
        );
        assert!(matches!(result, Err(ResolverError::Rdf(_))));
    }
}
