//! Fixed vocabulary constant tables consumed at the interface level.
//!
//! These mirror the external ontologies the adapters advertise through
//! [`crate::endpoint::QueryEndpoint::label_candidates`] and
//! [`crate::endpoint::QueryEndpoint::external_equivalent_class`]. They carry
//! no behavior; localized titles for these terms are the host platform's
//! concern.

use crate::types::{Class, Property};

/// The geonames ontology.
pub mod geonames {
    use super::*;

    pub const NAMESPACE: &str = "http://www.geonames.org/ontology#";

    /// The class of all geographical features.
    pub const FEATURE: Class = Class::new(NAMESPACE, "Feature");

    pub const NAME: Property = Property::new(NAMESPACE, "name");
    pub const OFFICIAL_NAME: Property = Property::new(NAMESPACE, "officialName");
    pub const ALTERNATE_NAME: Property = Property::new(NAMESPACE, "alternateName");
}

/// SKOS labeling properties.
pub mod skos {
    use super::*;

    pub const NAMESPACE: &str = "http://www.w3.org/2004/02/skos/core#";

    pub const PREF_LABEL: Property = Property::new(NAMESPACE, "prefLabel");
    pub const ALT_LABEL: Property = Property::new(NAMESPACE, "altLabel");
}

/// The wikibase system ontology.
pub mod wikibase {
    use super::*;

    pub const NAMESPACE: &str = "http://wikiba.se/ontology-beta#";

    /// The class of all wikibase items.
    pub const ITEM: Class = Class::new(NAMESPACE, "Item");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vocabulary_uris() {
        assert_eq!(
            geonames::OFFICIAL_NAME.uri(),
            "http://www.geonames.org/ontology#officialName"
        );
        assert_eq!(wikibase::ITEM.uri(), "http://wikiba.se/ontology-beta#Item");
        assert_eq!(
            skos::PREF_LABEL.uri(),
            "http://www.w3.org/2004/02/skos/core#prefLabel"
        );
    }
}
