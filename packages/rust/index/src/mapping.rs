//! Typed index mapping for hotel records.

use std::collections::BTreeMap;

use roomscout_shared::Locale;
use serde::Serialize;

/// Body of a create-index request.
#[derive(Debug, Clone, Serialize)]
pub struct CreateIndexBody {
    pub mappings: Mappings,
}

#[derive(Debug, Clone, Serialize)]
pub struct Mappings {
    pub properties: BTreeMap<&'static str, FieldMapping>,
}

/// One field of the mapping, tagged by its `type`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldMapping {
    Text {
        #[serde(skip_serializing_if = "Option::is_none")]
        analyzer: Option<&'static str>,
        #[serde(skip_serializing_if = "BTreeMap::is_empty")]
        fields: BTreeMap<&'static str, FieldMapping>,
    },
    Keyword,
    GeoPoint,
    Integer,
    Nested {
        properties: BTreeMap<&'static str, FieldMapping>,
    },
}

impl FieldMapping {
    /// Text field with a stemmed sub-field named `stemmed`.
    fn stemmed_text(analyzer: &'static str) -> Self {
        Self::Text {
            analyzer: None,
            fields: BTreeMap::from([(
                "stemmed",
                Self::Text {
                    analyzer: Some(analyzer),
                    fields: BTreeMap::new(),
                },
            )]),
        }
    }
}

/// Stemming analyzer for a locale's text fields.
pub fn analyzer_for(locale: &Locale) -> &'static str {
    match locale.as_str() {
        "en" => "english",
        "ru" => "russian",
        _ => "standard",
    }
}

/// Mapping for one locale's hotel partition.
pub fn hotel_mapping(locale: &Locale) -> CreateIndexBody {
    let analyzer = analyzer_for(locale);

    let name = FieldMapping::Text {
        analyzer: None,
        fields: BTreeMap::from([
            ("raw", FieldMapping::Keyword),
            (
                "stemmed",
                FieldMapping::Text {
                    analyzer: Some(analyzer),
                    fields: BTreeMap::new(),
                },
            ),
        ]),
    };

    let room = BTreeMap::from([
        ("name", FieldMapping::stemmed_text(analyzer)),
        ("max_people", FieldMapping::Integer),
    ]);

    let properties = BTreeMap::from([
        ("id", FieldMapping::Keyword),
        ("locale", FieldMapping::Keyword),
        ("name", name),
        ("address", FieldMapping::stemmed_text(analyzer)),
        ("summary", FieldMapping::stemmed_text(analyzer)),
        ("location", FieldMapping::GeoPoint),
        ("amenities", FieldMapping::Keyword),
        ("rooms", FieldMapping::Nested { properties: room }),
    ]);

    CreateIndexBody {
        mappings: Mappings { properties },
    }
}
