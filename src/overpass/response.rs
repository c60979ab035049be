//! Mapping of Overpass JSON responses into tagged features.

use std::collections::BTreeMap;

use geojson::Geometry;
use geojson::feature::Id;
use serde::Deserialize;
use serde_json::Value as JsonValue;

use crate::error::QueryError;
use crate::model::{FeatureSet, TaggedFeature};

/// Top level of an Overpass JSON response.
#[derive(Debug, Deserialize)]
pub struct OverpassResponse {
    #[serde(default)]
    pub version: Option<JsonValue>,
    #[serde(default)]
    pub elements: Vec<OverpassElement>,
}

/// One converted element: a GeoJSON geometry plus OSM tags.
#[derive(Debug, Deserialize)]
pub struct OverpassElement {
    #[serde(rename = "type", default)]
    pub element_type: Option<String>,
    #[serde(default)]
    pub id: Option<JsonValue>,
    #[serde(default)]
    pub geometry: Option<JsonValue>,
    #[serde(default)]
    pub tags: Option<BTreeMap<String, String>>,
}

impl OverpassElement {
    fn into_feature(self) -> Option<TaggedFeature> {
        let tags = self.tags?;
        if !tags.get("name").is_some_and(|name| !name.is_empty()) {
            return None;
        }

        let geometry = match serde_json::from_value::<Geometry>(self.geometry?) {
            Ok(geometry) => geometry,
            Err(e) => {
                log::debug!("Skipping element {:?} with unusable geometry: {}", self.id, e);
                return None;
            }
        };

        let id = match self.id {
            Some(JsonValue::Number(n)) => Some(Id::Number(n)),
            Some(JsonValue::String(s)) => Some(Id::String(s)),
            _ => None,
        };

        TaggedFeature::new(id, geometry, tags)
    }
}

impl OverpassResponse {
    /// Keep only elements with a non-empty `name` tag and a geometry.
    pub fn into_features(self) -> FeatureSet {
        let total = self.elements.len();
        let features: FeatureSet = self
            .elements
            .into_iter()
            .filter_map(OverpassElement::into_feature)
            .collect();
        log::debug!("Kept {} of {} Overpass elements", features.len(), total);
        features
    }
}

/// Parse a response body into features.
pub fn parse_response(body: &str) -> Result<FeatureSet, QueryError> {
    let response: OverpassResponse = serde_json::from_str(body)?;
    Ok(response.into_features())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "version": 0.6,
        "generator": "Overpass API",
        "elements": [
            {
                "type": "item",
                "id": 1001,
                "geometry": { "type": "Point", "coordinates": [151.21, -33.87] },
                "tags": { "name": "Cafe X", "amenity": "cafe", "_osm_type": "node" }
            },
            {
                "type": "item",
                "id": 1002,
                "geometry": { "type": "Point", "coordinates": [151.22, -33.86] },
                "tags": { "amenity": "bench" }
            },
            {
                "type": "item",
                "id": 1003,
                "geometry": { "type": "Point", "coordinates": [151.22, -33.86] }
            },
            {
                "type": "item",
                "id": 1004,
                "tags": { "name": "Ghost", "amenity": "cafe" }
            },
            {
                "type": "item",
                "id": 1005,
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[151.2, -33.8], [151.3, -33.8], [151.3, -33.9], [151.2, -33.8]]]
                },
                "tags": { "name": "Library", "amenity": "library", "_osm_type": "way" }
            }
        ]
    }"#;

    #[test]
    fn test_keeps_named_elements_with_geometry() {
        let features = parse_response(SAMPLE).unwrap();
        let names: Vec<&str> = features.iter().map(TaggedFeature::name).collect();
        assert_eq!(names, vec!["Cafe X", "Library"]);
        assert!(features[0].id_matches("1001"));
    }

    #[test]
    fn test_tags_survive_exactly() {
        let body = r#"{ "version": 0.6, "elements": [
            { "type": "item", "id": 1,
              "geometry": { "type": "Point", "coordinates": [0.5, 0.5] },
              "tags": { "name": "Cafe X", "amenity": "cafe" } }
        ] }"#;
        let features = parse_response(body).unwrap();
        assert_eq!(features.len(), 1);

        let expected: BTreeMap<String, String> = [("name", "Cafe X"), ("amenity", "cafe")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        assert_eq!(features[0].tags, expected);
    }

    #[test]
    fn test_invalid_json_is_decode_error() {
        assert!(matches!(
            parse_response("<html>busy</html>"),
            Err(QueryError::Decode(_))
        ));
    }

    #[test]
    fn test_empty_response() {
        assert!(parse_response(r#"{ "version": 0.6, "elements": [] }"#)
            .unwrap()
            .is_empty());
    }
}
