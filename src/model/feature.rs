//! Tagged features returned by the feature query service.

use std::collections::BTreeMap;

use geojson::feature::Id;
use geojson::{Feature, Geometry, JsonObject};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

/// Ordered features fetched for one polygon.
pub type FeatureSet = Vec<TaggedFeature>;

/// A geometry with string tags. Always carries a `name` tag.
///
/// Serializes as a GeoJSON Feature with the tags as `properties`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "Feature", try_from = "Feature")]
pub struct TaggedFeature {
    /// Id assigned by the query service
    pub id: Option<Id>,
    pub geometry: Geometry,
    pub tags: BTreeMap<String, String>,
}

impl TaggedFeature {
    /// Build a feature from its parts. Returns None if `tags` has no
    /// non-empty `name`.
    pub fn new(id: Option<Id>, geometry: Geometry, tags: BTreeMap<String, String>) -> Option<Self> {
        let named = tags.get("name").is_some_and(|name| !name.is_empty());
        named.then_some(Self { id, geometry, tags })
    }

    /// The `name` tag.
    pub fn name(&self) -> &str {
        self.tags.get("name").map(String::as_str).unwrap_or_default()
    }

    /// Value of an arbitrary tag.
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    /// Check the id against a textual key; numeric ids compare by their
    /// decimal form.
    pub fn id_matches(&self, key: &str) -> bool {
        match &self.id {
            Some(Id::String(id)) => id == key,
            Some(Id::Number(id)) => id.to_string() == key,
            None => false,
        }
    }

    /// Convert into a plain GeoJSON feature for rendering.
    pub fn to_geojson(&self) -> Feature {
        self.clone().into()
    }
}

impl From<TaggedFeature> for Feature {
    fn from(feature: TaggedFeature) -> Self {
        let properties: JsonObject = feature
            .tags
            .into_iter()
            .map(|(key, value)| (key, JsonValue::String(value)))
            .collect();

        Feature {
            bbox: None,
            geometry: Some(feature.geometry),
            id: feature.id,
            properties: Some(properties),
            foreign_members: None,
        }
    }
}

/// Why a GeoJSON feature could not become a [`TaggedFeature`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidFeature {
    #[error("Feature has no geometry")]
    MissingGeometry,

    #[error("Feature has no name tag")]
    MissingName,

    #[error("Tag '{0}' is not a string")]
    NonStringTag(String),
}

impl TryFrom<Feature> for TaggedFeature {
    type Error = InvalidFeature;

    fn try_from(feature: Feature) -> Result<Self, Self::Error> {
        let geometry = feature.geometry.ok_or(InvalidFeature::MissingGeometry)?;

        let mut tags = BTreeMap::new();
        for (key, value) in feature.properties.unwrap_or_default() {
            match value {
                JsonValue::String(value) => {
                    tags.insert(key, value);
                }
                _ => return Err(InvalidFeature::NonStringTag(key)),
            }
        }

        Self::new(feature.id, geometry, tags).ok_or(InvalidFeature::MissingName)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geojson::Value;

    fn tags(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn point() -> Geometry {
        Geometry::new(Value::Point(vec![151.2, -33.8]))
    }

    #[test]
    fn test_requires_name() {
        assert!(TaggedFeature::new(None, point(), tags(&[("amenity", "cafe")])).is_none());
        assert!(TaggedFeature::new(None, point(), tags(&[("name", "")])).is_none());

        let feature =
            TaggedFeature::new(None, point(), tags(&[("name", "Cafe X"), ("amenity", "cafe")]))
                .unwrap();
        assert_eq!(feature.name(), "Cafe X");
        assert_eq!(feature.tag("amenity"), Some("cafe"));
    }

    #[test]
    fn test_serializes_as_geojson_feature() {
        let feature = TaggedFeature::new(
            Some(Id::Number(42.into())),
            point(),
            tags(&[("name", "Bench"), ("amenity", "bench")]),
        )
        .unwrap();

        let json = serde_json::to_value(&feature).unwrap();
        assert_eq!(json["type"], "Feature");
        assert_eq!(json["id"], 42);
        assert_eq!(json["properties"]["name"], "Bench");
        assert_eq!(json["geometry"]["type"], "Point");

        let back: TaggedFeature = serde_json::from_value(json).unwrap();
        assert_eq!(back, feature);
    }

    #[test]
    fn test_id_matches_textual_form() {
        let numeric =
            TaggedFeature::new(Some(Id::Number(7.into())), point(), tags(&[("name", "n")]))
                .unwrap();
        assert!(numeric.id_matches("7"));
        assert!(!numeric.id_matches("8"));

        let textual = TaggedFeature::new(
            Some(Id::String("node/7".to_string())),
            point(),
            tags(&[("name", "n")]),
        )
        .unwrap();
        assert!(textual.id_matches("node/7"));
    }

    #[test]
    fn test_rejects_non_string_tags() {
        let mut properties = JsonObject::new();
        properties.insert("name".to_string(), JsonValue::from("x"));
        properties.insert("levels".to_string(), JsonValue::from(3));
        let feature = Feature {
            bbox: None,
            geometry: Some(point()),
            id: None,
            properties: Some(properties),
            foreign_members: None,
        };

        assert_eq!(
            TaggedFeature::try_from(feature),
            Err(InvalidFeature::NonStringTag("levels".to_string()))
        );
    }
}
