//! Events published to observers of the sync engine.

use geojson::Geometry;
use serde::{Deserialize, Serialize};

use super::{DrawId, FeatureSet};

/// Kind of state transition in the change feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Create,
    Update,
    Delete,
}

/// Payload of create and update events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeaturesData {
    pub name: String,
    pub polygon: Geometry,
    pub features: FeatureSet,
}

/// One entry of the change feed: `{ type, id, data? }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeaturesChangeEvent {
    #[serde(rename = "type")]
    pub kind: ChangeKind,
    pub id: DrawId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<FeaturesData>,
}

impl FeaturesChangeEvent {
    pub fn create(id: DrawId, data: FeaturesData) -> Self {
        Self {
            kind: ChangeKind::Create,
            id,
            data: Some(data),
        }
    }

    pub fn update(id: DrawId, data: FeaturesData) -> Self {
        Self {
            kind: ChangeKind::Update,
            id,
            data: Some(data),
        }
    }

    pub fn delete(id: DrawId) -> Self {
        Self {
            kind: ChangeKind::Delete,
            id,
            data: None,
        }
    }
}

/// Which synchronization attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureKind {
    CreateFailed,
    UpdateFailed,
}

/// A create or update that did not reach the change feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncFailure {
    #[serde(rename = "type")]
    pub kind: FailureKind,
    pub id: DrawId,
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use geojson::Value;

    #[test]
    fn test_delete_event_omits_data() {
        let event = FeaturesChangeEvent::delete(DrawId::new("abc"));
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json, serde_json::json!({ "type": "delete", "id": "abc" }));
    }

    #[test]
    fn test_create_event_shape() {
        let polygon = Geometry::new(Value::Polygon(vec![vec![
            vec![0.0, 0.0],
            vec![0.0, 1.0],
            vec![1.0, 1.0],
            vec![0.0, 0.0],
        ]]));
        let event = FeaturesChangeEvent::create(
            DrawId::new("abc"),
            FeaturesData {
                name: "Park A".to_string(),
                polygon,
                features: Vec::new(),
            },
        );
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "create");
        assert_eq!(json["data"]["name"], "Park A");
        assert_eq!(json["data"]["polygon"]["type"], "Polygon");

        let back: FeaturesChangeEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn test_failure_kind_names() {
        assert_eq!(
            serde_json::to_value(FailureKind::CreateFailed).unwrap(),
            "create-failed"
        );
    }
}
