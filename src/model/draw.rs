//! Identity and geometry of a polygon held by the draw controller.

use std::fmt;

use geojson::Geometry;
use serde::{Deserialize, Serialize};

/// Opaque id the draw controller assigns to each drawn feature.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DrawId(String);

impl DrawId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DrawId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DrawId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for DrawId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A feature as reported by the draw controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawFeature {
    pub id: DrawId,
    pub geometry: Geometry,
}

impl DrawFeature {
    pub fn new(id: impl Into<DrawId>, geometry: Geometry) -> Self {
        Self {
            id: id.into(),
            geometry,
        }
    }
}
