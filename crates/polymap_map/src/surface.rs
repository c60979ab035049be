//! The rendering surface seen by the overlay layer.
//!
//! A [`MapSurface`] is anything that can hold GeoJSON sources and styled
//! layers over them, frame its viewport and change its pointer cursor. The
//! vocabulary mirrors common web-map style specifications: layer `layout` and
//! `paint` blocks are plain JSON objects that may contain style expressions.

use geojson::GeoJson;
use polymap_geo::Bounds;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

/// How a layer renders its source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerKind {
    /// Filled polygons
    Fill,
    /// Text and icons placed at features
    Symbol,
}

/// A styled layer drawn from one source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerSpec {
    /// Unique layer id
    pub id: String,
    /// Id of the source this layer draws
    pub source: String,
    /// Layer type
    #[serde(rename = "type")]
    pub kind: LayerKind,
    /// Layout properties
    pub layout: Value,
    /// Paint properties
    pub paint: Value,
}

impl LayerSpec {
    /// Create a layer with empty layout and paint blocks.
    pub fn new(id: impl Into<String>, source: impl Into<String>, kind: LayerKind) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            kind,
            layout: Value::Object(Default::default()),
            paint: Value::Object(Default::default()),
        }
    }

    /// Set the layout block.
    pub fn layout(mut self, layout: Value) -> Self {
        self.layout = layout;
        self
    }

    /// Set the paint block.
    pub fn paint(mut self, paint: Value) -> Self {
        self.paint = paint;
        self
    }
}

/// Pointer cursor shown over the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cursor {
    /// Default pointer
    #[default]
    Pointer,
    /// Crosshair, used while drawing
    Crosshair,
}

/// Options for [`MapSurface::fit_bounds`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitBoundsOptions {
    /// Never zoom in further than this level
    pub max_zoom: f64,
}

/// Rendering primitives the overlay layer is built on.
pub trait MapSurface {
    /// Add a GeoJSON source under a new id.
    fn add_source(&mut self, id: &str, data: GeoJson) -> Result<()>;

    /// Replace the data of an existing source.
    fn set_source_data(&mut self, id: &str, data: GeoJson) -> Result<()>;

    /// Current data of a source, if it exists.
    fn source_data(&self, id: &str) -> Option<&GeoJson>;

    /// Remove a source. Layers drawing it must be removed first.
    fn remove_source(&mut self, id: &str) -> Result<()>;

    /// Add a layer over an existing source.
    fn add_layer(&mut self, layer: LayerSpec) -> Result<()>;

    /// Remove a layer.
    fn remove_layer(&mut self, id: &str) -> Result<()>;

    /// Move the viewport so that `bounds` is visible.
    fn fit_bounds(&mut self, bounds: Bounds, options: FitBoundsOptions);

    /// Change the pointer cursor.
    fn set_cursor(&mut self, cursor: Cursor);
}
