//! Labels and feature overlays rendered onto a [`MapSurface`].
//!
//! Every artifact gets an id from an allocator owned by the [`MapOverlay`],
//! so ids are unique for the overlay's lifetime and never collide with the
//! draw controller's ids. A label is one point source plus one symbol layer;
//! a feature overlay is one collection source plus a fill and a symbol layer,
//! both colored by a categorical property.

use std::fmt;

use geojson::{Feature, FeatureCollection, GeoJson, Geometry, JsonObject, Value as GeoValue};
use polymap_geo::{color_for_label, LngLat};
use serde_json::{json, Value};

use crate::error::Result;
use crate::surface::{LayerKind, LayerSpec, MapSurface};

/// Label text size in pixels.
pub const LABEL_TEXT_SIZE: f64 = 16.0;

/// Label text color.
pub const LABEL_TEXT_COLOR: &str = "#2563eb";

/// Feature name text size in pixels.
pub const FEATURE_TEXT_SIZE: f64 = 12.0;

/// Halo color behind all overlay text.
pub const HALO_COLOR: &str = "#fff";

/// Handle to a rendered label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LabelId(u64);

impl LabelId {
    /// Id of the backing source, shared by the symbol layer.
    pub fn source_id(self) -> String {
        format!("label-{}", self.0)
    }
}

impl fmt::Display for LabelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "label-{}", self.0)
    }
}

/// Handle to a rendered fill + symbol layer pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OverlayId(u64);

impl OverlayId {
    /// Id of the backing feature collection source.
    pub fn source_id(self) -> String {
        format!("feature-{}", self.0)
    }

    /// Id of the fill layer.
    pub fn fill_layer_id(self) -> String {
        format!("fill-feature-{}", self.0)
    }

    /// Id of the symbol layer.
    pub fn symbol_layer_id(self) -> String {
        format!("symbol-feature-{}", self.0)
    }
}

impl fmt::Display for OverlayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "feature-{}", self.0)
    }
}

/// Partial update for [`MapOverlay::update_label`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabelUpdate {
    /// New anchor position
    pub position: Option<LngLat>,
    /// New text
    pub text: Option<String>,
}

impl LabelUpdate {
    /// Move the label only.
    pub fn position(position: LngLat) -> Self {
        Self {
            position: Some(position),
            text: None,
        }
    }

    /// Change the text only.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            position: None,
            text: Some(text.into()),
        }
    }
}

/// Styling choices for feature overlays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayStyle {
    /// Feature property whose value selects the color
    pub category_key: String,
    /// Color for features whose category is not listed
    pub fallback_color: String,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            category_key: "amenity".to_string(),
            fallback_color: "black".to_string(),
        }
    }
}

/// Build the categorical color expression for a feature set.
///
/// Produces `["match", ["get", key], value1, color1, ..., fallback]` with one
/// pair per distinct value of `key`, in first-seen order. Features without a
/// string value for `key` are not listed. When no value is found the fallback
/// color is returned on its own.
pub fn category_color_expression(features: &[Feature], key: &str, fallback: &str) -> Value {
    let mut categories: Vec<&str> = Vec::new();
    for value in features
        .iter()
        .filter_map(|f| f.properties.as_ref()?.get(key)?.as_str())
    {
        if !categories.contains(&value) {
            categories.push(value);
        }
    }

    if categories.is_empty() {
        return Value::String(fallback.to_string());
    }

    let mut expression = vec![json!("match"), json!(["get", key])];
    for category in categories {
        expression.push(json!(category));
        expression.push(json!(color_for_label(category).to_string()));
    }
    expression.push(json!(fallback));
    Value::Array(expression)
}

/// Creates and removes labels and feature overlays on a surface.
#[derive(Debug)]
pub struct MapOverlay<S> {
    surface: S,
    style: OverlayStyle,
    next_label: u64,
    next_overlay: u64,
}

impl<S: MapSurface> MapOverlay<S> {
    /// Wrap a surface with the default style.
    pub fn new(surface: S) -> Self {
        Self::with_style(surface, OverlayStyle::default())
    }

    /// Wrap a surface with a custom style.
    pub fn with_style(surface: S, style: OverlayStyle) -> Self {
        Self {
            surface,
            style,
            next_label: 0,
            next_overlay: 0,
        }
    }

    /// The underlying surface.
    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Mutable access to the underlying surface (viewport, cursor).
    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    /// Current style.
    pub fn style(&self) -> &OverlayStyle {
        &self.style
    }

    /// Place a text label at `position`.
    pub fn add_label(&mut self, position: LngLat, text: &str) -> Result<LabelId> {
        self.next_label += 1;
        let id = LabelId(self.next_label);
        let source_id = id.source_id();

        self.surface
            .add_source(&source_id, label_feature(position, text))?;

        let layer = LayerSpec::new(&source_id, &source_id, LayerKind::Symbol)
            .layout(json!({
                "text-field": ["get", "text"],
                "text-anchor": "center",
                "text-size": LABEL_TEXT_SIZE,
            }))
            .paint(json!({
                "text-color": LABEL_TEXT_COLOR,
                "text-halo-color": HALO_COLOR,
                "text-halo-width": 2,
            }));

        if let Err(e) = self.surface.add_layer(layer) {
            if let Err(cleanup) = self.surface.remove_source(&source_id) {
                log::warn!("Failed to clean up source {}: {}", source_id, cleanup);
            }
            return Err(e);
        }

        log::debug!("Added {} at ({}, {})", id, position.lng, position.lat);
        Ok(id)
    }

    /// Patch a live label in place. Returns false, without changing anything,
    /// if the label does not exist.
    pub fn update_label(&mut self, id: LabelId, update: LabelUpdate) -> bool {
        let source_id = id.source_id();
        let mut feature = match self.surface.source_data(&source_id) {
            Some(GeoJson::Feature(feature)) => feature.clone(),
            _ => {
                log::debug!("Cannot update {}: no such label", id);
                return false;
            }
        };

        if let Some(text) = update.text {
            feature
                .properties
                .get_or_insert_with(JsonObject::new)
                .insert("text".to_string(), Value::String(text));
        }
        if let Some(position) = update.position {
            feature.geometry = Some(Geometry::new(GeoValue::Point(position.to_position())));
        }

        self.surface
            .set_source_data(&source_id, GeoJson::Feature(feature))
            .is_ok()
    }

    /// Remove a label's layer and source. Removing the same id twice fails.
    pub fn remove_label(&mut self, id: LabelId) -> Result<()> {
        let source_id = id.source_id();
        self.surface.remove_layer(&source_id)?;
        self.surface.remove_source(&source_id)?;
        log::debug!("Removed {}", id);
        Ok(())
    }

    /// Render a feature set as a categorical fill layer and a name layer.
    pub fn add_feature_overlay(&mut self, features: Vec<Feature>) -> Result<OverlayId> {
        self.next_overlay += 1;
        let id = OverlayId(self.next_overlay);
        let source_id = id.source_id();

        let colors = category_color_expression(
            &features,
            &self.style.category_key,
            &self.style.fallback_color,
        );
        let count = features.len();

        self.surface.add_source(
            &source_id,
            GeoJson::FeatureCollection(FeatureCollection {
                bbox: None,
                features,
                foreign_members: None,
            }),
        )?;

        let fill = LayerSpec::new(id.fill_layer_id(), &source_id, LayerKind::Fill)
            .paint(json!({ "fill-color": colors }));
        let symbol = LayerSpec::new(id.symbol_layer_id(), &source_id, LayerKind::Symbol)
            .layout(json!({
                "text-field": ["get", "name"],
                "text-anchor": "center",
                "text-size": FEATURE_TEXT_SIZE,
            }))
            .paint(json!({
                "text-color": colors,
                "text-halo-color": HALO_COLOR,
                "text-halo-width": 1,
            }));

        let fill_id = id.fill_layer_id();
        if let Err(e) = self.surface.add_layer(fill) {
            self.roll_back(&source_id, None);
            return Err(e);
        }
        if let Err(e) = self.surface.add_layer(symbol) {
            self.roll_back(&source_id, Some(&fill_id));
            return Err(e);
        }

        log::debug!("Added {} with {} features", id, count);
        Ok(id)
    }

    /// Undo a partially added overlay.
    fn roll_back(&mut self, source_id: &str, fill_id: Option<&str>) {
        if let Some(fill_id) = fill_id {
            if let Err(cleanup) = self.surface.remove_layer(fill_id) {
                log::warn!("Failed to clean up layer {}: {}", fill_id, cleanup);
            }
        }
        if let Err(cleanup) = self.surface.remove_source(source_id) {
            log::warn!("Failed to clean up source {}: {}", source_id, cleanup);
        }
    }

    /// Remove both layers of an overlay, then its source. Every removal is
    /// attempted; the first failure is returned.
    pub fn remove_feature_overlay(&mut self, id: OverlayId) -> Result<()> {
        let results = [
            self.surface.remove_layer(&id.fill_layer_id()),
            self.surface.remove_layer(&id.symbol_layer_id()),
            self.surface.remove_source(&id.source_id()),
        ];
        results.into_iter().collect::<Result<Vec<()>>>()?;
        log::debug!("Removed {}", id);
        Ok(())
    }
}

fn label_feature(position: LngLat, text: &str) -> GeoJson {
    let mut properties = JsonObject::new();
    properties.insert("text".to_string(), Value::String(text.to_string()));

    GeoJson::Feature(Feature {
        bbox: None,
        geometry: Some(Geometry::new(GeoValue::Point(position.to_position()))),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    })
}
