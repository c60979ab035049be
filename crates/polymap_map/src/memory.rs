//! A surface that keeps everything in memory.
//!
//! Useful for headless runs and for asserting exactly which sources and layers
//! a sequence of operations leaves behind.

use std::collections::BTreeMap;

use geojson::GeoJson;
use polymap_geo::Bounds;

use crate::error::{Result, SurfaceError};
use crate::surface::{Cursor, FitBoundsOptions, LayerSpec, MapSurface};

/// In-memory [`MapSurface`] implementation.
#[derive(Debug, Clone, Default)]
pub struct InMemorySurface {
    sources: BTreeMap<String, GeoJson>,
    /// Layers in draw order
    layers: Vec<LayerSpec>,
    cursor: Cursor,
    viewport: Option<(Bounds, FitBoundsOptions)>,
}

impl InMemorySurface {
    /// Create an empty surface.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a layer by id.
    pub fn layer(&self, id: &str) -> Option<&LayerSpec> {
        self.layers.iter().find(|layer| layer.id == id)
    }

    /// All layers in draw order.
    pub fn layers(&self) -> &[LayerSpec] {
        &self.layers
    }

    /// Ids of all sources.
    pub fn source_ids(&self) -> impl Iterator<Item = &str> {
        self.sources.keys().map(String::as_str)
    }

    /// Check if no source or layer exists.
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty() && self.layers.is_empty()
    }

    /// Current cursor.
    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    /// The most recent `fit_bounds` request.
    pub fn viewport(&self) -> Option<(Bounds, FitBoundsOptions)> {
        self.viewport
    }
}

impl MapSurface for InMemorySurface {
    fn add_source(&mut self, id: &str, data: GeoJson) -> Result<()> {
        if self.sources.contains_key(id) {
            return Err(SurfaceError::DuplicateSource(id.to_string()));
        }
        self.sources.insert(id.to_string(), data);
        Ok(())
    }

    fn set_source_data(&mut self, id: &str, data: GeoJson) -> Result<()> {
        match self.sources.get_mut(id) {
            Some(existing) => {
                *existing = data;
                Ok(())
            }
            None => Err(SurfaceError::SourceNotFound(id.to_string())),
        }
    }

    fn source_data(&self, id: &str) -> Option<&GeoJson> {
        self.sources.get(id)
    }

    fn remove_source(&mut self, id: &str) -> Result<()> {
        if self.layers.iter().any(|layer| layer.source == id) {
            log::warn!("Removing source {} while layers still draw it", id);
        }
        self.sources
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| SurfaceError::SourceNotFound(id.to_string()))
    }

    fn add_layer(&mut self, layer: LayerSpec) -> Result<()> {
        if self.layer(&layer.id).is_some() {
            return Err(SurfaceError::DuplicateLayer(layer.id));
        }
        if !self.sources.contains_key(&layer.source) {
            return Err(SurfaceError::MissingLayerSource {
                layer: layer.id,
                source_id: layer.source,
            });
        }
        self.layers.push(layer);
        Ok(())
    }

    fn remove_layer(&mut self, id: &str) -> Result<()> {
        let index = self
            .layers
            .iter()
            .position(|layer| layer.id == id)
            .ok_or_else(|| SurfaceError::LayerNotFound(id.to_string()))?;
        self.layers.remove(index);
        Ok(())
    }

    fn fit_bounds(&mut self, bounds: Bounds, options: FitBoundsOptions) {
        self.viewport = Some((bounds, options));
    }

    fn set_cursor(&mut self, cursor: Cursor) {
        self.cursor = cursor;
    }
}
