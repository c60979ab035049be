//! The drawing toolkit seen from the sync engine.
//!
//! A [`DrawController`] holds the polygons the user has drawn and raises
//! [`DrawEvent`]s as they change. [`MemoryDraw`] is a controller without any
//! pointer handling, used by the CLI and in tests.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use geojson::Geometry;
use serde::{Deserialize, Serialize};

use crate::model::{DrawFeature, DrawId};

/// Interaction mode of the draw controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrawMode {
    /// Click to select whole features
    #[default]
    SimpleSelect,
    /// Drag vertices of the selected feature
    DirectSelect,
    /// Each click adds a vertex to a new polygon
    DrawPolygon,
}

impl DrawMode {
    /// Whether the user is placing a new polygon.
    pub fn is_drawing(self) -> bool {
        matches!(self, DrawMode::DrawPolygon)
    }
}

/// Lifecycle and interaction events raised by the draw controller.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawEvent {
    Create(DrawFeature),
    Update(DrawFeature),
    Delete(Vec<DrawFeature>),
    ModeChange(DrawMode),
    SelectionChange(Vec<DrawId>),
}

/// Operations the sync engine issues against the draw controller.
///
/// Mutating calls return the events the controller raised because of them,
/// so the caller can feed them back through the same handling path as
/// user-driven events.
pub trait DrawController {
    /// The live feature with `id`, if any.
    fn get(&self, id: &DrawId) -> Option<DrawFeature>;

    /// Delete a feature. Returns no events if it does not exist.
    fn delete(&mut self, id: &DrawId) -> Vec<DrawEvent>;

    /// Switch the interaction mode.
    fn change_mode(&mut self, mode: DrawMode) -> Vec<DrawEvent>;
}

#[derive(Debug, Default)]
struct DrawState {
    features: BTreeMap<DrawId, Geometry>,
    mode: DrawMode,
    selection: Vec<DrawId>,
    next_id: u64,
}

/// In-memory draw controller. Clones share the same state.
#[derive(Debug, Clone, Default)]
pub struct MemoryDraw {
    state: Rc<RefCell<DrawState>>,
}

impl MemoryDraw {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a polygon under a generated id.
    pub fn insert(&self, geometry: Geometry) -> DrawEvent {
        let id = {
            let mut state = self.state.borrow_mut();
            state.next_id += 1;
            DrawId::new(format!("draw-{}", state.next_id))
        };
        self.insert_with_id(id, geometry)
    }

    /// Add or replace a polygon under a caller-chosen id.
    pub fn insert_with_id(&self, id: impl Into<DrawId>, geometry: Geometry) -> DrawEvent {
        let id = id.into();
        self.state
            .borrow_mut()
            .features
            .insert(id.clone(), geometry.clone());
        DrawEvent::Create(DrawFeature::new(id, geometry))
    }

    /// Reshape an existing polygon. Returns None if `id` is unknown.
    pub fn update(&self, id: &DrawId, geometry: Geometry) -> Option<DrawEvent> {
        let mut state = self.state.borrow_mut();
        let slot = state.features.get_mut(id)?;
        *slot = geometry.clone();
        Some(DrawEvent::Update(DrawFeature::new(id.clone(), geometry)))
    }

    /// Replace the selection. Unknown ids are dropped.
    pub fn select(&self, ids: &[DrawId]) -> DrawEvent {
        let mut state = self.state.borrow_mut();
        let selection: Vec<DrawId> = ids
            .iter()
            .filter(|id| state.features.contains_key(*id))
            .cloned()
            .collect();
        state.selection = selection.clone();
        DrawEvent::SelectionChange(selection)
    }

    pub fn mode(&self) -> DrawMode {
        self.state.borrow().mode
    }

    pub fn selection(&self) -> Vec<DrawId> {
        self.state.borrow().selection.clone()
    }

    /// Ids of all live features, in id order.
    pub fn ids(&self) -> Vec<DrawId> {
        self.state.borrow().features.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.state.borrow().features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.borrow().features.is_empty()
    }
}

impl DrawController for MemoryDraw {
    fn get(&self, id: &DrawId) -> Option<DrawFeature> {
        let state = self.state.borrow();
        state
            .features
            .get(id)
            .map(|geometry| DrawFeature::new(id.clone(), geometry.clone()))
    }

    fn delete(&mut self, id: &DrawId) -> Vec<DrawEvent> {
        let mut state = self.state.borrow_mut();
        let Some(geometry) = state.features.remove(id) else {
            return Vec::new();
        };

        let mut events = vec![DrawEvent::Delete(vec![DrawFeature::new(id.clone(), geometry)])];
        if state.selection.contains(id) {
            state.selection.retain(|selected| selected != id);
            events.push(DrawEvent::SelectionChange(state.selection.clone()));
        }
        events
    }

    fn change_mode(&mut self, mode: DrawMode) -> Vec<DrawEvent> {
        let mut state = self.state.borrow_mut();
        if state.mode == mode {
            return Vec::new();
        }
        state.mode = mode;

        let mut events = Vec::new();
        // Starting a new polygon drops the current selection.
        if mode.is_drawing() && !state.selection.is_empty() {
            state.selection.clear();
            events.push(DrawEvent::SelectionChange(Vec::new()));
        }
        events.push(DrawEvent::ModeChange(mode));
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geojson::Value;

    fn square(size: f64) -> Geometry {
        Geometry::new(Value::Polygon(vec![vec![
            vec![0.0, 0.0],
            vec![0.0, size],
            vec![size, size],
            vec![size, 0.0],
            vec![0.0, 0.0],
        ]]))
    }

    #[test]
    fn test_insert_generates_ids() {
        let draw = MemoryDraw::new();
        let DrawEvent::Create(first) = draw.insert(square(1.0)) else {
            panic!("expected create");
        };
        let DrawEvent::Create(second) = draw.insert(square(2.0)) else {
            panic!("expected create");
        };
        assert_ne!(first.id, second.id);
        assert_eq!(draw.len(), 2);
        assert_eq!(draw.get(&first.id), Some(first));
    }

    #[test]
    fn test_update_unknown_id() {
        let draw = MemoryDraw::new();
        assert_eq!(draw.update(&DrawId::new("missing"), square(1.0)), None);
    }

    #[test]
    fn test_delete_raises_delete_and_selection() {
        let mut draw = MemoryDraw::new();
        draw.insert_with_id("a", square(1.0));
        draw.insert_with_id("b", square(2.0));
        draw.select(&[DrawId::new("a"), DrawId::new("b")]);

        let events = draw.delete(&DrawId::new("a"));
        assert_eq!(events.len(), 2);
        assert!(matches!(&events[0], DrawEvent::Delete(features) if features[0].id.as_str() == "a"));
        assert_eq!(events[1], DrawEvent::SelectionChange(vec![DrawId::new("b")]));

        assert!(draw.delete(&DrawId::new("a")).is_empty());
        assert!(draw.get(&DrawId::new("a")).is_none());
    }

    #[test]
    fn test_change_mode() {
        let mut draw = MemoryDraw::new();
        draw.insert_with_id("a", square(1.0));
        draw.select(&[DrawId::new("a")]);

        let events = draw.change_mode(DrawMode::DrawPolygon);
        assert_eq!(
            events,
            vec![
                DrawEvent::SelectionChange(Vec::new()),
                DrawEvent::ModeChange(DrawMode::DrawPolygon)
            ]
        );
        assert!(draw.change_mode(DrawMode::DrawPolygon).is_empty());
        assert_eq!(draw.mode(), DrawMode::DrawPolygon);
    }

    #[test]
    fn test_mode_names() {
        assert_eq!(
            serde_json::to_value(DrawMode::DrawPolygon).unwrap(),
            "draw_polygon"
        );
        assert!(!DrawMode::DirectSelect.is_drawing());
    }
}
