//! The per-polygon record owned by the sync engine.

use geojson::Geometry;
use polymap_map::{LabelId, OverlayId};

use super::FeatureSet;

/// Sequence number of one issued fetch. Later fetches get larger tickets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FetchTicket(pub(crate) u64);

/// Everything known about one live polygon.
#[derive(Debug, Clone)]
pub struct PolygonRecord {
    /// Display name resolved at creation
    pub name: String,
    /// Geometry as last reported by the draw controller
    pub geometry: Geometry,
    /// Centroid label on the map
    pub label_id: LabelId,
    /// Rendered feature overlay. None only while an update is in flight
    /// (the old overlay is already gone) or after that update failed.
    pub overlay_id: Option<OverlayId>,
    /// Features from the last successful query
    pub features: FeatureSet,
    /// Ticket of the most recently issued update
    pub latest_update: Option<FetchTicket>,
}
