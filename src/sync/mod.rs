//! Polygon/feature synchronization.
//!
//! [`PolygonFeatureSync`] keeps one [`PolygonRecord`] per drawn polygon and
//! the label and overlay rendered for it. It is a plain state machine:
//!
//! ```text
//! absent -> pending-create -> live -> (pending-update -> live)* -> absent
//! ```
//!
//! Draw events go in through [`PolygonFeatureSync::handle_draw_event`], which
//! returns the fetches that need to run. Whoever runs them (see [`SyncDriver`])
//! hands the results back through [`PolygonFeatureSync::complete`]. Nothing
//! here suspends, so every mutation of the record table happens on the
//! caller's thread in the order calls are made.
//!
//! Updates of the same polygon are not serialized. With
//! [`UpdateOrdering::LastResolved`] whichever fetch completes last wins, even
//! if it was issued first. [`UpdateOrdering::LatestIssued`] drops completions
//! of anything but the newest update.

mod driver;


use std::collections::HashMap;

use geojson::Geometry;
use polymap_geo::{compute_bounds, compute_center};
use polymap_map::{
    Cursor, EventHandler, FitBoundsOptions, LabelId, LabelUpdate, MapOverlay, MapSurface,
    OverlayId, OverlayStyle,
};
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_CATEGORY_KEY, DEFAULT_MAX_ZOOM, FALLBACK_CATEGORY_COLOR};
use crate::draw::{DrawController, DrawEvent, DrawMode};
use crate::error::{QueryError, SyncError};
use crate::model::{
    DrawFeature, DrawId, FailureKind, FeatureSet, FeaturesChangeEvent, FeaturesData,
    FetchTicket, PolygonRecord, SyncFailure, TaggedFeature,
};

pub use driver::{Command, SyncDriver, SyncHandle};

/// How overlapping updates of one polygon resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateOrdering {
    /// Apply every completion as it arrives; the last to arrive wins
    #[default]
    LastResolved,
    /// Apply only the completion of the most recently issued update
    LatestIssued,
}

/// Tunables for [`PolygonFeatureSync`].
#[derive(Debug, Clone, PartialEq)]
pub struct SyncSettings {
    /// Tag that overlays are colored by
    pub category_key: String,
    /// Zoom cap when framing a feature
    pub max_zoom: f64,
    pub update_ordering: UpdateOrdering,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            category_key: DEFAULT_CATEGORY_KEY.to_string(),
            max_zoom: DEFAULT_MAX_ZOOM,
            update_ordering: UpdateOrdering::default(),
        }
    }
}

/// A fetch the caller must run and report back through
/// [`PolygonFeatureSync::complete`].
#[derive(Debug, Clone, PartialEq)]
pub enum FetchRequest {
    /// Resolve a name and query features for a new polygon
    Create {
        ticket: FetchTicket,
        feature: DrawFeature,
    },
    /// Query features for a reshaped polygon
    Update {
        ticket: FetchTicket,
        feature: DrawFeature,
    },
}

impl FetchRequest {
    pub fn ticket(&self) -> FetchTicket {
        match self {
            FetchRequest::Create { ticket, .. } | FetchRequest::Update { ticket, .. } => *ticket,
        }
    }

    pub fn feature(&self) -> &DrawFeature {
        match self {
            FetchRequest::Create { feature, .. } | FetchRequest::Update { feature, .. } => feature,
        }
    }
}

/// Result of a [`FetchRequest`].
#[derive(Debug)]
pub enum FetchOutcome {
    Create {
        ticket: FetchTicket,
        feature: DrawFeature,
        /// Resolved name and fetched features
        result: Result<(String, FeatureSet), SyncError>,
    },
    Update {
        ticket: FetchTicket,
        feature: DrawFeature,
        result: Result<FeatureSet, QueryError>,
    },
}

/// Keeps labels, overlays and the change feed in step with drawn polygons.
pub struct PolygonFeatureSync<S, D> {
    overlay: MapOverlay<S>,
    draw: D,
    settings: SyncSettings,
    records: HashMap<DrawId, PolygonRecord>,
    /// Record ids in insertion order
    order: Vec<DrawId>,
    /// Create fetches in flight; only the listed ticket may complete
    pending_creates: HashMap<DrawId, FetchTicket>,
    next_ticket: u64,
    features_change: EventHandler<FeaturesChangeEvent>,
    sync_failed: EventHandler<SyncFailure>,
    mode_change: EventHandler<DrawMode>,
    selection_change: EventHandler<Vec<DrawId>>,
}

impl<S: MapSurface, D: DrawController> PolygonFeatureSync<S, D> {
    pub fn new(surface: S, draw: D, settings: SyncSettings) -> Self {
        let style = OverlayStyle {
            category_key: settings.category_key.clone(),
            fallback_color: FALLBACK_CATEGORY_COLOR.to_string(),
        };
        Self {
            overlay: MapOverlay::with_style(surface, style),
            draw,
            settings,
            records: HashMap::new(),
            order: Vec::new(),
            pending_creates: HashMap::new(),
            next_ticket: 0,
            features_change: EventHandler::new(),
            sync_failed: EventHandler::new(),
            mode_change: EventHandler::new(),
            selection_change: EventHandler::new(),
        }
    }

    /// Create, update and delete events for live polygons.
    pub fn features_change(&self) -> &EventHandler<FeaturesChangeEvent> {
        &self.features_change
    }

    /// Creates and updates that did not reach the change feed.
    pub fn sync_failed(&self) -> &EventHandler<SyncFailure> {
        &self.sync_failed
    }

    /// Interaction mode changes of the draw controller.
    pub fn mode_change(&self) -> &EventHandler<DrawMode> {
        &self.mode_change
    }

    /// Currently selected polygons.
    pub fn selection_change(&self) -> &EventHandler<Vec<DrawId>> {
        &self.selection_change
    }

    pub fn surface(&self) -> &S {
        self.overlay.surface()
    }

    pub fn draw(&self) -> &D {
        &self.draw
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    pub fn record(&self, id: &DrawId) -> Option<&PolygonRecord> {
        self.records.get(id)
    }

    /// Live records in the order they were created.
    pub fn records(&self) -> impl Iterator<Item = (&DrawId, &PolygonRecord)> {
        self.order
            .iter()
            .filter_map(|id| self.records.get(id).map(|record| (id, record)))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Whether a create fetch for `id` is still outstanding.
    pub fn is_pending_create(&self, id: &DrawId) -> bool {
        self.pending_creates.contains_key(id)
    }

    fn issue_ticket(&mut self) -> FetchTicket {
        self.next_ticket += 1;
        FetchTicket(self.next_ticket)
    }

    /// React to one draw controller event. Returns the fetches it started.
    pub fn handle_draw_event(&mut self, event: DrawEvent) -> Vec<FetchRequest> {
        match event {
            DrawEvent::Create(feature) => self.on_create(feature).into_iter().collect(),
            DrawEvent::Update(feature) => self.on_update(feature).into_iter().collect(),
            DrawEvent::Delete(features) => {
                for feature in features {
                    if let Some(ticket) = self.pending_creates.remove(&feature.id) {
                        log::debug!("{} deleted with create {:?} pending", feature.id, ticket);
                    }
                    self.remove_record(&feature.id);
                }
                Vec::new()
            }
            DrawEvent::ModeChange(mode) => {
                let cursor = if mode.is_drawing() {
                    Cursor::Crosshair
                } else {
                    Cursor::Pointer
                };
                self.overlay.surface_mut().set_cursor(cursor);
                self.mode_change.invoke(&mode);
                Vec::new()
            }
            DrawEvent::SelectionChange(ids) => {
                self.selection_change.invoke(&ids);
                Vec::new()
            }
        }
    }

    fn on_create(&mut self, feature: DrawFeature) -> Option<FetchRequest> {
        if self.records.contains_key(&feature.id) {
            log::warn!("Ignoring create for {}: already live", feature.id);
            return None;
        }
        if let Some(pending) = self.pending_creates.get(&feature.id) {
            log::debug!("Ignoring create for {}: {:?} pending", feature.id, pending);
            return None;
        }
        let ticket = self.issue_ticket();
        self.pending_creates.insert(feature.id.clone(), ticket);
        log::debug!("{} pending create ({:?})", feature.id, ticket);
        Some(FetchRequest::Create { ticket, feature })
    }

    fn on_update(&mut self, feature: DrawFeature) -> Option<FetchRequest> {
        let ticket = FetchTicket(self.next_ticket + 1);
        let Some(record) = self.records.get_mut(&feature.id) else {
            log::debug!("Ignoring update for {}: no record", feature.id);
            return None;
        };
        self.next_ticket = ticket.0;

        match compute_center(&feature.geometry) {
            Some(center) => {
                if !self
                    .overlay
                    .update_label(record.label_id, LabelUpdate::position(center))
                {
                    log::warn!("Label {} of {} is gone", record.label_id, feature.id);
                }
            }
            None => log::warn!("Updated geometry of {} has no center", feature.id),
        }

        if let Some(overlay_id) = record.overlay_id.take() {
            if let Err(e) = self.overlay.remove_feature_overlay(overlay_id) {
                log::warn!("Failed to remove {} of {}: {}", overlay_id, feature.id, e);
            }
        }

        record.geometry = feature.geometry.clone();
        record.latest_update = Some(ticket);
        log::debug!("{} pending update ({:?})", feature.id, ticket);
        Some(FetchRequest::Update { ticket, feature })
    }

    /// Apply the result of a fetch returned earlier.
    pub fn complete(&mut self, outcome: FetchOutcome) {
        match outcome {
            FetchOutcome::Create {
                ticket,
                feature,
                result,
            } => self.complete_create(ticket, feature, result),
            FetchOutcome::Update {
                ticket,
                feature,
                result,
            } => self.complete_update(ticket, feature, result),
        }
    }

    fn complete_create(
        &mut self,
        ticket: FetchTicket,
        feature: DrawFeature,
        result: Result<(String, FeatureSet), SyncError>,
    ) {
        if self.pending_creates.get(&feature.id) != Some(&ticket) {
            log::debug!("Discarding create {:?} of {}: not pending", ticket, feature.id);
            return;
        }
        self.pending_creates.remove(&feature.id);

        if self.draw.get(&feature.id).is_none() {
            log::debug!("Discarding create {:?}: {} was deleted", ticket, feature.id);
            return;
        }
        if self.records.contains_key(&feature.id) {
            log::warn!("Discarding create {:?}: {} is already live", ticket, feature.id);
            return;
        }

        let (name, features) = match result {
            Ok(resolved) => resolved,
            Err(e) => {
                self.fail(FailureKind::CreateFailed, feature.id, &e);
                return;
            }
        };

        let (label_id, overlay_id) = match self.render(&feature.geometry, &name, &features) {
            Ok(ids) => ids,
            Err(e) => {
                self.fail(FailureKind::CreateFailed, feature.id, &e);
                return;
            }
        };

        log::info!(
            "{} is live as '{}' with {} features",
            feature.id,
            name,
            features.len()
        );
        self.records.insert(
            feature.id.clone(),
            PolygonRecord {
                name: name.clone(),
                geometry: feature.geometry.clone(),
                label_id,
                overlay_id: Some(overlay_id),
                features: features.clone(),
                latest_update: None,
            },
        );
        self.order.push(feature.id.clone());

        self.features_change.invoke(&FeaturesChangeEvent::create(
            feature.id,
            FeaturesData {
                name,
                polygon: feature.geometry,
                features,
            },
        ));
    }

    /// Put a label and an overlay on the map for a new record.
    fn render(
        &mut self,
        geometry: &Geometry,
        name: &str,
        features: &[TaggedFeature],
    ) -> Result<(LabelId, OverlayId), SyncError> {
        let center = compute_center(geometry).ok_or(SyncError::NoCentroid)?;
        let label_id = self.overlay.add_label(center, name)?;

        let geojson = features.iter().map(TaggedFeature::to_geojson).collect();
        match self.overlay.add_feature_overlay(geojson) {
            Ok(overlay_id) => Ok((label_id, overlay_id)),
            Err(e) => {
                if let Err(cleanup) = self.overlay.remove_label(label_id) {
                    log::warn!("Failed to remove {}: {}", label_id, cleanup);
                }
                Err(e.into())
            }
        }
    }

    fn complete_update(
        &mut self,
        ticket: FetchTicket,
        feature: DrawFeature,
        result: Result<FeatureSet, QueryError>,
    ) {
        let Some(record) = self.records.get_mut(&feature.id) else {
            log::debug!("Discarding update {:?}: {} was deleted", ticket, feature.id);
            return;
        };

        if self.settings.update_ordering == UpdateOrdering::LatestIssued
            && record.latest_update != Some(ticket)
        {
            log::debug!(
                "Discarding stale update {:?} of {} (latest {:?})",
                ticket,
                feature.id,
                record.latest_update
            );
            return;
        }

        let features = match result {
            Ok(features) => features,
            Err(e) => {
                self.fail(FailureKind::UpdateFailed, feature.id, &e);
                return;
            }
        };

        // An earlier completion of an overlapping update may have rendered already.
        if let Some(previous) = record.overlay_id.take() {
            if let Err(e) = self.overlay.remove_feature_overlay(previous) {
                log::warn!("Failed to remove {} of {}: {}", previous, feature.id, e);
            }
        }

        let geojson = features.iter().map(TaggedFeature::to_geojson).collect();
        match self.overlay.add_feature_overlay(geojson) {
            Ok(overlay_id) => record.overlay_id = Some(overlay_id),
            Err(e) => {
                self.fail(FailureKind::UpdateFailed, feature.id, &SyncError::from(e));
                return;
            }
        }

        record.geometry = feature.geometry.clone();
        record.features = features.clone();
        log::info!(
            "{} updated with {} features ({:?})",
            feature.id,
            features.len(),
            ticket
        );

        let data = FeaturesData {
            name: record.name.clone(),
            polygon: feature.geometry,
            features,
        };
        self.features_change
            .invoke(&FeaturesChangeEvent::update(feature.id, data));
    }

    fn fail(&self, kind: FailureKind, id: DrawId, reason: &dyn std::error::Error) {
        log::warn!("{:?} for {}: {}", kind, id, reason);
        self.sync_failed.invoke(&SyncFailure {
            kind,
            id,
            reason: reason.to_string(),
        });
    }

    fn remove_record(&mut self, id: &DrawId) {
        let Some(record) = self.records.remove(id) else {
            log::debug!("Ignoring delete for {}: no record", id);
            return;
        };
        self.order.retain(|existing| existing != id);

        if let Err(e) = self.overlay.remove_label(record.label_id) {
            log::warn!("Failed to remove {} of {}: {}", record.label_id, id, e);
        }
        if let Some(overlay_id) = record.overlay_id {
            if let Err(e) = self.overlay.remove_feature_overlay(overlay_id) {
                log::warn!("Failed to remove {} of {}: {}", overlay_id, id, e);
            }
        }

        log::info!("{} ('{}') deleted", id, record.name);
        self.features_change
            .invoke(&FeaturesChangeEvent::delete(id.clone()));
    }

    /// Feed events the controller raised in response to our own call.
    fn replay(&mut self, events: Vec<DrawEvent>) {
        for event in events {
            let requests = self.handle_draw_event(event);
            if !requests.is_empty() {
                log::warn!("Dropping {} fetches raised by the controller", requests.len());
            }
        }
    }

    /// Put the controller into polygon drawing mode.
    pub fn activate_draw(&mut self) {
        let events = self.draw.change_mode(DrawMode::DrawPolygon);
        self.replay(events);
        self.overlay.surface_mut().set_cursor(Cursor::Crosshair);
    }

    /// Delete a drawn polygon through the controller. The resulting delete
    /// event tears down its record. Returns false if the controller does not
    /// know `id`.
    pub fn delete_draw(&mut self, id: &DrawId) -> bool {
        if self.draw.get(id).is_none() {
            log::debug!("Nothing to delete for {}", id);
            return false;
        }
        let events = self.draw.delete(id);
        self.replay(events);
        true
    }

    /// Issue the create fetch again for a drawn polygon that has no record,
    /// typically after a `create-failed` event. Returns `None` while a create
    /// for `id` is still pending.
    pub fn retry_create(&mut self, id: &DrawId) -> Option<FetchRequest> {
        if self.records.contains_key(id) {
            log::debug!("Not retrying {}: already live", id);
            return None;
        }
        if self.is_pending_create(id) {
            log::debug!("Not retrying {}: create pending", id);
            return None;
        }
        let feature = self.draw.get(id)?;
        self.on_create(feature)
    }

    /// Frame the viewport on a fetched feature, searching one polygon's
    /// features or, without `polygon_id`, every polygon in creation order.
    /// Returns whether the feature was found.
    pub fn zoom_to_feature(&mut self, feature_id: &str, polygon_id: Option<&DrawId>) -> bool {
        let found = match polygon_id {
            Some(polygon_id) => self.records.get(polygon_id).and_then(|record| {
                record
                    .features
                    .iter()
                    .find(|feature| feature.id_matches(feature_id))
            }),
            None => self
                .records()
                .find_map(|(_, record)| {
                    record
                        .features
                        .iter()
                        .find(|feature| feature.id_matches(feature_id))
                }),
        };

        let Some(feature) = found else {
            log::debug!("No fetched feature {}", feature_id);
            return false;
        };

        match compute_bounds(&feature.geometry) {
            Some(bounds) => {
                let options = FitBoundsOptions {
                    max_zoom: self.settings.max_zoom,
                };
                self.overlay.surface_mut().fit_bounds(bounds, options);
            }
            None => log::debug!("Feature {} has no extent", feature_id),
        }
        true
    }
}
