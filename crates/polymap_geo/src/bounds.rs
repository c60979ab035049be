//! Bounding boxes and centers for GeoJSON geometries.

use geojson::{Geometry, Position, Value};
use serde::{Deserialize, Serialize};

/// A longitude/latitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LngLat {
    pub lng: f64,
    pub lat: f64,
}

impl LngLat {
    pub fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }

    /// Read a GeoJSON position (`[lng, lat, ...]`). Returns None for
    /// positions with fewer than two ordinates.
    pub fn from_position(position: &[f64]) -> Option<Self> {
        match position {
            [lng, lat, ..] => Some(Self::new(*lng, *lat)),
            _ => None,
        }
    }

    /// Convert back into a GeoJSON position.
    pub fn to_position(self) -> Position {
        vec![self.lng, self.lat]
    }
}

/// An axis-aligned longitude/latitude box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    /// South-west corner (minimum longitude and latitude)
    pub sw: LngLat,
    /// North-east corner (maximum longitude and latitude)
    pub ne: LngLat,
}

impl Bounds {
    /// A zero-sized box around a single point.
    pub fn from_point(point: LngLat) -> Self {
        Self {
            sw: point,
            ne: point,
        }
    }

    /// Grow the box to cover `point`.
    pub fn extend(&mut self, point: LngLat) {
        self.sw.lng = self.sw.lng.min(point.lng);
        self.sw.lat = self.sw.lat.min(point.lat);
        self.ne.lng = self.ne.lng.max(point.lng);
        self.ne.lat = self.ne.lat.max(point.lat);
    }

    /// Center point of the box.
    pub fn center(&self) -> LngLat {
        LngLat::new(
            (self.sw.lng + self.ne.lng) / 2.0,
            (self.sw.lat + self.ne.lat) / 2.0,
        )
    }

    /// Check whether a point lies inside the box (edges included).
    pub fn contains(&self, point: LngLat) -> bool {
        point.lng >= self.sw.lng
            && point.lng <= self.ne.lng
            && point.lat >= self.sw.lat
            && point.lat <= self.ne.lat
    }
}

/// Accumulates points into an optional box; empty until the first point.
#[derive(Debug, Default)]
struct BoundsBuilder {
    bounds: Option<Bounds>,
}

impl BoundsBuilder {
    fn extend(&mut self, point: LngLat) {
        match self.bounds.as_mut() {
            Some(bounds) => bounds.extend(point),
            None => self.bounds = Some(Bounds::from_point(point)),
        }
    }

    fn extend_positions<'a>(&mut self, positions: impl IntoIterator<Item = &'a Position>) {
        for point in positions
            .into_iter()
            .filter_map(|p| LngLat::from_position(p))
        {
            self.extend(point);
        }
    }
}

/// Compute the minimal box covering every coordinate of `geometry`.
///
/// Geometry collections are folded by member *centers*, not by the members'
/// raw coordinates, so the result for a collection is an approximation of
/// the union's extent. Returns None when the geometry has no usable
/// coordinates.
pub fn compute_bounds(geometry: &Geometry) -> Option<Bounds> {
    let mut builder = BoundsBuilder::default();

    match &geometry.value {
        Value::Point(position) => builder.extend_positions([position]),
        Value::MultiPoint(positions) | Value::LineString(positions) => {
            builder.extend_positions(positions)
        }
        Value::MultiLineString(lines) | Value::Polygon(lines) => {
            builder.extend_positions(lines.iter().flatten())
        }
        Value::MultiPolygon(polygons) => {
            builder.extend_positions(polygons.iter().flatten().flatten())
        }
        Value::GeometryCollection(members) => {
            for center in members.iter().filter_map(compute_center) {
                builder.extend(center);
            }
        }
    }

    builder.bounds
}

/// Center of [`compute_bounds`]. Independent of vertex order.
pub fn compute_center(geometry: &Geometry) -> Option<LngLat> {
    compute_bounds(geometry).map(|bounds| bounds.center())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ring(points: &[(f64, f64)]) -> Vec<Position> {
        points.iter().map(|(x, y)| vec![*x, *y]).collect()
    }

    #[test]
    fn test_point_bounds_are_degenerate() {
        let geometry = Geometry::new(Value::Point(vec![151.2, -33.8]));
        let bounds = compute_bounds(&geometry).unwrap();
        assert_eq!(bounds.sw, bounds.ne);
        assert_eq!(compute_center(&geometry), Some(LngLat::new(151.2, -33.8)));
    }

    #[test]
    fn test_polygon_center() {
        let geometry = Geometry::new(Value::Polygon(vec![ring(&[
            (0.0, 0.0),
            (0.0, 1.0),
            (1.0, 1.0),
            (1.0, 0.0),
            (0.0, 0.0),
        ])]));
        let bounds = compute_bounds(&geometry).unwrap();
        assert_eq!(bounds.sw, LngLat::new(0.0, 0.0));
        assert_eq!(bounds.ne, LngLat::new(1.0, 1.0));
        assert_eq!(compute_center(&geometry), Some(LngLat::new(0.5, 0.5)));
    }

    #[test]
    fn test_center_ignores_vertex_order() {
        let forward = Geometry::new(Value::Polygon(vec![ring(&[
            (2.0, 3.0),
            (4.0, 3.0),
            (4.0, 7.0),
            (2.0, 7.0),
            (2.0, 3.0),
        ])]));
        let reversed = Geometry::new(Value::Polygon(vec![ring(&[
            (2.0, 3.0),
            (2.0, 7.0),
            (4.0, 7.0),
            (4.0, 3.0),
            (2.0, 3.0),
        ])]));
        assert_eq!(compute_center(&forward), compute_center(&reversed));
    }

    #[test]
    fn test_multipolygon_covers_all_parts() {
        let geometry = Geometry::new(Value::MultiPolygon(vec![
            vec![ring(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 0.0)])],
            vec![ring(&[(5.0, 5.0), (6.0, 5.0), (6.0, 8.0), (5.0, 5.0)])],
        ]));
        let bounds = compute_bounds(&geometry).unwrap();
        assert_eq!(bounds.sw, LngLat::new(0.0, 0.0));
        assert_eq!(bounds.ne, LngLat::new(6.0, 8.0));
    }

    #[test]
    fn test_collection_folds_member_centers() {
        // The line spans 0..10 but only its center (5, 0) enters the box.
        let geometry = Geometry::new(Value::GeometryCollection(vec![
            Geometry::new(Value::LineString(ring(&[(0.0, 0.0), (10.0, 0.0)]))),
            Geometry::new(Value::Point(vec![5.0, 4.0])),
        ]));
        let bounds = compute_bounds(&geometry).unwrap();
        assert_eq!(bounds.sw, LngLat::new(5.0, 0.0));
        assert_eq!(bounds.ne, LngLat::new(5.0, 4.0));
        assert!(!bounds.contains(LngLat::new(0.0, 0.0)));
    }

    #[test]
    fn test_empty_geometry_has_no_bounds() {
        let geometry = Geometry::new(Value::MultiPoint(vec![]));
        assert!(compute_bounds(&geometry).is_none());
        assert!(compute_center(&geometry).is_none());

        let short = Geometry::new(Value::Point(vec![1.0]));
        assert!(compute_bounds(&short).is_none());
    }
}
