//! polymap_geo - geometry helpers for drawn polygons and fetched features
//!
//! Bounding boxes and centers over GeoJSON geometries, plus the stable
//! label-to-color hash used to color feature categories.

mod bounds;
mod color;

pub use bounds::{compute_bounds, compute_center, Bounds, LngLat};
pub use color::{color_for_label, Rgb};
