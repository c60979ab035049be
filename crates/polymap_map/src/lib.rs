//! polymap_map - map surface abstraction and overlay management
//!
//! This crate provides the pieces that sit between the polygon sync engine and
//! whatever actually draws the map: a typed publish/subscribe primitive, the
//! [`MapSurface`] trait for sources and layers, and [`MapOverlay`], which turns
//! labels and feature sets into styled layers.

mod error;
mod event_handler;
mod memory;
mod overlay;
mod surface;

pub use error::{Result, SurfaceError};
pub use event_handler::{EventHandler, ListenerId, Subscription};
pub use memory::InMemorySurface;
pub use overlay::{category_color_expression, LabelId, LabelUpdate, MapOverlay, OverlayId, OverlayStyle};
pub use surface::{Cursor, FitBoundsOptions, LayerKind, LayerSpec, MapSurface};

// Re-export geometry types that surface implementors need
pub use polymap_geo::{Bounds, LngLat};
