//! polymap - keeps map overlays in sync with drawn polygons
//!
//! Draw a polygon, and polymap fetches the named features inside it from an
//! Overpass service, renders a centroid label plus a categorical overlay, and
//! publishes a change feed as polygons are created, reshaped and deleted.

pub mod config;
pub mod constants;
pub mod draw;
pub mod error;
pub mod model;
pub mod name;
pub mod overpass;
pub mod sync;

pub use config::AppConfig;
pub use draw::{DrawController, DrawEvent, DrawMode, MemoryDraw};
pub use error::{DriverStopped, QueryError, SyncError};
pub use name::{FixedName, NameProvider};
pub use overpass::{FeatureQuery, OverpassClient};
pub use sync::{
    FetchOutcome, FetchRequest, PolygonFeatureSync, SyncDriver, SyncHandle, SyncSettings,
    UpdateOrdering,
};
