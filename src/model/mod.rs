//! Data models for polygons, fetched features and the change feed.

mod change;
mod draw;
mod feature;
mod record;

pub use change::{ChangeKind, FailureKind, FeaturesChangeEvent, FeaturesData, SyncFailure};
pub use draw::{DrawFeature, DrawId};
pub use feature::{FeatureSet, InvalidFeature, TaggedFeature};
pub use record::{FetchTicket, PolygonRecord};
