//! Global constants for polymap

/// Default Overpass interpreter endpoint
pub const DEFAULT_OVERPASS_ENDPOINT: &str = "https://overpass-api.de/api/interpreter";

/// Client-side timeout for one feature query, in seconds
pub const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 10;

/// Timeout the query asks the Overpass server to honor, in seconds
pub const DEFAULT_SERVER_TIMEOUT_SECS: u64 = 90;

/// Maximum zoom when framing a feature
pub const DEFAULT_MAX_ZOOM: f64 = 16.0;

/// Name given to a polygon when no prompt is wired up
pub const DEFAULT_POLYGON_NAME: &str = "Untitled";

/// Tag used to query and color features
pub const DEFAULT_CATEGORY_KEY: &str = "amenity";

/// Color for feature categories not listed in the overlay style
pub const FALLBACK_CATEGORY_COLOR: &str = "black";
