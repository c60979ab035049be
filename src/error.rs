//! Error types for feature queries and polygon synchronization.

use std::time::Duration;

use polymap_map::SurfaceError;
use thiserror::Error;

/// Errors from the feature query service.
#[derive(Error, Debug)]
pub enum QueryError {
    /// The request did not finish within the configured timeout
    #[error("Query timed out after {0:?}")]
    Timeout(Duration),

    /// Connection or transport failure
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-success status
    #[error("HTTP {status}: {body}")]
    Status {
        /// Status code returned by the service
        status: u16,
        /// Start of the response body
        body: String,
    },

    /// The response body was not the expected JSON
    #[error("Invalid response: {0}")]
    Decode(#[from] serde_json::Error),

    /// The query input is not a polygon
    #[error("Unsupported geometry '{0}', expected Polygon")]
    UnsupportedGeometry(String),

    /// A configured request header is not valid HTTP
    #[error("Invalid header '{0}'")]
    InvalidHeader(String),

    /// The task running the fetch panicked or was cancelled
    #[error("Fetch task failed: {0}")]
    TaskFailed(String),
}

impl QueryError {
    /// Create a status error, keeping at most 256 bytes of the body.
    pub fn status(status: u16, body: &str) -> Self {
        const MAX_BODY: usize = 256;

        let body = if body.len() > MAX_BODY {
            let mut end = MAX_BODY;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}...", &body[..end])
        } else {
            body.to_string()
        };

        Self::Status { status, body }
    }
}

/// Reasons a create or update did not complete.
#[derive(Error, Debug)]
pub enum SyncError {
    /// The name prompt was dismissed
    #[error("No name was provided")]
    NameCancelled,

    /// The feature query failed
    #[error(transparent)]
    Query(#[from] QueryError),

    /// The polygon has no coordinates to place a label at
    #[error("Polygon has no centroid")]
    NoCentroid,

    /// Rendering the label or overlay failed
    #[error("Map surface error: {0}")]
    Surface(#[from] SurfaceError),
}

/// The sync driver is no longer accepting commands.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Sync driver has stopped")]
pub struct DriverStopped;
