//! Feature queries against an Overpass interpreter.
//!
//! [`FeatureQuery`] is the capability the sync engine consumes: polygon in,
//! tagged features out. [`OverpassClient`] implements it over HTTP with a
//! bounded timeout and no internal retries; retrying is left to the caller.

mod query;
mod response;

use std::future::Future;
use std::time::Duration;

use geojson::Geometry;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use web_time::Instant;

use crate::config::OverpassConfig;
use crate::error::QueryError;
use crate::model::FeatureSet;

pub use query::{build_query, poly_filter};
pub use response::{OverpassElement, OverpassResponse, parse_response};

/// Source of tagged features inside a polygon.
pub trait FeatureQuery {
    /// Fetch the named features inside `polygon`.
    fn query_features(
        &self,
        polygon: &Geometry,
    ) -> impl Future<Output = Result<FeatureSet, QueryError>>;
}

/// HTTP client for an Overpass interpreter endpoint.
#[derive(Debug, Clone)]
pub struct OverpassClient {
    client: reqwest::Client,
    endpoint: String,
    category_key: String,
    timeout: Duration,
    server_timeout_secs: u64,
}

impl OverpassClient {
    /// Build a client from config. `category_key` selects which tag the
    /// query filters on.
    pub fn new(config: &OverpassConfig, category_key: &str) -> Result<Self, QueryError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/x-www-form-urlencoded"),
        );
        for (name, value) in &config.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| QueryError::InvalidHeader(name.clone()))?;
            let value = HeaderValue::from_str(value)
                .map_err(|_| QueryError::InvalidHeader(name.as_str().to_string()))?;
            headers.insert(name, value);
        }

        let timeout = config.timeout();
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            category_key: category_key.to_string(),
            timeout,
            server_timeout_secs: config.server_timeout_secs,
        })
    }

    /// The interpreter URL.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn post(&self, query: String) -> Result<String, QueryError> {
        let response = self
            .client
            .post(&self.endpoint)
            .form(&[("data", query)])
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| self.classify(e))?;

        if status.is_success() {
            Ok(body)
        } else {
            Err(QueryError::status(status.as_u16(), &body))
        }
    }

    fn classify(&self, error: reqwest::Error) -> QueryError {
        if error.is_timeout() {
            QueryError::Timeout(self.timeout)
        } else {
            QueryError::Http(error)
        }
    }
}

impl FeatureQuery for OverpassClient {
    async fn query_features(&self, polygon: &Geometry) -> Result<FeatureSet, QueryError> {
        let poly = poly_filter(polygon)?;
        let query = build_query(&poly, &self.category_key, self.server_timeout_secs);

        let started = Instant::now();
        let result = self.post(query).await;
        match &result {
            Ok(body) => log::debug!(
                "Overpass answered {} bytes in {:?}",
                body.len(),
                started.elapsed()
            ),
            Err(e) => log::warn!("Overpass query failed after {:?}: {}", started.elapsed(), e),
        }

        parse_response(&result?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_client_from_default_config() {
        let client = OverpassClient::new(&OverpassConfig::default(), "amenity").unwrap();
        assert_eq!(client.endpoint(), "https://overpass-api.de/api/interpreter");
    }

    #[test]
    fn test_invalid_header_rejected() {
        let config = OverpassConfig {
            headers: BTreeMap::from([("bad header".to_string(), "x".to_string())]),
            ..OverpassConfig::default()
        };
        assert!(matches!(
            OverpassClient::new(&config, "amenity"),
            Err(QueryError::InvalidHeader(name)) if name == "bad header"
        ));
    }

    #[tokio::test]
    async fn test_non_polygon_fails_before_request() {
        let client = OverpassClient::new(&OverpassConfig::default(), "amenity").unwrap();
        let line = Geometry::new(geojson::Value::LineString(vec![
            vec![0.0, 0.0],
            vec![1.0, 1.0],
        ]));
        assert!(matches!(
            client.query_features(&line).await,
            Err(QueryError::UnsupportedGeometry(_))
        ));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_http_error() {
        let config = OverpassConfig {
            // Port 9 (discard) on localhost is closed on test machines.
            endpoint: "http://127.0.0.1:9/api/interpreter".to_string(),
            timeout_secs: 2,
            ..OverpassConfig::default()
        };
        let client = OverpassClient::new(&config, "amenity").unwrap();
        let square = Geometry::new(geojson::Value::Polygon(vec![vec![
            vec![0.0, 0.0],
            vec![0.0, 1.0],
            vec![1.0, 1.0],
            vec![0.0, 0.0],
        ]]));
        assert!(matches!(
            client.query_features(&square).await,
            Err(QueryError::Http(_) | QueryError::Timeout(_))
        ));
    }
}
