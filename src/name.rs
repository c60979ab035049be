//! Display names for newly drawn polygons.

use std::future::Future;

use crate::constants::DEFAULT_POLYGON_NAME;
use crate::model::DrawFeature;

/// Asks someone (a dialog, another service) what a new polygon is called.
pub trait NameProvider {
    /// Resolve a name for `feature`. None means the prompt was dismissed.
    fn name_for(&self, feature: &DrawFeature) -> impl Future<Output = Option<String>>;
}

/// Gives every polygon the same name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedName(String);

impl FixedName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

impl Default for FixedName {
    fn default() -> Self {
        Self::new(DEFAULT_POLYGON_NAME)
    }
}

impl NameProvider for FixedName {
    async fn name_for(&self, _feature: &DrawFeature) -> Option<String> {
        Some(self.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geojson::{Geometry, Value};

    #[tokio::test]
    async fn test_fixed_name() {
        let feature = DrawFeature::new("a", Geometry::new(Value::Point(vec![0.0, 0.0])));
        assert_eq!(
            FixedName::default().name_for(&feature).await.as_deref(),
            Some("Untitled")
        );
        assert_eq!(
            FixedName::new("Park A").name_for(&feature).await.as_deref(),
            Some("Park A")
        );
    }
}
