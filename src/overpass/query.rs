//! Overpass QL text for a polygon filter.

use geojson::{Geometry, Value};

use crate::error::QueryError;

/// Flatten a polygon's rings into Overpass `poly:` syntax.
///
/// Every `[lng, lat]` position of every ring is written as `lat lng`, all
/// separated by single spaces, in ring order.
pub fn poly_filter(geometry: &Geometry) -> Result<String, QueryError> {
    let rings = match &geometry.value {
        Value::Polygon(rings) => rings,
        other => return Err(QueryError::UnsupportedGeometry(kind_of(other).to_string())),
    };

    let points: Vec<String> = rings
        .iter()
        .flatten()
        .filter_map(|position| match position.as_slice() {
            [lng, lat, ..] => Some(format!("{lat} {lng}")),
            _ => None,
        })
        .collect();

    Ok(points.join(" "))
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Point(_) => "Point",
        Value::MultiPoint(_) => "MultiPoint",
        Value::LineString(_) => "LineString",
        Value::MultiLineString(_) => "MultiLineString",
        Value::Polygon(_) => "Polygon",
        Value::MultiPolygon(_) => "MultiPolygon",
        Value::GeometryCollection(_) => "GeometryCollection",
    }
}

/// Build the full query: named nodes, ways and relations carrying
/// `category_key` inside the polygon, plus the relations that reference
/// them, converted to GeoJSON geometries.
pub fn build_query(poly: &str, category_key: &str, server_timeout_secs: u64) -> String {
    format!(
        "[out:json][timeout:{server_timeout_secs}];\n\
         (\n\
         \x20 node[\"{category_key}\"][\"name\"](poly:\"{poly}\");\n\
         \x20 way[\"{category_key}\"](poly:\"{poly}\");\n\
         \x20 relation[\"{category_key}\"](poly:\"{poly}\");\n\
         \x20 <;\n\
         );\n\
         convert item ::=::,::geom=geom(),_osm_type=type();\n\
         out geom;"
    )
}
