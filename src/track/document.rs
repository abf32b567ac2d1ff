// Reading of GeoJSON track documents into raw features

use geojson::{GeoJson, Value};
use serde_json::Map;

/// Geometry of a feature the assembler knows how to use
#[derive(Debug, Clone, PartialEq)]
pub enum RawGeometry {
    /// `[longitude, latitude]` pairs
    LineString(Vec<[f64; 2]>),
    Point([f64; 2]),
    /// Any other geometry type, or a missing geometry, kept only for reporting
    Unsupported(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawFeature {
    /// Position of the feature in the document
    pub index: usize,
    pub geometry: RawGeometry,
    pub properties: Map<String, serde_json::Value>,
}

fn position(coord: &[f64]) -> Option<[f64; 2]> {
    match coord {
        [lon, lat, ..] => Some([*lon, *lat]),
        _ => None,
    }
}

fn raw_geometry(geometry: Option<&geojson::Geometry>) -> RawGeometry {
    let Some(geometry) = geometry else {
        return RawGeometry::Unsupported("missing geometry".to_string());
    };
    match &geometry.value {
        Value::LineString(coords) => {
            match coords.iter().map(|c| position(c)).collect::<Option<Vec<_>>>() {
                Some(points) => RawGeometry::LineString(points),
                None => RawGeometry::Unsupported("LineString with short positions".to_string()),
            }
        }
        Value::Point(coord) => match position(coord) {
            Some(point) => RawGeometry::Point(point),
            None => RawGeometry::Unsupported("Point with a short position".to_string()),
        },
        other => RawGeometry::Unsupported(other.type_name().to_string()),
    }
}

/// Flatten a parsed GeoJSON document into its features, in document order
pub fn raw_features(document: GeoJson) -> Vec<RawFeature> {
    let features = match document {
        GeoJson::FeatureCollection(fc) => fc.features,
        GeoJson::Feature(f) => vec![f],
        GeoJson::Geometry(g) => vec![geojson::Feature {
            bbox: None,
            geometry: Some(g),
            id: None,
            properties: None,
            foreign_members: None,
        }],
    };

    features
        .into_iter()
        .enumerate()
        .map(|(index, feature)| RawFeature {
            index,
            geometry: raw_geometry(feature.geometry.as_ref()),
            properties: feature.properties.unwrap_or_default(),
        })
        .collect()
}

/// Parse a GeoJSON string into raw features
pub fn parse_document(content: &str) -> Result<Vec<RawFeature>, geojson::Error> {
    let document: GeoJson = content.parse()?;
    Ok(raw_features(document))
}
