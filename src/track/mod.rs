// Track assembly: turns a tagged GeoJSON circuit into a resolved track model
// with rails, sectors, DRS zones and markers

pub mod assembler;
pub mod document;
pub mod model;
pub mod segments;
pub mod tags;

use std::path::Path;

use log::debug;

use crate::config::AssemblerConfig;
use crate::errors::TracksmithError;

// Re-export commonly used types
pub use assembler::TrackAssembler;
pub use document::{RawFeature, RawGeometry, parse_document};
pub use model::{
    Diagnostic, DrsZone, PointAnnotation, Sector, StartPose, TrackEntity, TrackModel,
    TrackProfile,
};
pub use tags::{
    DrsRole, EntityKind, LineKind, LineProperties, LineValue, MarkerRole, RacewayRole, TrackTag,
};

/// Read a track document from disk and assemble it.
///
/// Reading the file is the only asynchronous step, the assembly itself runs to completion
/// without yielding.
pub async fn load_track(
    path: impl AsRef<Path>,
    config: AssemblerConfig,
) -> Result<TrackModel, TracksmithError> {
    let path = path.as_ref();
    debug!("Loading track document {:?}", path);
    let content = tokio::fs::read_to_string(path).await.map_err(|e| {
        TracksmithError::DocumentReadError {
            path: path.display().to_string(),
            source: e,
        }
    })?;
    TrackAssembler::new(config).assemble_str(&content)
}

/// Blocking variant of [`load_track`]
pub fn load_track_blocking(
    path: impl AsRef<Path>,
    config: AssemblerConfig,
) -> Result<TrackModel, TracksmithError> {
    let path = path.as_ref();
    let content =
        std::fs::read_to_string(path).map_err(|e| TracksmithError::DocumentReadError {
            path: path.display().to_string(),
            source: e,
        })?;
    TrackAssembler::new(config).assemble_str(&content)
}

/// Raw `[longitude, latitude]` coordinates of the first track centerline in a document, used
/// for geodesic measurements that must not go through the projection
pub fn track_coordinates(features: &[RawFeature]) -> Option<&[[f64; 2]]> {
    features.iter().find_map(|feature| match &feature.geometry {
        RawGeometry::LineString(coords)
            if tags::line_kind(&feature.properties) == Some(LineKind::Track) =>
        {
            Some(coords.as_slice())
        }
        _ => None,
    })
}
