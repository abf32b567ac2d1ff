// Error types for tracksmith

use snafu::Snafu;
use std::io;

use crate::track::EntityKind;

#[derive(Debug, Snafu)]
pub enum TracksmithError {
    // Errors while reading the input document
    #[snafu(display("Error reading track document {path}"))]
    DocumentReadError { path: String, source: io::Error },
    #[snafu(display("Error parsing track document"))]
    DocumentParseError { source: Box<geojson::Error> },

    // Runtime errors for the binary
    #[snafu(display("Error starting the async runtime"))]
    RuntimeError { source: io::Error },

    // Structural errors, the load cannot produce a circuit
    #[snafu(display("Missing a LineString with rt:kind defined as track"))]
    MissingTrackCenterline,
    #[snafu(display("Track centerline needs at least 2 points, found {points}"))]
    DegenerateCenterline { points: usize },
    #[snafu(display(
        "Rails of the {kind} do not match its centerline: center={center}, left={left}, right={right}"
    ))]
    RailLengthMismatch {
        kind: EntityKind,
        center: usize,
        left: usize,
        right: usize,
    },

    // Config management errors
    #[snafu(display("Could not find application config directory for the config file"))]
    NoConfigDir,
    #[snafu(display("Error reading or writing config file"))]
    ConfigIOError { source: io::Error },
    #[snafu(display("Error serializing config file"))]
    ConfigSerializeError { source: serde_json::Error },

    // Errors for the model writer
    #[snafu(display("Error writing track model file"))]
    WriterError { source: io::Error },
    #[snafu(display("Error serializing track model"))]
    ExportSerializeError { source: serde_json::Error },
}

impl From<geojson::Error> for TracksmithError {
    fn from(value: geojson::Error) -> Self {
        TracksmithError::DocumentParseError {
            source: Box::new(value),
        }
    }
}
