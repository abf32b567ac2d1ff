// Library interface for tracksmith
// This allows integration tests and benches to access internal modules

pub mod config;
pub mod errors;
pub mod geometry;
pub mod gis;
pub mod track;
pub mod writer;

// Re-export commonly used types
pub use config::{AssemblerConfig, Framing};
pub use errors::TracksmithError;
pub use geometry::{Point2, Point3, Way, Way3};
pub use gis::Projector;
pub use track::{Diagnostic, TrackAssembler, TrackModel, load_track, load_track_blocking};
