// Resolved track model produced by the assembler

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use uom::si::f64::Length;
use uom::si::length::meter;

use crate::geometry::{Point2, Point3, Way, Way3};
use crate::gis::Projector;

use super::tags::{
    DrsRole, EntityKind, LineKind, LineProperties, MarkerRole, PropertyValue, TrackTag,
};

/// A point feature matched to a centerline index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointAnnotation {
    /// Index of the source feature in the document
    pub feature_index: usize,
    /// Projected and recentred position
    pub point: Point2,
    pub tags: Vec<TrackTag>,
    pub extra: BTreeMap<String, PropertyValue>,
}

impl PointAnnotation {
    pub fn width(&self) -> Option<f64> {
        self.tags.iter().rev().find_map(|t| match t {
            TrackTag::Width(v) => Some(*v),
            _ => None,
        })
    }

    pub fn height(&self) -> Option<f64> {
        self.tags.iter().rev().find_map(|t| match t {
            TrackTag::Height(v) => Some(*v),
            _ => None,
        })
    }

    pub fn camber(&self) -> Option<f64> {
        self.tags.iter().rev().find_map(|t| match t {
            TrackTag::Camber(v) => Some(*v),
            _ => None,
        })
    }

    /// Fold the tags of another annotation on the same index into this one
    pub fn merge(&mut self, other: PointAnnotation) {
        self.tags.extend(other.tags);
        self.extra.extend(other.extra);
    }
}

/// Width, height and camber resolved for one centerline index
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackProfile {
    /// Meters
    pub width: f64,
    /// Meters, before exaggeration
    pub height: f64,
    pub camber: f64,
}

/// The track or the pit lane, with its rails
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackEntity {
    pub kind: EntityKind,
    pub closed: bool,
    pub properties: LineProperties,
    /// Matched point annotations, one slot per centerline index
    pub annotations: Vec<Option<PointAnnotation>>,
    pub profile: Vec<TrackProfile>,
    pub center: Way3,
    pub left: Way3,
    pub right: Way3,
}

impl TrackEntity {
    pub fn len(&self) -> usize {
        self.center.len()
    }

    pub fn is_empty(&self) -> bool {
        self.center.is_empty()
    }

    /// Planar centerline, without elevation
    pub fn center_2d(&self) -> Vec<Point2> {
        self.center.iter().map(|p| p.xy()).collect()
    }
}

/// Span of the track centerline between two sector markers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sector {
    pub id: String,
    pub start: usize,
    pub end: usize,
    pub center: Way3,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrsZone {
    pub detect: usize,
    pub detect_point: Point3,
    pub start: usize,
    pub finish: usize,
    pub center: Way3,
}

/// Recoverable conditions met while assembling a track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Diagnostic {
    /// No raceway marker, the start/finish line defaults to index 0
    MissingRaceway,
    /// No sector markers, the whole loop is a single sector
    NoSectorMarkers,
    /// At least one DRS role has no marker, including documents without any DRS marker
    IncompleteDrs { missing: Vec<DrsRole> },
    /// Point feature that matches no centerline index
    UnmatchedAnnotation { feature_index: usize, point: Point2 },
    /// Point feature attached to the nearest index within the snapping tolerance
    SnappedAnnotation {
        feature_index: usize,
        kind: EntityKind,
        index: usize,
        distance: f64,
    },
    /// Recognised key whose value could not be interpreted
    MalformedProperty {
        feature_index: usize,
        key: String,
        value: String,
    },
    IgnoredFeature { feature_index: usize, reason: String },
    /// Tag that makes no sense on the entity it was matched to
    IgnoredTag {
        feature_index: usize,
        kind: EntityKind,
        tag: TrackTag,
    },
    /// A second line of the same kind, only the first one is used
    DuplicateEntity { feature_index: usize, kind: LineKind },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::MissingRaceway => {
                write!(f, "No raceway finish marker, start/finish defaults to index 0")
            }
            Diagnostic::NoSectorMarkers => {
                write!(f, "No sector markers, the whole track is sector 1")
            }
            Diagnostic::IncompleteDrs { missing } => {
                write!(f, "DRS zones ignored, missing roles {:?}", missing)
            }
            Diagnostic::UnmatchedAnnotation {
                feature_index,
                point,
            } => write!(
                f,
                "Point feature {} at ({:.2}, {:.2}) matches no centerline index",
                feature_index, point.x, point.y
            ),
            Diagnostic::SnappedAnnotation {
                feature_index,
                kind,
                index,
                distance,
            } => write!(
                f,
                "Point feature {} snapped to {} index {} ({:.3}px away)",
                feature_index, kind, index, distance
            ),
            Diagnostic::MalformedProperty {
                feature_index,
                key,
                value,
            } => write!(
                f,
                "Feature {} has malformed {}: {:?}, ignored",
                feature_index, key, value
            ),
            Diagnostic::IgnoredFeature {
                feature_index,
                reason,
            } => write!(f, "Feature {} ignored: {}", feature_index, reason),
            Diagnostic::IgnoredTag {
                feature_index,
                kind,
                tag,
            } => write!(
                f,
                "Tag {:?} of feature {} ignored on the {}",
                tag, feature_index, kind
            ),
            Diagnostic::DuplicateEntity {
                feature_index,
                kind,
            } => write!(
                f,
                "Feature {} is another {} line, only the first one is used",
                feature_index, kind
            ),
        }
    }
}

/// Position and heading of the car at the start/finish line
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StartPose {
    pub position: Point3,
    /// Radians, in pixel space
    pub heading: f64,
}

/// Fully resolved circuit, ready for rendering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackModel {
    pub track: TrackEntity,
    pub pit: Option<TrackEntity>,
    /// Width and height of the track centerline bounds, in pixels
    pub dimensions: (f64, f64),
    /// Projected point subtracted from every coordinate
    pub origin: Point2,
    pub sectors: Vec<Sector>,
    pub drs: Vec<DrsZone>,
    pub pit_stop: BTreeMap<MarkerRole, Point3>,
    pub starting_grid: BTreeMap<MarkerRole, Point3>,
    /// Slots of a `starting-grid` line, in grid order
    pub grid_slots: Way,
    /// Boxes of a `pit-stop` line, in line order
    pub pit_stop_slots: Way,
    pub start_finish_index: usize,
    /// Geodesic length of the track centerline, in meters
    pub track_length_m: f64,
    pub diagnostics: Vec<Diagnostic>,
    pub(crate) projector: Projector,
}

impl TrackModel {
    pub fn zoom(&self) -> u8 {
        self.projector.zoom()
    }

    /// Convert meters to pixels at the zoom this track was loaded with
    pub fn from_meters(&self, meters: f64) -> f64 {
        self.projector.from_meters(meters)
    }

    pub fn from_length(&self, length: Length) -> f64 {
        self.from_meters(length.get::<meter>())
    }

    pub fn track_length(&self) -> Length {
        Length::new::<meter>(self.track_length_m)
    }

    pub fn sector(&self, id: &str) -> Option<&Sector> {
        self.sectors.iter().find(|s| s.id == id)
    }

    /// Where the car sits on the grid line, facing along the centerline
    pub fn start_pose(&self) -> StartPose {
        let center = &self.track.center;
        let i = self.start_finish_index.min(center.len().saturating_sub(1));
        let position = center[i];

        let mut heading = 0.0;
        for step in 1..center.len() {
            let next = center[(i + step) % center.len()];
            let d = next.xy().sub(position.xy());
            if d.length_squared() > 0.0 {
                heading = d.angle();
                break;
            }
        }

        StartPose { position, heading }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn annotation(tags: Vec<TrackTag>) -> PointAnnotation {
        PointAnnotation {
            feature_index: 0,
            point: Point2::default(),
            tags,
            extra: BTreeMap::new(),
        }
    }

    #[test]
    fn test_annotation_overrides() {
        let a = annotation(vec![
            TrackTag::Width(12.0),
            TrackTag::Sector("1".to_string()),
            TrackTag::Camber(2.0),
        ]);
        assert_eq!(a.width(), Some(12.0));
        assert_eq!(a.height(), None);
        assert_eq!(a.camber(), Some(2.0));
    }

    #[test]
    fn test_annotation_merge_keeps_latest_override() {
        let mut a = annotation(vec![TrackTag::Width(12.0)]);
        a.merge(annotation(vec![
            TrackTag::Width(15.0),
            TrackTag::Drs(DrsRole::Start),
        ]));
        assert_eq!(a.width(), Some(15.0));
        assert_eq!(a.tags.len(), 3);
    }

    fn model(center: Way3, start_finish_index: usize) -> TrackModel {
        let track = TrackEntity {
            kind: EntityKind::Track,
            closed: true,
            properties: LineProperties::default(),
            annotations: vec![None; center.len()],
            profile: Vec::new(),
            left: center.clone(),
            right: center.clone(),
            center,
        };
        TrackModel {
            track,
            pit: None,
            dimensions: (0.0, 0.0),
            origin: Point2::default(),
            sectors: Vec::new(),
            drs: Vec::new(),
            pit_stop: BTreeMap::new(),
            starting_grid: BTreeMap::new(),
            grid_slots: Vec::new(),
            pit_stop_slots: Vec::new(),
            start_finish_index,
            track_length_m: 4653.0,
            diagnostics: Vec::new(),
            projector: Projector::new(17),
        }
    }

    #[test]
    fn test_start_pose_skips_ring_duplicate() {
        let center = vec![
            Point3::new(0.0, 0.0, 1.0),
            Point3::new(0.0, 10.0, 1.0),
            Point3::new(-10.0, 10.0, 1.0),
            Point3::new(0.0, 0.0, 1.0),
        ];

        let pose = model(center.clone(), 1).start_pose();
        assert_eq!(pose.position, center[1]);
        assert!((pose.heading - std::f64::consts::PI).abs() < 1e-12);

        // From the closing point the next distinct location is index 1
        let pose = model(center, 3).start_pose();
        assert!((pose.heading - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
    }

    #[test]
    fn test_lengths_in_pixels() {
        let m = model(vec![Point3::new(0.0, 0.0, 0.0)], 0);
        assert_eq!(m.zoom(), 17);
        assert!((m.track_length().get::<uom::si::length::kilometer>() - 4.653).abs() < 1e-9);
        let px = m.from_length(Length::new::<meter>(12.0));
        assert!((px - 12.0 * 131072.0 * 0.000003).abs() < 1e-9);
    }

    #[test]
    fn test_diagnostic_display() {
        let d = Diagnostic::UnmatchedAnnotation {
            feature_index: 4,
            point: Point2::new(1.0, 2.5),
        };
        assert_eq!(
            d.to_string(),
            "Point feature 4 at (1.00, 2.50) matches no centerline index"
        );
    }
}
