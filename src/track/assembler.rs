// Assembly of a raw track document into the resolved track model

use std::collections::BTreeMap;
use std::f64::consts::FRAC_PI_2;

use log::{debug, info, warn};
use uom::si::length::meter;

use crate::config::{AssemblerConfig, Framing};
use crate::errors::TracksmithError;
use crate::geometry::{
    Distances, Point2, Point3, Way, Way3, exact_index, limits2, nearest_index,
    nearest_index_within, offset_curve,
};
use crate::gis::{Projector, way_length};

use super::document::{RawFeature, RawGeometry, parse_document};
use super::track_coordinates;
use super::model::{Diagnostic, PointAnnotation, TrackEntity, TrackModel, TrackProfile};
use super::segments::{SectorMarker, cut_sectors, is_ring, pair_drs_zones};
use super::tags::{
    DrsRole, EntityKind, LineKind, LineProperties, LineValue, MalformedTag, MarkerRole,
    PointTags, TrackTag, line_properties, point_tags,
};

/// A line feature claimed by the track or the pit, before its rails are built
struct LineDraft {
    kind: EntityKind,
    properties: LineProperties,
    center: Way,
    annotations: Vec<Option<PointAnnotation>>,
}

impl LineDraft {
    fn attach(&mut self, index: usize, annotation: PointAnnotation) {
        match &mut self.annotations[index] {
            Some(existing) => existing.merge(annotation),
            slot => *slot = Some(annotation),
        }
    }
}

/// A point feature waiting to be matched to a centerline
struct QueuedPoint {
    feature_index: usize,
    point: Point2,
    tags: PointTags,
}

impl QueuedPoint {
    fn into_annotation(self) -> PointAnnotation {
        PointAnnotation {
            feature_index: self.feature_index,
            point: self.point,
            tags: self.tags.tags,
            extra: self.tags.extra,
        }
    }
}

/// A point feature matched to one index of an entity, recorded once per feature
struct Resolved {
    kind: EntityKind,
    index: usize,
    annotation: PointAnnotation,
}

/// Features split by what they describe
#[derive(Default)]
struct Classified {
    track: Option<LineDraft>,
    pit: Option<LineDraft>,
    grid_slots: Option<Way>,
    pit_stop_slots: Option<Way>,
    queued: Vec<QueuedPoint>,
}

/// Markers collected from the tags of resolved points
#[derive(Default)]
struct Roles {
    sectors: Vec<(String, Point2)>,
    starting_grid: BTreeMap<MarkerRole, (EntityKind, usize)>,
    pit_stop: BTreeMap<MarkerRole, usize>,
    drs: BTreeMap<DrsRole, Vec<Point2>>,
    raceway: Option<Point2>,
}

/// Running width/height/camber carried along a centerline
#[derive(Debug, Clone, Copy)]
struct ProfileState {
    width: f64,
    height: f64,
    camber: f64,
}

impl ProfileState {
    fn initial(properties: &LineProperties, config: &AssemblerConfig) -> Self {
        let initial = |value: &Option<LineValue>, fallback: f64| {
            value.as_ref().and_then(LineValue::initial).unwrap_or(fallback)
        };
        Self {
            width: initial(&properties.width, config.default_width),
            height: initial(&properties.height, config.default_height),
            camber: initial(&properties.camber, config.default_camber),
        }
    }

    /// Per-index line entries first, then point overrides
    fn step(
        &mut self,
        properties: &LineProperties,
        index: usize,
        annotation: Option<&PointAnnotation>,
    ) -> TrackProfile {
        let line_at = |value: &Option<LineValue>| value.as_ref().and_then(|v| v.at(index));
        if let Some(width) = line_at(&properties.width) {
            self.width = width;
        }
        if let Some(height) = line_at(&properties.height) {
            self.height = height;
        }
        if let Some(camber) = line_at(&properties.camber) {
            self.camber = camber;
        }

        if let Some(annotation) = annotation {
            if let Some(width) = annotation.width() {
                self.width = width;
            }
            if let Some(height) = annotation.height() {
                self.height = height;
            }
            if let Some(camber) = annotation.camber() {
                self.camber = camber;
            }
        }

        TrackProfile {
            width: self.width,
            height: self.height,
            camber: self.camber,
        }
    }
}

/// Resolve width, height and camber for every index, holding each value until it is
/// overridden again
fn resolve_profiles(
    properties: &LineProperties,
    annotations: &[Option<PointAnnotation>],
    config: &AssemblerConfig,
) -> Vec<TrackProfile> {
    annotations
        .iter()
        .enumerate()
        .scan(ProfileState::initial(properties, config), |state, (i, annotation)| {
            Some(state.step(properties, i, annotation.as_ref()))
        })
        .collect()
}

/// Turns track documents into [`TrackModel`]s
pub struct TrackAssembler {
    config: AssemblerConfig,
    projector: Projector,
}

impl TrackAssembler {
    pub fn new(config: AssemblerConfig) -> Self {
        let projector = Projector::with_meters_scale(config.zoom, config.meters_scale);
        Self { config, projector }
    }

    pub fn config(&self) -> &AssemblerConfig {
        &self.config
    }

    /// Parse a GeoJSON document and assemble it
    pub fn assemble_str(&self, content: &str) -> Result<TrackModel, TracksmithError> {
        let features = parse_document(content)?;
        self.assemble(&features)
    }

    /// Assemble raw features into a track model.
    ///
    /// Fails only when the document has no usable track centerline. Every other problem is
    /// recorded in [`TrackModel::diagnostics`] and resolved with a default.
    pub fn assemble(&self, features: &[RawFeature]) -> Result<TrackModel, TracksmithError> {
        Assembly::new(self).run(features)
    }
}

/// State of a single document load
struct Assembly<'a> {
    config: &'a AssemblerConfig,
    projector: Projector,
    origin: Point2,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Assembly<'a> {
    fn new(assembler: &'a TrackAssembler) -> Self {
        Self {
            config: &assembler.config,
            projector: assembler.projector,
            origin: Point2::default(),
            diagnostics: Vec::new(),
        }
    }

    fn report(&mut self, diagnostic: Diagnostic) {
        warn!("{}", diagnostic);
        self.diagnostics.push(diagnostic);
    }

    fn report_malformed(&mut self, feature_index: usize, malformed: Vec<MalformedTag>) {
        for tag in malformed {
            self.report(Diagnostic::MalformedProperty {
                feature_index,
                key: tag.key,
                value: tag.value,
            });
        }
    }

    fn project(&self, coord: [f64; 2]) -> Point2 {
        self.projector.project(coord).sub(self.origin)
    }

    fn run(mut self, features: &[RawFeature]) -> Result<TrackModel, TracksmithError> {
        debug!("Assembling track from {} features", features.len());

        let track_coords = locate_centerline(features)?;
        let dimensions = self.frame(track_coords);
        let track_length = way_length(track_coords);

        let Classified {
            track,
            mut pit,
            grid_slots,
            pit_stop_slots,
            queued,
        } = self.classify(features);
        let Some(mut track) = track else {
            return Err(TracksmithError::MissingTrackCenterline);
        };

        let resolved = self.associate(&mut track, pit.as_mut(), queued);
        let roles = self.resolve_roles(&resolved);

        let track = self.build_entity(track)?;
        let pit = pit.map(|p| self.build_entity(p)).transpose()?;

        let track_center = track.center_2d();
        let ring = is_ring(&track.center);

        let start_finish_index = match roles.raceway.and_then(|p| nearest_index(&track_center, p)) {
            Some(index) => index,
            None => {
                self.report(Diagnostic::MissingRaceway);
                0
            }
        };

        let sector_markers: Vec<SectorMarker> = roles
            .sectors
            .iter()
            .filter_map(|(id, point)| {
                nearest_index(&track_center, *point).map(|index| SectorMarker {
                    id: id.clone(),
                    index,
                })
            })
            .collect();
        if sector_markers.is_empty() {
            self.report(Diagnostic::NoSectorMarkers);
        }
        let sectors = cut_sectors(&track.center, &sector_markers, ring);
        debug!("Cut {} sectors", sectors.len());

        let missing: Vec<DrsRole> = DrsRole::ALL
            .into_iter()
            .filter(|role| roles.drs.get(role).is_none_or(|points| points.is_empty()))
            .collect();
        let drs = if missing.is_empty() {
            let indices = |role: DrsRole| -> Vec<usize> {
                roles.drs[&role]
                    .iter()
                    .filter_map(|p| nearest_index(&track_center, *p))
                    .collect()
            };
            pair_drs_zones(
                &track.center,
                &indices(DrsRole::Detect),
                &indices(DrsRole::Start),
                &indices(DrsRole::Finish),
                ring,
            )
        } else {
            self.report(Diagnostic::IncompleteDrs { missing });
            Vec::new()
        };
        debug!("Paired {} DRS zones", drs.len());

        let entity_point = |kind: EntityKind, index: usize| -> Option<Point3> {
            match kind {
                EntityKind::Track => track.center.get(index).copied(),
                EntityKind::Pit => pit.as_ref().and_then(|p| p.center.get(index).copied()),
            }
        };
        let starting_grid: BTreeMap<MarkerRole, Point3> = roles
            .starting_grid
            .iter()
            .filter_map(|(role, (kind, index))| entity_point(*kind, *index).map(|p| (*role, p)))
            .collect();
        let pit_stop: BTreeMap<MarkerRole, Point3> = roles
            .pit_stop
            .iter()
            .filter_map(|(role, index)| entity_point(EntityKind::Pit, *index).map(|p| (*role, p)))
            .collect();

        info!(
            "Assembled track with {} points, {} sectors, {} DRS zones and {} diagnostics",
            track.len(),
            sectors.len(),
            drs.len(),
            self.diagnostics.len()
        );

        Ok(TrackModel {
            track,
            pit,
            dimensions,
            origin: self.origin,
            sectors,
            drs,
            pit_stop,
            starting_grid,
            grid_slots: grid_slots.unwrap_or_default(),
            pit_stop_slots: pit_stop_slots.unwrap_or_default(),
            start_finish_index,
            track_length_m: track_length.get::<meter>(),
            diagnostics: self.diagnostics,
            projector: self.projector,
        })
    }

    /// Bounds of the projected track centerline give the dimensions and the origin
    fn frame(&mut self, track_coords: &[[f64; 2]]) -> (f64, f64) {
        let projected: Way = track_coords.iter().map(|c| self.projector.project(*c)).collect();
        let bounds = limits2(&projected);
        self.origin = match self.config.framing {
            Framing::MinCorner => bounds.min_corner(),
            Framing::Center => bounds.center(),
        };
        debug!(
            "Track bounds: {:.2}x{:.2}px, origin at ({:.2}, {:.2})",
            bounds.width(),
            bounds.height(),
            self.origin.x,
            self.origin.y
        );
        (bounds.width(), bounds.height())
    }

    /// Split features into the track and pit lines, the slot lines and the queue of point
    /// features. The first line of each kind wins.
    fn classify(&mut self, features: &[RawFeature]) -> Classified {
        let mut out = Classified::default();

        for feature in features {
            match &feature.geometry {
                RawGeometry::LineString(coords) => {
                    let (properties, malformed) = line_properties(&feature.properties);
                    self.report_malformed(feature.index, malformed);

                    let Some(kind) = properties.kind else {
                        self.report(Diagnostic::IgnoredFeature {
                            feature_index: feature.index,
                            reason: "LineString without a recognised kind".to_string(),
                        });
                        continue;
                    };
                    let taken = match kind {
                        LineKind::Track => out.track.is_some(),
                        LineKind::Pit => out.pit.is_some(),
                        LineKind::StartingGrid => out.grid_slots.is_some(),
                        LineKind::PitStop => out.pit_stop_slots.is_some(),
                    };
                    if taken {
                        self.report(Diagnostic::DuplicateEntity {
                            feature_index: feature.index,
                            kind,
                        });
                        continue;
                    }

                    let center: Way = coords.iter().map(|c| self.project(*c)).collect();
                    debug!("Feature {} is the {} with {} points", feature.index, kind, center.len());
                    match kind.entity() {
                        Some(entity) => {
                            let draft = LineDraft {
                                kind: entity,
                                properties,
                                annotations: vec![None; center.len()],
                                center,
                            };
                            match entity {
                                EntityKind::Track => out.track = Some(draft),
                                EntityKind::Pit => out.pit = Some(draft),
                            }
                        }
                        None if kind == LineKind::StartingGrid => out.grid_slots = Some(center),
                        None => out.pit_stop_slots = Some(center),
                    }
                }
                RawGeometry::Point(coord) => {
                    let (tags, malformed) = point_tags(&feature.properties);
                    self.report_malformed(feature.index, malformed);
                    out.queued.push(QueuedPoint {
                        feature_index: feature.index,
                        point: self.project(*coord),
                        tags,
                    });
                }
                RawGeometry::Unsupported(geometry) => {
                    self.report(Diagnostic::IgnoredFeature {
                        feature_index: feature.index,
                        reason: format!("unsupported geometry {}", geometry),
                    });
                }
            }
        }

        out
    }

    /// Attach queued points to centerline indices: exact matches on the track, then on the pit,
    /// then (when configured) the nearest index within the snapping tolerance
    fn associate(
        &mut self,
        track: &mut LineDraft,
        mut pit: Option<&mut LineDraft>,
        queued: Vec<QueuedPoint>,
    ) -> Vec<Resolved> {
        let mut resolved = Vec::new();
        let mut pending = queued;

        for draft in std::iter::once(&mut *track).chain(pit.as_deref_mut()) {
            let mut deferred = Vec::new();
            for point in pending {
                match exact_index(&draft.center, point.point) {
                    Some(index) => resolved.push(attach(draft, index, point)),
                    None => deferred.push(point),
                }
            }
            pending = deferred;
        }

        for point in pending {
            let snapped = self.config.snap_tolerance.and_then(|tolerance| {
                std::iter::once(&*track)
                    .chain(pit.as_deref())
                    .find_map(|draft| {
                        nearest_index_within(&draft.center, point.point, tolerance)
                            .map(|index| (draft.kind, index))
                    })
            });

            match snapped {
                Some((kind, index)) => {
                    let draft = match kind {
                        EntityKind::Track => &mut *track,
                        EntityKind::Pit => match pit.as_deref_mut() {
                            Some(pit) => pit,
                            None => continue,
                        },
                    };
                    self.report(Diagnostic::SnappedAnnotation {
                        feature_index: point.feature_index,
                        kind,
                        index,
                        distance: draft.center[index].sub(point.point).length(),
                    });
                    resolved.push(attach(draft, index, point));
                }
                None => self.report(Diagnostic::UnmatchedAnnotation {
                    feature_index: point.feature_index,
                    point: point.point,
                }),
            }
        }

        // Role resolution is first-wins in document order, whichever line a point matched
        resolved.sort_by_key(|r| r.annotation.feature_index);
        debug!("Resolved {} point annotations", resolved.len());
        resolved
    }

    fn resolve_roles(&mut self, resolved: &[Resolved]) -> Roles {
        let mut roles = Roles::default();

        for r in resolved {
            let point = r.annotation.point;
            for tag in &r.annotation.tags {
                match tag {
                    TrackTag::Width(_) | TrackTag::Height(_) | TrackTag::Camber(_) => {}
                    TrackTag::Sector(id) => roles.sectors.push((id.clone(), point)),
                    TrackTag::StartingGrid(role) => {
                        roles.starting_grid.entry(*role).or_insert((r.kind, r.index));
                    }
                    TrackTag::PitStop(role) => match r.kind {
                        EntityKind::Pit => {
                            roles.pit_stop.entry(*role).or_insert(r.index);
                        }
                        EntityKind::Track => self.report(Diagnostic::IgnoredTag {
                            feature_index: r.annotation.feature_index,
                            kind: r.kind,
                            tag: tag.clone(),
                        }),
                    },
                    TrackTag::Drs(role) => roles.drs.entry(*role).or_default().push(point),
                    TrackTag::Raceway(role) => {
                        if role.marks_finish_line() && roles.raceway.is_none() {
                            roles.raceway = Some(point);
                        }
                    }
                }
            }
        }

        roles
    }

    /// Resolve the profile of every index and derive the rails
    fn build_entity(&self, draft: LineDraft) -> Result<TrackEntity, TracksmithError> {
        let closed = draft.kind.is_closed();
        let profile = resolve_profiles(&draft.properties, &draft.annotations, self.config);

        let widths: Vec<f64> = profile
            .iter()
            .map(|p| self.projector.from_meters(p.width))
            .collect();
        let heights: Vec<f64> = profile
            .iter()
            .map(|p| {
                self.projector
                    .from_meters(p.height * self.config.elevation_exaggeration)
            })
            .collect();

        let left = offset_curve(&draft.center, -FRAC_PI_2, Distances::PerIndex(&widths), closed);
        let right = offset_curve(&draft.center, FRAC_PI_2, Distances::PerIndex(&widths), closed);

        if left.len() != draft.center.len() || right.len() != draft.center.len() {
            return Err(TracksmithError::RailLengthMismatch {
                kind: draft.kind,
                center: draft.center.len(),
                left: left.len(),
                right: right.len(),
            });
        }

        let elevate = |way: &[Point2]| -> Way3 {
            way.iter()
                .zip(&heights)
                .map(|(p, z)| p.with_z(*z))
                .collect()
        };

        Ok(TrackEntity {
            kind: draft.kind,
            closed,
            center: elevate(&draft.center),
            left: elevate(&left),
            right: elevate(&right),
            properties: draft.properties,
            annotations: draft.annotations,
            profile,
        })
    }
}

/// Coordinates of the first track centerline in the document
fn locate_centerline(features: &[RawFeature]) -> Result<&[[f64; 2]], TracksmithError> {
    let coords = track_coordinates(features).ok_or(TracksmithError::MissingTrackCenterline)?;

    if coords.len() < 2 {
        return Err(TracksmithError::DegenerateCenterline {
            points: coords.len(),
        });
    }
    Ok(coords)
}

/// Attach a point to `index`, mirroring it onto the other end of a closed ring
fn attach(draft: &mut LineDraft, index: usize, point: QueuedPoint) -> Resolved {
    let annotation = point.into_annotation();
    let last = draft.center.len() - 1;
    let ring = draft.kind.is_closed() && last > 0 && draft.center[0] == draft.center[last];

    if ring && (index == 0 || index == last) {
        let mirror = if index == 0 { last } else { 0 };
        draft.attach(mirror, annotation.clone());
    }
    draft.attach(index, annotation.clone());

    Resolved {
        kind: draft.kind,
        index,
        annotation,
    }
}
