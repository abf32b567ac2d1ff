// Geographic projection from WGS84 longitude/latitude to planar pixel space

use std::f64::consts::PI;

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use uom::si::f64::Length;
use uom::si::length::kilometer;

use crate::geometry::Point2;

/// Size of a map tile edge in pixels at zoom 0
pub const TILE_DIM: f64 = 256.0;

/// Pixels per meter per zoom unit. Not derived from the projection, it was tuned by
/// eye against reference circuits and is kept as the default scale.
pub const ZOOM_TO_METERS: f64 = 0.000003;

/// Mean earth radius (km) at 39 degrees from the equator
const EARTH_RADIUS_KM: f64 = 6373.0;

/// Project a `[longitude, latitude]` pair (degrees) to pixel space at the given zoom level.
///
/// Longitude maps linearly to `x`, latitude goes through the Mercator stretch
/// `ln(tan(π/4 + φ/2))`. Both axes are normalized to `[0, 1]` and scaled by `256 * 2^zoom`.
/// The vertical axis is inverted so that north points up in a top-down pixel system.
///
/// Latitudes close to ±90° diverge and must not be passed in.
pub fn project(coord: [f64; 2], zoom: u8) -> Point2 {
    let [lon, lat] = coord;
    let lambda = PI * lon / 180.0;
    let phi = PI * lat / 180.0;

    // [-π, π] on both axes
    let x = lambda;
    let y = (PI / 4.0 + phi / 2.0).tan().ln();

    // [0, 1] on both axes
    let x = (x + PI) / (2.0 * PI);
    let y = (y + PI) / (2.0 * PI);

    let scale = tiles_per_dim(zoom) * TILE_DIM;
    Point2::new(x * scale, -(y * scale))
}

fn tiles_per_dim(zoom: u8) -> f64 {
    2f64.powi(zoom as i32)
}

/// Projector bound to a zoom level, also owning the meters to pixels conversion for that zoom
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Projector {
    zoom: u8,
    meters_scale: f64,
}

impl Projector {
    pub fn new(zoom: u8) -> Self {
        Self::with_meters_scale(zoom, ZOOM_TO_METERS)
    }

    pub fn with_meters_scale(zoom: u8, meters_scale: f64) -> Self {
        Self { zoom, meters_scale }
    }

    pub fn zoom(&self) -> u8 {
        self.zoom
    }

    pub fn project(&self, coord: [f64; 2]) -> Point2 {
        project(coord, self.zoom)
    }

    /// Convert a real-world distance in meters to pixels at this projector's zoom
    pub fn from_meters(&self, meters: f64) -> f64 {
        meters * tiles_per_dim(self.zoom) * self.meters_scale
    }
}

/// Great-circle distance between two `[longitude, latitude]` pairs
pub fn haversine_distance(a: [f64; 2], b: [f64; 2]) -> Length {
    let lat1 = a[1].to_radians();
    let lon1 = a[0].to_radians();
    let lat2 = b[1].to_radians();
    let lon2 = b[0].to_radians();

    let dlat = lat2 - lat1;
    let dlon = lon2 - lon1;

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    Length::new::<kilometer>(c * EARTH_RADIUS_KM)
}

/// Length of a polyline of `[longitude, latitude]` pairs, summed over consecutive segments
pub fn way_length(coords: &[[f64; 2]]) -> Length {
    coords
        .iter()
        .tuple_windows()
        .map(|(a, b)| haversine_distance(*a, *b))
        .fold(Length::new::<kilometer>(0.0), |acc, d| acc + d)
}
