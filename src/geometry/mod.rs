// Planar geometry helpers shared by the track assembler

pub mod offset;

use serde::{Deserialize, Serialize};

pub use offset::{Distances, offset_curve};

/// Ordered sequence of planar points describing a curve, open or closed
pub type Way = Vec<Point2>;

/// Ordered sequence of points carrying an elevation
pub type Way3 = Vec<Point3>;

/// Represents a 2D coordinate point in pixel space
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

impl Point2 {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn add(self, other: Point2) -> Point2 {
        Point2::new(self.x + other.x, self.y + other.y)
    }

    pub fn sub(self, other: Point2) -> Point2 {
        Point2::new(self.x - other.x, self.y - other.y)
    }

    pub fn scale(self, s: f64) -> Point2 {
        Point2::new(self.x * s, self.y * s)
    }

    pub fn length_squared(self) -> f64 {
        self.x * self.x + self.y * self.y
    }

    pub fn length(self) -> f64 {
        self.length_squared().sqrt()
    }

    /// Unit vector with the same direction. A zero vector stays zero.
    pub fn normalize(self) -> Point2 {
        let l = self.length();
        if l == 0.0 {
            self
        } else {
            self.scale(1.0 / l)
        }
    }

    /// Polar angle of the vector, in radians
    pub fn angle(self) -> f64 {
        self.y.atan2(self.x)
    }

    /// Unit vector pointing along `angle`
    pub fn from_angle(angle: f64) -> Point2 {
        Point2::new(angle.cos(), angle.sin())
    }

    pub fn move_polar(self, angle: f64, dist: f64) -> Point2 {
        self.add(Point2::from_angle(angle).scale(dist))
    }

    pub fn distance_squared(self, other: Point2) -> f64 {
        self.sub(other).length_squared()
    }

    pub fn with_z(self, z: f64) -> Point3 {
        Point3::new(self.x, self.y, z)
    }
}

/// Planar point with an elevation, all in pixels
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn xy(self) -> Point2 {
        Point2::new(self.x, self.y)
    }
}

/// Axis-aligned bounds of a set of points
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
}

impl BoundingBox {
    pub fn new() -> Self {
        Self {
            min_x: f64::INFINITY,
            max_x: f64::NEG_INFINITY,
            min_y: f64::INFINITY,
            max_y: f64::NEG_INFINITY,
        }
    }

    pub fn update(&mut self, point: Point2) {
        self.min_x = self.min_x.min(point.x);
        self.max_x = self.max_x.max(point.x);
        self.min_y = self.min_y.min(point.y);
        self.max_y = self.max_y.max(point.y);
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn min_corner(&self) -> Point2 {
        Point2::new(self.min_x, self.min_y)
    }

    pub fn center(&self) -> Point2 {
        Point2::new(
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::new()
    }
}

/// Minimum and maximum of a sequence of values
pub fn limits(values: impl IntoIterator<Item = f64>) -> (f64, f64) {
    values
        .into_iter()
        .fold((f64::MAX, -f64::MAX), |(m, big_m), n| (m.min(n), big_m.max(n)))
}

/// Bounds of a set of planar points
pub fn limits2(points: &[Point2]) -> BoundingBox {
    let (min_x, max_x) = limits(points.iter().map(|p| p.x));
    let (min_y, max_y) = limits(points.iter().map(|p| p.y));
    BoundingBox {
        min_x,
        max_x,
        min_y,
        max_y,
    }
}

/// Clamp a signed index into `0..len`
pub fn clamp_index(i: isize, len: usize) -> usize {
    i.clamp(0, len as isize - 1) as usize
}

/// Wrap a signed index around `0..len`
pub fn wrap_index(i: isize, len: usize) -> usize {
    i.rem_euclid(len as isize) as usize
}

/// Average of angles computed on the unit circle, so that values on both sides of ±π average
/// to ±π instead of 0. Returns `None` for an empty input.
pub fn circular_mean_angle(angles: impl IntoIterator<Item = f64>) -> Option<f64> {
    let mut any = false;
    let sum = angles.into_iter().fold(Point2::default(), |acc, a| {
        any = true;
        acc.add(Point2::from_angle(a))
    });
    any.then(|| sum.angle())
}

/// Index of the way point closest to `point`. Stops at the first exact match, ties keep the
/// lowest index. Returns `None` only for an empty way.
pub fn nearest_index(way: &[Point2], point: Point2) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, p) in way.iter().enumerate() {
        let d = p.distance_squared(point);
        if d == 0.0 {
            return Some(i);
        }
        if best.is_none_or(|(_, best_d)| d < best_d) {
            best = Some((i, d));
        }
    }
    best.map(|(i, _)| i)
}

/// Like [`nearest_index`] but only accepts points at most `tolerance` away
pub fn nearest_index_within(way: &[Point2], point: Point2, tolerance: f64) -> Option<usize> {
    nearest_index(way, point).filter(|&i| way[i].distance_squared(point) <= tolerance * tolerance)
}

/// Index of the first way point with exactly the same coordinates
pub fn exact_index(way: &[Point2], point: Point2) -> Option<usize> {
    way.iter().position(|p| *p == point)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::f64::consts::PI;

    fn square() -> Way {
        vec![
            Point2::new(0.0, 0.0),
            Point2::new(10.0, 0.0),
            Point2::new(10.0, 10.0),
            Point2::new(0.0, 10.0),
        ]
    }

    #[test]
    fn test_vector_ops() {
        let a = Point2::new(3.0, 4.0);
        let b = Point2::new(1.0, 1.0);
        assert_eq!(a.add(b), Point2::new(4.0, 5.0));
        assert_eq!(a.sub(b), Point2::new(2.0, 3.0));
        assert_eq!(a.scale(2.0), Point2::new(6.0, 8.0));
        assert_eq!(a.length(), 5.0);
        assert!((a.normalize().length() - 1.0).abs() < 1e-12);
        assert_eq!(Point2::default().normalize(), Point2::default());
    }

    #[test]
    fn test_move_polar() {
        let p = Point2::new(1.0, 1.0).move_polar(PI / 2.0, 2.0);
        assert!((p.x - 1.0).abs() < 1e-12);
        assert!((p.y - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_limits_and_bounds() {
        assert_eq!(limits([3.0, -1.0, 7.0]), (-1.0, 7.0));
        let bbox = limits2(&square());
        assert_eq!(bbox.width(), 10.0);
        assert_eq!(bbox.height(), 10.0);
        assert_eq!(bbox.min_corner(), Point2::new(0.0, 0.0));
        assert_eq!(bbox.center(), Point2::new(5.0, 5.0));
    }

    #[test]
    fn test_bounding_box_update_matches_limits() {
        let mut bbox = BoundingBox::new();
        for p in square() {
            bbox.update(p);
        }
        assert_eq!(bbox, limits2(&square()));
    }

    #[test]
    fn test_index_helpers() {
        assert_eq!(wrap_index(-1, 5), 4);
        assert_eq!(wrap_index(5, 5), 0);
        assert_eq!(wrap_index(-7, 5), 3);
        assert_eq!(clamp_index(-1, 5), 0);
        assert_eq!(clamp_index(9, 5), 4);
    }

    #[test]
    fn test_circular_mean_across_pi() {
        let mean = circular_mean_angle([PI - 0.1, -PI + 0.1]).unwrap();
        // arithmetic mean would be 0, the circular mean points backwards
        assert!((mean.abs() - PI).abs() < 1e-9);
        assert!(circular_mean_angle([]).is_none());
        assert!((circular_mean_angle([0.3]).unwrap() - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_nearest_index() {
        let way = square();
        assert_eq!(nearest_index(&way, Point2::new(9.0, 1.0)), Some(1));
        assert_eq!(nearest_index(&way, Point2::new(0.0, 10.0)), Some(3));
        assert_eq!(nearest_index(&[], Point2::default()), None);
    }

    #[test]
    fn test_nearest_index_ties_keep_first() {
        let way = square();
        // equidistant from indices 0 and 1
        assert_eq!(nearest_index(&way, Point2::new(5.0, -1.0)), Some(0));
    }

    #[test]
    fn test_nearest_index_within_tolerance() {
        let way = square();
        assert_eq!(nearest_index_within(&way, Point2::new(10.5, 0.0), 1.0), Some(1));
        assert_eq!(nearest_index_within(&way, Point2::new(12.0, 0.0), 1.0), None);
    }

    #[test]
    fn test_exact_index() {
        let way = square();
        assert_eq!(exact_index(&way, Point2::new(10.0, 10.0)), Some(2));
        assert_eq!(exact_index(&way, Point2::new(10.0, 10.000001)), None);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn prop_nearest_index_finds_own_point(
            coords in prop::collection::vec((-1000.0f64..1000.0, -1000.0f64..1000.0), 1..50),
        ) {
            let mut way: Way = Vec::new();
            for (x, y) in coords {
                let p = Point2::new(x, y);
                if !way.contains(&p) {
                    way.push(p);
                }
            }
            for (i, p) in way.iter().enumerate() {
                prop_assert_eq!(nearest_index(&way, *p), Some(i));
            }
        }

        #[test]
        fn prop_circular_mean_of_equal_angles(angle in -PI..PI, n in 1usize..10) {
            let mean = circular_mean_angle(std::iter::repeat_n(angle, n)).unwrap();
            let diff = (mean - angle).rem_euclid(2.0 * PI);
            prop_assert!(diff < 1e-9 || (2.0 * PI - diff) < 1e-9);
        }
    }
}
