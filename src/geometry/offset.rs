// Variable distance offset curves, used to derive the rails of a centerline

use super::{Point2, Way, circular_mean_angle, clamp_index, wrap_index};

/// Offset distance, either shared by all points or given per index
#[derive(Debug, Clone, Copy)]
pub enum Distances<'a> {
    Uniform(f64),
    PerIndex(&'a [f64]),
}

impl Distances<'_> {
    /// Distance for index `i`. A per-index list shorter than the way repeats its last value.
    fn at(&self, i: usize) -> f64 {
        match self {
            Distances::Uniform(d) => *d,
            Distances::PerIndex(ds) => ds
                .get(i)
                .or_else(|| ds.last())
                .copied()
                .unwrap_or(0.0),
        }
    }
}

/// Offset every point of `way` by `distances[i]` along the local tangent rotated by
/// `angle_offset` (use `-π/2` for the left rail and `π/2` for the right one).
///
/// The tangent at `i` is the circular mean of the incoming (`i-1 → i`) and outgoing
/// (`i → i+1`) directions. Closed ways wrap around, open ways clamp at the ends so the end
/// points take the direction of their only segment. When a segment has zero length (duplicate
/// points, e.g. a pit lane touching the track) the segment to the point two positions away is
/// used instead, and a segment that is still degenerate is left out of the mean.
pub fn offset_curve(way: &[Point2], angle_offset: f64, distances: Distances, closed: bool) -> Way {
    let len = way.len();
    let idx = |i: isize| {
        if closed {
            wrap_index(i, len)
        } else {
            clamp_index(i, len)
        }
    };

    (0..len)
        .map(|i| {
            let curr = way[i];
            let signed = i as isize;

            let incoming = segment_direction(way[idx(signed - 1)], curr)
                .or_else(|| segment_direction(way[idx(signed - 2)], curr));
            let outgoing = segment_direction(curr, way[idx(signed + 1)])
                .or_else(|| segment_direction(curr, way[idx(signed + 2)]));

            let tangent = circular_mean_angle(incoming.into_iter().chain(outgoing)).unwrap_or(0.0);
            curr.move_polar(tangent + angle_offset, distances.at(i))
        })
        .collect()
}

/// Direction angle from `from` to `to`, `None` when both points coincide
fn segment_direction(from: Point2, to: Point2) -> Option<f64> {
    let d = to.sub(from);
    if d.length_squared() == 0.0 {
        None
    } else {
        Some(d.angle())
    }
}
