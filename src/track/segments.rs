// Sector and DRS zone cutting over the closed track centerline

use itertools::Itertools;

use crate::geometry::Way3;

use super::model::{DrsZone, Sector};

/// Sector marker resolved to a track centerline index
#[derive(Debug, Clone, PartialEq)]
pub struct SectorMarker {
    pub id: String,
    pub index: usize,
}

/// Whether the first and last points of a way are the same location
pub fn is_ring(way: &Way3) -> bool {
    match (way.first(), way.last()) {
        (Some(first), Some(last)) if way.len() > 1 => first.xy() == last.xy(),
        _ => false,
    }
}

/// Forward sub-sequence of `way` from `start` to `end`, both included, wrapping past the last
/// index. `start == end` yields a single point unless `full_lap` is set, in which case the whole
/// loop is walked back to `start`. On a ring the duplicated endpoint is only visited once.
pub fn forward_slice(way: &Way3, start: usize, end: usize, ring: bool, full_lap: bool) -> Way3 {
    if way.is_empty() {
        return Vec::new();
    }
    let last = way.len() - 1;
    let (start, end) = (start.min(last), end.min(last));

    if start < end || (start == end && !full_lap) {
        return way[start..=end].to_vec();
    }

    let resume = if ring { 1 } else { 0 };
    let mut out = way[start..].to_vec();
    if resume <= end {
        out.extend_from_slice(&way[resume..=end]);
    }
    out
}

/// Cut the sectors of the track. Markers are ordered by id (numerically when every id is a
/// number), each sector runs from its marker to the next one and the last wraps to the first.
/// Output ids are renumbered from 1.
pub fn cut_sectors(center: &Way3, markers: &[SectorMarker], ring: bool) -> Vec<Sector> {
    if center.is_empty() {
        return Vec::new();
    }
    if markers.is_empty() {
        return vec![Sector {
            id: "1".to_string(),
            start: 0,
            end: center.len() - 1,
            center: center.clone(),
        }];
    }

    let numeric: Option<Vec<f64>> = markers.iter().map(|m| m.id.parse::<f64>().ok()).collect();
    let ordered = match numeric {
        Some(keys) => markers
            .iter()
            .zip(keys)
            .sorted_by(|(_, a), (_, b)| a.total_cmp(b))
            .map(|(m, _)| m)
            .collect_vec(),
        None => markers.iter().sorted_by(|a, b| a.id.cmp(&b.id)).collect_vec(),
    };

    let full_lap = ordered.len() == 1;
    ordered
        .iter()
        .enumerate()
        .map(|(i, marker)| {
            let next = ordered[(i + 1) % ordered.len()];
            Sector {
                id: (i + 1).to_string(),
                start: marker.index,
                end: next.index,
                center: forward_slice(center, marker.index, next.index, ring, full_lap),
            }
        })
        .collect()
}

/// First value of a sorted list that is at least `x`, wrapping to the smallest value when there
/// is none. Same result as rotating the list until its head is `>= x`.
pub fn circular_successor(sorted: &[usize], x: usize) -> Option<usize> {
    sorted
        .iter()
        .find(|&&v| v >= x)
        .or_else(|| sorted.first())
        .copied()
}

/// Pair every detection index with the next start index and the finish index following that
/// start, producing one zone per detection point.
pub fn pair_drs_zones(
    center: &Way3,
    detects: &[usize],
    starts: &[usize],
    finishes: &[usize],
    ring: bool,
) -> Vec<DrsZone> {
    let starts = starts.iter().copied().sorted().collect_vec();
    let finishes = finishes.iter().copied().sorted().collect_vec();

    detects
        .iter()
        .copied()
        .sorted()
        .filter_map(|detect| {
            let start = circular_successor(&starts, detect)?;
            let finish = circular_successor(&finishes, start)?;
            Some(DrsZone {
                detect,
                detect_point: *center.get(detect)?,
                start,
                finish,
                center: forward_slice(center, start, finish, ring, false),
            })
        })
        .collect()
}
