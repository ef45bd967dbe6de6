// src/neighbors.rs - Ranked nearest-neighbor candidates per point

use std::cmp::Ordering;

use crate::errors::{DotAnalyzerError, Result};
use crate::geometry::{bearing, distance, Point};

/// One ranked candidate neighbor of a target point
#[derive(Debug, Clone, Copy)]
pub struct NeighborEntry {
    pub index: usize,
    pub distance: f64,
    pub bearing: f64,
}

/// The K nearest candidates of one point, ascending by distance.
/// Ties are broken by original index so the ranking is deterministic.
#[derive(Debug, Clone)]
pub struct NeighborRecord {
    pub target: usize,
    pub entries: Vec<NeighborEntry>,
}

/// Rank every other point by distance from the target and keep the first K
pub fn rank_neighbors(points: &[Point], target: usize, k: usize) -> Result<NeighborRecord> {
    let available = points.len().saturating_sub(1);
    if available < k {
        return Err(DotAnalyzerError::InsufficientPoints {
            required: k,
            available,
        });
    }

    let origin = points[target];
    let mut candidates: Vec<NeighborEntry> = points
        .iter()
        .enumerate()
        .filter(|(index, _)| *index != target)
        .map(|(index, &q)| NeighborEntry {
            index,
            distance: distance(origin, q),
            bearing: bearing(origin, q),
        })
        .collect();

    candidates.sort_by(|a, b| {
        a.distance
            .partial_cmp(&b.distance)
            .unwrap_or(Ordering::Equal)
            .then(a.index.cmp(&b.index))
    });
    candidates.truncate(k);

    Ok(NeighborRecord {
        target,
        entries: candidates,
    })
}

/// Rank the neighbors of every point in the set
pub fn rank_all_neighbors(points: &[Point], k: usize) -> Result<Vec<NeighborRecord>> {
    (0..points.len())
        .map(|target| rank_neighbors(points, target, k))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn ranks_by_distance_with_index_tie_break() {
        let points = vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(0.0, 1.0),
            Point::new(5.0, 5.0),
        ];
        let record = rank_neighbors(&points, 0, 3).unwrap();
        let indices: Vec<usize> = record.entries.iter().map(|e| e.index).collect();
        assert_eq!(indices, vec![1, 2, 3]);
        assert_approx_eq!(record.entries[0].distance, 1.0);
        assert_approx_eq!(record.entries[1].distance, 1.0);
        assert_approx_eq!(record.entries[2].distance, 50.0f64.sqrt());
    }

    #[test]
    fn bearing_points_from_neighbor_to_target() {
        let points = vec![Point::new(0.0, 0.0), Point::new(1.0, 0.0)];
        let record = rank_neighbors(&points, 0, 1).unwrap();
        // Vector target - neighbor = (-1, 0)
        assert_approx_eq!(record.entries[0].bearing, std::f64::consts::PI);
    }

    #[test]
    fn too_few_points_is_an_error() {
        let points = vec![Point::new(0.0, 0.0), Point::new(1.0, 0.0)];
        let result = rank_neighbors(&points, 0, 12);
        assert!(matches!(
            result,
            Err(DotAnalyzerError::InsufficientPoints {
                required: 12,
                available: 1
            })
        ));
    }

    #[test]
    fn all_records_cover_the_point_set() {
        let points = vec![
            Point::new(0.0, 0.0),
            Point::new(2.0, 0.0),
            Point::new(4.0, 0.0),
        ];
        let records = rank_all_neighbors(&points, 2).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[1].entries[0].index, 0);
        assert_eq!(records[1].entries[1].index, 2);
    }
}
