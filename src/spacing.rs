// src/spacing.rs - Mean spacing and hexatic order over the confirmed neighbor graph

use serde::Serialize;

use crate::adjacency::{AdjacencyEdge, ConfirmedNeighbors};
use crate::geometry::Calibration;

/// Aggregate spacing and order statistics for one image
#[derive(Debug, Clone, Serialize)]
pub struct AggregateResult {
    pub edge_count: usize,
    pub mean_spacing_nm: f64,
    pub stdev_nm: f64,
    pub stderror_nm: f64,
    /// Global hexatic order parameter phi6
    pub order_parameter: f64,
    /// Set when no non-boundary confirmed edge exists; the zeroed result is
    /// still a valid outcome (an all-boundary image is legal input)
    pub no_valid_edges: bool,
}

/// Accumulate the deduplicated non-boundary edges into spacing statistics and
/// the per-point hexatic order into the global phi6.
///
/// Spacing is accumulated in pixel units and converted once at the end.
/// psi6 of a point is |sum over its M confirmed bearings of exp(6 i theta)| / M,
/// M being the local coordination count; phi6 averages psi6 over non-boundary
/// points that have at least one confirmed neighbor.
pub fn aggregate_spacing_and_order(
    edges: &[AdjacencyEdge],
    confirmed: &ConfirmedNeighbors,
    boundary: &[bool],
    calibration: &Calibration,
) -> AggregateResult {
    let mut sum_dist = 0.0;
    let mut sum_sq_dist = 0.0;
    for edge in edges {
        sum_dist += edge.distance;
        sum_sq_dist += edge.distance * edge.distance;
    }
    let count = edges.len();

    let mut phi = 0.0;
    let mut contributing_points = 0usize;
    for (index, entries) in confirmed.entries.iter().enumerate() {
        if boundary[index] || entries.is_empty() {
            continue;
        }
        let mut psi_real = 0.0;
        let mut psi_imag = 0.0;
        for entry in entries {
            psi_real += (6.0 * entry.bearing).cos();
            psi_imag += (6.0 * entry.bearing).sin();
        }
        let coordination = entries.len() as f64;
        phi += (psi_real * psi_real + psi_imag * psi_imag).sqrt() / coordination;
        contributing_points += 1;
    }
    let order_parameter = if contributing_points > 0 {
        phi / contributing_points as f64
    } else {
        0.0
    };

    if count == 0 {
        return AggregateResult {
            edge_count: 0,
            mean_spacing_nm: 0.0,
            stdev_nm: 0.0,
            stderror_nm: 0.0,
            order_parameter,
            no_valid_edges: true,
        };
    }

    let n = count as f64;
    let mean_px = sum_dist / n;
    // Rounding can leave a tiny negative residue under the square root
    let variance_px = ((sum_sq_dist - n * mean_px * mean_px) / n).max(0.0);
    let stdev_nm = calibration.to_physical(variance_px.sqrt());

    AggregateResult {
        edge_count: count,
        mean_spacing_nm: calibration.to_physical(mean_px),
        stdev_nm,
        stderror_nm: stdev_nm / n.sqrt(),
        order_parameter,
        no_valid_edges: false,
    }
}
