// src/correlation.rs - Radius-function estimators over the full point set:
// Ripley's K / Besag's L, the pair correlation function and the
// bond-orientational correlation function

use rayon::prelude::*;
use serde::Serialize;
use std::f64::consts::PI;

use crate::errors::{DotAnalyzerError, Result};
use crate::fitting::{fit_exponential, ExponentialFit};
use crate::geometry::{
    distance, epanechnikov_kernel, kernel_bandwidth, window_weight, Calibration, Point, Window,
};

/// One sample of a function of radius, in physical units
#[derive(Debug, Clone, Copy, Serialize)]
pub struct RadiusSample {
    pub radius: f64,
    pub value: f64,
}

/// Reference level of the pair correlation under complete spatial randomness;
/// callers chart it alongside g(r)
pub const PAIR_CORRELATION_REFERENCE: f64 = 1.0;

/// Neighbor bearings considered per point by the bond-orientational estimator
const MAX_BEARINGS: usize = 6;

/// Cross pairs of bearings per qualifying point pair
const CROSS_PAIR_NORM: f64 = 36.0;

/// Raw bond-orientational samples plus the exponential decay fit when it
/// converged; `fit` stays `None` on a failed fit and the samples survive
#[derive(Debug, Clone)]
pub struct BondOrientationResult {
    pub samples: Vec<RadiusSample>,
    pub fit: Option<ExponentialFit>,
}

fn ensure_pair_capable(point_count: usize) -> Result<()> {
    if point_count < 2 {
        return Err(DotAnalyzerError::InsufficientPoints {
            required: 1,
            available: point_count.saturating_sub(1),
        });
    }
    Ok(())
}

/// Ripley's K function (Ripley 1981), or Besag's variance-stabilized
/// L(r) = sqrt(K(r)/pi) - r when `besag_transform` is set. L is zero for a
/// Poisson pattern, positive for clustering, negative for ordered packing.
///
/// The accumulation runs in pixel units; the radius axis scales by the
/// calibration factor afterwards, L by the same factor and K by its square so
/// both stay dimensionally consistent.
pub fn ripley_k_function(
    points: &[Point],
    window: &Window,
    calibration: &Calibration,
    besag_transform: bool,
    resolution: u32,
    parallel: bool,
) -> Result<Vec<RadiusSample>> {
    ensure_pair_capable(points.len())?;
    window.validate()?;
    if resolution == 0 {
        return Err(DotAnalyzerError::Config(
            "radius resolution must be > 0".to_string(),
        ));
    }

    let n = points.len() as f64;
    let normalization = window.area() / (n * (n - 1.0));
    let bins = window.min_dimension().floor() as u32 * resolution;
    let factor = calibration.nm_per_pixel();

    let sample_bin = |t: u32| -> RadiusSample {
        let r = (t + 1) as f64 / resolution as f64;
        let mut weighted_sum = 0.0;
        for (i, &p) in points.iter().enumerate() {
            let weight = window_weight(p, window, r);
            if weight == 0.0 {
                continue;
            }
            let mut inside = 0usize;
            for (j, &q) in points.iter().enumerate() {
                if j != i && distance(p, q) <= r {
                    inside += 1;
                }
            }
            weighted_sum += weight * inside as f64;
        }
        let k = normalization * weighted_sum;
        if besag_transform {
            RadiusSample {
                radius: r * factor,
                value: ((k / PI).sqrt() - r) * factor,
            }
        } else {
            RadiusSample {
                radius: r * factor,
                value: k * factor * factor,
            }
        }
    };

    let samples = if parallel {
        (0..bins).into_par_iter().map(&sample_bin).collect()
    } else {
        (0..bins).map(&sample_bin).collect()
    };
    Ok(samples)
}

/// Kernel-density pair correlation g(r) with Stoyan's rectangular edge
/// correction (Penttinen et al. 1992; Stoyan et al. 1987). g(r) settles at 1
/// for complete spatial randomness; a peak near the typical spacing signals
/// short-range order. Bins where the edge correction degenerates are dropped.
pub fn pair_correlation_function(
    points: &[Point],
    window: &Window,
    calibration: &Calibration,
    resolution: u32,
    parallel: bool,
) -> Result<Vec<RadiusSample>> {
    ensure_pair_capable(points.len())?;
    window.validate()?;
    if resolution == 0 {
        return Err(DotAnalyzerError::Config(
            "radius resolution must be > 0".to_string(),
        ));
    }

    let n = points.len() as f64;
    let area = window.area();
    let inv_lambda = area / n;
    let bandwidth = kernel_bandwidth(window, points.len());
    if !(bandwidth > 0.0) {
        return Err(DotAnalyzerError::Other(
            "kernel bandwidth collapsed to zero".to_string(),
        ));
    }
    let bins = window.min_dimension().floor() as u32 * resolution;
    let factor = calibration.nm_per_pixel();

    let sample_bin = |t: u32| -> Option<RadiusSample> {
        let r = t as f64 / resolution as f64;
        let edge_correction = area - r * (2.0 * (window.width + window.height) - r) / PI;
        if r <= 0.0 || edge_correction <= 0.0 {
            return None;
        }
        let mut kernel_sum = 0.0;
        for (i, &p) in points.iter().enumerate() {
            for (j, &q) in points.iter().enumerate() {
                if j != i {
                    kernel_sum += epanechnikov_kernel(distance(p, q), r, bandwidth);
                }
            }
        }
        let g = kernel_sum * inv_lambda * inv_lambda / (2.0 * PI * r * edge_correction);
        Some(RadiusSample {
            radius: r * factor,
            value: g,
        })
    };

    let samples: Vec<Option<RadiusSample>> = if parallel {
        (1..bins).into_par_iter().map(&sample_bin).collect()
    } else {
        (1..bins).map(&sample_bin).collect()
    };
    Ok(samples.into_iter().flatten().collect())
}

/// Bond-orientational correlation g6(r) over integer pixel radius bins, with
/// an exponential decay fit on the retained samples.
///
/// For every unordered pair within the kernel bandwidth of the bin radius,
/// cross pairs of the two points' confirmed neighbor bearings (ranked order,
/// at most six per point) contribute |cos(6 * (theta_j - theta_i))|. A point
/// whose truncated bearing list repeats a value is degenerate and contributes
/// to no orientation sum, though its pairs still count toward the bin.
/// Empty and zero-valued bins are dropped, not zero-padded.
pub fn bond_orientational_correlation(
    points: &[Point],
    window: &Window,
    calibration: &Calibration,
    bearings: &[Vec<f64>],
    parallel: bool,
) -> Result<BondOrientationResult> {
    ensure_pair_capable(points.len())?;
    window.validate()?;
    if bearings.len() != points.len() {
        return Err(DotAnalyzerError::InvalidSegmentation(format!(
            "{} bearing lists for {} points",
            bearings.len(),
            points.len()
        )));
    }

    let bandwidth = kernel_bandwidth(window, points.len());
    if !(bandwidth > 0.0) {
        return Err(DotAnalyzerError::Other(
            "kernel bandwidth collapsed to zero".to_string(),
        ));
    }

    let truncated: Vec<&[f64]> = bearings
        .iter()
        .map(|list| &list[..list.len().min(MAX_BEARINGS)])
        .collect();
    let degenerate: Vec<bool> = truncated
        .iter()
        .map(|list| has_repeated_value(list))
        .collect();

    let bins = window.min_dimension().floor() as usize;
    let factor = calibration.nm_per_pixel();

    let sample_bin = |radius_px: usize| -> Option<RadiusSample> {
        let target = radius_px as f64;
        let mut pair_count = 0usize;
        let mut orientation_sum = 0.0;
        for i in 0..points.len() {
            for j in (i + 1)..points.len() {
                if (distance(points[i], points[j]) - target).abs() >= bandwidth {
                    continue;
                }
                pair_count += 1;
                if degenerate[i] || degenerate[j] {
                    continue;
                }
                for &theta_i in truncated[i] {
                    for &theta_j in truncated[j] {
                        orientation_sum += (6.0 * (theta_j - theta_i)).cos().abs();
                    }
                }
            }
        }
        if pair_count == 0 {
            return None;
        }
        let value = orientation_sum / pair_count as f64 / CROSS_PAIR_NORM;
        if value == 0.0 {
            return None;
        }
        Some(RadiusSample {
            radius: target * factor,
            value,
        })
    };

    let raw: Vec<Option<RadiusSample>> = if parallel {
        (1..bins).into_par_iter().map(&sample_bin).collect()
    } else {
        (1..bins).map(&sample_bin).collect()
    };
    let samples: Vec<RadiusSample> = raw.into_iter().flatten().collect();

    let xs: Vec<f64> = samples.iter().map(|s| s.radius).collect();
    let ys: Vec<f64> = samples.iter().map(|s| s.value).collect();
    let fit = fit_exponential(&xs, &ys).ok();

    Ok(BondOrientationResult { samples, fit })
}

fn has_repeated_value(values: &[f64]) -> bool {
    for (index, &a) in values.iter().enumerate() {
        for &b in &values[index + 1..] {
            if a == b {
                return true;
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn unit_window(side: f64) -> Window {
        Window::new(side, side).unwrap()
    }

    #[test]
    fn single_point_is_insufficient() {
        let points = vec![Point::new(5.0, 5.0)];
        let result = ripley_k_function(
            &points,
            &unit_window(10.0),
            &Calibration::identity(),
            true,
            1,
            false,
        );
        assert!(matches!(
            result,
            Err(DotAnalyzerError::InsufficientPoints { .. })
        ));
    }

    #[test]
    fn isolated_pair_yields_negative_l_at_small_radii() {
        // Two points far apart in a large window: no neighbor within small r,
        // so K = 0 and L(r) = -r
        let points = vec![Point::new(30.0, 30.0), Point::new(70.0, 70.0)];
        let samples = ripley_k_function(
            &points,
            &unit_window(100.0),
            &Calibration::identity(),
            true,
            1,
            false,
        )
        .unwrap();
        assert_approx_eq!(samples[0].radius, 1.0);
        assert_approx_eq!(samples[0].value, -1.0, 1e-12);
        assert_approx_eq!(samples[9].value, -10.0, 1e-12);
    }

    #[test]
    fn radius_axis_is_calibrated() {
        let points = vec![Point::new(30.0, 30.0), Point::new(70.0, 70.0)];
        let calibration = Calibration::new(200.0, 100.0).unwrap();
        let samples = ripley_k_function(
            &points,
            &unit_window(100.0),
            &calibration,
            true,
            1,
            false,
        )
        .unwrap();
        assert_approx_eq!(samples[0].radius, 2.0);
        assert_approx_eq!(samples[0].value, -2.0, 1e-12);
    }

    #[test]
    fn parallel_and_serial_bins_agree() {
        let points = vec![
            Point::new(20.0, 20.0),
            Point::new(40.0, 25.0),
            Point::new(30.0, 45.0),
            Point::new(55.0, 50.0),
            Point::new(60.0, 22.0),
        ];
        let window = unit_window(80.0);
        let serial = ripley_k_function(&points, &window, &Calibration::identity(), true, 1, false)
            .unwrap();
        let parallel = ripley_k_function(&points, &window, &Calibration::identity(), true, 1, true)
            .unwrap();
        assert_eq!(serial.len(), parallel.len());
        for (s, p) in serial.iter().zip(&parallel) {
            assert_approx_eq!(s.radius, p.radius, 1e-12);
            assert_approx_eq!(s.value, p.value, 1e-12);
        }
    }

    #[test]
    fn pair_correlation_vanishes_outside_the_kernel_band() {
        let points = vec![Point::new(45.0, 50.0), Point::new(55.0, 50.0)];
        let samples = pair_correlation_function(
            &points,
            &unit_window(100.0),
            &Calibration::identity(),
            1,
            false,
        )
        .unwrap();
        // Samples start at r = 1
        assert_approx_eq!(samples[0].radius, 1.0);
        // The pair sits at distance 10; bandwidth is 0.15 * sqrt(5000) ~ 10.6
        assert!(samples[9].value > 0.0);
        assert!(samples[9].value > samples[19].value);
        // Beyond distance + bandwidth the kernel sees nothing
        assert_approx_eq!(samples[30].value, 0.0, 1e-12);
    }

    #[test]
    fn bond_orientation_bins_follow_the_kernel_band() {
        // Two points 5 px apart, one bearing each; bandwidth is
        // 0.15 * sqrt(400/2) ~ 2.12, so bins 3..=7 qualify with value 1/36
        let points = vec![Point::new(5.0, 10.0), Point::new(10.0, 10.0)];
        let bearings = vec![vec![0.0], vec![PI]];
        let result = bond_orientational_correlation(
            &points,
            &unit_window(20.0),
            &Calibration::identity(),
            &bearings,
            false,
        )
        .unwrap();
        let radii: Vec<f64> = result.samples.iter().map(|s| s.radius).collect();
        assert_eq!(radii, vec![3.0, 4.0, 5.0, 6.0, 7.0]);
        for sample in &result.samples {
            assert_approx_eq!(sample.value, 1.0 / 36.0, 1e-12);
        }
        // Constant samples fit a flat exponential
        let fit = result.fit.unwrap();
        assert_approx_eq!(fit.a, 1.0 / 36.0, 1e-9);
        assert_approx_eq!(fit.b, 0.0, 1e-9);
    }

    #[test]
    fn degenerate_bearing_list_contributes_nothing() {
        let points = vec![Point::new(5.0, 10.0), Point::new(10.0, 10.0)];
        let bearings = vec![vec![0.0], vec![0.2, 0.2]];
        let result = bond_orientational_correlation(
            &points,
            &unit_window(20.0),
            &Calibration::identity(),
            &bearings,
            false,
        )
        .unwrap();
        assert!(result.samples.is_empty());
        assert!(result.fit.is_none());
    }

    #[test]
    fn mismatched_bearing_lists_are_rejected() {
        let points = vec![Point::new(5.0, 10.0), Point::new(10.0, 10.0)];
        let result = bond_orientational_correlation(
            &points,
            &unit_window(20.0),
            &Calibration::identity(),
            &[vec![0.0]],
            false,
        );
        assert!(matches!(
            result,
            Err(DotAnalyzerError::InvalidSegmentation(_))
        ));
    }
}
