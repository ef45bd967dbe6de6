// src/geometry.rs - Geometry primitives shared by the spacing and correlation estimators

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::errors::{DotAnalyzerError, Result};

/// Factor applied to sqrt(mean area per point) to obtain the kernel bandwidth
pub const BANDWIDTH_FACTOR: f64 = 0.15;

/// A particle centroid in pixel coordinates. Identity is its index in the input sequence.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// The rectangular sampling domain, in pixel units
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct Window {
    pub width: f64,
    pub height: f64,
}

impl Window {
    pub fn new(width: f64, height: f64) -> Result<Self> {
        let window = Self { width, height };
        window.validate()?;
        Ok(window)
    }

    /// Reject windows that cannot define edge corrections
    pub fn validate(&self) -> Result<()> {
        if !(self.width > 0.0) || !(self.height > 0.0)
            || !self.width.is_finite() || !self.height.is_finite()
        {
            return Err(DotAnalyzerError::DegenerateWindow {
                width: self.width,
                height: self.height,
            });
        }
        Ok(())
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    pub fn min_dimension(&self) -> f64 {
        self.width.min(self.height)
    }
}

/// Pixel to physical unit conversion (nm per pixel), built from a measured scale bar
#[derive(Debug, Clone, Copy)]
pub struct Calibration {
    nm_per_pixel: f64,
}

impl Calibration {
    pub fn new(known_distance_nm: f64, measured_distance_px: f64) -> Result<Self> {
        if !(known_distance_nm > 0.0) || !known_distance_nm.is_finite()
            || !(measured_distance_px > 0.0) || !measured_distance_px.is_finite()
        {
            return Err(DotAnalyzerError::InvalidCalibration {
                known_nm: known_distance_nm,
                measured_px: measured_distance_px,
            });
        }
        Ok(Self {
            nm_per_pixel: known_distance_nm / measured_distance_px,
        })
    }

    /// Calibration that leaves pixel values unchanged
    pub fn identity() -> Self {
        Self { nm_per_pixel: 1.0 }
    }

    pub fn nm_per_pixel(&self) -> f64 {
        self.nm_per_pixel
    }

    pub fn to_physical(&self, pixels: f64) -> f64 {
        pixels * self.nm_per_pixel
    }

    pub fn to_pixels(&self, nm: f64) -> f64 {
        nm / self.nm_per_pixel
    }
}

/// Euclidean distance between two centroids
pub fn distance(p: Point, q: Point) -> f64 {
    Vector2::new(p.x - q.x, p.y - q.y).norm()
}

/// Angle of the vector p - q, in (-pi, pi]. Not symmetric: bearing(p, q) and
/// bearing(q, p) differ by pi.
pub fn bearing(p: Point, q: Point) -> f64 {
    (p.y - q.y).atan2(p.x - q.x)
}

/// Isotropic edge-correction weight for a point and test radius (Ripley 1981).
///
/// Returns 1 when the disk of radius r around p lies fully inside the window,
/// and the reciprocal of the in-window circumference fraction otherwise. A
/// non-positive radius yields 0 so the contribution is skipped.
pub fn window_weight(p: Point, window: &Window, r: f64) -> f64 {
    if r <= 0.0 {
        return 0.0;
    }
    let minx = p.x.min(window.width - p.x);
    let miny = p.y.min(window.height - p.y);
    let dmin = minx.min(miny);
    if r <= dmin {
        1.0
    } else if r * r <= minx * minx + miny * miny {
        // One edge implicated
        1.0 / (1.0 - clamped_acos(dmin / r) / PI)
    } else {
        // Corner implicated
        1.0 / (1.0 - (clamped_acos(minx / r) + clamped_acos(miny / r) + PI / 2.0) / (2.0 * PI))
    }
}

fn clamped_acos(ratio: f64) -> f64 {
    ratio.clamp(-1.0, 1.0).acos()
}

/// Epanechnikov kernel centered at radius r with the given half-width
pub fn epanechnikov_kernel(d: f64, r: f64, bandwidth: f64) -> f64 {
    if bandwidth <= 0.0 {
        return 0.0;
    }
    let diff = d - r;
    if diff.abs() < bandwidth {
        3.0 * (1.0 - diff * diff / (bandwidth * bandwidth)) / (4.0 * bandwidth)
    } else {
        0.0
    }
}

/// Kernel half-width used by the pair and bond-orientational correlations:
/// 0.15 * sqrt(mean area per point)
pub fn kernel_bandwidth(window: &Window, point_count: usize) -> f64 {
    if point_count == 0 {
        return 0.0;
    }
    BANDWIDTH_FACTOR * (window.area() / point_count as f64).sqrt()
}
