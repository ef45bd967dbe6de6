// End-to-end checks on synthetic lattices and random patterns

use assert_approx_eq::assert_approx_eq;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use dot_analyzer_rust_lib::{
    analyze, ripley_k_function, Calibration, Config, Point, Region, Segmentation, Window,
};

/// Configuration with identity calibration for pixel-unit assertions
fn pixel_config() -> Config {
    let mut config = Config::default();
    config.known_distance_nm = 1.0;
    config.measured_distance_px = 1.0;
    config
}

/// Octagonal stand-in for a clipped Voronoi cell: a square of half-side
/// `half` with chamfered corners, so corner contact between diagonal cells
/// does not survive the dilation margin
fn octagon_cell(cx: f64, cy: f64, half: f64, chamfer: f64) -> Region {
    let a = half;
    let b = half - chamfer;
    Region::new(vec![
        Point::new(cx + a, cy + b),
        Point::new(cx + b, cy + a),
        Point::new(cx - b, cy + a),
        Point::new(cx - a, cy + b),
        Point::new(cx - a, cy - b),
        Point::new(cx - b, cy - a),
        Point::new(cx + b, cy - a),
        Point::new(cx + a, cy - b),
    ])
}

/// Regular hexagon cell of a triangular lattice: faces toward the six
/// neighbors, circumradius spacing / sqrt(3)
fn hexagon_cell(cx: f64, cy: f64, spacing: f64) -> Region {
    let circumradius = spacing / 3.0f64.sqrt();
    let vertices = (0..6)
        .map(|k| {
            let angle = (30.0 + 60.0 * k as f64).to_radians();
            Point::new(
                cx + circumradius * angle.cos(),
                cy + circumradius * angle.sin(),
            )
        })
        .collect();
    Region::new(vertices)
}

#[test]
fn four_point_square_lattice_end_to_end() {
    let centers = [(45.0, 45.0), (55.0, 45.0), (45.0, 55.0), (55.0, 55.0)];
    let segmentation = Segmentation {
        window: Window {
            width: 100.0,
            height: 100.0,
        },
        points: centers.iter().map(|&(x, y)| Point::new(x, y)).collect(),
        regions: centers
            .iter()
            .map(|&(x, y)| octagon_cell(x, y, 4.2, 2.0))
            .collect(),
    };

    let results = analyze(&segmentation, &pixel_config()).unwrap();
    let aggregate = &results.aggregate;

    assert_eq!(aggregate.edge_count, 4);
    assert_approx_eq!(aggregate.mean_spacing_nm, 10.0, 1e-9);
    assert_approx_eq!(aggregate.stdev_nm, 0.0, 1e-9);
    assert_approx_eq!(aggregate.stderror_nm, 0.0, 1e-9);
    assert!(!aggregate.no_valid_edges);
    // Right-angle bonds carry no sixfold symmetry
    assert_approx_eq!(aggregate.order_parameter, 0.0, 1e-9);

    // Every cell sits well inside the window
    assert!(results.boundary_flags.iter().all(|&flag| !flag));
    // Each dot is confirmed against its two side neighbors, not the diagonal
    assert!(results.neighbor_counts.iter().all(|&count| count == 2));
}

#[test]
fn triangular_lattice_recovers_spacing_and_order() {
    let spacing = 20.0;
    let row_height = spacing * 3.0f64.sqrt() / 2.0;
    let mut points = Vec::new();
    let mut regions = Vec::new();
    for row in 0..9 {
        let offset = if row % 2 == 1 { spacing / 2.0 } else { 0.0 };
        for col in 0..9 {
            let x = 20.0 + col as f64 * spacing + offset;
            let y = 20.0 + row as f64 * row_height;
            points.push(Point::new(x, y));
            regions.push(hexagon_cell(x, y, spacing));
        }
    }
    let segmentation = Segmentation {
        window: Window {
            width: 220.0,
            height: 220.0,
        },
        points,
        regions,
    };

    let mut config = pixel_config();
    // The lattice checks only need the spacing aggregates
    config.ripley_function = false;
    config.pair_correlation = false;
    config.bond_orientational = false;

    let results = analyze(&segmentation, &config).unwrap();
    let aggregate = &results.aggregate;

    assert!(aggregate.edge_count > 0);
    // Relative error below 1 percent on the lattice constant
    assert!((aggregate.mean_spacing_nm - spacing).abs() / spacing < 0.01);
    assert_approx_eq!(aggregate.stdev_nm, 0.0, 1e-6);
    // Sixfold coordination everywhere gives phi6 of 1
    assert!((aggregate.order_parameter - 1.0).abs() < 0.02);

    // Interior dots of the lattice see all six neighbors
    let max_count = results.neighbor_counts.iter().copied().max().unwrap();
    assert_eq!(max_count, 6);
}

#[test]
fn poisson_pattern_has_flat_besag_l() {
    let mut rng = StdRng::seed_from_u64(42);
    let side = 250.0;
    let points: Vec<Point> = (0..250)
        .map(|_| Point::new(rng.gen_range(0.0..side), rng.gen_range(0.0..side)))
        .collect();
    let window = Window {
        width: side,
        height: side,
    };

    let samples = ripley_k_function(&points, &window, &Calibration::identity(), true, 1, true)
        .unwrap();

    // L(r) of a random pattern stays near zero where the window dominates
    for sample in samples.iter().filter(|s| s.radius <= 25.0) {
        assert!(
            sample.value.abs() < 2.5,
            "L({}) = {} drifted from zero",
            sample.radius,
            sample.value
        );
    }
}

#[test]
fn all_boundary_image_yields_flagged_zero_result() {
    // Cells hug the window edge, so every point is excluded from aggregates
    let centers = [(5.0, 5.0), (15.0, 5.0), (5.0, 15.0), (15.0, 15.0)];
    let segmentation = Segmentation {
        window: Window {
            width: 20.0,
            height: 20.0,
        },
        points: centers.iter().map(|&(x, y)| Point::new(x, y)).collect(),
        regions: centers
            .iter()
            .map(|&(x, y)| octagon_cell(x, y, 4.5, 2.0))
            .collect(),
    };

    let mut config = pixel_config();
    config.ripley_function = false;
    config.pair_correlation = false;
    config.bond_orientational = false;

    let results = analyze(&segmentation, &config).unwrap();
    assert!(results.aggregate.no_valid_edges);
    assert_eq!(results.aggregate.edge_count, 0);
    assert!(results.boundary_flags.iter().all(|&flag| flag));
}
