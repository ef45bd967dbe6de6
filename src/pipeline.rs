// src/pipeline.rs - Batch analysis pipeline for one segmented image

use std::fs;
use std::path::{Path, PathBuf};

use crate::adjacency::{confirm_neighbors, dedup_edges};
use crate::config::Config;
use crate::correlation::{
    bond_orientational_correlation, pair_correlation_function, ripley_k_function,
    BondOrientationResult, RadiusSample,
};
use crate::errors::{DotAnalyzerError, Result};
use crate::geometry::Calibration;
use crate::neighbors::rank_all_neighbors;
use crate::output::{
    write_bond_orientation_csv, write_neighbor_counts_csv, write_radius_function_csv,
    write_results_csv,
};
use crate::region::{is_region_at_edge, ConvexGeometry, RegionGeometry};
use crate::segmentation::{JsonSegmentationFile, Segmentation, SegmentationProvider};
use crate::spacing::{aggregate_spacing_and_order, AggregateResult};

/// Everything the engine produces for one image
#[derive(Debug, Clone)]
pub struct AnalysisResults {
    pub aggregate: AggregateResult,
    /// Confirmed-neighbor count per point, boundary points included
    pub neighbor_counts: Vec<usize>,
    pub boundary_flags: Vec<bool>,
    /// Besag L (or raw Ripley K) samples when the estimator is enabled
    pub ripley: Option<Vec<RadiusSample>>,
    pub pair_correlation: Option<Vec<RadiusSample>>,
    pub bond_orientation: Option<BondOrientationResult>,
}

/// Run the full analysis with the bundled convex region geometry
pub fn analyze(segmentation: &Segmentation, config: &Config) -> Result<AnalysisResults> {
    analyze_with_geometry(segmentation, config, &ConvexGeometry)
}

/// Run the full analysis with a caller-supplied region geometry
pub fn analyze_with_geometry<G: RegionGeometry>(
    segmentation: &Segmentation,
    config: &Config,
    geometry: &G,
) -> Result<AnalysisResults> {
    segmentation.validate()?;
    let window = segmentation.window;
    let calibration = Calibration::new(config.known_distance_nm, config.measured_distance_px)?;
    let points = &segmentation.points;

    // Degrade the neighbor count on small point sets; below two points
    // nothing can be ranked at all
    let k = config.max_neighbors.min(points.len() - 1);
    if k == 0 {
        return Err(DotAnalyzerError::InsufficientPoints {
            required: 1,
            available: 0,
        });
    }

    // Step 1: ranked candidates and tessellation-confirmed neighbors
    println!("Calculation of spacing and order parameter");
    let records = rank_all_neighbors(points, k)?;
    let confirmed = confirm_neighbors(
        &records,
        &segmentation.regions,
        geometry,
        config.dilation_margin,
    );

    // Step 2: boundary exclusion and the deduplicated edge set
    let boundary_flags: Vec<bool> = segmentation
        .regions
        .iter()
        .map(|region| is_region_at_edge(region, &window))
        .collect();
    let edges = dedup_edges(&confirmed, &boundary_flags);

    // Step 3: spacing and hexatic order aggregates
    let aggregate = aggregate_spacing_and_order(&edges, &confirmed, &boundary_flags, &calibration);

    // Step 4: the radius-function estimators over the full point set
    let ripley = if config.ripley_function {
        if config.besag_transform {
            println!("Computing the Besag's L function");
        } else {
            println!("Computing the Ripley's K function");
        }
        Some(ripley_k_function(
            points,
            &window,
            &calibration,
            config.besag_transform,
            config.resolution,
            config.use_parallel,
        )?)
    } else {
        None
    };

    let pair_correlation = if config.pair_correlation {
        println!("Computing the pair correlation function");
        Some(pair_correlation_function(
            points,
            &window,
            &calibration,
            config.resolution,
            config.use_parallel,
        )?)
    } else {
        None
    };

    let bond_orientation = if config.bond_orientational {
        println!("Computing the bond-orientational correlation function");
        Some(bond_orientational_correlation(
            points,
            &window,
            &calibration,
            &confirmed.bearings(),
            config.use_parallel,
        )?)
    } else {
        None
    };

    Ok(AnalysisResults {
        aggregate,
        neighbor_counts: confirmed.counts(),
        boundary_flags,
        ripley,
        pair_correlation,
        bond_orientation,
    })
}

/// Analyze one segmentation file and write the CSV outputs
pub fn process_segmentation(path: &Path, config: &Config, debug: bool) -> Result<()> {
    let provider = JsonSegmentationFile::new(path)?;
    let segmentation = provider.segmentation()?;
    let filename = provider.filename.clone();

    let results = analyze(&segmentation, config)?;

    let image_dir = PathBuf::from(&config.output_base_dir).join(format!("Analyzed_{}", filename));
    fs::create_dir_all(&image_dir)?;

    if results.aggregate.no_valid_edges {
        println!("No non-boundary confirmed edges in {}; writing a zeroed summary", filename);
    }

    println!("Results:");
    println!("Number of dot = {}", results.aggregate.edge_count);
    println!("Spacing (nm) = {:.3}", results.aggregate.mean_spacing_nm);
    println!("Stdev (nm) = {:.3}", results.aggregate.stdev_nm);
    println!("Sterror (nm) = {:.3}", results.aggregate.stderror_nm);
    println!("Order = {:.3}", results.aggregate.order_parameter);

    if debug {
        for (index, count) in results.neighbor_counts.iter().enumerate() {
            println!(
                "  dot {}: {} confirmed neighbors{}",
                index,
                count,
                if results.boundary_flags[index] {
                    " (at edge)"
                } else {
                    ""
                }
            );
        }
    }

    if config.save_spacing {
        match (&config.results_table_path, config.append_results) {
            (Some(table_path), true) => write_results_csv(
                &results.aggregate,
                config.metadata.as_ref(),
                &filename,
                table_path,
                true,
            )?,
            _ => write_results_csv(
                &results.aggregate,
                config.metadata.as_ref(),
                &filename,
                image_dir.join(format!("{}_Results.csv", filename)),
                false,
            )?,
        }
    }

    if let Some(samples) = &results.ripley {
        if config.besag_transform {
            write_radius_function_csv(
                samples,
                "L(r)",
                image_dir.join(format!("{}_BesagFunction.csv", filename)),
            )?;
        } else {
            write_radius_function_csv(
                samples,
                "K(r)",
                image_dir.join(format!("{}_KFunction.csv", filename)),
            )?;
        }
    }

    if let Some(samples) = &results.pair_correlation {
        write_radius_function_csv(
            samples,
            "g(r)",
            image_dir.join(format!("{}_PCF.csv", filename)),
        )?;
    }

    if let Some(bond) = &results.bond_orientation {
        match &bond.fit {
            Some(fit) => println!(
                "g6 decay fit: a = {:.6}, b = {:.6}, R^2 = {:.4}",
                fit.a, fit.b, fit.r_squared
            ),
            None => println!("Exponential fit unavailable; keeping raw g6 samples"),
        }
        write_bond_orientation_csv(bond, image_dir.join(format!("{}_OCF.csv", filename)))?;
    }

    write_neighbor_counts_csv(
        &segmentation.points,
        &results.neighbor_counts,
        &results.boundary_flags,
        image_dir.join(format!("{}_NeighborCounts.csv", filename)),
    )?;

    Ok(())
}
