// src/output.rs - CSV persistence for the spacing table and the radius functions

use std::fs::{self, OpenOptions};
use std::path::Path;

use csv::Writer;

use crate::config::ExperimentMetadata;
use crate::correlation::{BondOrientationResult, RadiusSample};
use crate::errors::Result;
use crate::geometry::Point;
use crate::spacing::AggregateResult;

/// Column headings of the spacing and order results table
pub const RESULT_HEADINGS: [&str; 11] = [
    "Filename",
    "Polymer",
    "Loading",
    "concentration (mg/ml)",
    "Speed (V)",
    "Date (yy/mm/dd)",
    "Number of dot",
    "Spacing (nm)",
    "Stdev (nm)",
    "Sterror (nm)",
    "Order",
];

/// Write (or append) the one-row spacing and order summary.
///
/// In append mode an existing table receives the new row without a second
/// header, so many images can share one results file.
pub fn write_results_csv<P: AsRef<Path>>(
    result: &AggregateResult,
    metadata: Option<&ExperimentMetadata>,
    filename: &str,
    output_path: P,
    append: bool,
) -> Result<()> {
    let output_path = output_path.as_ref();

    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let appending = append && output_path.exists();
    let mut writer = if appending {
        let file = OpenOptions::new().append(true).open(output_path)?;
        Writer::from_writer(Box::new(file) as Box<dyn std::io::Write>)
    } else {
        let file = fs::File::create(output_path)?;
        Writer::from_writer(Box::new(file) as Box<dyn std::io::Write>)
    };

    if !appending {
        writer.write_record(RESULT_HEADINGS)?;
    }

    let default_metadata = ExperimentMetadata::default();
    let metadata = metadata.unwrap_or(&default_metadata);

    writer.write_record(&[
        filename.to_string(),
        metadata.polymer.clone(),
        metadata.loading.clone(),
        format!("{:.3}", metadata.concentration_mg_ml),
        format!("{:.3}", metadata.speed_v),
        metadata.date.clone(),
        result.edge_count.to_string(),
        format!("{:.6}", result.mean_spacing_nm),
        format!("{:.6}", result.stdev_nm),
        format!("{:.6}", result.stderror_nm),
        format!("{:.6}", result.order_parameter),
    ])?;

    writer.flush()?;

    Ok(())
}

/// Write one radius function (K, L or g) as a two-column CSV
pub fn write_radius_function_csv<P: AsRef<Path>>(
    samples: &[RadiusSample],
    value_label: &str,
    output_path: P,
) -> Result<()> {
    let output_path = output_path.as_ref();

    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut writer = Writer::from_path(output_path)?;
    writer.write_record(["Distance r (nm)", value_label])?;
    for sample in samples {
        writer.write_record(&[
            format!("{:.6}", sample.radius),
            format!("{:.6}", sample.value),
        ])?;
    }
    writer.flush()?;

    Ok(())
}

/// Write the bond-orientational correlation with the fitted decay beside the
/// raw samples, mirroring the raw and fit series of the source chart
pub fn write_bond_orientation_csv<P: AsRef<Path>>(
    result: &BondOrientationResult,
    output_path: P,
) -> Result<()> {
    let output_path = output_path.as_ref();

    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut writer = Writer::from_path(output_path)?;
    writer.write_record(["Distance r (nm)", "g6(r)", "Fit a*exp(b*r)"])?;
    for sample in &result.samples {
        let fitted = match &result.fit {
            Some(fit) => format!("{:.6}", fit.evaluate(sample.radius)),
            None => String::new(),
        };
        writer.write_record(&[
            format!("{:.6}", sample.radius),
            format!("{:.6}", sample.value),
            fitted,
        ])?;
    }
    writer.flush()?;

    Ok(())
}

/// Write per-point confirmed-neighbor counts for color-coded overlay rendering
pub fn write_neighbor_counts_csv<P: AsRef<Path>>(
    points: &[Point],
    neighbor_counts: &[usize],
    boundary_flags: &[bool],
    output_path: P,
) -> Result<()> {
    let output_path = output_path.as_ref();

    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut writer = Writer::from_path(output_path)?;
    writer.write_record(["Dot", "X", "Y", "Neighbors", "At edge"])?;
    for (index, point) in points.iter().enumerate() {
        writer.write_record(&[
            index.to_string(),
            format!("{:.3}", point.x),
            format!("{:.3}", point.y),
            neighbor_counts[index].to_string(),
            boundary_flags[index].to_string(),
        ])?;
    }
    writer.flush()?;

    Ok(())
}
