mod adjacency;
mod config;
mod correlation;
mod errors;
mod fitting;
mod geometry;
mod neighbors;
mod output;
mod pipeline;
mod region;
mod segmentation;
mod spacing;

use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use clap::Parser;
use rayon::prelude::*;

use config::Config;
use pipeline::process_segmentation;
use segmentation::get_json_files_in_dir;

/// Command-line arguments
#[derive(Parser, Debug)]
#[clap(author, version, about = "DotAnalyzerR - Dot Array Spacing and Order Analysis")]
struct Args {
    /// Path to input segmentation file or directory
    #[clap(short, long)]
    input: Option<String>,

    /// Path to output directory
    #[clap(short, long)]
    output: Option<String>,

    /// Path to configuration file
    #[clap(short, long, default_value = "config.toml")]
    config: String,

    /// Known distance in nm (overwrites config)
    #[clap(long)]
    known_distance: Option<f64>,

    /// Measured distance in pixels (overwrites config)
    #[clap(long)]
    measured_distance: Option<f64>,

    /// Report raw Ripley K instead of Besag's L
    #[clap(long)]
    raw_k: bool,

    /// Enable debug mode (print per-point neighbor information)
    #[clap(short, long)]
    debug: bool,
}

/// Main function
fn main() -> anyhow::Result<()> {
    // Parse command-line arguments
    let args = Args::parse();

    // Load configuration
    let mut config = Config::from_file(&args.config)
        .with_context(|| format!("loading configuration from {}", args.config))?;

    // Override config with command-line arguments
    if let Some(input) = args.input.clone() {
        config.input_path = input;
    }

    if let Some(output) = args.output.clone() {
        config.output_base_dir = output;
    }

    if let Some(known) = args.known_distance {
        config.known_distance_nm = known;
    }

    if let Some(measured) = args.measured_distance {
        config.measured_distance_px = measured;
    }

    if args.raw_k {
        config.besag_transform = false;
    }

    // Validate configuration
    config.validate()?;

    // Start timing
    let start_time = Instant::now();

    // Process input
    let input_path = PathBuf::from(&config.input_path);

    if input_path.is_file() {
        // Process single segmentation file
        println!("Processing single file: {}", input_path.display());
        process_segmentation(&input_path, &config, args.debug)?;
    } else if input_path.is_dir() {
        // Process all JSON segmentation files in the directory
        println!("Processing directory: {}", input_path.display());
        let json_files = get_json_files_in_dir(&input_path)?;

        println!("Found {} segmentation files", json_files.len());

        if config.use_parallel {
            // Process files in parallel
            json_files.par_iter().for_each(|path| {
                println!("Processing: {}", path.display());
                if let Err(e) = process_segmentation(path, &config, args.debug) {
                    eprintln!("Error processing {}: {}", path.display(), e);
                }
            });
        } else {
            // Process files sequentially
            for path in &json_files {
                println!("Processing: {}", path.display());
                process_segmentation(path, &config, args.debug)?;
            }
        }
    } else {
        return Err(errors::DotAnalyzerError::InvalidPath(input_path).into());
    }

    // Report elapsed time
    let elapsed = start_time.elapsed();
    println!("Processing completed in {:.2} seconds", elapsed.as_secs_f64());

    Ok(())
}
