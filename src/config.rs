// src/config.rs - Configuration for DotAnalyzerR with calibration, estimator switches and metadata

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::{DotAnalyzerError, Result};

/// Configuration for DotAnalyzerR
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    pub input_path: String,
    pub output_base_dir: String,

    /// Known distance in nm (scale bar length)
    #[serde(default = "default_known_distance_nm")]
    pub known_distance_nm: f64,

    /// Measured length of the known distance in pixels
    #[serde(default = "default_measured_distance_px")]
    pub measured_distance_px: f64,

    /// Maximum number of ranked neighbor candidates per point
    #[serde(default = "default_max_neighbors")]
    pub max_neighbors: usize,

    /// Radius samples per pixel for the K and pair correlation functions
    #[serde(default = "default_resolution")]
    pub resolution: u32,

    /// Margin in pixels applied to a candidate region before the overlap test
    #[serde(default = "default_dilation_margin")]
    pub dilation_margin: f64,

    /// Report Besag's L instead of raw Ripley K
    #[serde(default = "default_enabled")]
    pub besag_transform: bool,

    #[serde(default = "default_enabled")]
    pub ripley_function: bool,

    #[serde(default = "default_enabled")]
    pub pair_correlation: bool,

    #[serde(default = "default_enabled")]
    pub bond_orientational: bool,

    /// Write the spacing and order row to a results table
    #[serde(default = "default_enabled")]
    pub save_spacing: bool,

    #[serde(default = "default_enabled")]
    pub use_parallel: bool,

    /// Append the results row to a shared table instead of writing a fresh one
    #[serde(default)]
    pub append_results: bool,

    /// Shared results table used when `append_results` is set
    #[serde(default)]
    pub results_table_path: Option<String>,

    /// Experiment metadata copied into the results table
    #[serde(default)]
    pub metadata: Option<ExperimentMetadata>,
}

/// Sample provenance recorded next to the measurements
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct ExperimentMetadata {
    #[serde(default)]
    pub polymer: String,

    #[serde(default)]
    pub loading: String,

    #[serde(default)]
    pub concentration_mg_ml: f64,

    #[serde(default)]
    pub speed_v: f64,

    /// Deposition date, yy/mm/dd
    #[serde(default)]
    pub date: String,
}

fn default_known_distance_nm() -> f64 {
    200.0
}

fn default_measured_distance_px() -> f64 {
    85.0
}

fn default_max_neighbors() -> usize {
    12
}

fn default_resolution() -> u32 {
    1
}

fn default_dilation_margin() -> f64 {
    2.0
}

fn default_enabled() -> bool {
    true
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            DotAnalyzerError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| {
            DotAnalyzerError::Config(format!(
                "Failed to parse config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        Ok(config)
    }

    /// Create default configuration
    pub fn default() -> Self {
        Self {
            input_path: "./input".to_string(),
            output_base_dir: "./output".to_string(),
            known_distance_nm: 200.0,
            measured_distance_px: 85.0,
            max_neighbors: 12,
            resolution: 1,
            dilation_margin: 2.0,
            besag_transform: true,
            ripley_function: true,
            pair_correlation: true,
            bond_orientational: true,
            save_spacing: true,
            use_parallel: true,
            append_results: false,
            results_table_path: None,
            metadata: None,
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let input_path = PathBuf::from(&self.input_path);
        if !input_path.exists() {
            return Err(DotAnalyzerError::InvalidPath(input_path));
        }

        if !(self.known_distance_nm > 0.0) || !self.known_distance_nm.is_finite() {
            return Err(DotAnalyzerError::Config(
                "known_distance_nm must be > 0.0".to_string(),
            ));
        }

        if !(self.measured_distance_px > 0.0) || !self.measured_distance_px.is_finite() {
            return Err(DotAnalyzerError::Config(
                "measured_distance_px must be > 0.0".to_string(),
            ));
        }

        if self.max_neighbors == 0 {
            return Err(DotAnalyzerError::Config(
                "max_neighbors must be > 0".to_string(),
            ));
        }

        if self.resolution == 0 {
            return Err(DotAnalyzerError::Config(
                "resolution must be > 0".to_string(),
            ));
        }

        if !(self.dilation_margin >= 0.0) || !self.dilation_margin.is_finite() {
            return Err(DotAnalyzerError::Config(
                "dilation_margin must be >= 0.0".to_string(),
            ));
        }

        if self.append_results && self.results_table_path.is_none() {
            return Err(DotAnalyzerError::Config(
                "append_results requires results_table_path".to_string(),
            ));
        }

        // Create the output directory if it doesn't exist
        fs::create_dir_all(&self.output_base_dir)?;

        Ok(())
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| DotAnalyzerError::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, content)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_values() {
        let config = Config::default();
        assert_eq!(config.max_neighbors, 12);
        assert_eq!(config.resolution, 1);
        assert!(config.besag_transform);
        assert!((config.known_distance_nm / config.measured_distance_px - 200.0 / 85.0).abs()
            < f64::EPSILON);
    }

    #[test]
    fn missing_optional_fields_fall_back_to_defaults() {
        let config: Config = toml::from_str(
            r#"
            input_path = "./data"
            output_base_dir = "./out"
        "#,
        )
        .unwrap();
        assert_eq!(config.max_neighbors, 12);
        assert!((config.dilation_margin - 2.0).abs() < f64::EPSILON);
        assert!(config.metadata.is_none());
        assert!(!config.append_results);
    }

    #[test]
    fn metadata_block_round_trips() {
        let config: Config = toml::from_str(
            r#"
            input_path = "./data"
            output_base_dir = "./out"

            [metadata]
            polymer = "PS(52400)-P2VP(28100)"
            loading = "0.5"
            concentration_mg_ml = 5.0
            speed_v = 6.0
            date = "22/03/14"
        "#,
        )
        .unwrap();
        let metadata = config.metadata.unwrap();
        assert_eq!(metadata.polymer, "PS(52400)-P2VP(28100)");
        assert_eq!(metadata.loading, "0.5");
    }
}
