use thiserror::Error;
use std::io;
use std::path::PathBuf;

/// Custom error types for DotAnalyzerR
#[derive(Error, Debug)]
pub enum DotAnalyzerError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("CSV output error: {0}")]
    CsvOutput(#[from] csv::Error),

    #[error("Segmentation parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid segmentation data: {0}")]
    InvalidSegmentation(String),

    #[error("Not enough points: {required} neighbors requested but only {available} other points exist")]
    InsufficientPoints { required: usize, available: usize },

    #[error("Degenerate sampling window: {width} x {height}")]
    DegenerateWindow { width: f64, height: f64 },

    #[error("Invalid calibration: known {known_nm} nm over measured {measured_px} px")]
    InvalidCalibration { known_nm: f64, measured_px: f64 },

    #[error("Exponential fit unavailable: {0}")]
    FitUnavailable(String),

    #[error("Invalid input path: {0}")]
    InvalidPath(PathBuf),

    #[error("Unexpected error: {0}")]
    Other(String),
}

/// Type alias for Result with our custom error type
pub type Result<T> = std::result::Result<T, DotAnalyzerError>;
