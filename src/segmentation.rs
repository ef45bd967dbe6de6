// src/segmentation.rs - Segmentation input boundary: points and regions from the external detection step

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::{DotAnalyzerError, Result};
use crate::geometry::{Point, Window};
use crate::region::Region;

/// Already-segmented input for one image: the sampling window, the particle
/// centroids and one tessellation region per centroid
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Segmentation {
    pub window: Window,
    pub points: Vec<Point>,
    pub regions: Vec<Region>,
}

impl Segmentation {
    /// Check the 1:1 point/region contract
    pub fn validate(&self) -> Result<()> {
        self.window.validate()?;
        if self.points.is_empty() {
            return Err(DotAnalyzerError::InvalidSegmentation(
                "no points in segmentation".to_string(),
            ));
        }
        if self.regions.len() != self.points.len() {
            return Err(DotAnalyzerError::InvalidSegmentation(format!(
                "{} regions for {} points",
                self.regions.len(),
                self.points.len()
            )));
        }
        Ok(())
    }
}

/// Source of segmentation data. The surrounding application decides how the
/// segmentation is produced: manual, automatic or scripted.
pub trait SegmentationProvider {
    fn segmentation(&self) -> Result<Segmentation>;
}

/// Segmentation stored as a JSON file
pub struct JsonSegmentationFile {
    pub path: PathBuf,
    pub filename: String,
}

impl JsonSegmentationFile {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let filename = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| DotAnalyzerError::InvalidPath(path.to_path_buf()))?
            .to_string();
        Ok(Self {
            path: path.to_path_buf(),
            filename,
        })
    }
}

impl SegmentationProvider for JsonSegmentationFile {
    fn segmentation(&self) -> Result<Segmentation> {
        let content = fs::read_to_string(&self.path)?;
        let segmentation: Segmentation = serde_json::from_str(&content)?;
        segmentation.validate()?;
        Ok(segmentation)
    }
}

/// Get all JSON segmentation files from a directory (recursively)
pub fn get_json_files_in_dir<P: AsRef<Path>>(dir_path: P) -> Result<Vec<PathBuf>> {
    let dir_path = dir_path.as_ref();

    if !dir_path.exists() {
        return Err(DotAnalyzerError::InvalidPath(dir_path.to_path_buf()));
    }

    if !dir_path.is_dir() {
        return Err(DotAnalyzerError::Config(format!(
            "{} is not a directory",
            dir_path.display()
        )));
    }

    let mut json_files = Vec::new();
    find_json_files_recursive(dir_path, &mut json_files)?;
    json_files.sort();

    Ok(json_files)
}

/// Helper function to recursively search for JSON files
fn find_json_files_recursive(dir_path: &Path, result: &mut Vec<PathBuf>) -> Result<()> {
    let entries = fs::read_dir(dir_path)?;

    for entry in entries {
        let entry = entry?;
        let path = entry.path();

        if path.is_dir() {
            find_json_files_recursive(&path, result)?;
        } else if path.is_file() {
            if let Some(ext) = path.extension() {
                if ext.to_ascii_lowercase() == "json" {
                    result.push(path);
                }
            }
        }
    }

    Ok(())
}
