//! JSON configuration and report helpers for chart detection.

use crate::{
    patch_name, reference_color, ChartDetectError, ChartDetection, ChartDetectorParams, CHART_COLS,
    CHART_ROWS,
};
use macbeth_core::{Color3f, Color3i, Point2};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

#[derive(thiserror::Error, Debug)]
pub enum ChartIoError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Configuration for a detection run from the command line.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChartDetectConfig {
    #[serde(default)]
    pub image_path: String,
    /// Report file; the CLI prints the report to stdout when unset.
    #[serde(default)]
    pub output_path: Option<String>,
    #[serde(default)]
    pub overlay_path: Option<String>,
    #[serde(default)]
    pub working_width: Option<usize>,
    #[serde(default)]
    pub working_height: Option<usize>,
    #[serde(default)]
    pub params: Option<ChartDetectorParams>,
}

impl ChartDetectConfig {
    /// Load a JSON config from disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ChartIoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this config to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), ChartIoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Detector parameters with the working size overrides applied.
    pub fn build_params(&self) -> ChartDetectorParams {
        let mut params = self.params.clone().unwrap_or_default();
        if let Some(w) = self.working_width {
            params.working_width = w;
        }
        if let Some(h) = self.working_height {
            params.working_height = h;
        }
        params
    }
}

/// One chart patch as written to a report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchReport {
    pub row: usize,
    pub col: usize,
    pub name: String,
    pub reference: Color3i,
    #[serde(default)]
    pub position: Option<Point2<f32>>,
    #[serde(default)]
    pub color: Option<Color3f>,
    pub radius_sq: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartDetectReport {
    pub image_path: String,
    pub image_width: usize,
    pub image_height: usize,
    #[serde(default)]
    pub detection: Option<ChartDetection>,
    /// Patch table in source image coordinates.
    #[serde(default)]
    pub patches: Vec<PatchReport>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ChartDetectReport {
    pub fn new(image_path: impl Into<String>, image_width: usize, image_height: usize) -> Self {
        Self {
            image_path: image_path.into(),
            image_width,
            image_height,
            detection: None,
            patches: Vec::new(),
            error: None,
        }
    }

    /// Populate report fields from a successful detection.
    pub fn set_detection(&mut self, detection: ChartDetection) {
        let source = detection.scaled_to_source();
        self.patches = (0..CHART_ROWS)
            .flat_map(|row| (0..CHART_COLS).map(move |col| (row, col)))
            .map(|(row, col)| PatchReport {
                row,
                col,
                name: patch_name(row, col).unwrap_or_default().to_string(),
                reference: reference_color(row, col).unwrap_or_default(),
                position: source.patches.positions[row][col],
                color: source.patches.colors[row][col],
                radius_sq: source.patches.radii_sq[row][col],
            })
            .collect();
        self.detection = Some(detection);
        self.error = None;
    }

    /// Record a detection error.
    pub fn set_error(&mut self, err: &ChartDetectError) {
        self.error = Some(err.to_string());
    }

    /// Load a report from JSON on disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ChartIoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this report to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), ChartIoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}
