//! High-level facade crate for the `macbeth-*` workspace.
//!
//! This crate provides:
//! - re-exports of the pixel buffer types, the chart detector and the
//!   calibration analyzers,
//! - (feature-gated) helpers that run the detector directly on an
//!   `image::RgbaImage` and render the debug overlay back into one.
//!
//! ## Quickstart
//!
//! ```no_run
//! use macbeth::chart::ChartDetectorParams;
//! use macbeth::detect;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let img = image::open("chart.png")?.to_rgba8();
//! let detection = detect::detect_chart(&img, ChartDetectorParams::default())?;
//! println!("matched {} patches", detection.matched);
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `macbeth::core`: colors, points, pixel buffers and patch sampling.
//! - `macbeth::chart`: chart detection, reference colors, JSON reports.
//! - `macbeth::calib`: auto-lock/metering comparisons, white balance and
//!   exposure response.
//! - `macbeth::detect` (feature `image`): helpers over `image::RgbaImage`.

pub use macbeth_calib as calib;
pub use macbeth_chart as chart;
pub use macbeth_core as core;

pub use macbeth_calib::{
    CalibError, ComparisonAnalyzer, ComparisonKind, ComparisonSamples, ExposureAnalyzer, Verdict,
    WhiteBalanceAnalyzer, WhiteBalanceMode,
};
pub use macbeth_chart::{ChartDetectError, ChartDetection, ChartDetector, ChartDetectorParams};
pub use macbeth_core::{Color3f, Color3i, PixelBuffer, PixelBufferView};

#[cfg(feature = "image")]
pub mod detect;
