//! MacBeth chart detection pipeline.
//!
//! This module wires together edge extraction, Hough line detection, candidate
//! cell construction, reference matching and the final fill-in that recovers
//! every patch position, color and size.

mod error;
mod params;
mod pipeline;
mod result;

pub use error::ChartDetectError;
pub use params::{ChartDetectorParams, FillParams, GridParams, HoughParams};
pub use pipeline::ChartDetector;
pub use result::ChartDetection;
