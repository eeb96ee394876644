//! Photometric calibration routines over extracted chart patches.
//!
//! Each analyzer accumulates patch colors (as produced by
//! `macbeth_chart::ChartDetection`) and evaluates them in a pure `process`
//! step:
//! - [`ComparisonAnalyzer`]: brightness verdicts for auto-exposure lock and
//!   metering captures,
//! - [`WhiteBalanceAnalyzer`]: correlated color temperature against a
//!   daylight baseline,
//! - [`ExposureAnalyzer`]: expected vs measured response of the neutral row.

mod comparison;
mod error;
mod exposure;
mod white_balance;

pub use comparison::{
    is_brighter_than, is_darker_than, is_equivalent_to, ComparisonAnalyzer, ComparisonKind,
    ComparisonParams, ComparisonReport, ComparisonSamples, PairVerdicts, Verdict,
};
pub use error::CalibError;
pub use exposure::{
    ExposureAnalyzer, ExposureParams, ExposurePoint, ExposureResponse, ResponseCurve,
};
pub use white_balance::{
    convert_to_linear, correlated_color_temperature, rgb_to_xyz, WhiteBalanceAnalyzer,
    WhiteBalanceMode,
};
