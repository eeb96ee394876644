//! MacBeth ColorChecker detection.
//!
//! Current focus:
//! - edge extraction and Hough line detection on a downscaled working image,
//! - candidate cells between adjacent lines and matching against the
//!   reference colors,
//! - recovery of every patch position, color and radius.
//!
//! Pixel buffers and color primitives live in `macbeth-core`.

mod detector;
mod fill;
mod gradient;
mod grid;
mod hough;
mod io;
mod matching;
mod observer;
mod reference;

pub use detector::{
    ChartDetectError, ChartDetection, ChartDetector, ChartDetectorParams, FillParams, GridParams,
    HoughParams,
};
pub use fill::{estimate_spacing, extrapolate, grow_region, grow_regions, Region, Spacing};
pub use gradient::{DirectionBucket, GradientField};
pub use grid::{CandidateCell, CandidateGrid};
pub use hough::{HoughAccumulator, Line, LineFamily, SmoothedAccumulator, ANGLE_BINS, RADIUS_BINS};
pub use io::{ChartDetectConfig, ChartDetectReport, ChartIoError, PatchReport};
pub use matching::{align_block, segment_blocks, Block, BlockMatch, MatchGrid};
pub use observer::{DetectionObserver, OverlayCanvas};
pub use reference::{
    patch_name, reference_color, CHART_COLS, CHART_ROWS, NEUTRAL_ROW, PATCH_COUNT, PATCH_NAMES,
    REFERENCE_CHART,
};
