use macbeth_core::ImageError;

use crate::hough::LineFamily;

/// Errors returned by the chart detector.
#[derive(thiserror::Error, Debug)]
pub enum ChartDetectError {
    #[error(transparent)]
    Image(#[from] ImageError),
    #[error("no edge pixels above the magnitude threshold")]
    NoEdges,
    #[error("no {family} lines found")]
    NoLines { family: LineFamily },
    #[error("no candidate cells between the detected lines")]
    NoCandidates,
    #[error("no candidate block matched the reference chart")]
    NoMatches,
    #[error("patch spacing undetermined from {placed} matched patches")]
    SpacingUndetermined { placed: usize },
}
