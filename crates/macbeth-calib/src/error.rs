/// Errors returned by the calibration analyzers.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum CalibError {
    #[error("no samples to process")]
    NoSamples,
    #[error("snapshot holds no patches")]
    EmptySnapshot,
    #[error("odd sample count {count}; comparisons need pairs")]
    OddSampleCount { count: usize },
    #[error("patch count mismatch (expected {expected}, got {got})")]
    PatchCountMismatch { expected: usize, got: usize },
    #[error("too few patches (need at least {min}, got {got})")]
    TooFewPatches { min: usize, got: usize },
    #[error("white balance baseline missing; process a daylight capture first")]
    MissingBaseline,
    #[error("no patch produced a usable ratio")]
    NoUsablePatches,
}
