//! Brightness comparison between paired chart snapshots.
//!
//! Snapshots are pushed as `A, B, A, B, ...`. Each pair is judged on the
//! luminance ratio `lum(A) / lum(B)` averaged over the patches that are
//! neither black nor saturated.

use std::fmt;

use log::debug;
use macbeth_core::Color3f;
use serde::{Deserialize, Serialize};

use crate::CalibError;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Outcome of a single comparison.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Holds,
    Fails,
    /// Every patch was excluded (black, saturated or not finite).
    Indeterminate,
}

impl Verdict {
    #[inline]
    pub fn holds(self) -> bool {
        self == Self::Holds
    }

    fn from_test(mean: Option<f32>, test: impl FnOnce(f32) -> bool) -> Self {
        match mean {
            None => Self::Indeterminate,
            Some(m) if test(m) => Self::Holds,
            Some(_) => Self::Fails,
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Holds => f.write_str("true"),
            Self::Fails => f.write_str("false"),
            Self::Indeterminate => f.write_str("indeterminate"),
        }
    }
}

/// Thresholds shared by the comparison predicates.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComparisonParams {
    /// Patches with luminance at or above this are treated as clipped.
    pub saturation: f32,
    /// Relative luminance change that counts as a difference.
    pub tolerance: f32,
}

impl Default for ComparisonParams {
    fn default() -> Self {
        Self {
            saturation: 230.0,
            tolerance: 0.05,
        }
    }
}

fn mean_ratio<'a>(pairs: impl Iterator<Item = (&'a Color3f, &'a Color3f)>) -> Option<f32> {
    let (sum, n) = pairs
        .map(|(a, b)| a.luminance() / b.luminance())
        .filter(|r| r.is_finite())
        .fold((0.0f32, 0u32), |(s, n), r| (s + r, n + 1));
    (n > 0).then(|| sum / n as f32)
}

/// `A` is brighter than `B`: the mean ratio over patches with
/// `0 < lum(B) < saturation` exceeds `1 + tolerance`.
pub fn is_brighter_than(a: &[Color3f], b: &[Color3f], params: &ComparisonParams) -> Verdict {
    let mean = mean_ratio(a.iter().zip(b).filter(|(_, b)| {
        let lb = b.luminance();
        lb > 0.0 && lb < params.saturation
    }));
    Verdict::from_test(mean, |m| m > 1.0 + params.tolerance)
}

/// `A` is darker than `B`, i.e. `B` is brighter than `A`.
#[inline]
pub fn is_darker_than(a: &[Color3f], b: &[Color3f], params: &ComparisonParams) -> Verdict {
    is_brighter_than(b, a, params)
}

/// `A` and `B` match: over patches where both are below saturation and
/// `lum(B) > 0`, the mean ratio lies within `1 ± tolerance`.
pub fn is_equivalent_to(a: &[Color3f], b: &[Color3f], params: &ComparisonParams) -> Verdict {
    let mean = mean_ratio(a.iter().zip(b).filter(|(a, b)| {
        let (la, lb) = (a.luminance(), b.luminance());
        la < params.saturation && lb < params.saturation && lb > 0.0
    }));
    Verdict::from_test(mean, |m| {
        (1.0 - params.tolerance..=1.0 + params.tolerance).contains(&m)
    })
}

/// Which pair of predicates a comparison run evaluates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonKind {
    /// Locked exposure must not follow a scene change: emits
    /// `[is_brighter_than(B, A), is_equivalent_to(A, B)]`.
    AutoLock,
    /// Metering mode change: emits `[is_darker_than(A, B), is_equivalent_to(A, B)]`.
    Metering,
}

impl fmt::Display for ComparisonKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AutoLock => f.write_str("auto-lock"),
            Self::Metering => f.write_str("metering"),
        }
    }
}

/// Snapshot accumulator. Every snapshot has the same patch count.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ComparisonSamples {
    snapshots: Vec<Vec<Color3f>>,
}

impl ComparisonSamples {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, snapshot: Vec<Color3f>) -> Result<(), CalibError> {
        if snapshot.is_empty() {
            return Err(CalibError::EmptySnapshot);
        }
        if let Some(first) = self.snapshots.first() {
            if first.len() != snapshot.len() {
                return Err(CalibError::PatchCountMismatch {
                    expected: first.len(),
                    got: snapshot.len(),
                });
            }
        }
        self.snapshots.push(snapshot);
        Ok(())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn snapshots(&self) -> &[Vec<Color3f>] {
        &self.snapshots
    }

    pub fn clear(&mut self) {
        self.snapshots.clear();
    }
}

/// Verdicts of one `A`/`B` pair.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PairVerdicts {
    pub first: Verdict,
    pub equivalent: Verdict,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ComparisonReport {
    pub kind: ComparisonKind,
    pub pairs: Vec<PairVerdicts>,
}

impl ComparisonReport {
    /// Flat verdict list, two per pair.
    pub fn verdicts(&self) -> Vec<Verdict> {
        self.pairs
            .iter()
            .flat_map(|p| [p.first, p.equivalent])
            .collect()
    }
}

impl fmt::Display for ComparisonReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let first = match self.kind {
            ComparisonKind::AutoLock => "B brighter than A",
            ComparisonKind::Metering => "A darker than B",
        };
        writeln!(f, "{} comparison, {} pair(s)", self.kind, self.pairs.len())?;
        for (i, p) in self.pairs.iter().enumerate() {
            writeln!(
                f,
                "  pair {i}: {first}: {}, equivalent: {}",
                p.first, p.equivalent
            )?;
        }
        Ok(())
    }
}

/// Evaluates paired snapshots for one [`ComparisonKind`].
#[derive(Clone, Debug)]
pub struct ComparisonAnalyzer {
    kind: ComparisonKind,
    params: ComparisonParams,
}

impl ComparisonAnalyzer {
    pub fn new(kind: ComparisonKind) -> Self {
        Self::with_params(kind, ComparisonParams::default())
    }

    pub fn with_params(kind: ComparisonKind, params: ComparisonParams) -> Self {
        Self { kind, params }
    }

    #[inline]
    pub fn kind(&self) -> ComparisonKind {
        self.kind
    }

    #[inline]
    pub fn params(&self) -> &ComparisonParams {
        &self.params
    }

    /// Verdicts for every pair, two per pair in the order of the kind.
    pub fn process(&self, samples: &ComparisonSamples) -> Result<Vec<Verdict>, CalibError> {
        Ok(self.report(samples)?.verdicts())
    }

    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip(self, samples), fields(kind = %self.kind, samples = samples.len()))
    )]
    pub fn report(&self, samples: &ComparisonSamples) -> Result<ComparisonReport, CalibError> {
        if samples.is_empty() {
            return Err(CalibError::NoSamples);
        }
        if samples.len() % 2 != 0 {
            return Err(CalibError::OddSampleCount {
                count: samples.len(),
            });
        }
        let pairs: Vec<PairVerdicts> = samples
            .snapshots()
            .chunks_exact(2)
            .map(|pair| {
                let (a, b) = (&pair[0], &pair[1]);
                let first = match self.kind {
                    ComparisonKind::AutoLock => is_brighter_than(b, a, &self.params),
                    ComparisonKind::Metering => is_darker_than(a, b, &self.params),
                };
                PairVerdicts {
                    first,
                    equivalent: is_equivalent_to(a, b, &self.params),
                }
            })
            .collect();
        debug!("{} comparison over {} pairs", self.kind, pairs.len());
        Ok(ComparisonReport {
            kind: self.kind,
            pairs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gray(values: &[f32]) -> Vec<Color3f> {
        values.iter().map(|&v| Color3f::new(v, v, v)).collect()
    }

    #[test]
    fn brighter_and_darker_are_symmetric() {
        let p = ComparisonParams::default();
        let dark = gray(&[20.0, 60.0, 100.0]);
        let bright = gray(&[30.0, 90.0, 150.0]);
        assert_eq!(is_brighter_than(&bright, &dark, &p), Verdict::Holds);
        assert_eq!(is_darker_than(&dark, &bright, &p), Verdict::Holds);
        assert_eq!(is_brighter_than(&dark, &bright, &p), Verdict::Fails);
        for (a, b) in [(&dark, &bright), (&bright, &dark), (&dark, &dark)] {
            assert_eq!(is_brighter_than(a, b, &p), is_darker_than(b, a, &p));
        }
    }

    #[test]
    fn equivalence_is_reflexive_below_saturation() {
        let p = ComparisonParams::default();
        let a = gray(&[10.0, 250.0, 120.0]);
        assert_eq!(is_equivalent_to(&a, &a, &p), Verdict::Holds);
        let within = gray(&[10.3, 250.0, 123.0]);
        assert_eq!(is_equivalent_to(&within, &a, &p), Verdict::Holds);
    }

    #[test]
    fn black_and_saturated_patches_are_excluded() {
        let p = ComparisonParams::default();
        let black = gray(&[0.0, 0.0]);
        let clipped = gray(&[240.0, 255.0]);
        assert_eq!(is_brighter_than(&clipped, &black, &p), Verdict::Indeterminate);
        assert_eq!(is_equivalent_to(&clipped, &clipped, &p), Verdict::Indeterminate);
        assert_eq!(is_darker_than(&black, &clipped, &p), Verdict::Indeterminate);
    }

    #[test]
    fn metering_on_identical_snapshots() {
        let mut samples = ComparisonSamples::new();
        let snapshot = gray(&[52.0, 85.0, 122.0, 160.0, 200.0, 243.0]);
        samples.push(snapshot.clone()).expect("push");
        samples.push(snapshot).expect("push");
        let verdicts = ComparisonAnalyzer::new(ComparisonKind::Metering)
            .process(&samples)
            .expect("process");
        assert_eq!(verdicts, vec![Verdict::Fails, Verdict::Holds]);
    }

    #[test]
    fn auto_lock_flags_a_brighter_second_capture() {
        let mut samples = ComparisonSamples::new();
        samples.push(gray(&[40.0, 80.0])).expect("push");
        samples.push(gray(&[60.0, 120.0])).expect("push");
        let report = ComparisonAnalyzer::new(ComparisonKind::AutoLock)
            .report(&samples)
            .expect("report");
        assert_eq!(report.verdicts(), vec![Verdict::Holds, Verdict::Fails]);
        let text = report.to_string();
        assert!(text.starts_with("auto-lock comparison, 1 pair(s)"));
        assert!(text.contains("B brighter than A: true, equivalent: false"));
    }

    #[test]
    fn sample_validation() {
        let analyzer = ComparisonAnalyzer::new(ComparisonKind::AutoLock);
        let mut samples = ComparisonSamples::new();
        assert_eq!(analyzer.process(&samples), Err(CalibError::NoSamples));
        assert_eq!(samples.push(Vec::new()), Err(CalibError::EmptySnapshot));
        samples.push(gray(&[1.0, 2.0])).expect("push");
        assert_eq!(
            samples.push(gray(&[1.0])),
            Err(CalibError::PatchCountMismatch {
                expected: 2,
                got: 1
            })
        );
        assert_eq!(
            analyzer.process(&samples),
            Err(CalibError::OddSampleCount { count: 1 })
        );
    }
}
