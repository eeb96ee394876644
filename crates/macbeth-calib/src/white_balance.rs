//! Correlated color temperature of white balance modes relative to a
//! daylight capture of the same chart.

use log::debug;
use macbeth_core::Color3f;
use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};

use crate::CalibError;

/// Linear sRGB (D65) to CIE XYZ.
#[rustfmt::skip]
const SRGB_TO_XYZ: [f32; 9] = [
    0.4124, 0.3576, 0.1805,
    0.2126, 0.7152, 0.0722,
    0.0193, 0.1192, 0.9505,
];

/// Correction applied to the averaged ratio before the temperature fit.
const RATIO_CORRECTION: Color3f = Color3f::new(0.9781, 1.0, 0.9021);

/// sRGB transfer function inverse for an 8-bit channel value.
pub fn convert_to_linear(c: f32) -> f32 {
    let v = c / 255.0;
    if v <= 0.04045 {
        v / 12.92
    } else {
        ((v + 0.055) / 1.055).powf(2.4)
    }
}

/// CIE XYZ of an 8-bit sRGB color.
pub fn rgb_to_xyz(color: &Color3f) -> Color3f {
    let m = Matrix3::from_row_slice(&SRGB_TO_XYZ);
    let linear = Vector3::new(
        convert_to_linear(color.r),
        convert_to_linear(color.g),
        convert_to_linear(color.b),
    );
    let xyz = m * linear;
    Color3f::new(xyz.x, xyz.y, xyz.z)
}

/// McCamy's cubic approximation of the correlated color temperature, with
/// the exponential terms of Hernández-Andrés et al. Returns kelvin,
/// truncated.
///
/// `None` when the chromaticity is undefined (a black or non-finite white
/// point) or the fit leaves the positive range.
pub fn correlated_color_temperature(xyz: &Color3f) -> Option<i32> {
    let sum = (xyz.r + xyz.g + xyz.b) as f64;
    if !sum.is_finite() || sum <= 0.0 {
        return None;
    }
    let x = xyz.r as f64 / sum;
    let y = xyz.g as f64 / sum;
    let n = (x - 0.3366) / (y - 0.1735);
    let cct = -949.86315
        + 6253.80338 * (-n / 0.92159).exp()
        + 28.70599 * (-n / 0.20039).exp()
        + 0.00004 * (-n / 0.07125).exp();
    (1.0..=i32::MAX as f64).contains(&cct).then_some(cct as i32)
}

/// Camera white balance setting under test.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WhiteBalanceMode {
    Auto,
    Daylight,
    Cloudy,
    Fluorescent,
    Incandescent,
}

/// Holds the daylight baseline and estimates the temperature of the other
/// modes against it.
#[derive(Clone, Debug, Default)]
pub struct WhiteBalanceAnalyzer {
    baseline: Option<Vec<Color3f>>,
}

impl WhiteBalanceAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Per-patch XYZ of the daylight capture, if one was processed.
    pub fn baseline(&self) -> Option<&[Color3f]> {
        self.baseline.as_deref()
    }

    /// Daylight stores the baseline and yields `None`; every other mode
    /// yields its correlated color temperature.
    pub fn process(
        &mut self,
        mode: WhiteBalanceMode,
        patches: &[Color3f],
    ) -> Result<Option<i32>, CalibError> {
        match mode {
            WhiteBalanceMode::Daylight => {
                self.set_baseline(patches)?;
                Ok(None)
            }
            _ => {
                let cct = self.estimate(patches)?;
                debug!("{mode:?}: {cct} K");
                Ok(Some(cct))
            }
        }
    }

    pub fn set_baseline(&mut self, patches: &[Color3f]) -> Result<(), CalibError> {
        if patches.len() < 2 {
            return Err(CalibError::TooFewPatches {
                min: 2,
                got: patches.len(),
            });
        }
        self.baseline = Some(patches.iter().map(rgb_to_xyz).collect());
        Ok(())
    }

    /// Average per-patch ratio `daylight / sample` in XYZ over every patch
    /// but the first, corrected and turned into a temperature.
    pub fn estimate(&self, patches: &[Color3f]) -> Result<i32, CalibError> {
        let baseline = self.baseline.as_ref().ok_or(CalibError::MissingBaseline)?;
        if patches.len() < 2 {
            return Err(CalibError::TooFewPatches {
                min: 2,
                got: patches.len(),
            });
        }
        if patches.len() != baseline.len() {
            return Err(CalibError::PatchCountMismatch {
                expected: baseline.len(),
                got: patches.len(),
            });
        }
        let ratios: Vec<Color3f> = baseline
            .iter()
            .zip(patches)
            .skip(1)
            .map(|(day, sample)| *day / rgb_to_xyz(sample))
            .filter(Color3f::is_finite)
            .collect();
        let mean = Color3f::mean(&ratios).ok_or(CalibError::NoUsablePatches)?;
        correlated_color_temperature(&(mean * RATIO_CORRECTION)).ok_or(CalibError::NoUsablePatches)
    }
}
