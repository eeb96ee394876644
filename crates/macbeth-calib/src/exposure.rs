//! Exposure response from the neutral patches over an exposure sweep.

use log::debug;
use macbeth_chart::{CHART_COLS, NEUTRAL_ROW, REFERENCE_CHART};
use macbeth_core::Color3f;
use serde::{Deserialize, Serialize};

use crate::CalibError;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExposureParams {
    /// Lowest exposure value of the sweep; shifts expected values to be
    /// non-negative.
    pub min_exposure: f32,
    /// Scale from stops to the plotted unit.
    pub scale: f32,
    pub gamma: f32,
}

impl Default for ExposureParams {
    fn default() -> Self {
        Self {
            min_exposure: -3.0,
            scale: 9.0,
            gamma: 2.2,
        }
    }
}

/// One point of a per-channel response scatter.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExposurePoint {
    pub expected: f32,
    pub measured: f32,
}

/// Response scatter of each channel.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ExposureResponse {
    pub red: Vec<ExposurePoint>,
    pub green: Vec<ExposurePoint>,
    pub blue: Vec<ExposurePoint>,
}

impl ExposureResponse {
    /// Least-squares fit per channel, in `[red, green, blue]` order.
    pub fn fit(&self) -> [Option<ResponseCurve>; 3] {
        [
            ResponseCurve::fit(&self.red),
            ResponseCurve::fit(&self.green),
            ResponseCurve::fit(&self.blue),
        ]
    }
}

/// Straight line `measured = slope * expected + intercept`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResponseCurve {
    pub slope: f32,
    pub intercept: f32,
    /// Coefficient of determination; 1 when the points are exactly on the line.
    pub r_squared: f32,
}

impl ResponseCurve {
    /// `None` with fewer than two points or no spread in `expected`.
    pub fn fit(points: &[ExposurePoint]) -> Option<Self> {
        if points.len() < 2 {
            return None;
        }
        let n = points.len() as f64;
        let mean_x = points.iter().map(|p| p.expected as f64).sum::<f64>() / n;
        let mean_y = points.iter().map(|p| p.measured as f64).sum::<f64>() / n;
        let (mut sxx, mut sxy, mut syy) = (0.0f64, 0.0f64, 0.0f64);
        for p in points {
            let dx = p.expected as f64 - mean_x;
            let dy = p.measured as f64 - mean_y;
            sxx += dx * dx;
            sxy += dx * dy;
            syy += dy * dy;
        }
        if sxx <= f64::EPSILON {
            return None;
        }
        let slope = sxy / sxx;
        let r_squared = if syy <= f64::EPSILON {
            1.0
        } else {
            (sxy * sxy) / (sxx * syy)
        };
        Some(Self {
            slope: slope as f32,
            intercept: (mean_y - slope * mean_x) as f32,
            r_squared: r_squared as f32,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct ExposureSample {
    exposure_value: f32,
    patches: Vec<Color3f>,
}

/// Accumulates neutral-row captures taken at different exposure values.
#[derive(Clone, Debug, Default)]
pub struct ExposureAnalyzer {
    params: ExposureParams,
    samples: Vec<ExposureSample>,
}

impl ExposureAnalyzer {
    pub fn new(params: ExposureParams) -> Self {
        Self {
            params,
            samples: Vec::new(),
        }
    }

    #[inline]
    pub fn params(&self) -> &ExposureParams {
        &self.params
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Add the six neutral patches (dark to light) captured at
    /// `exposure_value`.
    pub fn push(&mut self, exposure_value: f32, patches: Vec<Color3f>) -> Result<(), CalibError> {
        if patches.len() != CHART_COLS {
            return Err(CalibError::PatchCountMismatch {
                expected: CHART_COLS,
                got: patches.len(),
            });
        }
        self.samples.push(ExposureSample {
            exposure_value,
            patches,
        });
        Ok(())
    }

    /// Expected response of a reference channel value at an exposure value:
    /// `(log2(reference / 255) * gamma + ev - min_exposure) * scale`.
    pub fn expected(&self, reference: f32, exposure_value: f32) -> f32 {
        let p = &self.params;
        ((reference / 255.0).log2() * p.gamma + exposure_value - p.min_exposure) * p.scale
    }

    pub fn process(&self) -> Result<ExposureResponse, CalibError> {
        if self.samples.is_empty() {
            return Err(CalibError::NoSamples);
        }
        let neutral = &REFERENCE_CHART[NEUTRAL_ROW];
        let mut out = ExposureResponse::default();
        for sample in &self.samples {
            let ev = sample.exposure_value;
            for (reference, measured) in neutral.iter().zip(&sample.patches) {
                let reference = reference.to_f32();
                out.red.push(ExposurePoint {
                    expected: self.expected(reference.r, ev),
                    measured: measured.r,
                });
                out.green.push(ExposurePoint {
                    expected: self.expected(reference.g, ev),
                    measured: measured.g,
                });
                out.blue.push(ExposurePoint {
                    expected: self.expected(reference.b, ev),
                    measured: measured.b,
                });
            }
        }
        debug!(
            "exposure response: {} samples, {} points per channel",
            self.samples.len(),
            out.green.len()
        );
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn expected_value_formula() {
        let a = ExposureAnalyzer::default();
        // reference 255 contributes log2(1) = 0
        assert_abs_diff_eq!(a.expected(255.0, 0.0), 27.0, epsilon = 1e-4);
        assert_abs_diff_eq!(a.expected(255.0, -3.0), 0.0, epsilon = 1e-4);
        // half intensity is one stop down, times gamma
        assert_abs_diff_eq!(a.expected(127.5, 1.0), (-2.2 + 4.0) * 9.0, epsilon = 1e-3);
    }

    #[test]
    fn process_emits_one_point_per_patch_and_channel() {
        let mut a = ExposureAnalyzer::new(ExposureParams::default());
        assert_eq!(a.process(), Err(CalibError::NoSamples));
        let patches: Vec<Color3f> = REFERENCE_CHART[NEUTRAL_ROW]
            .iter()
            .map(|c| c.to_f32())
            .collect();
        a.push(-1.0, patches.clone()).expect("push");
        a.push(1.0, patches).expect("push");
        assert_eq!(
            a.push(0.0, vec![Color3f::default(); 3]),
            Err(CalibError::PatchCountMismatch {
                expected: 6,
                got: 3
            })
        );
        let response = a.process().expect("process");
        assert_eq!(response.red.len(), 12);
        assert_eq!(response.green[5].measured, 243.0);
        // dark to light within a sample
        assert!(response.green[0].expected < response.green[5].expected);
        // higher exposure shifts every expected value by 2 stops * scale
        assert_abs_diff_eq!(
            response.green[6].expected - response.green[0].expected,
            18.0,
            epsilon = 1e-3
        );
    }

    #[test]
    fn params_fill_missing_fields_from_defaults() {
        let params: ExposureParams =
            serde_json::from_str(r#"{ "min_exposure": -2.0 }"#).expect("params");
        assert_eq!(params.min_exposure, -2.0);
        assert_eq!(params.scale, 9.0);
        assert_eq!(params.gamma, 2.2);
    }

    #[test]
    fn line_fit_recovers_slope() {
        let points: Vec<ExposurePoint> = (0..5)
            .map(|i| ExposurePoint {
                expected: i as f32,
                measured: 3.0 * i as f32 + 2.0,
            })
            .collect();
        let curve = ResponseCurve::fit(&points).expect("fit");
        assert_abs_diff_eq!(curve.slope, 3.0, epsilon = 1e-5);
        assert_abs_diff_eq!(curve.intercept, 2.0, epsilon = 1e-5);
        assert_abs_diff_eq!(curve.r_squared, 1.0, epsilon = 1e-5);
        assert!(ResponseCurve::fit(&points[..1]).is_none());
        let flat = vec![
            ExposurePoint {
                expected: 1.0,
                measured: 0.0
            };
            3
        ];
        assert!(ResponseCurve::fit(&flat).is_none());
    }
}
