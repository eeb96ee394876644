use macbeth_core::{Color3f, ImageError, PixelBuffer, Point2};
use serde::{Deserialize, Serialize};

use crate::fill::Spacing;
use crate::hough::Line;
use crate::matching::MatchGrid;
use crate::reference::{CHART_COLS, CHART_ROWS};

/// Output of a successful chart detection.
///
/// Positions, spacing and radii are expressed in the frame given by
/// `width` x `height`, which is the working image unless the detection was
/// mapped with [`ChartDetection::scaled_to_source`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChartDetection {
    pub patches: MatchGrid,
    pub spacing: Spacing,
    /// Patches placed by block matching; the rest were extrapolated.
    pub matched: usize,
    pub width: usize,
    pub height: usize,
    /// Size of the image handed to the detector.
    pub source_width: usize,
    pub source_height: usize,
    pub vertical_lines: Vec<Line>,
    pub horizontal_lines: Vec<Line>,
}

impl ChartDetection {
    /// Per-axis factor between the source image and the detection frame.
    fn block_scale(&self) -> (f32, f32) {
        let ws = (self.source_width / self.width.max(1)).max(1) as f32;
        let hs = (self.source_height / self.height.max(1)).max(1) as f32;
        (ws, hs)
    }

    /// Map the detection into source image coordinates.
    ///
    /// The working image averages `ws` x `hs` source blocks, so a working
    /// pixel center `x` maps to `(x + 0.5) * ws - 0.5`.
    pub fn scaled_to_source(&self) -> ChartDetection {
        let (ws, hs) = self.block_scale();
        let mut patches = self.patches.clone();
        for row in patches.positions.iter_mut() {
            for p in row.iter_mut().flatten() {
                *p = Point2::new((p.x + 0.5) * ws - 0.5, (p.y + 0.5) * hs - 0.5);
            }
        }
        for row in patches.radii_sq.iter_mut() {
            for r in row.iter_mut() {
                *r *= ws * hs;
            }
        }
        ChartDetection {
            patches,
            spacing: Spacing {
                row: self.spacing.row * hs,
                col: self.spacing.col * ws,
            },
            matched: self.matched,
            width: self.source_width,
            height: self.source_height,
            source_width: self.source_width,
            source_height: self.source_height,
            vertical_lines: self.vertical_lines.clone(),
            horizontal_lines: self.horizontal_lines.clone(),
        }
    }

    /// Patch centers in reference layout; missing positions are NaN.
    pub fn centers(&self) -> [[Point2<f32>; CHART_COLS]; CHART_ROWS] {
        self.patches
            .positions
            .map(|row| row.map(|p| p.unwrap_or(Point2::new(f32::NAN, f32::NAN))))
    }

    /// Re-sample the discovered patches on another frame of the same scene.
    ///
    /// The frame must have the size of this detection's frame. Patches are
    /// returned in row-major reference order; a patch is `None` when it had
    /// no sampled region at detection time (for example because its center
    /// fell outside the image) or when its disc covers no pixel of `frame`.
    pub fn sample_frame(&self, frame: &PixelBuffer) -> Result<Vec<Option<Color3f>>, ImageError> {
        if frame.width() != self.width || frame.height() != self.height {
            return Err(ImageError::GeometryMismatch {
                expected_height: self.height,
                expected_width: self.width,
                height: frame.height(),
                width: frame.width(),
            });
        }
        let patches = &self.patches;
        Ok(patches
            .positions
            .iter()
            .zip(&patches.radii_sq)
            .flat_map(|(centers, radii)| centers.iter().zip(radii))
            .map(|(&center, &radius_sq)| {
                center.and_then(|center| frame.sample_disc(&center, radius_sq))
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use macbeth_core::PixelBufferView;

    fn detection(width: usize, height: usize, source: (usize, usize)) -> ChartDetection {
        let mut patches = MatchGrid::new();
        for r in 0..CHART_ROWS {
            for c in 0..CHART_COLS {
                patches.positions[r][c] = Some(Point2::new(
                    5.0 + 10.0 * c as f32,
                    5.0 + 10.0 * r as f32,
                ));
                patches.radii_sq[r][c] = 4.0;
            }
        }
        ChartDetection {
            patches,
            spacing: Spacing {
                row: 10.0,
                col: 10.0,
            },
            matched: 24,
            width,
            height,
            source_width: source.0,
            source_height: source.1,
            vertical_lines: Vec::new(),
            horizontal_lines: Vec::new(),
        }
    }

    #[test]
    fn scaling_maps_block_centers() {
        let d = detection(60, 40, (240, 160)).scaled_to_source();
        let p = d.patches.positions[0][0].expect("position");
        assert_abs_diff_eq!(p.x, 21.5, epsilon = 1e-5);
        assert_abs_diff_eq!(p.y, 21.5, epsilon = 1e-5);
        assert_abs_diff_eq!(d.patches.radii_sq[1][1], 64.0, epsilon = 1e-5);
        assert_eq!((d.width, d.height), (240, 160));
        assert_abs_diff_eq!(d.spacing.col, 40.0, epsilon = 1e-5);
        // already in source frame
        assert_eq!(d.scaled_to_source(), d);
    }

    #[test]
    fn unsampled_patches_are_skipped() {
        let mut d = detection(60, 40, (60, 40));
        d.patches.radii_sq[0][4] = 0.0;
        d.patches.positions[2][1] = None;
        d.patches.positions[3][5] = Some(Point2::new(-30.0, 35.0));
        let data = vec![100u8; 60 * 40 * 4];
        let frame =
            PixelBuffer::from_view(&PixelBufferView::packed(60, 40, 4, &data)).expect("frame");
        let colors = d.sample_frame(&frame).expect("sample");
        assert_eq!(colors.len(), 24);
        assert!(colors[4].is_none());
        assert!(colors[2 * CHART_COLS + 1].is_none());
        assert!(colors[3 * CHART_COLS + 5].is_none());
        assert_eq!(colors.iter().flatten().count(), 21);
    }

    #[test]
    fn sample_frame_checks_geometry() {
        let d = detection(60, 40, (60, 40));
        let data: Vec<u8> = (0..60 * 40).flat_map(|_| [10u8, 20, 30, 255]).collect();
        let frame =
            PixelBuffer::from_view(&PixelBufferView::packed(60, 40, 4, &data)).expect("frame");
        let colors = d.sample_frame(&frame).expect("sample");
        assert_eq!(colors.len(), 24);
        for c in &colors {
            let c = c.expect("color");
            assert_abs_diff_eq!(c.r, 10.0, epsilon = 1e-3);
            assert_abs_diff_eq!(c.b, 30.0, epsilon = 1e-3);
        }

        let small_view = PixelBufferView::packed(30, 40, 4, &data[..30 * 40 * 4]);
        let small = PixelBuffer::from_view(&small_view).expect("frame");
        assert!(matches!(
            d.sample_frame(&small),
            Err(ImageError::GeometryMismatch { .. })
        ));
    }
}
