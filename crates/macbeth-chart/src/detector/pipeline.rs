use log::{debug, warn};
use macbeth_core::{ImageError, PixelBuffer, PixelBufferView};

use super::{ChartDetectError, ChartDetection, ChartDetectorParams};
use crate::fill::{estimate_spacing, extrapolate, grow_regions};
use crate::gradient::GradientField;
use crate::grid::CandidateGrid;
use crate::hough::{HoughAccumulator, Line, LineFamily, SmoothedAccumulator};
use crate::matching::{align_block, segment_blocks, MatchGrid};
use crate::observer::DetectionObserver;
use crate::reference::PATCH_COUNT;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Single-image MacBeth chart detector.
#[derive(Clone, Debug, Default)]
pub struct ChartDetector {
    params: ChartDetectorParams,
}

impl ChartDetector {
    pub fn new(params: ChartDetectorParams) -> Self {
        Self { params }
    }

    #[inline]
    pub fn params(&self) -> &ChartDetectorParams {
        &self.params
    }

    /// Detect the chart in an RGBA image.
    pub fn detect(&self, image: &PixelBufferView<'_>) -> Result<ChartDetection, ChartDetectError> {
        self.detect_with_observer(image, &mut ())
    }

    /// Detect the chart and report intermediate results to `observer`.
    ///
    /// The observer sees working-image coordinates.
    pub fn detect_with_observer<O: DetectionObserver + ?Sized>(
        &self,
        image: &PixelBufferView<'_>,
        observer: &mut O,
    ) -> Result<ChartDetection, ChartDetectError> {
        let working = self.working_buffer(image)?;
        let mut detection = self.detect_working(&working, observer)?;
        detection.source_width = image.width;
        detection.source_height = image.height;
        Ok(detection)
    }

    /// Copy of `image` reduced to the configured working size.
    pub fn working_buffer(&self, image: &PixelBufferView<'_>) -> Result<PixelBuffer, ImageError> {
        let (h, w) = self.params.working_size(image.height, image.width);
        PixelBuffer::resized_from(image, h, w)
    }

    /// Run the pipeline on an image that is already at working size.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, image, observer), fields(width = image.width(), height = image.height()))
    )]
    pub fn detect_working<O: DetectionObserver + ?Sized>(
        &self,
        image: &PixelBuffer,
        observer: &mut O,
    ) -> Result<ChartDetection, ChartDetectError> {
        let params = &self.params;
        let gray = image.to_grayscale()?;
        let field = GradientField::from_gray(&gray);
        let edges = field.non_maximum_suppression();
        observer.on_edges(field.width, field.height, &edges);

        let smoothed = self.vote(&field, &edges)?;
        let vertical = self.lines(&smoothed, LineFamily::Vertical)?;
        let horizontal = self.lines(&smoothed, LineFamily::Horizontal)?;
        observer.on_lines(LineFamily::Vertical, &vertical);
        observer.on_lines(LineFamily::Horizontal, &horizontal);

        let mut grid = CandidateGrid::build(image, &vertical, &horizontal, &params.grid);
        debug!(
            "candidate grid {}x{} with {} cells",
            grid.rows(),
            grid.cols(),
            grid.populated()
        );
        if params.grid.uniformity_filter {
            let dropped = grid.drop_uniform_strips(params.grid.uniformity_threshold);
            debug!("uniformity filter dropped {dropped} cells");
        }
        if grid.populated() == 0 {
            return Err(ChartDetectError::NoCandidates);
        }
        observer.on_candidates(&grid);

        let mut patches = MatchGrid::new();
        for block in segment_blocks(&grid) {
            let Some(aligned) = align_block(&grid, &block) else {
                debug!("block {block:?} exceeds the chart, skipped");
                continue;
            };
            let written = patches.place(&grid, &block, &aligned);
            debug!(
                "block {}x{} at ({}, {}) -> reference ({}, {}), cost {:.1}, {written} placed",
                block.rows, block.cols, block.row, block.col, aligned.row, aligned.col, aligned.cost
            );
        }
        let matched = patches.placed();
        if matched == 0 {
            return Err(ChartDetectError::NoMatches);
        }

        let spacing = estimate_spacing(&patches)
            .ok_or(ChartDetectError::SpacingUndetermined { placed: matched })?;
        let filled = extrapolate(&mut patches, &spacing);
        grow_regions(&mut patches, image, &spacing, &params.fill);
        debug!(
            "spacing row={:.2} col={:.2}, {matched} matched, {filled} extrapolated",
            spacing.row, spacing.col
        );
        let sampled = patches.colors.iter().flatten().flatten().count();
        if sampled < PATCH_COUNT {
            warn!("{} patches could not be sampled", PATCH_COUNT - sampled);
        }
        observer.on_patches(&patches);

        Ok(ChartDetection {
            patches,
            spacing,
            matched,
            width: image.width(),
            height: image.height(),
            source_width: image.width(),
            source_height: image.height(),
            vertical_lines: vertical,
            horizontal_lines: horizontal,
        })
    }

    fn vote(
        &self,
        field: &GradientField,
        edges: &[bool],
    ) -> Result<SmoothedAccumulator, ChartDetectError> {
        let hough = &self.params.hough;
        let mut acc = HoughAccumulator::new();
        let mut voters = 0usize;
        for row in 0..field.height {
            for col in 0..field.width {
                let idx = field.index(row, col);
                if edges[idx] && field.magnitude[idx] > hough.magnitude_threshold {
                    acc.vote(row, col, field.direction[idx]);
                    voters += 1;
                }
            }
        }
        debug!("{voters} edge pixels voted");
        if voters == 0 {
            return Err(ChartDetectError::NoEdges);
        }
        Ok(acc.smooth_angles(hough.angle_window))
    }

    fn lines(
        &self,
        smoothed: &SmoothedAccumulator,
        family: LineFamily,
    ) -> Result<Vec<Line>, ChartDetectError> {
        let angle = smoothed
            .dominant_angle(family)
            .ok_or(ChartDetectError::NoLines { family })?;
        let lines = smoothed.extract_lines(angle, &self.params.hough);
        debug!(
            "{family} family at {angle} deg: {} lines (total {})",
            lines.len(),
            smoothed.total(angle)
        );
        if lines.is_empty() {
            return Err(ChartDetectError::NoLines { family });
        }
        Ok(lines)
    }
}
