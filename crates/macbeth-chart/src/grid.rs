//! Candidate cells between adjacent line pairs.

use macbeth_core::{midpoint, pixel_of, Color3f, Color3i, PixelBuffer, Point2};
use serde::{Deserialize, Serialize};

use crate::detector::GridParams;
use crate::hough::Line;

/// A quadrilateral between two adjacent lines of each family.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CandidateCell {
    pub center: Point2<f32>,
    pub color: Color3i,
}

/// Row-major grid of candidate cells. Rows follow the horizontal lines,
/// columns the vertical ones.
#[derive(Clone, Debug, PartialEq)]
pub struct CandidateGrid {
    rows: usize,
    cols: usize,
    cells: Vec<Option<CandidateCell>>,
}

impl CandidateGrid {
    /// Build cells from consecutive line pairs.
    ///
    /// Cell `(a, b)` uses the corners `V[b] ∩ H[a]` and `V[b+1] ∩ H[a+1]`. It
    /// is kept when both corners lie inside the image and their separation
    /// along each axis is strictly between the configured extents. Its color
    /// is the pixel at the rounded midpoint.
    pub fn build(
        image: &PixelBuffer,
        vertical: &[Line],
        horizontal: &[Line],
        params: &GridParams,
    ) -> Self {
        let rows = horizontal.len().saturating_sub(1);
        let cols = vertical.len().saturating_sub(1);
        let (w, h) = (image.width(), image.height());
        let inside = |p: &Point2<f32>| {
            p.x >= 0.0 && p.y >= 0.0 && p.x < w as f32 && p.y < h as f32
        };
        let extent_ok =
            |d: f32| d.abs() > params.min_cell_extent && d.abs() < params.max_cell_extent;

        let mut cells = Vec::with_capacity(rows * cols);
        for a in 0..rows {
            for b in 0..cols {
                let cell = vertical[b]
                    .intersect(&horizontal[a])
                    .zip(vertical[b + 1].intersect(&horizontal[a + 1]))
                    .filter(|(p1, p2)| inside(p1) && inside(p2))
                    .filter(|(p1, p2)| extent_ok(p2.x - p1.x) && extent_ok(p2.y - p1.y))
                    .and_then(|(p1, p2)| {
                        let center = midpoint(&p1, &p2);
                        let (row, col) = pixel_of(&center, w, h)?;
                        Some(CandidateCell {
                            center,
                            color: image.sample(row, col),
                        })
                    });
                cells.push(cell);
            }
        }
        Self { rows, cols, cells }
    }

    /// Grid from row-major cells.
    ///
    /// # Panics
    /// When `cells.len() != rows * cols`.
    pub fn from_cells(rows: usize, cols: usize, cells: Vec<Option<CandidateCell>>) -> Self {
        assert_eq!(cells.len(), rows * cols, "cell count must be rows * cols");
        Self { rows, cols, cells }
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> Option<&CandidateCell> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        self.cells[row * self.cols + col].as_ref()
    }

    pub fn populated(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, &CandidateCell)> + '_ {
        self.cells.iter().enumerate().filter_map(move |(idx, c)| {
            c.as_ref().map(|cell| (idx / self.cols, idx % self.cols, cell))
        })
    }

    /// Null every row and column whose populated cells have nearly the same
    /// color. Rows and columns are judged on the grid as built, then both
    /// sets are cleared.
    pub fn drop_uniform_strips(&mut self, threshold: f32) -> usize {
        let uniform_rows: Vec<usize> = (0..self.rows)
            .filter(|&r| self.is_uniform((0..self.cols).map(|c| (r, c)), threshold))
            .collect();
        let uniform_cols: Vec<usize> = (0..self.cols)
            .filter(|&c| self.is_uniform((0..self.rows).map(|r| (r, c)), threshold))
            .collect();

        let before = self.populated();
        for &r in &uniform_rows {
            for c in 0..self.cols {
                self.cells[r * self.cols + c] = None;
            }
        }
        for &c in &uniform_cols {
            for r in 0..self.rows {
                self.cells[r * self.cols + c] = None;
            }
        }
        before - self.populated()
    }

    fn is_uniform(&self, strip: impl Iterator<Item = (usize, usize)>, threshold: f32) -> bool {
        let colors: Vec<Color3f> = strip
            .filter_map(|(r, c)| self.get(r, c))
            .map(|cell| cell.color.to_f32())
            .collect();
        if colors.len() <= 1 {
            return false;
        }
        let Some(mean) = Color3f::mean(&colors) else {
            return false;
        };
        let mse = colors
            .iter()
            .map(|c| c.distance_squared(&mean))
            .sum::<f32>()
            / colors.len() as f32;
        mse.sqrt() <= threshold
    }
}
