//! Debug side-channel for the detection pipeline.

use macbeth_core::{PixelBuffer, Point2};

use crate::grid::CandidateGrid;
use crate::hough::{Line, LineFamily};
use crate::matching::MatchGrid;

/// Receives intermediate pipeline results. Every hook defaults to a no-op.
pub trait DetectionObserver {
    /// Edge mask after non-maximum suppression, row-major.
    fn on_edges(&mut self, _width: usize, _height: usize, _edges: &[bool]) {}
    fn on_lines(&mut self, _family: LineFamily, _lines: &[Line]) {}
    fn on_candidates(&mut self, _grid: &CandidateGrid) {}
    fn on_patches(&mut self, _patches: &MatchGrid) {}
}

impl DetectionObserver for () {}

const EDGE: [u8; 4] = [255, 0, 0, 255];
const LINE: [u8; 4] = [0, 255, 0, 255];
const CANDIDATE: [u8; 4] = [0, 128, 255, 255];
const PATCH: [u8; 4] = [255, 255, 0, 255];

/// RGBA canvas that draws what the pipeline reports.
#[derive(Clone, Debug)]
pub struct OverlayCanvas {
    width: usize,
    height: usize,
    rgba: Vec<u8>,
}

impl OverlayCanvas {
    /// Canvas initialized with a copy of `image`; missing channels are filled
    /// from the first one and alpha is opaque.
    pub fn from_buffer(image: &PixelBuffer) -> Self {
        let (w, h, ch) = (image.width(), image.height(), image.channels());
        let mut rgba = Vec::with_capacity(w * h * 4);
        for row in 0..h {
            let line = &image.data()[row * image.row_stride()..];
            for col in 0..w {
                let px = &line[col * ch..col * ch + ch];
                let at = |i: usize| px.get(i).copied().unwrap_or(px[0]);
                rgba.extend_from_slice(&[at(0), at(1), at(2), 255]);
            }
        }
        Self {
            width: w,
            height: h,
            rgba,
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Row-major RGBA bytes.
    #[inline]
    pub fn rgba(&self) -> &[u8] {
        &self.rgba
    }

    pub fn into_rgba(self) -> Vec<u8> {
        self.rgba
    }

    fn put(&mut self, row: isize, col: isize, color: [u8; 4]) {
        if row < 0 || col < 0 || row as usize >= self.height || col as usize >= self.width {
            return;
        }
        let i = (row as usize * self.width + col as usize) * 4;
        self.rgba[i..i + 4].copy_from_slice(&color);
    }

    fn cross(&mut self, p: &Point2<f32>, arm: isize, color: [u8; 4]) {
        let (r, c) = (p.y.round() as isize, p.x.round() as isize);
        for d in -arm..=arm {
            self.put(r + d, c, color);
            self.put(r, c + d, color);
        }
    }

    fn circle(&mut self, p: &Point2<f32>, radius: f32, color: [u8; 4]) {
        let steps = ((radius * 8.0).ceil() as usize).max(8);
        for k in 0..steps {
            let t = k as f32 / steps as f32 * std::f32::consts::TAU;
            let (s, c) = t.sin_cos();
            self.put(
                (p.y + radius * s).round() as isize,
                (p.x + radius * c).round() as isize,
                color,
            );
        }
    }
}

impl DetectionObserver for OverlayCanvas {
    fn on_edges(&mut self, width: usize, height: usize, edges: &[bool]) {
        if width != self.width || height != self.height {
            return;
        }
        for (idx, _) in edges.iter().enumerate().filter(|(_, e)| **e) {
            self.put((idx / width) as isize, (idx % width) as isize, EDGE);
        }
    }

    fn on_lines(&mut self, _family: LineFamily, lines: &[Line]) {
        for line in lines {
            for row in 0..self.height {
                for col in 0..self.width {
                    if line.distance(row as f64, col as f64).abs() < 0.5 {
                        self.put(row as isize, col as isize, LINE);
                    }
                }
            }
        }
    }

    fn on_candidates(&mut self, grid: &CandidateGrid) {
        for (_, _, cell) in grid.iter() {
            self.cross(&cell.center, 1, CANDIDATE);
        }
    }

    fn on_patches(&mut self, patches: &MatchGrid) {
        for (r, c, p) in patches.iter_placed() {
            self.circle(&p, patches.radii_sq[r][c].sqrt().max(1.0), PATCH);
        }
    }
}
