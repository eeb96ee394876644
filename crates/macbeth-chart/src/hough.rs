//! Hough line detection in a 45°-rotated frame.
//!
//! Pixel `(i, j)` (row, column) is rotated to `a = (i - j)/√2`,
//! `b = (i + j)/√2`. A line with angle bucket `φ` and radius `r` is the set of
//! points with `a·sin φ - b·cos φ = r`. An edge pixel with gradient direction
//! `θ` votes for `φ = (225 - θ) mod 180`. With this parameterization the
//! chart's column boundaries fall near `φ = 45` and row boundaries near
//! `φ = 135`.

use std::f64::consts::FRAC_1_SQRT_2;
use std::fmt;

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::detector::HoughParams;

pub const ANGLE_BINS: usize = 180;
pub const RADIUS_BINS: usize = 200;
const RADIUS_OFFSET: f64 = 100.0;
const RADIUS_STEP: f64 = 2.0;

/// Which of the two dominant line directions a line belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineFamily {
    /// Angle buckets in `[0, 90)`: chart column boundaries.
    Vertical,
    /// Angle buckets in `[90, 180)`: chart row boundaries.
    Horizontal,
}

impl LineFamily {
    fn angle_range(self) -> std::ops::Range<usize> {
        match self {
            Self::Vertical => 0..90,
            Self::Horizontal => 90..ANGLE_BINS,
        }
    }
}

impl fmt::Display for LineFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Vertical => f.write_str("vertical"),
            Self::Horizontal => f.write_str("horizontal"),
        }
    }
}

/// A detected line as `(angle bucket, radius bucket)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Line {
    pub angle: usize,
    pub radius: usize,
}

impl Line {
    #[inline]
    fn angle_rad(&self) -> f64 {
        (self.angle as f64).to_radians()
    }

    /// Signed radius in pixels at the center of the bucket.
    #[inline]
    pub fn radius_px(&self) -> f64 {
        (self.radius as f64 - RADIUS_OFFSET) * RADIUS_STEP + RADIUS_STEP / 2.0
    }

    /// Signed distance of pixel `(row, col)` from the line.
    pub fn distance(&self, row: f64, col: f64) -> f64 {
        let (a, b) = rotate(row, col);
        let (s, c) = self.angle_rad().sin_cos();
        a * s - b * c - self.radius_px()
    }

    /// Intersection with another line as an image point (`x` = column,
    /// `y` = row); `None` for (near) parallel lines.
    pub fn intersect(&self, other: &Line) -> Option<Point2<f32>> {
        let (s1, c1) = self.angle_rad().sin_cos();
        let (s2, c2) = other.angle_rad().sin_cos();
        let (r1, r2) = (self.radius_px(), other.radius_px());
        let det = c1 * s2 - s1 * c2;
        if det.abs() < 1e-6 {
            return None;
        }
        let a = (c1 * r2 - c2 * r1) / det;
        let b = (s1 * r2 - s2 * r1) / det;
        let row = (a + b) * FRAC_1_SQRT_2;
        let col = (b - a) * FRAC_1_SQRT_2;
        Some(Point2::new(col as f32, row as f32))
    }
}

#[inline]
fn rotate(row: f64, col: f64) -> (f64, f64) {
    ((row - col) * FRAC_1_SQRT_2, (row + col) * FRAC_1_SQRT_2)
}

/// Vote histogram over `(angle, radius)` buckets.
#[derive(Clone, Debug)]
pub struct HoughAccumulator {
    votes: Vec<u32>, // [angle * RADIUS_BINS + radius]
}

impl Default for HoughAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl HoughAccumulator {
    pub fn new() -> Self {
        Self {
            votes: vec![0; ANGLE_BINS * RADIUS_BINS],
        }
    }

    #[inline]
    pub fn get(&self, angle: usize, radius: usize) -> u32 {
        self.votes[angle * RADIUS_BINS + radius]
    }

    pub fn total(&self) -> u64 {
        self.votes.iter().map(|&v| v as u64).sum()
    }

    /// Cast the single vote of an edge pixel with gradient direction
    /// `direction` (whole degrees, `[0, 180)`). Returns the voted line.
    pub fn vote(&mut self, row: usize, col: usize, direction: u16) -> Line {
        let angle = (225 - direction as usize % 180) % 180;
        let (a, b) = rotate(row as f64, col as f64);
        let (s, c) = (angle as f64).to_radians().sin_cos();
        let r = a * s - b * c;
        let bin = (r / RADIUS_STEP + RADIUS_OFFSET)
            .floor()
            .clamp(0.0, (RADIUS_BINS - 1) as f64) as usize;
        self.votes[angle * RADIUS_BINS + bin] += 1;
        Line { angle, radius: bin }
    }

    /// Accumulator box-summed over `±window` angles. Rows whose window would
    /// leave `[0, 180)` stay zero.
    pub fn smooth_angles(&self, window: usize) -> SmoothedAccumulator {
        let mut votes = vec![0u32; ANGLE_BINS * RADIUS_BINS];
        for angle in window..ANGLE_BINS.saturating_sub(window) {
            let out = &mut votes[angle * RADIUS_BINS..(angle + 1) * RADIUS_BINS];
            for k in angle - window..=angle + window {
                let src = &self.votes[k * RADIUS_BINS..(k + 1) * RADIUS_BINS];
                for (o, &v) in out.iter_mut().zip(src) {
                    *o += v;
                }
            }
        }
        let totals = (0..ANGLE_BINS)
            .map(|angle| {
                votes[angle * RADIUS_BINS..(angle + 1) * RADIUS_BINS]
                    .iter()
                    .map(|&v| v as u64)
                    .sum()
            })
            .collect();
        let raw_totals = (0..ANGLE_BINS)
            .map(|angle| {
                self.votes[angle * RADIUS_BINS..(angle + 1) * RADIUS_BINS]
                    .iter()
                    .map(|&v| v as u64)
                    .sum()
            })
            .collect();
        SmoothedAccumulator {
            votes,
            totals,
            raw_totals,
        }
    }
}

/// Angle-smoothed accumulator with per-angle vote totals.
#[derive(Clone, Debug)]
pub struct SmoothedAccumulator {
    votes: Vec<u32>,
    totals: Vec<u64>,
    raw_totals: Vec<u64>,
}

impl SmoothedAccumulator {
    #[inline]
    pub fn total(&self, angle: usize) -> u64 {
        self.totals[angle]
    }

    /// Angle with the largest smoothed total inside the family's range.
    ///
    /// A plateau of equal totals resolves to the angle with the most raw
    /// votes, then to the smallest angle. `None` when the family got no votes.
    pub fn dominant_angle(&self, family: LineFamily) -> Option<usize> {
        let mut best: Option<usize> = None;
        for angle in family.angle_range() {
            let t = self.totals[angle];
            if t == 0 {
                continue;
            }
            let better = match best {
                None => true,
                Some(b) => {
                    t > self.totals[b]
                        || (t == self.totals[b] && self.raw_totals[angle] > self.raw_totals[b])
                }
            };
            if better {
                best = Some(angle);
            }
        }
        best
    }

    /// Lines of one family at `angle`, in increasing radius order.
    pub fn extract_lines(&self, angle: usize, params: &HoughParams) -> Vec<Line> {
        let row = &self.votes[angle * RADIUS_BINS..(angle + 1) * RADIUS_BINS];
        let w = params.radius_window;
        let window = |r: usize| r.saturating_sub(w)..=(r + w).min(RADIUS_BINS - 1);

        let smoothed: Vec<u32> = (0..RADIUS_BINS)
            .map(|r| window(r).map(|m| row[m]).sum())
            .collect();

        let peaks: Vec<usize> = (0..RADIUS_BINS)
            .filter(|&r| {
                smoothed[r] >= params.min_line_votes
                    && window(r).all(|m| smoothed[r] >= smoothed[m])
            })
            .collect();

        merge_peaks(&peaks, params.merge_distance)
            .into_iter()
            .map(|radius| Line { angle, radius })
            .collect()
    }
}

/// Merge sorted peak positions closer than `distance` into their rounded mean.
fn merge_peaks(peaks: &[usize], distance: usize) -> Vec<usize> {
    let mut out = Vec::new();
    let mut cluster: Vec<usize> = Vec::new();
    for &p in peaks {
        if let Some(&last) = cluster.last() {
            if p - last >= distance {
                out.push(cluster_mean(&cluster));
                cluster.clear();
            }
        }
        cluster.push(p);
    }
    if !cluster.is_empty() {
        out.push(cluster_mean(&cluster));
    }
    out
}

fn cluster_mean(cluster: &[usize]) -> usize {
    let sum: usize = cluster.iter().sum();
    (sum as f64 / cluster.len() as f64).round() as usize
}
