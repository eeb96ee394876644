//! Central-difference gradients and non-maximum suppression.

use macbeth_core::GrayImage;

/// Gradient direction quantized to one of the four principal directions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DirectionBucket {
    #[default]
    Deg0,
    Deg45,
    Deg90,
    Deg135,
}

impl DirectionBucket {
    /// Nearest bucket for an angle in degrees on `[0, 180)`; exact ties go to
    /// the steeper neighbor (the one closer to 90°).
    pub fn from_degrees(angle: f32) -> Self {
        let t = angle / 45.0;
        let lo = t.floor();
        let frac = t - lo;
        let k = if frac > 0.5 {
            lo + 1.0
        } else if frac < 0.5 {
            lo
        } else if (lo - 2.0).abs() < (lo - 1.0).abs() {
            lo
        } else {
            lo + 1.0
        };
        match (k as i32).rem_euclid(4) {
            0 => Self::Deg0,
            1 => Self::Deg45,
            2 => Self::Deg90,
            _ => Self::Deg135,
        }
    }

    /// Row/column offsets of the two neighbors perpendicular to this
    /// direction. Directions are measured from the column axis towards the
    /// row axis.
    fn perpendicular_offsets(self) -> [(isize, isize); 2] {
        match self {
            Self::Deg0 => [(-1, 0), (1, 0)],
            Self::Deg45 => [(1, -1), (-1, 1)],
            Self::Deg90 => [(0, -1), (0, 1)],
            Self::Deg135 => [(1, 1), (-1, -1)],
        }
    }
}

/// Per-pixel gradient of a grayscale layer. Border pixels are zero.
#[derive(Clone, Debug)]
pub struct GradientField {
    pub width: usize,
    pub height: usize,
    pub dx: Vec<f32>,
    pub dy: Vec<f32>,
    pub magnitude: Vec<f32>,
    /// `atan(dy/dx)` in whole degrees on `[0, 180)`.
    pub direction: Vec<u16>,
    pub bucket: Vec<DirectionBucket>,
}

impl GradientField {
    pub fn from_gray(gray: &GrayImage) -> Self {
        let (w, h) = (gray.width, gray.height);
        let n = w * h;
        let mut field = Self {
            width: w,
            height: h,
            dx: vec![0.0; n],
            dy: vec![0.0; n],
            magnitude: vec![0.0; n],
            direction: vec![0; n],
            bucket: vec![DirectionBucket::Deg0; n],
        };
        if w < 3 || h < 3 {
            return field;
        }

        for row in 1..h - 1 {
            for col in 1..w - 1 {
                let dx = gray.get(row, col + 1) as f32 - gray.get(row, col - 1) as f32;
                let dy = gray.get(row + 1, col) as f32 - gray.get(row - 1, col) as f32;
                let idx = row * w + col;
                field.dx[idx] = dx;
                field.dy[idx] = dy;
                field.magnitude[idx] = (dx * dx + dy * dy).sqrt();
                let angle = gradient_angle(dx, dy);
                field.direction[idx] = (angle.round() as u16) % 180;
                field.bucket[idx] = DirectionBucket::from_degrees(angle);
            }
        }
        field
    }

    #[inline]
    pub fn index(&self, row: usize, col: usize) -> usize {
        row * self.width + col
    }

    /// Edge mask: a pixel with non-zero gradient is an edge when its
    /// magnitude is not smaller than either neighbor perpendicular to its
    /// bucketed gradient direction.
    pub fn non_maximum_suppression(&self) -> Vec<bool> {
        let (w, h) = (self.width, self.height);
        let mut edges = vec![false; w * h];
        if w < 3 || h < 3 {
            return edges;
        }
        for row in 1..h - 1 {
            for col in 1..w - 1 {
                let idx = self.index(row, col);
                let mag = self.magnitude[idx];
                if mag <= 0.0 {
                    continue;
                }
                edges[idx] = self.bucket[idx]
                    .perpendicular_offsets()
                    .iter()
                    .all(|&(dr, dc)| {
                        let r = row.wrapping_add_signed(dr);
                        let c = col.wrapping_add_signed(dc);
                        mag >= self.magnitude[self.index(r, c)]
                    });
            }
        }
        edges
    }
}

/// `atan(dy/dx)` in degrees folded to `[0, 180)`.
fn gradient_angle(dx: f32, dy: f32) -> f32 {
    if dx == 0.0 && dy == 0.0 {
        return 0.0;
    }
    let deg = if dx == 0.0 {
        90.0
    } else {
        (dy / dx).atan().to_degrees()
    };
    if deg < 0.0 {
        deg + 180.0
    } else {
        deg
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gray(width: usize, height: usize, f: impl Fn(usize, usize) -> u8) -> GrayImage {
        let mut data = Vec::with_capacity(width * height);
        for row in 0..height {
            for col in 0..width {
                data.push(f(row, col));
            }
        }
        GrayImage {
            width,
            height,
            data,
        }
    }

    #[test]
    fn buckets_round_ties_toward_vertical() {
        assert_eq!(DirectionBucket::from_degrees(0.0), DirectionBucket::Deg0);
        assert_eq!(DirectionBucket::from_degrees(22.4), DirectionBucket::Deg0);
        assert_eq!(DirectionBucket::from_degrees(22.5), DirectionBucket::Deg45);
        assert_eq!(DirectionBucket::from_degrees(67.5), DirectionBucket::Deg90);
        assert_eq!(DirectionBucket::from_degrees(112.5), DirectionBucket::Deg90);
        assert_eq!(DirectionBucket::from_degrees(157.5), DirectionBucket::Deg135);
        assert_eq!(DirectionBucket::from_degrees(170.0), DirectionBucket::Deg0);
    }

    #[test]
    fn angle_is_folded_into_half_circle() {
        assert_eq!(gradient_angle(1.0, 0.0), 0.0);
        assert_eq!(gradient_angle(0.0, -3.0), 90.0);
        assert!((gradient_angle(1.0, -1.0) - 135.0).abs() < 1e-4);
        assert!((gradient_angle(-1.0, -1.0) - 45.0).abs() < 1e-4);
    }

    #[test]
    fn vertical_step_produces_horizontal_gradient() {
        let img = gray(8, 6, |_, c| if c < 4 { 10 } else { 110 });
        let field = GradientField::from_gray(&img);
        let idx = field.index(2, 4);
        assert_eq!(field.dx[idx], 100.0);
        assert_eq!(field.dy[idx], 0.0);
        assert_eq!(field.direction[idx], 0);
        assert_eq!(field.bucket[idx], DirectionBucket::Deg0);
        // border stays zero
        assert_eq!(field.magnitude[field.index(0, 4)], 0.0);
    }

    #[test]
    fn flat_image_has_no_edges() {
        let img = gray(10, 10, |_, _| 128);
        let field = GradientField::from_gray(&img);
        assert!(field.non_maximum_suppression().iter().all(|e| !e));
    }

    #[test]
    fn straight_step_is_an_edge_along_its_length() {
        let img = gray(10, 10, |_, c| if c < 5 { 0 } else { 200 });
        let field = GradientField::from_gray(&img);
        let edges = field.non_maximum_suppression();
        for row in 2..8 {
            assert!(edges[field.index(row, 4)]);
            assert!(edges[field.index(row, 5)]);
            assert!(!edges[field.index(row, 2)]);
        }
    }
}
