use nalgebra::Point2;

/// Squared euclidean distance between two image points.
#[inline]
pub fn distance_squared(a: &Point2<f32>, b: &Point2<f32>) -> f32 {
    nalgebra::distance_squared(a, b)
}

/// Midpoint of the segment `a`-`b`.
#[inline]
pub fn midpoint(a: &Point2<f32>, b: &Point2<f32>) -> Point2<f32> {
    nalgebra::center(a, b)
}

/// Nearest integer pixel `(row, col)` for a point, or `None` when it falls
/// outside a `width` x `height` raster.
#[inline]
pub fn pixel_of(p: &Point2<f32>, width: usize, height: usize) -> Option<(usize, usize)> {
    let col = p.x.round();
    let row = p.y.round();
    if !(col >= 0.0 && row >= 0.0) || col >= width as f32 || row >= height as f32 {
        return None;
    }
    Some((row as usize, col as usize))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pixel_of_rejects_out_of_bounds() {
        assert_eq!(pixel_of(&Point2::new(2.4, 3.6), 10, 10), Some((4, 2)));
        assert_eq!(pixel_of(&Point2::new(-0.6, 3.0), 10, 10), None);
        assert_eq!(pixel_of(&Point2::new(9.6, 3.0), 10, 10), None);
        assert_eq!(pixel_of(&Point2::new(f32::NAN, 3.0), 10, 10), None);
    }

    #[test]
    fn distance_and_midpoint() {
        let a = Point2::new(1.0, 2.0);
        let b = Point2::new(4.0, 6.0);
        assert_eq!(distance_squared(&a, &b), 25.0);
        assert_eq!(midpoint(&a, &b), Point2::new(2.5, 4.0));
    }
}
