//! RGB triples used for patch colors and reference values.

use std::ops::{Add, Div, Mul, Sub};

use num_traits::AsPrimitive;
use serde::{Deserialize, Serialize};

/// Weights of the luminance approximation used everywhere in the engine.
pub const LUMA_WEIGHTS: [f32; 3] = [0.299, 0.587, 0.114];

/// An RGB triple.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Color3<T> {
    pub r: T,
    pub g: T,
    pub b: T,
}

/// Integer color, usually 0..=255 per channel.
pub type Color3i = Color3<i32>;
/// Floating point color, usually an average of integer samples.
pub type Color3f = Color3<f32>;

impl<T> Color3<T> {
    #[inline]
    pub const fn new(r: T, g: T, b: T) -> Self {
        Self { r, g, b }
    }
}

impl<T: Copy> Color3<T> {
    /// Channels as an array `[r, g, b]`.
    #[inline]
    pub fn to_array(self) -> [T; 3] {
        [self.r, self.g, self.b]
    }

    /// Apply `f` to every channel.
    #[inline]
    pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> Color3<U> {
        Color3::new(f(self.r), f(self.g), f(self.b))
    }
}

impl<T: AsPrimitive<f32>> Color3<T> {
    /// `0.299 r + 0.587 g + 0.114 b`.
    #[inline]
    pub fn luminance(&self) -> f32 {
        LUMA_WEIGHTS[0] * self.r.as_()
            + LUMA_WEIGHTS[1] * self.g.as_()
            + LUMA_WEIGHTS[2] * self.b.as_()
    }

    /// Squared euclidean distance in RGB space, computed in `f32`.
    #[inline]
    pub fn distance_squared<U: AsPrimitive<f32>>(&self, other: &Color3<U>) -> f32 {
        let dr = self.r.as_() - other.r.as_();
        let dg = self.g.as_() - other.g.as_();
        let db = self.b.as_() - other.b.as_();
        dr * dr + dg * dg + db * db
    }

    #[inline]
    pub fn to_f32(self) -> Color3f {
        Color3::new(self.r.as_(), self.g.as_(), self.b.as_())
    }
}

impl<T: Copy + 'static> Color3<T> {
    /// Numeric cast of every channel (`as` semantics).
    #[inline]
    pub fn cast<U: Copy + 'static>(self) -> Color3<U>
    where
        T: AsPrimitive<U>,
    {
        Color3::new(self.r.as_(), self.g.as_(), self.b.as_())
    }
}

impl<T: Add<Output = T>> Add for Color3<T> {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self::new(self.r + rhs.r, self.g + rhs.g, self.b + rhs.b)
    }
}

impl<T: Sub<Output = T>> Sub for Color3<T> {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.r - rhs.r, self.g - rhs.g, self.b - rhs.b)
    }
}

impl<T: Mul<Output = T> + Copy> Mul<T> for Color3<T> {
    type Output = Self;

    #[inline]
    fn mul(self, rhs: T) -> Self {
        Self::new(self.r * rhs, self.g * rhs, self.b * rhs)
    }
}

/// Elementwise product.
impl<T: Mul<Output = T>> Mul for Color3<T> {
    type Output = Self;

    #[inline]
    fn mul(self, rhs: Self) -> Self {
        Self::new(self.r * rhs.r, self.g * rhs.g, self.b * rhs.b)
    }
}

/// Elementwise quotient.
impl<T: Div<Output = T>> Div for Color3<T> {
    type Output = Self;

    #[inline]
    fn div(self, rhs: Self) -> Self {
        Self::new(self.r / rhs.r, self.g / rhs.g, self.b / rhs.b)
    }
}

impl Color3f {
    /// Mean of a set of colors; `None` for an empty input.
    pub fn mean<'a>(colors: impl IntoIterator<Item = &'a Color3f>) -> Option<Color3f> {
        let mut sum = Color3f::default();
        let mut n = 0usize;
        for c in colors {
            sum = sum + *c;
            n += 1;
        }
        if n == 0 {
            return None;
        }
        Some(sum * (1.0 / n as f32))
    }

    /// True if every channel is finite.
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.r.is_finite() && self.g.is_finite() && self.b.is_finite()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn luminance_uses_rec601_weights() {
        let white = Color3i::new(255, 255, 255);
        assert_relative_eq!(white.luminance(), 255.0, epsilon = 1e-3);
        let red = Color3i::new(100, 0, 0);
        assert_relative_eq!(red.luminance(), 29.9, epsilon = 1e-4);
    }

    #[test]
    fn arithmetic_is_channelwise() {
        let a = Color3f::new(1.0, 2.0, 3.0);
        let b = Color3f::new(2.0, 4.0, 6.0);
        assert_eq!(a + a, b);
        assert_eq!(b - a, a);
        assert_eq!(a * 2.0, b);
        assert_eq!(b / a, Color3f::new(2.0, 2.0, 2.0));
        assert_eq!(a * b, Color3f::new(2.0, 8.0, 18.0));
    }

    #[test]
    fn mixed_distance_between_int_and_float_colors() {
        let a = Color3i::new(10, 20, 30);
        let b = Color3f::new(13.0, 24.0, 30.0);
        assert_relative_eq!(a.distance_squared(&b), 25.0);
    }

    #[test]
    fn mean_of_empty_is_none() {
        assert!(Color3f::mean(&[]).is_none());
        let m = Color3f::mean(&[Color3f::new(0.0, 0.0, 0.0), Color3f::new(2.0, 4.0, 6.0)])
            .expect("mean");
        assert_eq!(m, Color3f::new(1.0, 2.0, 3.0));
    }
}
