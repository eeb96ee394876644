//! Raw pixel buffers, grayscale conversion and circular patch sampling.

use std::ops::Range;
use std::sync::OnceLock;

use nalgebra::Point2;

use crate::color::{Color3f, Color3i, LUMA_WEIGHTS};

const GAMMA: f32 = 2.2;

/// Errors raised when a raw buffer does not satisfy the pixel-buffer contract.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ImageError {
    #[error("invalid image dimensions (width={width}, height={height})")]
    InvalidDimensions { width: usize, height: usize },
    #[error("unsupported channel count {channels}")]
    UnsupportedChannels { channels: usize },
    #[error("row stride {stride} is smaller than width*channels = {min}")]
    InvalidStride { stride: usize, min: usize },
    #[error("pixel buffer too small (expected at least {expected} bytes, got {got})")]
    BufferTooSmall { expected: usize, got: usize },
    #[error("geometry mismatch: expected {expected_height}x{expected_width}, got {height}x{width}")]
    GeometryMismatch {
        expected_height: usize,
        expected_width: usize,
        height: usize,
        width: usize,
    },
    #[error("cannot resize {height}x{width} to {new_height}x{new_width}")]
    InvalidResize {
        height: usize,
        width: usize,
        new_height: usize,
        new_width: usize,
    },
    #[error("patch ({row}, {col}) is missing from the center/radius tables")]
    PatchOutOfTable { row: usize, col: usize },
    #[error("patch ({row}, {col}) covers no pixels")]
    EmptyPatch { row: usize, col: usize },
}

/// Borrowed raw pixel data as handed over by a capture layer.
#[derive(Clone, Copy, Debug)]
pub struct PixelBufferView<'a> {
    pub width: usize,
    pub height: usize,
    pub channels: usize,
    pub row_stride: usize,
    pub data: &'a [u8], // row-major, channel-interleaved
}

impl<'a> PixelBufferView<'a> {
    /// Tightly packed view (`row_stride = width * channels`).
    pub fn packed(width: usize, height: usize, channels: usize, data: &'a [u8]) -> Self {
        Self {
            width,
            height,
            channels,
            row_stride: width.saturating_mul(channels),
            data,
        }
    }

    /// Check the geometry against the data and return the number of bytes
    /// the pixels span.
    fn validate(&self) -> Result<usize, ImageError> {
        if self.width == 0 || self.height == 0 {
            return Err(ImageError::InvalidDimensions {
                width: self.width,
                height: self.height,
            });
        }
        if self.channels == 0 || self.channels > 4 {
            return Err(ImageError::UnsupportedChannels {
                channels: self.channels,
            });
        }
        let too_large = ImageError::InvalidDimensions {
            width: self.width,
            height: self.height,
        };
        let min = self
            .width
            .checked_mul(self.channels)
            .ok_or_else(|| too_large.clone())?;
        if self.row_stride < min {
            return Err(ImageError::InvalidStride {
                stride: self.row_stride,
                min,
            });
        }
        let expected = self
            .row_stride
            .checked_mul(self.height - 1)
            .and_then(|n| n.checked_add(min))
            .ok_or(too_large)?;
        if self.data.len() < expected {
            return Err(ImageError::BufferTooSmall {
                expected,
                got: self.data.len(),
            });
        }
        Ok(expected)
    }
}

/// Owned, immutable pixel buffer.
#[derive(Clone, Debug, PartialEq)]
pub struct PixelBuffer {
    width: usize,
    height: usize,
    channels: usize,
    row_stride: usize,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Take ownership of a raw buffer after validating its geometry.
    pub fn new(
        width: usize,
        height: usize,
        channels: usize,
        row_stride: usize,
        data: Vec<u8>,
    ) -> Result<Self, ImageError> {
        PixelBufferView {
            width,
            height,
            channels,
            row_stride,
            data: &data,
        }
        .validate()?;
        Ok(Self {
            width,
            height,
            channels,
            row_stride,
            data,
        })
    }

    /// Copy a source buffer as is.
    pub fn from_view(view: &PixelBufferView<'_>) -> Result<Self, ImageError> {
        let len = view.validate()?;
        Ok(Self {
            width: view.width,
            height: view.height,
            channels: view.channels,
            row_stride: view.row_stride,
            data: view.data[..len].to_vec(),
        })
    }

    /// Copy a source buffer that must already have the requested geometry.
    pub fn from_view_exact(
        view: &PixelBufferView<'_>,
        height: usize,
        width: usize,
    ) -> Result<Self, ImageError> {
        if view.height != height || view.width != width {
            return Err(ImageError::GeometryMismatch {
                expected_height: height,
                expected_width: width,
                height: view.height,
                width: view.width,
            });
        }
        Self::from_view(view)
    }

    /// Copy a source buffer and box-filter it down to `new_height` x `new_width`.
    pub fn resized_from(
        view: &PixelBufferView<'_>,
        new_height: usize,
        new_width: usize,
    ) -> Result<Self, ImageError> {
        let full = Self::from_view(view)?;
        if full.height == new_height && full.width == new_width {
            return Ok(full);
        }
        full.resize(new_height, new_width)
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn channels(&self) -> usize {
        self.channels
    }

    #[inline]
    pub fn row_stride(&self) -> usize {
        self.row_stride
    }

    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn view(&self) -> PixelBufferView<'_> {
        PixelBufferView {
            width: self.width,
            height: self.height,
            channels: self.channels,
            row_stride: self.row_stride,
            data: &self.data,
        }
    }

    #[inline]
    fn pixel(&self, row: usize, col: usize) -> &[u8] {
        let start = row * self.row_stride + col * self.channels;
        &self.data[start..start + self.channels]
    }

    /// Read the first three channels at `(row, col)`.
    ///
    /// # Panics
    ///
    /// Panics when the position is outside the buffer or the buffer has fewer
    /// than three channels.
    #[inline]
    pub fn sample(&self, row: usize, col: usize) -> Color3i {
        assert!(
            row < self.height && col < self.width,
            "pixel ({row}, {col}) outside {}x{} buffer",
            self.height,
            self.width
        );
        assert!(self.channels >= 3, "sampling needs at least 3 channels");
        let px = self.pixel(row, col);
        Color3i::new(px[0] as i32, px[1] as i32, px[2] as i32)
    }

    /// Box-filter resize using whole-pixel blocks.
    ///
    /// The block size is `height / new_height` by `width / new_width` (integer
    /// division), so trailing rows/columns that do not fill a block are
    /// dropped. Channel averages truncate.
    pub fn resize(&self, new_height: usize, new_width: usize) -> Result<Self, ImageError> {
        if new_height == 0 || new_width == 0 || new_height > self.height || new_width > self.width
        {
            return Err(ImageError::InvalidResize {
                height: self.height,
                width: self.width,
                new_height,
                new_width,
            });
        }
        let height_scale = self.height / new_height;
        let width_scale = self.width / new_width;
        let block = (height_scale * width_scale) as u64;
        let ch = self.channels;
        let row_stride = new_width * ch;

        let mut data = vec![0u8; row_stride * new_height];
        let mut sums = vec![0u64; ch];
        for i in 0..new_height {
            for j in 0..new_width {
                sums.iter_mut().for_each(|s| *s = 0);
                for y in i * height_scale..(i + 1) * height_scale {
                    for x in j * width_scale..(j + 1) * width_scale {
                        for (s, &v) in sums.iter_mut().zip(self.pixel(y, x)) {
                            *s += v as u64;
                        }
                    }
                }
                let out = &mut data[i * row_stride + j * ch..i * row_stride + (j + 1) * ch];
                for (o, s) in out.iter_mut().zip(&sums) {
                    *o = (s / block) as u8;
                }
            }
        }

        Ok(Self {
            width: new_width,
            height: new_height,
            channels: ch,
            row_stride,
            data,
        })
    }

    /// Gamma-aware luminance layer of an RGBA buffer.
    pub fn to_grayscale(&self) -> Result<GrayImage, ImageError> {
        if self.channels != 4 {
            return Err(ImageError::UnsupportedChannels {
                channels: self.channels,
            });
        }
        let lut = gamma_expand_lut();
        let mut data = Vec::with_capacity(self.width * self.height);
        for row in 0..self.height {
            for col in 0..self.width {
                let px = self.pixel(row, col);
                let linear = LUMA_WEIGHTS[0] * lut[px[0] as usize]
                    + LUMA_WEIGHTS[1] * lut[px[1] as usize]
                    + LUMA_WEIGHTS[2] * lut[px[2] as usize];
                data.push(linear.powf(1.0 / GAMMA).clamp(0.0, 255.0) as u8);
            }
        }
        Ok(GrayImage {
            width: self.width,
            height: self.height,
            data,
        })
    }

    /// Average color of a disc around a center; `radius_sq` is the squared
    /// radius and the boundary is exclusive.
    pub fn sample_disc(&self, center: &Point2<f32>, radius_sq: f32) -> Option<Color3f> {
        if !(radius_sq > 0.0) || !center.x.is_finite() || !center.y.is_finite() {
            return None;
        }
        let reach = radius_sq.sqrt().ceil();
        let row0 = (center.y - reach).floor().max(0.0) as usize;
        let col0 = (center.x - reach).floor().max(0.0) as usize;
        let row1 = ((center.y + reach).ceil().max(-1.0) + 1.0).min(self.height as f32) as usize;
        let col1 = ((center.x + reach).ceil().max(-1.0) + 1.0).min(self.width as f32) as usize;

        let mut sum = Color3f::default();
        let mut count = 0u32;
        for row in row0..row1 {
            let dy = row as f32 - center.y;
            for col in col0..col1 {
                let dx = col as f32 - center.x;
                if dx * dx + dy * dy < radius_sq {
                    sum = sum + self.sample(row, col).to_f32();
                    count += 1;
                }
            }
        }
        (count > 0).then(|| sum * (1.0 / count as f32))
    }

    /// Average colors of circular patches.
    ///
    /// For each `(row, col)` of the half-open ranges, in row-major order, the
    /// pixels strictly closer than `sqrt(radii[row][col])` to
    /// `centers[row][col]` are averaged. Radii are stored squared.
    pub fn sample_patches<C, R>(
        &self,
        rows: Range<usize>,
        cols: Range<usize>,
        centers: &[C],
        radii: &[R],
    ) -> Result<Vec<Color3f>, ImageError>
    where
        C: AsRef<[Point2<f32>]>,
        R: AsRef<[f32]>,
    {
        let mut out = Vec::with_capacity(rows.len() * cols.len());
        for row in rows {
            for col in cols.clone() {
                let center = centers
                    .get(row)
                    .and_then(|r| r.as_ref().get(col))
                    .ok_or(ImageError::PatchOutOfTable { row, col })?;
                let radius_sq = radii
                    .get(row)
                    .and_then(|r| r.as_ref().get(col))
                    .ok_or(ImageError::PatchOutOfTable { row, col })?;
                let color = self
                    .sample_disc(center, *radius_sq)
                    .ok_or(ImageError::EmptyPatch { row, col })?;
                out.push(color);
            }
        }
        Ok(out)
    }
}

fn gamma_expand_lut() -> &'static [f32; 256] {
    static LUT: OnceLock<[f32; 256]> = OnceLock::new();
    LUT.get_or_init(|| std::array::from_fn(|v| (v as f32).powf(GAMMA)))
}

/// Single-channel 8-bit image.
#[derive(Clone, Debug, PartialEq)]
pub struct GrayImage {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>, // row-major, len = w*h
}

impl GrayImage {
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> u8 {
        self.data[row * self.width + col]
    }
}
