//! Core types for MacBeth chart detection and calibration.
//!
//! This crate holds the value types shared by the detector and the analyzers:
//! RGB triples, point helpers over `nalgebra::Point2`, and the pixel buffer
//! with its resize, grayscale and patch-sampling operations. It knows nothing
//! about the chart itself.

mod color;
mod geometry;
mod image;
mod logger;

pub use color::{Color3, Color3f, Color3i, LUMA_WEIGHTS};
pub use geometry::{distance_squared, midpoint, pixel_of};
pub use image::{GrayImage, ImageError, PixelBuffer, PixelBufferView};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::{init_from_env, init_with_filter, init_with_level, LogFilter, LOG_ENV};

pub use nalgebra::Point2;
