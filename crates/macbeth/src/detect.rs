use crate::{chart, core};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Errors produced by the high-level facade helpers.
#[derive(thiserror::Error, Debug)]
pub enum DetectError {
    #[error("invalid RGBA image buffer length (expected {expected} bytes, got {got})")]
    InvalidRgbaBuffer { expected: usize, got: usize },

    #[error(
        "image is {width}x{height}, detection covers {detected_width}x{detected_height} \
         (source {source_width}x{source_height})"
    )]
    FrameMismatch {
        width: usize,
        height: usize,
        detected_width: usize,
        detected_height: usize,
        source_width: usize,
        source_height: usize,
    },

    #[error(transparent)]
    Image(#[from] core::ImageError),

    #[error(transparent)]
    ChartDetect(#[from] chart::ChartDetectError),
}

/// Borrow an `image::RgbaImage` as a `macbeth-core` view.
pub fn rgba_view(img: &::image::RgbaImage) -> core::PixelBufferView<'_> {
    core::PixelBufferView::packed(img.width() as usize, img.height() as usize, 4, img.as_raw())
}

/// Run the chart detector on an RGBA image.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip(img, params), fields(width = img.width(), height = img.height()))
)]
pub fn detect_chart(
    img: &::image::RgbaImage,
    params: chart::ChartDetectorParams,
) -> Result<chart::ChartDetection, chart::ChartDetectError> {
    chart::ChartDetector::new(params).detect(&rgba_view(img))
}

/// Run the chart detector on a raw, tightly packed RGBA buffer.
pub fn detect_chart_from_rgba_u8(
    width: u32,
    height: u32,
    rgba: &[u8],
    params: chart::ChartDetectorParams,
) -> Result<chart::ChartDetection, DetectError> {
    let expected = width as usize * height as usize * 4;
    if rgba.len() != expected {
        return Err(DetectError::InvalidRgbaBuffer {
            expected,
            got: rgba.len(),
        });
    }
    let view = core::PixelBufferView::packed(width as usize, height as usize, 4, rgba);
    Ok(chart::ChartDetector::new(params).detect(&view)?)
}

/// Run the detector while drawing its intermediate stages.
///
/// The overlay is rendered on the working image, so its size is the
/// detector's working size rather than the input size. The overlay is
/// returned even when detection fails.
pub fn detect_chart_with_overlay(
    img: &::image::RgbaImage,
    params: chart::ChartDetectorParams,
) -> Result<
    (
        Result<chart::ChartDetection, chart::ChartDetectError>,
        ::image::RgbaImage,
    ),
    DetectError,
> {
    let view = rgba_view(img);
    let detector = chart::ChartDetector::new(params);
    let working = detector.working_buffer(&view)?;
    let mut canvas = chart::OverlayCanvas::from_buffer(&working);
    let result = detector
        .detect_working(&working, &mut canvas)
        .map(|mut detection| {
            detection.source_width = view.width;
            detection.source_height = view.height;
            detection
        });
    Ok((result, overlay_image(canvas)?))
}

/// Convert a finished overlay canvas into an `image::RgbaImage`.
pub fn overlay_image(canvas: chart::OverlayCanvas) -> Result<::image::RgbaImage, DetectError> {
    let (width, height) = (canvas.width(), canvas.height());
    let expected = width * height * 4;
    let data = canvas.into_rgba();
    let got = data.len();
    ::image::RgbaImage::from_raw(width as u32, height as u32, data)
        .ok_or(DetectError::InvalidRgbaBuffer { expected, got })
}

/// Re-sample a previously discovered chart from a later frame.
///
/// The frame may either have the detector's working size or the size of the
/// image the chart was detected in. Patches that could not be sampled are
/// `None`.
pub fn sample_chart(
    img: &::image::RgbaImage,
    detection: &chart::ChartDetection,
) -> Result<Vec<Option<core::Color3f>>, DetectError> {
    let (width, height) = (img.width() as usize, img.height() as usize);
    let frame = core::PixelBuffer::from_view(&rgba_view(img))?;
    if (width, height) == (detection.width, detection.height) {
        return Ok(detection.sample_frame(&frame)?);
    }
    if (width, height) == (detection.source_width, detection.source_height) {
        return Ok(detection.scaled_to_source().sample_frame(&frame)?);
    }
    Err(DetectError::FrameMismatch {
        width,
        height,
        detected_width: detection.width,
        detected_height: detection.height,
        source_width: detection.source_width,
        source_height: detection.source_height,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::{ChartDetectorParams, CHART_COLS, REFERENCE_CHART};

    fn chart_image(scale: u32) -> ::image::RgbaImage {
        ::image::RgbaImage::from_fn(160 * scale, 120 * scale, |x, y| {
            let (x, y) = ((x / scale) as usize, (y / scale) as usize);
            if !(22..142).contains(&x) || !(22..102).contains(&y) {
                return ::image::Rgba([0, 0, 0, 255]);
            }
            let (dx, dy) = ((x - 22) % 20, (y - 22) % 20);
            if dx >= 16 || dy >= 16 {
                return ::image::Rgba([0, 0, 0, 255]);
            }
            let row = (y - 22) / 20;
            let col = CHART_COLS - 1 - (x - 22) / 20;
            let c = REFERENCE_CHART[row][col];
            ::image::Rgba([c.r as u8, c.g as u8, c.b as u8, 255])
        })
    }

    #[test]
    fn raw_buffer_length_is_checked() {
        let err = detect_chart_from_rgba_u8(4, 4, &[0u8; 10], ChartDetectorParams::default())
            .expect_err("short buffer");
        assert!(matches!(
            err,
            DetectError::InvalidRgbaBuffer {
                expected: 64,
                got: 10
            }
        ));
    }

    #[test]
    fn detects_and_resamples_rgba_image() {
        let img = chart_image(2);
        let detection = detect_chart(&img, ChartDetectorParams::default()).expect("chart");
        assert_eq!(detection.matched, 24);

        let colors = sample_chart(&img, &detection).expect("sample");
        assert_eq!(colors.len(), 24);
        let white = REFERENCE_CHART[3][5].to_f32();
        let sampled = colors[3 * CHART_COLS + 5].expect("white patch");
        assert!((sampled.g - white.g).abs() <= 5.0);

        let other = ::image::RgbaImage::new(100, 100);
        assert!(matches!(
            sample_chart(&other, &detection),
            Err(DetectError::FrameMismatch { .. })
        ));
    }

    #[test]
    fn overlay_has_working_size() {
        let img = chart_image(2);
        let (result, overlay) =
            detect_chart_with_overlay(&img, ChartDetectorParams::default()).expect("overlay");
        let detection = result.expect("chart");
        assert_eq!(detection.source_width, 320);
        assert_eq!(overlay.dimensions(), (160, 120));
    }
}
