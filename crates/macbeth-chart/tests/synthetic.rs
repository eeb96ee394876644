use macbeth_chart::{
    ChartDetectError, ChartDetector, ChartDetectorParams, DetectionObserver, Line, LineFamily,
    MatchGrid, OverlayCanvas, CHART_COLS, CHART_ROWS, REFERENCE_CHART,
};
use macbeth_core::{PixelBuffer, PixelBufferView};

const WIDTH: usize = 160;
const HEIGHT: usize = 120;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Black frame with the 24 reference patches (16px, 4px gaps). The printed
/// chart is upright, so grid column `c` lands at image column `5 - c`.
/// Patches are clipped to the frame, so `origin` may be negative.
fn synthetic_chart(scale: usize, origin: (isize, isize)) -> Vec<u8> {
    let (w, h) = (WIDTH * scale, HEIGHT * scale);
    let s = scale as isize;
    let mut data = vec![0u8; w * h * 4];
    for px in data.chunks_mut(4) {
        px[3] = 255;
    }
    for (r, row) in REFERENCE_CHART.iter().enumerate() {
        for (c, color) in row.iter().enumerate() {
            let top = origin.1 + 2 + 20 * r as isize;
            let left = origin.0 + 2 + 20 * (CHART_COLS - 1 - c) as isize;
            for y in (top * s).max(0)..((top + 16) * s).min(h as isize) {
                for x in (left * s).max(0)..((left + 16) * s).min(w as isize) {
                    let i = (y as usize * w + x as usize) * 4;
                    data[i..i + 3].copy_from_slice(&[
                        color.r as u8,
                        color.g as u8,
                        color.b as u8,
                    ]);
                }
            }
        }
    }
    data
}

#[test]
fn uniform_gray_is_not_a_chart() {
    init_logging();
    let data = vec![128u8; WIDTH * HEIGHT * 4];
    let view = PixelBufferView::packed(WIDTH, HEIGHT, 4, &data);
    let err = ChartDetector::default()
        .detect(&view)
        .expect_err("no chart in a flat image");
    assert!(matches!(err, ChartDetectError::NoEdges));
}

#[test]
fn three_channel_input_is_rejected() {
    let data = vec![0u8; WIDTH * HEIGHT * 3];
    let view = PixelBufferView::packed(WIDTH, HEIGHT, 3, &data);
    let err = ChartDetector::default().detect(&view).expect_err("rgb");
    assert!(matches!(err, ChartDetectError::Image(_)));
}

#[test]
fn synthetic_chart_is_detected() {
    init_logging();
    let data = synthetic_chart(1, (20, 20));
    let view = PixelBufferView::packed(WIDTH, HEIGHT, 4, &data);
    let detection = ChartDetector::default().detect(&view).expect("chart");

    assert_eq!(detection.vertical_lines.len(), CHART_COLS + 1);
    assert_eq!(detection.horizontal_lines.len(), CHART_ROWS + 1);
    assert_eq!(detection.matched, CHART_ROWS * CHART_COLS);
    assert!((detection.spacing.row - 20.0).abs() < 1.5);
    assert!((detection.spacing.col + 20.0).abs() < 1.5);

    for r in 0..CHART_ROWS {
        for c in 0..CHART_COLS {
            let color = detection.patches.colors[r][c].expect("color");
            let reference = REFERENCE_CHART[r][c].to_f32();
            assert!(
                (color.r - reference.r).abs() <= 5.0
                    && (color.g - reference.g).abs() <= 5.0
                    && (color.b - reference.b).abs() <= 5.0,
                "patch ({r}, {c}): {color:?} vs {reference:?}"
            );
            assert!(detection.patches.radii_sq[r][c] > 4.0);
        }
    }

    // grid column 0 is the rightmost printed column
    let first = detection.patches.positions[0][0].expect("position");
    let last = detection.patches.positions[0][5].expect("position");
    assert!(first.x > last.x);
}

#[test]
fn large_input_is_detected_on_the_working_image() {
    init_logging();
    let data = synthetic_chart(2, (20, 20));
    let view = PixelBufferView::packed(WIDTH * 2, HEIGHT * 2, 4, &data);
    let detector = ChartDetector::new(ChartDetectorParams::default());
    let detection = detector.detect(&view).expect("chart");
    assert_eq!((detection.width, detection.height), (WIDTH, HEIGHT));
    assert_eq!(
        (detection.source_width, detection.source_height),
        (WIDTH * 2, HEIGHT * 2)
    );

    let working = detection.patches.positions[3][2].expect("position");
    let source = detection.scaled_to_source();
    let mapped = source.patches.positions[3][2].expect("position");
    assert!((mapped.x - ((working.x + 0.5) * 2.0 - 0.5)).abs() < 1e-4);

    let frame = PixelBuffer::from_view(&view).expect("frame");
    let colors = source.sample_frame(&frame).expect("sample");
    let neutral = REFERENCE_CHART[3][2].to_f32();
    let sampled = colors[3 * CHART_COLS + 2].expect("neutral patch");
    assert!((sampled.g - neutral.g).abs() <= 5.0);
}

#[test]
fn chart_cut_by_the_left_edge_is_resampled_where_visible() {
    init_logging();
    // grid columns 4 and 5 fall outside the frame
    let data = synthetic_chart(1, (-38, 20));
    let view = PixelBufferView::packed(WIDTH, HEIGHT, 4, &data);
    let detection = ChartDetector::default().detect(&view).expect("chart");
    assert_eq!(detection.matched, CHART_ROWS * (CHART_COLS - 2));

    let frame = PixelBuffer::from_view(&view).expect("frame");
    let colors = detection.sample_frame(&frame).expect("sample");
    assert_eq!(colors.len(), CHART_ROWS * CHART_COLS);
    for r in 0..CHART_ROWS {
        for c in 0..CHART_COLS {
            let sampled = colors[r * CHART_COLS + c];
            if c >= CHART_COLS - 2 {
                assert!(sampled.is_none(), "patch ({r}, {c}) is off-frame");
                continue;
            }
            let color = sampled.expect("visible patch");
            let reference = REFERENCE_CHART[r][c].to_f32();
            assert!(
                (color.g - reference.g).abs() <= 5.0,
                "patch ({r}, {c}): {color:?} vs {reference:?}"
            );
        }
    }
}

#[derive(Default)]
struct Recorder {
    edges: usize,
    families: Vec<(LineFamily, usize)>,
    candidates: usize,
    placed: usize,
}

impl DetectionObserver for Recorder {
    fn on_edges(&mut self, _width: usize, _height: usize, edges: &[bool]) {
        self.edges = edges.iter().filter(|e| **e).count();
    }

    fn on_lines(&mut self, family: LineFamily, lines: &[Line]) {
        self.families.push((family, lines.len()));
    }

    fn on_candidates(&mut self, grid: &macbeth_chart::CandidateGrid) {
        self.candidates = grid.populated();
    }

    fn on_patches(&mut self, patches: &MatchGrid) {
        self.placed = patches.placed();
    }
}

#[test]
fn observer_sees_every_stage() {
    let data = synthetic_chart(1, (10, 10));
    let view = PixelBufferView::packed(WIDTH, HEIGHT, 4, &data);
    let detector = ChartDetector::default();

    let mut recorder = Recorder::default();
    detector
        .detect_with_observer(&view, &mut recorder)
        .expect("chart");
    assert!(recorder.edges > 0);
    assert_eq!(
        recorder.families,
        vec![(LineFamily::Vertical, 7), (LineFamily::Horizontal, 5)]
    );
    assert_eq!(recorder.candidates, 24);
    assert_eq!(recorder.placed, 24);

    let working = detector.working_buffer(&view).expect("working");
    let mut canvas = OverlayCanvas::from_buffer(&working);
    detector
        .detect_working(&working, &mut canvas)
        .expect("chart");
    assert_ne!(canvas.rgba(), working.data());
}
