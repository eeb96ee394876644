use serde::{Deserialize, Serialize};

/// Hough voting and line extraction settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HoughParams {
    /// Edge pixels vote only when their gradient magnitude exceeds this.
    pub magnitude_threshold: f32,
    /// Half-width (degrees) of the angle smoothing window.
    pub angle_window: usize,
    /// Half-width (bins) of the radius smoothing / peak window.
    pub radius_window: usize,
    /// Minimal smoothed vote count for a line candidate.
    pub min_line_votes: u32,
    /// Candidates closer than this many bins are merged into one line.
    pub merge_distance: usize,
}

impl Default for HoughParams {
    fn default() -> Self {
        Self {
            magnitude_threshold: 15.0,
            angle_window: 5,
            radius_window: 2,
            min_line_votes: 20,
            merge_distance: 5,
        }
    }
}

/// Candidate cell construction settings.
///
/// The cell extent bounds are in working-image pixels and were tuned for a
/// chart filling a moderate part of a 160x120 frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridParams {
    /// Exclusive lower bound of a cell's per-axis corner separation.
    pub min_cell_extent: f32,
    /// Exclusive upper bound of a cell's per-axis corner separation.
    pub max_cell_extent: f32,
    /// Drop rows/columns whose colors are nearly uniform (background strips).
    pub uniformity_filter: bool,
    /// RMS color deviation at or below which a row/column counts as uniform.
    pub uniformity_threshold: f32,
}

impl Default for GridParams {
    fn default() -> Self {
        Self {
            min_cell_extent: 5.0,
            max_cell_extent: 30.0,
            uniformity_filter: true,
            uniformity_threshold: 30.0,
        }
    }
}

/// Fill-in and region growing settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FillParams {
    /// Pixels closer than this squared color distance to the center pixel
    /// join a patch region.
    pub region_color_threshold: f32,
    /// Patch squared radius = max squared extent / `radius_divisor`.
    pub radius_divisor: f32,
}

impl Default for FillParams {
    fn default() -> Self {
        Self {
            region_color_threshold: 200.0,
            radius_divisor: 4.0,
        }
    }
}

/// Configuration for [`ChartDetector`](crate::ChartDetector).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartDetectorParams {
    /// Width of the working image; larger inputs are box-filtered down by an
    /// integer factor so that they fit inside `working_width` x `working_height`.
    pub working_width: usize,
    pub working_height: usize,
    pub hough: HoughParams,
    pub grid: GridParams,
    pub fill: FillParams,
}

impl Default for ChartDetectorParams {
    fn default() -> Self {
        Self {
            working_width: 160,
            working_height: 120,
            hough: HoughParams::default(),
            grid: GridParams::default(),
            fill: FillParams::default(),
        }
    }
}

impl ChartDetectorParams {
    /// Working size `(height, width)` for a source of the given size.
    ///
    /// The source is shrunk by the smallest integer factor that makes it fit;
    /// sources that already fit are used as is.
    pub fn working_size(&self, height: usize, width: usize) -> (usize, usize) {
        let fit_w = self.working_width.max(1);
        let fit_h = self.working_height.max(1);
        let factor = width.div_ceil(fit_w).max(height.div_ceil(fit_h)).max(1);
        ((height / factor).max(1), (width / factor).max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn working_size_uses_uniform_integer_factor() {
        let p = ChartDetectorParams::default();
        assert_eq!(p.working_size(480, 640), (120, 160));
        assert_eq!(p.working_size(120, 160), (120, 160));
        assert_eq!(p.working_size(100, 100), (100, 100));
        assert_eq!(p.working_size(1080, 1920), (90, 160));
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let p: ChartDetectorParams =
            serde_json::from_str(r#"{"grid": {"uniformity_filter": false}}"#).expect("json");
        assert!(!p.grid.uniformity_filter);
        assert_eq!(p.grid.max_cell_extent, 30.0);
        assert_eq!(p.hough, HoughParams::default());
        assert_eq!(p.working_width, 160);
    }
}
