//! Completing a partial match: spacing estimation, extrapolation of missing
//! positions and region growing for patch color and size.

use macbeth_core::{pixel_of, Color3f, PixelBuffer, Point2};
use serde::{Deserialize, Serialize};

use crate::detector::FillParams;
use crate::matching::MatchGrid;
use crate::reference::{CHART_COLS, CHART_ROWS};

/// Mean image displacement per chart step.
///
/// `row` is the `y` offset between consecutive chart rows and `col` the `x`
/// offset between consecutive chart columns. With the mirrored column order
/// `col` is negative for an upright chart.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Spacing {
    pub row: f32,
    pub col: f32,
}

/// Estimate spacing from the placed patches relative to the first one.
///
/// Returns `None` when no placed patch differs from the anchor in row, or
/// none differs in column.
pub fn estimate_spacing(matches: &MatchGrid) -> Option<Spacing> {
    let (ar, ac, anchor) = matches.first_placed()?;
    let (mut row_sum, mut row_n) = (0.0f32, 0u32);
    let (mut col_sum, mut col_n) = (0.0f32, 0u32);
    for (r, c, p) in matches.iter_placed().skip(1) {
        if r != ar {
            row_sum += (p.y - anchor.y) / (r as f32 - ar as f32);
            row_n += 1;
        }
        if c != ac {
            col_sum += (p.x - anchor.x) / (c as f32 - ac as f32);
            col_n += 1;
        }
    }
    if row_n == 0 || col_n == 0 {
        return None;
    }
    Some(Spacing {
        row: row_sum / row_n as f32,
        col: col_sum / col_n as f32,
    })
}

/// Fill unplaced positions from the anchor and spacing. Returns how many
/// positions were extrapolated.
pub fn extrapolate(matches: &mut MatchGrid, spacing: &Spacing) -> usize {
    let Some((ar, ac, anchor)) = matches.first_placed() else {
        return 0;
    };
    let mut filled = 0;
    for r in 0..CHART_ROWS {
        for c in 0..CHART_COLS {
            let slot = &mut matches.positions[r][c];
            if slot.is_some() {
                continue;
            }
            *slot = Some(Point2::new(
                anchor.x + (c as f32 - ac as f32) * spacing.col,
                anchor.y + (r as f32 - ar as f32) * spacing.row,
            ));
            filled += 1;
        }
    }
    filled
}

/// Region grown around a patch center.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Region {
    pub color: Color3f,
    pub radius_sq: f32,
}

/// Grow a region from the pixel nearest to `center`.
///
/// Pixels within a window of half-size `|spacing|/2` join the region when
/// their squared color distance to the center pixel is below
/// `params.region_color_threshold`. The squared radius is the largest squared
/// pixel distance from the center pixel divided by `params.radius_divisor`.
pub fn grow_region(
    image: &PixelBuffer,
    center: &Point2<f32>,
    spacing: &Spacing,
    params: &FillParams,
) -> Option<Region> {
    let (cr, cc) = pixel_of(center, image.width(), image.height())?;
    let seed = image.sample(cr, cc);
    let half_r = (spacing.row.abs() / 2.0) as usize;
    let half_c = (spacing.col.abs() / 2.0) as usize;
    let rows = cr.saturating_sub(half_r)..(cr + half_r + 1).min(image.height());
    let cols = cc.saturating_sub(half_c)..(cc + half_c + 1).min(image.width());

    let mut sum = Color3f::default();
    let mut count = 0u32;
    let mut max_d2 = 0usize;
    for row in rows {
        for col in cols.clone() {
            let color = image.sample(row, col);
            if color.distance_squared(&seed) >= params.region_color_threshold {
                continue;
            }
            sum = sum + color.to_f32();
            count += 1;
            let (dr, dc) = (row.abs_diff(cr), col.abs_diff(cc));
            max_d2 = max_d2.max(dr * dr + dc * dc);
        }
    }
    (count > 0).then(|| Region {
        color: sum * (1.0 / count as f32),
        radius_sq: max_d2 as f32 / params.radius_divisor,
    })
}

/// Per-patch colors and radii for every placed position.
pub fn grow_regions(
    matches: &mut MatchGrid,
    image: &PixelBuffer,
    spacing: &Spacing,
    params: &FillParams,
) {
    for r in 0..CHART_ROWS {
        for c in 0..CHART_COLS {
            let region = matches.positions[r][c]
                .and_then(|p| grow_region(image, &p, spacing, params));
            matches.colors[r][c] = region.map(|g| g.color);
            matches.radii_sq[r][c] = region.map_or(0.0, |g| g.radius_sq);
        }
    }
}
