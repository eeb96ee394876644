//! Reference values of the 24-patch MacBeth ColorChecker.
//!
//! Grid columns follow the order in which the detector emits vertical lines
//! (increasing Hough radius), which runs right-to-left across an upright chart.
//! The table is therefore the printed chart mirrored left-to-right, and the
//! neutral row (row 3) reads dark-to-light.

use macbeth_core::Color3i;

pub const CHART_ROWS: usize = 4;
pub const CHART_COLS: usize = 6;
pub const PATCH_COUNT: usize = CHART_ROWS * CHART_COLS;

/// Row holding the six neutral patches.
pub const NEUTRAL_ROW: usize = 3;

const fn c(r: i32, g: i32, b: i32) -> Color3i {
    Color3i::new(r, g, b)
}

/// sRGB reference colors in detector grid order.
pub const REFERENCE_CHART: [[Color3i; CHART_COLS]; CHART_ROWS] = [
    [
        c(103, 189, 170),
        c(133, 128, 177),
        c(87, 108, 67),
        c(98, 122, 157),
        c(194, 150, 130),
        c(115, 82, 68),
    ],
    [
        c(224, 163, 46),
        c(157, 188, 64),
        c(94, 60, 108),
        c(193, 90, 99),
        c(80, 91, 166),
        c(214, 126, 44),
    ],
    [
        c(8, 133, 161),
        c(187, 86, 149),
        c(231, 199, 31),
        c(175, 54, 60),
        c(70, 148, 73),
        c(56, 61, 150),
    ],
    [
        c(52, 52, 52),
        c(85, 85, 85),
        c(122, 122, 121),
        c(160, 160, 160),
        c(200, 200, 200),
        c(243, 243, 242),
    ],
];

/// Patch names in detector grid order.
pub const PATCH_NAMES: [[&str; CHART_COLS]; CHART_ROWS] = [
    [
        "bluish green",
        "blue flower",
        "foliage",
        "blue sky",
        "light skin",
        "dark skin",
    ],
    [
        "orange yellow",
        "yellow green",
        "purple",
        "moderate red",
        "purplish blue",
        "orange",
    ],
    ["cyan", "magenta", "yellow", "red", "green", "blue"],
    [
        "black 2",
        "neutral 3.5",
        "neutral 5",
        "neutral 6.5",
        "neutral 8",
        "white 9.5",
    ],
];

#[inline]
pub fn reference_color(row: usize, col: usize) -> Option<Color3i> {
    REFERENCE_CHART.get(row)?.get(col).copied()
}

#[inline]
pub fn patch_name(row: usize, col: usize) -> Option<&'static str> {
    PATCH_NAMES.get(row)?.get(col).copied()
}
