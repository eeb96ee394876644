//! Segmentation of the candidate grid and alignment against the reference.

use macbeth_core::{Color3f, Point2};
use serde::{Deserialize, Serialize};

use crate::grid::CandidateGrid;
use crate::reference::{CHART_COLS, CHART_ROWS, REFERENCE_CHART};

/// Per-patch positions, colors and squared radii in reference layout.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchGrid {
    pub positions: [[Option<Point2<f32>>; CHART_COLS]; CHART_ROWS],
    pub colors: [[Option<Color3f>; CHART_COLS]; CHART_ROWS],
    pub radii_sq: [[f32; CHART_COLS]; CHART_ROWS],
}

impl MatchGrid {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of patches with a known position.
    pub fn placed(&self) -> usize {
        self.positions.iter().flatten().filter(|p| p.is_some()).count()
    }

    /// First placed patch in row-major order.
    pub fn first_placed(&self) -> Option<(usize, usize, Point2<f32>)> {
        self.iter_placed().next()
    }

    pub fn iter_placed(&self) -> impl Iterator<Item = (usize, usize, Point2<f32>)> + '_ {
        self.positions.iter().enumerate().flat_map(|(r, row)| {
            row.iter()
                .enumerate()
                .filter_map(move |(c, p)| p.map(|p| (r, c, p)))
        })
    }

    /// Copy a block's cell centers to their matched reference positions.
    /// Positions that are already set are kept.
    pub fn place(&mut self, grid: &CandidateGrid, block: &Block, aligned: &BlockMatch) -> usize {
        let mut written = 0;
        for i in 0..block.rows {
            for j in 0..block.cols {
                let Some(cell) = grid.get(block.row + i, block.col + j) else {
                    continue;
                };
                let slot = &mut self.positions[aligned.row + i][aligned.col + j];
                if slot.is_none() {
                    *slot = Some(cell.center);
                    written += 1;
                }
            }
        }
        written
    }
}

/// A fully populated rectangle of candidate cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub row: usize,
    pub col: usize,
    pub rows: usize,
    pub cols: usize,
}

impl Block {
    #[inline]
    pub fn fits_chart(&self) -> bool {
        self.rows <= CHART_ROWS && self.cols <= CHART_COLS
    }
}

/// Reference offset of a block and its squared color distance.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BlockMatch {
    pub row: usize,
    pub col: usize,
    pub cost: f32,
}

/// Split the populated cells into maximal rectangles.
///
/// Scanning row-major, each unvisited populated cell starts a block: its run
/// of populated cells along the row fixes the width, and the block grows
/// downward while the next row is populated across the whole run.
pub fn segment_blocks(grid: &CandidateGrid) -> Vec<Block> {
    let (rows, cols) = (grid.rows(), grid.cols());
    let mut visited = vec![false; rows * cols];
    let free = |visited: &[bool], r: usize, c: usize| {
        grid.get(r, c).is_some() && !visited[r * cols + c]
    };

    let mut blocks = Vec::new();
    for row in 0..rows {
        for col in 0..cols {
            if !free(&visited, row, col) {
                continue;
            }
            let mut col_end = col + 1;
            while col_end < cols && free(&visited, row, col_end) {
                col_end += 1;
            }
            let mut row_end = row + 1;
            while row_end < rows && (col..col_end).all(|c| free(&visited, row_end, c)) {
                row_end += 1;
            }
            for r in row..row_end {
                for c in col..col_end {
                    visited[r * cols + c] = true;
                }
            }
            blocks.push(Block {
                row,
                col,
                rows: row_end - row,
                cols: col_end - col,
            });
        }
    }
    blocks
}

/// Exhaustive search for the reference offset with the smallest summed
/// squared color distance. Ties keep the first offset in row-major order.
/// Blocks larger than the chart have no match.
pub fn align_block(grid: &CandidateGrid, block: &Block) -> Option<BlockMatch> {
    if !block.fits_chart() || block.rows == 0 || block.cols == 0 {
        return None;
    }
    let mut best: Option<BlockMatch> = None;
    for dr in 0..=CHART_ROWS - block.rows {
        for dc in 0..=CHART_COLS - block.cols {
            let mut cost = 0.0f32;
            for i in 0..block.rows {
                for j in 0..block.cols {
                    let cell = grid.get(block.row + i, block.col + j)?;
                    cost += cell.color.distance_squared(&REFERENCE_CHART[dr + i][dc + j]);
                }
            }
            if best.is_none_or(|b| cost < b.cost) {
                best = Some(BlockMatch {
                    row: dr,
                    col: dc,
                    cost,
                });
            }
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::CandidateCell;

    /// Grid whose cells carry the given reference colors.
    fn chart_grid(cells: &[Vec<Option<(usize, usize)>>]) -> CandidateGrid {
        let rows = cells.len();
        let cols = cells[0].len();
        let flat = cells
            .iter()
            .enumerate()
            .flat_map(|(r, line)| {
                line.iter().enumerate().map(move |(c, cell)| {
                    cell.map(|(rr, cc)| CandidateCell {
                        center: Point2::new(c as f32 * 20.0, r as f32 * 20.0),
                        color: REFERENCE_CHART[rr][cc],
                    })
                })
            })
            .collect();
        CandidateGrid::from_cells(rows, cols, flat)
    }

    #[test]
    fn segmentation_finds_maximal_rectangles() {
        let grid = chart_grid(&[
            vec![None, Some((0, 3)), Some((0, 4))],
            vec![Some((1, 2)), Some((1, 3)), Some((1, 4))],
        ]);
        let blocks = segment_blocks(&grid);
        assert_eq!(
            blocks,
            vec![
                Block {
                    row: 0,
                    col: 1,
                    rows: 2,
                    cols: 2
                },
                Block {
                    row: 1,
                    col: 0,
                    rows: 1,
                    cols: 1
                },
            ]
        );
    }

    #[test]
    fn block_aligns_to_its_reference_offset() {
        let grid = chart_grid(&[
            vec![Some((2, 1)), Some((2, 2)), Some((2, 3))],
            vec![Some((3, 1)), Some((3, 2)), Some((3, 3))],
        ]);
        let blocks = segment_blocks(&grid);
        assert_eq!(blocks.len(), 1);
        let aligned = align_block(&grid, &blocks[0]).expect("aligned");
        assert_eq!((aligned.row, aligned.col), (2, 1));
        assert_eq!(aligned.cost, 0.0);

        let mut matches = MatchGrid::new();
        assert_eq!(matches.place(&grid, &blocks[0], &aligned), 6);
        assert_eq!(matches.placed(), 6);
        let (r, c, _) = matches.first_placed().expect("placed");
        assert_eq!((r, c), (2, 1));
        // second write keeps the first position
        assert_eq!(matches.place(&grid, &blocks[0], &aligned), 0);
    }

    #[test]
    fn oversized_blocks_do_not_match() {
        let block = Block {
            row: 0,
            col: 0,
            rows: 5,
            cols: 2,
        };
        let grid = chart_grid(&[vec![Some((0, 0))]]);
        assert!(align_block(&grid, &block).is_none());
    }
}
