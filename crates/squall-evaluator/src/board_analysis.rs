use std::{cell::OnceCell, iter};

use serde::{Deserialize, Serialize};
use squall_engine::Board;

/// Lazily computed structural metrics for a board snapshot.
///
/// Each metric is computed at most once per analysis; evaluations that only
/// touch a subset of metrics pay only for that subset.
#[derive(Debug)]
pub struct BoardAnalysis {
    board: Board,
    column_heights: OnceCell<Vec<usize>>,
    column_occupied_cells: OnceCell<Vec<usize>>,
    stack_height: OnceCell<usize>,
    num_holes: OnceCell<usize>,
    surface_bumpiness: OnceCell<usize>,
    deep_well_excess: OnceCell<usize>,
    full_rows: OnceCell<usize>,
}

impl BoardAnalysis {
    #[must_use]
    pub fn from_board(board: &Board) -> Self {
        Self {
            board: board.clone(),
            column_heights: OnceCell::new(),
            column_occupied_cells: OnceCell::new(),
            stack_height: OnceCell::new(),
            num_holes: OnceCell::new(),
            surface_bumpiness: OnceCell::new(),
            deep_well_excess: OnceCell::new(),
            full_rows: OnceCell::new(),
        }
    }

    #[must_use]
    pub fn board(&self) -> &Board {
        &self.board
    }

    #[must_use]
    pub fn column_heights(&self) -> &[usize] {
        self.column_heights.get_or_init(|| {
            let mut heights = vec![0; self.board.cols()];
            for (x, h) in heights.iter_mut().enumerate() {
                for y in 0..self.board.rows() {
                    if self.board.is_occupied(x, y) {
                        *h = self.board.rows() - y;
                        break;
                    }
                }
            }
            heights
        })
    }

    #[must_use]
    pub fn column_occupied_cells(&self) -> &[usize] {
        self.column_occupied_cells.get_or_init(|| {
            let mut occupied = vec![0; self.board.cols()];
            for (x, o) in occupied.iter_mut().enumerate() {
                for y in 0..self.board.rows() {
                    if self.board.is_occupied(x, y) {
                        *o += 1;
                    }
                }
            }
            occupied
        })
    }

    /// Rows from the topmost occupied row to the floor.
    #[must_use]
    pub fn stack_height(&self) -> usize {
        *self
            .stack_height
            .get_or_init(|| self.column_heights().iter().copied().max().unwrap_or(0))
    }

    /// A cell is a hole when it is empty but some occupied cell sits above it
    /// in the same column.
    #[must_use]
    pub fn num_holes(&self) -> usize {
        *self.num_holes.get_or_init(|| {
            iter::zip(self.column_heights(), self.column_occupied_cells())
                .map(|(h, occ)| h - occ)
                .sum()
        })
    }

    /// Sum of absolute differences between adjacent column heights.
    #[must_use]
    pub fn surface_bumpiness(&self) -> usize {
        *self.surface_bumpiness.get_or_init(|| {
            self.column_heights()
                .windows(2)
                .map(|w| w[0].abs_diff(w[1]))
                .sum()
        })
    }

    /// Sum over columns of well depth beyond 3 rows.
    ///
    /// A column is a deep well when both neighbors (board edges count as
    /// walls of unbounded height) are taller by more than 3; only the excess
    /// beyond 3 contributes.
    #[must_use]
    pub fn deep_well_excess(&self) -> usize {
        const DEPTH_THRESHOLD: usize = 3;
        *self.deep_well_excess.get_or_init(|| {
            let h = self.column_heights();
            (0..h.len())
                .map(|x| {
                    let left = if x == 0 { usize::MAX } else { h[x - 1] };
                    let right = if x + 1 == h.len() { usize::MAX } else { h[x + 1] };
                    let depth = usize::min(left, right).saturating_sub(h[x]);
                    depth.saturating_sub(DEPTH_THRESHOLD)
                })
                .sum()
        })
    }

    /// Count of completely filled rows.
    ///
    /// Clearing is the host game's job; the evaluator only counts.
    #[must_use]
    pub fn full_rows(&self) -> usize {
        *self.full_rows.get_or_init(|| {
            (0..self.board.rows())
                .filter(|&y| self.board.row(y).all(|c| !c.is_empty()))
                .count()
        })
    }

    /// Serializable snapshot of the headline metrics.
    #[must_use]
    pub fn metrics(&self) -> BoardMetrics {
        BoardMetrics {
            stack_height: self.stack_height(),
            holes: self.num_holes(),
            bumpiness: self.surface_bumpiness(),
        }
    }
}

/// Headline board metrics carried in decision metadata and recordings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardMetrics {
    pub stack_height: usize,
    pub holes: usize,
    pub bumpiness: usize,
}
