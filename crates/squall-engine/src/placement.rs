//! Legal placement enumeration.
//!
//! Pure functions from a board snapshot and a rotation set to the set of
//! candidate drops. Iteration order is fixed (rotation-major, then `x`
//! ascending) because downstream scoring breaks ties first-seen-wins under a
//! strict `>` comparison; reordering here would silently change decisions.

use serde::{Deserialize, Serialize};

use crate::core::{Board, PieceShape};

/// A candidate result of dropping one rotation of a piece at column `x`.
///
/// Scoring is layered on top by the evaluator; the generator only records the
/// geometry and whether the drop overflows the visible board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidatePlacement {
    pub x: i32,
    /// Landing row of the shape's top-left anchor. Negative when the piece
    /// comes to rest partially above the visible board.
    pub y: i32,
    pub rotation_index: usize,
    pub shape: PieceShape,
    /// True when even the minimal legal drop leaves the piece's top occupied
    /// row above the board. Such placements stay in the candidate set (they
    /// may be the only option) but are scored with a fixed large penalty.
    pub game_ending: bool,
}

/// Checks shape legality at a fixed anchor.
///
/// Every occupied cell must map to a column in `[0, cols)` and a row below
/// `rows`; rows `< 0` (above the visible board) are never checked against
/// occupancy, only against the horizontal bounds.
#[must_use]
pub fn shape_fits(board: &Board, shape: &PieceShape, x: i32, y: i32) -> bool {
    let cols = i32::try_from(board.cols()).unwrap_or(i32::MAX);
    let rows = i32::try_from(board.rows()).unwrap_or(i32::MAX);
    for (dx, dy) in shape.occupied_cells() {
        let cx = x + i32::try_from(dx).unwrap_or(i32::MAX);
        let cy = y + i32::try_from(dy).unwrap_or(i32::MAX);
        if cx < 0 || cx >= cols || cy >= rows {
            return false;
        }
        if cy >= 0 {
            let (cx, cy) = (usize::try_from(cx).unwrap(), usize::try_from(cy).unwrap());
            if board.is_occupied(cx, cy) {
                return false;
            }
        }
    }
    true
}

/// Simulates continuous descent of `shape` at column `x` from above the
/// board. Returns the landing anchor row, or `None` when no legal position
/// exists in that column (horizontal bounds fail).
#[must_use]
pub fn drop_shape(board: &Board, shape: &PieceShape, x: i32) -> Option<i32> {
    let start = -i32::try_from(shape.height()).unwrap_or(0);
    if !shape_fits(board, shape, x, start) {
        return None;
    }
    let mut y = start;
    while shape_fits(board, shape, x, y + 1) {
        y += 1;
    }
    Some(y)
}

fn top_occupied_row(shape: &PieceShape) -> usize {
    shape.occupied_cells().map(|(_, dy)| dy).min().unwrap_or(0)
}

fn enumerate_span(
    board: &Board,
    rotations: &[PieceShape],
    span: impl Fn(&PieceShape) -> (i32, i32),
) -> Vec<CandidatePlacement> {
    let mut placements = Vec::new();
    for (rotation_index, shape) in rotations.iter().enumerate() {
        if shape.occupied_cells().next().is_none() {
            continue;
        }
        let min_dy = i32::try_from(top_occupied_row(shape)).unwrap_or(0);
        let (lo, hi) = span(shape);
        for x in lo..=hi {
            let Some(y) = drop_shape(board, shape, x) else {
                continue;
            };
            placements.push(CandidatePlacement {
                x,
                y,
                rotation_index,
                shape: shape.clone(),
                game_ending: y + min_dy < 0,
            });
        }
    }
    placements
}

/// Enumerates all legal drops for the active piece.
///
/// Spans `x ∈ [-2, cols + 1]` per rotation, wide enough to cover partially
/// off-board spawn positions in degenerate cases; illegal offsets fall out of
/// the legality check.
#[must_use]
pub fn enumerate_placements(board: &Board, rotations: &[PieceShape]) -> Vec<CandidatePlacement> {
    let cols = i32::try_from(board.cols()).unwrap_or(0);
    enumerate_span(board, rotations, |_| (-2, cols + 1))
}

/// Enumerates legal drops for a queued piece during lookahead.
///
/// Uses the strict span `x ∈ [0, cols − width]`; queue pieces are simulated
/// only at fully on-board columns.
#[must_use]
pub fn enumerate_grounded(board: &Board, rotations: &[PieceShape]) -> Vec<CandidatePlacement> {
    let cols = i32::try_from(board.cols()).unwrap_or(0);
    enumerate_span(board, rotations, |shape| {
        (0, cols - i32::try_from(shape.width()).unwrap_or(0))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Color;

    fn single() -> PieceShape {
        PieceShape::from_ascii("#")
    }

    fn bar() -> PieceShape {
        PieceShape::from_ascii("####")
    }

    #[test]
    fn test_drop_on_empty_board_lands_on_floor() {
        let board = Board::new(10, 20);
        for x in 0..10 {
            assert_eq!(drop_shape(&board, &single(), x), Some(19));
        }
        // Landing row is rows - piece height for any shape.
        let tall = PieceShape::from_ascii("#\n#\n#");
        assert_eq!(drop_shape(&board, &tall, 4), Some(17));
    }

    #[test]
    fn test_drop_rests_on_stack() {
        let board = Board::from_ascii(
            "
            ....
            ....
            ....
            R...
            ",
        );
        assert_eq!(drop_shape(&board, &single(), 0), Some(2));
        assert_eq!(drop_shape(&board, &single(), 1), Some(3));
    }

    #[test]
    fn test_out_of_bounds_columns_rejected() {
        let board = Board::new(4, 8);
        assert_eq!(drop_shape(&board, &bar(), 1), None);
        assert_eq!(drop_shape(&board, &bar(), -1), None);
        assert_eq!(drop_shape(&board, &bar(), 0), Some(7));
    }

    #[test]
    fn test_enumerate_placements_no_overlap_and_in_bounds() {
        let board = Board::from_ascii(
            "
            ......
            ......
            ......
            ..GG..
            .GGGG.
            ",
        );
        let rotations = PieceShape::from_ascii("##\n.#").rotations();
        for p in enumerate_placements(&board, &rotations) {
            assert!(shape_fits(&board, &p.shape, p.x, p.y), "placement overlaps");
            assert!(!shape_fits(&board, &p.shape, p.x, p.y + 1), "not grounded");
        }
    }

    #[test]
    fn test_enumerate_grounded_strict_span() {
        let board = Board::new(6, 10);
        let rotations = bar().rotations();
        let placements = enumerate_grounded(&board, &rotations);
        for p in &placements {
            assert!(p.x >= 0);
            let width = i32::try_from(p.shape.width()).unwrap();
            assert!(p.x + width <= 6);
        }
        // Horizontal bar: 3 columns; vertical bar: 6 columns.
        assert_eq!(placements.len(), 3 + 6);
    }

    #[test]
    fn test_overflow_flagged_game_ending_not_excluded() {
        // Column 0 filled to the brim; a drop there rests above the board.
        let mut board = Board::new(3, 4);
        for y in 0..4 {
            board.set_cell(0, y, crate::core::Cell::Color(Color::Red));
        }
        let rotations = single().rotations();
        let placements = enumerate_placements(&board, &rotations);
        let overflow = placements.iter().find(|p| p.x == 0).unwrap();
        assert!(overflow.game_ending);
        assert_eq!(overflow.y, -1);
        let normal = placements.iter().find(|p| p.x == 1).unwrap();
        assert!(!normal.game_ending);
    }

    #[test]
    fn test_iteration_order_is_rotation_major_then_x() {
        let board = Board::new(4, 6);
        let rotations = bar().rotations();
        let placements = enumerate_placements(&board, &rotations);
        let order: Vec<(usize, i32)> = placements.iter().map(|p| (p.rotation_index, p.x)).collect();
        let mut sorted = order.clone();
        sorted.sort_unstable();
        assert_eq!(order, sorted);
    }
}
