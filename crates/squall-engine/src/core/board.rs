use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

/// Color tag for an occupied cell.
///
/// Colors are opaque identifiers: the engine only ever compares them for
/// equality, it never interprets them as pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Color {
    Red = 0,
    Yellow = 1,
    Green = 2,
    Blue = 3,
    Purple = 4,
    Cyan = 5,
}

impl Color {
    /// Number of distinct colors (6).
    pub const LEN: usize = 6;

    pub const ALL: [Color; Color::LEN] = [
        Color::Red,
        Color::Yellow,
        Color::Green,
        Color::Blue,
        Color::Purple,
        Color::Cyan,
    ];

    /// Returns the single character representation of this color.
    ///
    /// # Examples
    ///
    /// ```
    /// use squall_engine::Color;
    ///
    /// assert_eq!(Color::Red.as_char(), 'R');
    /// assert_eq!(Color::Cyan.as_char(), 'C');
    /// ```
    #[must_use]
    pub const fn as_char(self) -> char {
        match self {
            Color::Red => 'R',
            Color::Yellow => 'Y',
            Color::Green => 'G',
            Color::Blue => 'B',
            Color::Purple => 'P',
            Color::Cyan => 'C',
        }
    }

    /// Parses a color from a single character.
    #[must_use]
    pub const fn from_char(c: char) -> Option<Self> {
        match c {
            'R' => Some(Color::Red),
            'Y' => Some(Color::Yellow),
            'G' => Some(Color::Green),
            'B' => Some(Color::Blue),
            'P' => Some(Color::Purple),
            'C' => Some(Color::Cyan),
            _ => None,
        }
    }
}

/// A single cell on the board: empty, or occupied by a colored block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cell {
    #[default]
    Empty,
    Color(Color),
}

impl Cell {
    #[must_use]
    pub fn is_empty(self) -> bool {
        self == Cell::Empty
    }

    #[must_use]
    pub fn color(self) -> Option<Color> {
        match self {
            Cell::Empty => None,
            Cell::Color(color) => Some(color),
        }
    }
}

/// Rectangular cell grid of `cols × rows` colored blocks.
///
/// Row 0 is the top of the board, row `rows - 1` the floor. Rows have uniform
/// length; supplying inconsistent row data is a caller contract violation and
/// is not defended against here.
///
/// Boards are snapshots: the host hands one to the engine per decision request
/// and the engine never retains it beyond that computation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    cols: usize,
    rows: usize,
    cells: Vec<Cell>,
}

impl Serialize for Board {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        // Format: rows of cell characters joined by '|' (e.g. "R..G|....")
        let mut s = String::with_capacity(self.rows * (self.cols + 1));
        for y in 0..self.rows {
            if y > 0 {
                s.push('|');
            }
            for x in 0..self.cols {
                let c = match self.cell(x, y) {
                    Cell::Empty => '.',
                    Cell::Color(color) => color.as_char(),
                };
                let _ = s.write_char(c);
            }
        }
        serializer.serialize_str(&s)
    }
}

impl<'de> Deserialize<'de> for Board {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let mut rows_data = Vec::new();
        let mut cols = None;
        for line in s.split('|') {
            let row: Vec<Cell> = line
                .chars()
                .map(|c| {
                    if c == '.' {
                        Ok(Cell::Empty)
                    } else {
                        Color::from_char(c).map(Cell::Color).ok_or_else(|| {
                            serde::de::Error::custom(format!("invalid cell character: {c}"))
                        })
                    }
                })
                .collect::<Result<_, D::Error>>()?;
            match cols {
                None => cols = Some(row.len()),
                Some(cols) if cols == row.len() => {}
                Some(cols) => {
                    return Err(serde::de::Error::custom(format!(
                        "inconsistent row length: expected {cols}, got {}",
                        row.len()
                    )));
                }
            }
            rows_data.push(row);
        }
        let cols = cols.unwrap_or(0);
        let rows = rows_data.len();
        let cells = rows_data.into_iter().flatten().collect();
        Ok(Board { cols, rows, cells })
    }
}

/// Cell data handed to [`Board::from_cells`] does not match the declared
/// dimensions.
#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("board dimensions do not match cell count")]
pub struct BoardShapeError;

impl Board {
    #[must_use]
    pub fn new(cols: usize, rows: usize) -> Self {
        Self {
            cols,
            rows,
            cells: vec![Cell::Empty; cols * rows],
        }
    }

    /// Builds a board from row-major cell data.
    pub fn from_cells(
        cols: usize,
        rows: usize,
        cells: Vec<Cell>,
    ) -> Result<Self, BoardShapeError> {
        if cells.len() != cols * rows {
            return Err(BoardShapeError);
        }
        Ok(Self { cols, rows, cells })
    }

    /// Builds a board from an ASCII diagram.
    ///
    /// `.` marks an empty cell; color letters (`R Y G B P C`) mark occupied
    /// cells. Leading/trailing whitespace per line is trimmed, empty lines are
    /// skipped. Intended for test fixtures.
    ///
    /// # Panics
    ///
    /// Panics on unknown characters or inconsistent row lengths.
    #[must_use]
    pub fn from_ascii(s: &str) -> Self {
        let mut rows_data: Vec<Vec<Cell>> = Vec::new();
        for line in s.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let row: Vec<Cell> = line
                .chars()
                .map(|c| {
                    if c == '.' {
                        Cell::Empty
                    } else {
                        Cell::Color(Color::from_char(c).expect("unknown board character"))
                    }
                })
                .collect();
            if let Some(first) = rows_data.first() {
                assert_eq!(first.len(), row.len(), "inconsistent row length");
            }
            rows_data.push(row);
        }
        let cols = rows_data.first().map_or(0, Vec::len);
        let rows = rows_data.len();
        let cells = rows_data.into_iter().flatten().collect();
        Self { cols, rows, cells }
    }

    #[must_use]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[must_use]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[must_use]
    pub fn cell(&self, x: usize, y: usize) -> Cell {
        self.cells[y * self.cols + x]
    }

    pub fn set_cell(&mut self, x: usize, y: usize, cell: Cell) {
        self.cells[y * self.cols + x] = cell;
    }

    #[must_use]
    pub fn is_occupied(&self, x: usize, y: usize) -> bool {
        !self.cell(x, y).is_empty()
    }

    /// Returns an iterator over the cells of row `y`, left to right.
    pub fn row(&self, y: usize) -> impl Iterator<Item = Cell> + '_ {
        self.cells[y * self.cols..][..self.cols].iter().copied()
    }

    /// Rows from the topmost occupied cell down to the floor; 0 when empty.
    #[must_use]
    pub fn stack_height(&self) -> usize {
        for y in 0..self.rows {
            if self.row(y).any(|c| !c.is_empty()) {
                return self.rows - y;
            }
        }
        0
    }

    /// Fills the occupied cells of `shape` anchored at `(x, y)` with `color`.
    ///
    /// Cells that land above the visible board (row < 0) are discarded: they
    /// have no representation in the grid. Callers flag such placements as
    /// game-ending instead.
    pub fn fill_shape(&mut self, shape: &super::piece::PieceShape, x: i32, y: i32, color: Color) {
        for (dx, dy) in shape.occupied_cells() {
            let cx = x + i32::try_from(dx).unwrap_or(i32::MAX);
            let cy = y + i32::try_from(dy).unwrap_or(i32::MAX);
            if cy < 0 {
                continue;
            }
            let (cx, cy) = (usize::try_from(cx).unwrap(), usize::try_from(cy).unwrap());
            if cx < self.cols && cy < self.rows {
                self.set_cell(cx, cy, Cell::Color(color));
            }
        }
    }

    /// Removes completely filled rows, shifting rows above downward.
    ///
    /// Returns the number of rows removed. The engine core never calls this
    /// during evaluation (clear mechanics belong to the host game); it exists
    /// for hosts and simulators that own the real board.
    pub fn clear_full_rows(&mut self) -> usize {
        let mut cleared = 0;
        for y in (0..self.rows).rev() {
            if self.row(y).all(|c| !c.is_empty()) {
                cleared += 1;
                continue;
            }
            if cleared > 0 {
                for x in 0..self.cols {
                    let cell = self.cell(x, y);
                    self.set_cell(x, y + cleared, cell);
                }
            }
        }
        for y in 0..cleared {
            for x in 0..self.cols {
                self.set_cell(x, y, Cell::Empty);
            }
        }
        cleared
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_ascii_and_cells() {
        let board = Board::from_ascii(
            "
            ....
            R..G
            RRGG
            ",
        );
        assert_eq!(board.cols(), 4);
        assert_eq!(board.rows(), 3);
        assert_eq!(board.cell(0, 0), Cell::Empty);
        assert_eq!(board.cell(0, 1), Cell::Color(Color::Red));
        assert_eq!(board.cell(3, 2), Cell::Color(Color::Green));
    }

    #[test]
    fn test_stack_height() {
        let empty = Board::new(4, 6);
        assert_eq!(empty.stack_height(), 0);

        let board = Board::from_ascii(
            "
            ....
            ....
            ..B.
            BBBB
            ",
        );
        assert_eq!(board.stack_height(), 2);
    }

    #[test]
    fn test_clear_full_rows() {
        let mut board = Board::from_ascii(
            "
            ....
            G...
            RRRR
            YYYY
            ",
        );
        let cleared = board.clear_full_rows();
        assert_eq!(cleared, 2);
        assert_eq!(board.cell(0, 3), Cell::Color(Color::Green));
        assert_eq!(board.stack_height(), 1);
    }

    #[test]
    fn test_clear_full_rows_none() {
        let mut board = Board::from_ascii(
            "
            ....
            RRR.
            ",
        );
        assert_eq!(board.clear_full_rows(), 0);
        assert_eq!(board.cell(0, 1), Cell::Color(Color::Red));
    }

    #[test]
    fn test_board_serde_round_trip() {
        let board = Board::from_ascii(
            "
            .R..
            GGBB
            ",
        );
        let json = serde_json::to_string(&board).unwrap();
        assert_eq!(json, "\".R..|GGBB\"");
        let parsed: Board = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, board);
    }

    #[test]
    fn test_board_deserialize_rejects_ragged_rows() {
        assert!(serde_json::from_str::<Board>("\"..|...\"").is_err());
        assert!(serde_json::from_str::<Board>("\"..X|...\"").is_err());
    }

    #[test]
    fn test_from_cells_validates_dimensions() {
        let cells = vec![Cell::Empty; 8];
        let board = Board::from_cells(4, 2, cells.clone()).unwrap();
        assert_eq!(board, Board::new(4, 2));
        assert!(Board::from_cells(4, 3, cells).is_err());
    }

    #[test]
    fn test_color_char_round_trip() {
        for color in Color::ALL {
            assert_eq!(Color::from_char(color.as_char()), Some(color));
        }
        assert_eq!(Color::from_char('x'), None);
    }
}
