//! Same-color geometry: horizontal runs and 4-connected blobs.
//!
//! Runs and blobs drive the "special event" scoring terms: a full-width run
//! and a fully enclosed floor-touching blob are the two high-value board
//! configurations in this ruleset. Both structures are transient, recomputed
//! per evaluation, and never persisted in the board.

use squall_engine::{Board, Color};

/// Maximal horizontal sequence of same-colored occupied cells in one row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Run {
    pub color: Color,
    pub row: usize,
    pub start: usize,
    pub width: usize,
    pub touches_left: bool,
    pub touches_right: bool,
}

impl Run {
    /// Spans the full board width, touching both boundaries.
    #[must_use]
    pub fn is_full_width(&self) -> bool {
        self.touches_left && self.touches_right
    }

    fn edge_contacts(&self) -> usize {
        usize::from(self.touches_left) + usize::from(self.touches_right)
    }
}

/// Maximal 4-connected region of same-colored occupied cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    pub color: Color,
    pub cells: Vec<(usize, usize)>,
    pub touches_floor: bool,
    pub touches_left: bool,
    pub touches_right: bool,
    /// True when every outward-facing neighbor of the region is off-board or
    /// occupied by a different color (no empty neighbor anywhere).
    pub enclosed: bool,
}

impl Blob {
    #[must_use]
    pub fn size(&self) -> usize {
        self.cells.len()
    }

    /// Floor plus side contact: the precondition for the enclosure event.
    #[must_use]
    pub fn anchored(&self) -> bool {
        self.touches_floor && (self.touches_left || self.touches_right)
    }
}

/// Run and blob scan of one board snapshot.
#[derive(Debug)]
pub struct ColorAnalysis {
    runs: Vec<Run>,
    best_runs: [Option<Run>; Color::LEN],
    blobs: Vec<Blob>,
}

impl ColorAnalysis {
    #[must_use]
    pub fn from_board(board: &Board) -> Self {
        let runs = scan_runs(board);
        let best_runs = best_runs_per_color(&runs);
        let blobs = scan_blobs(board);
        Self {
            runs,
            best_runs,
            blobs,
        }
    }

    /// All maximal runs of width ≥ 2.
    #[must_use]
    pub fn runs(&self) -> &[Run] {
        &self.runs
    }

    /// The best run per color: widest, ties broken toward edge contact.
    #[must_use]
    pub fn best_run(&self, color: Color) -> Option<&Run> {
        self.best_runs[color as usize].as_ref()
    }

    /// Width of the widest run of any color, 0 when none.
    #[must_use]
    pub fn widest_run_width(&self) -> usize {
        self.best_runs
            .iter()
            .flatten()
            .map(|r| r.width)
            .max()
            .unwrap_or(0)
    }

    #[must_use]
    pub fn blobs(&self) -> &[Blob] {
        &self.blobs
    }

    /// Fraction of the board width covered by the widest run, in `[0, 1]`.
    ///
    /// Used as the "event-building confidence" signal: the closer a run is
    /// to spanning the board, the more the evaluator tolerates structural
    /// imperfection in pursuit of the event.
    #[must_use]
    pub fn building_confidence(&self, cols: usize) -> f32 {
        if cols == 0 {
            return 0.0;
        }
        let width = self.widest_run_width();
        #[expect(clippy::cast_precision_loss)]
        let confidence = width as f32 / cols as f32;
        confidence.clamp(0.0, 1.0)
    }
}

fn scan_runs(board: &Board) -> Vec<Run> {
    let mut runs = Vec::new();
    for y in 0..board.rows() {
        let mut x = 0;
        while x < board.cols() {
            let Some(color) = board.cell(x, y).color() else {
                x += 1;
                continue;
            };
            let start = x;
            while x < board.cols() && board.cell(x, y).color() == Some(color) {
                x += 1;
            }
            let width = x - start;
            if width >= 2 {
                runs.push(Run {
                    color,
                    row: y,
                    start,
                    width,
                    touches_left: start == 0,
                    touches_right: x == board.cols(),
                });
            }
        }
    }
    runs
}

fn best_runs_per_color(runs: &[Run]) -> [Option<Run>; Color::LEN] {
    let mut best: [Option<Run>; Color::LEN] = [None; Color::LEN];
    for run in runs {
        let slot = &mut best[run.color as usize];
        let better = match slot {
            None => true,
            Some(current) => {
                (run.width, run.edge_contacts()) > (current.width, current.edge_contacts())
            }
        };
        if better {
            *slot = Some(*run);
        }
    }
    best
}

fn scan_blobs(board: &Board) -> Vec<Blob> {
    let (cols, rows) = (board.cols(), board.rows());
    let mut visited = vec![false; cols * rows];
    let mut blobs = Vec::new();

    for y in 0..rows {
        for x in 0..cols {
            if visited[y * cols + x] {
                continue;
            }
            let Some(color) = board.cell(x, y).color() else {
                continue;
            };

            // Flood fill the 4-connected region of this color.
            let mut cells = Vec::new();
            let mut stack = vec![(x, y)];
            visited[y * cols + x] = true;
            let mut enclosed = true;
            let mut touches_floor = false;
            let mut touches_left = false;
            let mut touches_right = false;

            while let Some((cx, cy)) = stack.pop() {
                cells.push((cx, cy));
                touches_floor |= cy == rows - 1;
                touches_left |= cx == 0;
                touches_right |= cx == cols - 1;

                let neighbors = [
                    (cx.wrapping_sub(1), cy),
                    (cx + 1, cy),
                    (cx, cy.wrapping_sub(1)),
                    (cx, cy + 1),
                ];
                for (nx, ny) in neighbors {
                    if nx >= cols || ny >= rows {
                        continue;
                    }
                    match board.cell(nx, ny).color() {
                        Some(c) if c == color => {
                            if !visited[ny * cols + nx] {
                                visited[ny * cols + nx] = true;
                                stack.push((nx, ny));
                            }
                        }
                        Some(_) => {}
                        None => enclosed = false,
                    }
                }
            }

            blobs.push(Blob {
                color,
                cells,
                touches_floor,
                touches_left,
                touches_right,
                enclosed,
            });
        }
    }

    blobs
}
