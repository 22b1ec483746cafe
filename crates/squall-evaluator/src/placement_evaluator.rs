//! Multi-factor placement scoring.
//!
//! One evaluator computes every term and always builds the itemized
//! [`ScoreBreakdown`]; [`score_placement`] is the thin wrapper that discards
//! it when instrumentation is not requested. Keeping a single code path
//! prevents the plain and instrumented scores from drifting apart.

use serde::{Deserialize, Serialize};
use squall_engine::{Board, CandidatePlacement, Color, Mode, SkillLevel};

use crate::{
    board_analysis::BoardAnalysis,
    color_analysis::ColorAnalysis,
    weights::{EvalWeights, StrategyProfile},
};

/// Everything the evaluator needs besides the board: weights, profile, the
/// pilot's current mode, and the request's piece/queue context.
#[derive(Debug, Clone, Copy)]
pub struct EvalContext<'a> {
    pub weights: &'a EvalWeights,
    pub profile: StrategyProfile,
    pub mode: Mode,
    pub skill: SkillLevel,
    pub ufo_active: bool,
    pub piece_color: Color,
    pub queue_colors: &'a [Color],
}

/// Board state after simulating one placement.
///
/// Owns the resulting board plus its structural and color analyses; built
/// once per candidate and shared by every scoring term.
#[derive(Debug)]
pub struct PlacementAnalysis {
    placed_cells: Vec<(usize, usize)>,
    board_analysis: BoardAnalysis,
    color_analysis: ColorAnalysis,
}

impl PlacementAnalysis {
    #[must_use]
    pub fn from_board(before: &Board, candidate: &CandidatePlacement, color: Color) -> Self {
        let mut board = before.clone();
        board.fill_shape(&candidate.shape, candidate.x, candidate.y, color);

        let placed_cells = candidate
            .shape
            .occupied_cells()
            .filter_map(|(dx, dy)| {
                let x = candidate.x + i32::try_from(dx).ok()?;
                let y = candidate.y + i32::try_from(dy).ok()?;
                if x < 0 || y < 0 {
                    return None;
                }
                let (x, y) = (usize::try_from(x).ok()?, usize::try_from(y).ok()?);
                (x < board.cols() && y < board.rows()).then_some((x, y))
            })
            .collect();

        Self {
            placed_cells,
            color_analysis: ColorAnalysis::from_board(&board),
            board_analysis: BoardAnalysis::from_board(&board),
        }
    }

    #[must_use]
    pub fn board_analysis(&self) -> &BoardAnalysis {
        &self.board_analysis
    }

    #[must_use]
    pub fn color_analysis(&self) -> &ColorAnalysis {
        &self.color_analysis
    }

    /// On-board cells the placed piece occupies.
    #[must_use]
    pub fn placed_cells(&self) -> &[(usize, usize)] {
        &self.placed_cells
    }
}

/// Itemized scoring components. Sums to the placement score.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    pub holes: f32,
    pub height: f32,
    pub bumpiness: f32,
    pub deep_wells: f32,
    pub critical: f32,
    pub line_clears: f32,
    pub runs: f32,
    pub enclosure: f32,
    pub adjacency: f32,
}

impl ScoreBreakdown {
    #[must_use]
    pub fn total(&self) -> f32 {
        self.holes
            + self.height
            + self.bumpiness
            + self.deep_wells
            + self.critical
            + self.line_clears
            + self.runs
            + self.enclosure
            + self.adjacency
    }

    /// Coarse classification by dominant term.
    #[must_use]
    pub fn classify(&self) -> StrategyTag {
        let special = self.runs + self.enclosure;
        let structure = self.holes + self.height + self.bumpiness + self.deep_wells;
        let candidates = [
            (self.critical.abs(), StrategyTag::Survival),
            (special.abs(), StrategyTag::Offensive),
            (
                self.line_clears.abs(),
                if self.line_clears >= 0.0 {
                    StrategyTag::Opportunistic
                } else {
                    StrategyTag::Defensive
                },
            ),
            (self.adjacency.abs(), StrategyTag::Opportunistic),
            (structure.abs(), StrategyTag::Defensive),
        ];
        let (magnitude, tag) = candidates
            .into_iter()
            .max_by(|a, b| a.0.total_cmp(&b.0))
            .unwrap_or((0.0, StrategyTag::Neutral));
        if magnitude < 1.0 {
            StrategyTag::Neutral
        } else {
            tag
        }
    }
}

/// Which concern dominated a placement's score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyTag {
    Offensive,
    Defensive,
    Opportunistic,
    Survival,
    Neutral,
}

/// A candidate placement with its score attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredPlacement {
    pub x: i32,
    pub y: i32,
    pub rotation_index: usize,
    pub shape: squall_engine::PieceShape,
    pub score: f32,
    pub game_ending: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breakdown: Option<ScoreBreakdown>,
}

impl ScoredPlacement {
    #[must_use]
    pub fn new(candidate: &CandidatePlacement, score: f32, breakdown: Option<ScoreBreakdown>) -> Self {
        Self {
            x: candidate.x,
            y: candidate.y,
            rotation_index: candidate.rotation_index,
            shape: candidate.shape.clone(),
            score,
            game_ending: candidate.game_ending,
            breakdown,
        }
    }
}

/// Scores a placement, returning the score and the full breakdown.
///
/// Overflow placements short-circuit to the fixed game-ending score so they
/// remain selectable when no survivable option exists, while losing every
/// comparison against one.
#[must_use]
pub fn evaluate_placement(
    before: &Board,
    candidate: &CandidatePlacement,
    ctx: &EvalContext<'_>,
) -> (f32, ScoreBreakdown) {
    if candidate.game_ending {
        return (ctx.weights.game_ending_score, ScoreBreakdown::default());
    }
    let analysis = PlacementAnalysis::from_board(before, candidate, ctx.piece_color);
    let breakdown = score_terms(&analysis, ctx);
    (breakdown.total(), breakdown)
}

/// Score-only wrapper over [`evaluate_placement`].
#[must_use]
pub fn score_placement(
    before: &Board,
    candidate: &CandidatePlacement,
    ctx: &EvalContext<'_>,
) -> f32 {
    evaluate_placement(before, candidate, ctx).0
}

#[expect(clippy::cast_precision_loss)]
fn score_terms(analysis: &PlacementAnalysis, ctx: &EvalContext<'_>) -> ScoreBreakdown {
    let w = ctx.weights;
    let boards = analysis.board_analysis();
    let colors = analysis.color_analysis();
    let cols = boards.board().cols();
    let height = boards.stack_height();

    let special = ctx.skill.special_events_enabled();
    let confidence = if special {
        colors.building_confidence(cols)
    } else {
        0.0
    };
    let sub_critical = height < w.critical_bands[0].0;
    // Survival mode suppresses all grooming: the mode machine has decided the
    // stack is too dangerous to chase events.
    let grooming = ctx.mode == Mode::ColorBuilding;
    let building = special
        && grooming
        && (confidence >= 0.5
            || colors
                .blobs()
                .iter()
                .any(|b| b.anchored() && b.size() >= w.enclosure_partial_min_size));

    let mut b = ScoreBreakdown::default();

    // Holes: the penalty rate decays toward the building rate as run
    // progress grows; structurally acceptable imperfection while an event
    // is within reach.
    let hole_rate = w.hole_penalty - (w.hole_penalty - w.hole_penalty_building) * confidence;
    b.holes = -hole_rate * boards.num_holes() as f32;

    let height_rate = if building && sub_critical {
        w.height_penalty_building
    } else {
        w.height_penalty
    };
    b.height = -height_rate * height as f32;

    let bump_rate = if building {
        w.bumpiness_penalty_building
    } else {
        w.bumpiness_penalty
    };
    b.bumpiness = -bump_rate * boards.surface_bumpiness() as f32;

    b.deep_wells = -w.deep_well_penalty * boards.deep_well_excess() as f32;

    // Unconditional loss-avoidance pressure, independent of event building.
    for (threshold, penalty) in w.critical_bands {
        if height >= threshold {
            b.critical -= penalty;
        }
    }

    let lines = boards.full_rows();
    if lines > 0 {
        let lines = lines as f32;
        if !special {
            b.line_clears = w.clear_reward_plain * lines;
        } else if !ctx.ufo_active && height >= w.emergency_height {
            b.line_clears = w.clear_reward_emergency * lines;
        } else {
            // Clearing a row destroys run progress; the closer the best run
            // is to spanning the board, the worse a clear is. The UFO flag
            // extends the penalty into the emergency band.
            b.line_clears = -(w.clear_base_penalty + w.clear_progress_penalty * confidence) * lines;
        }
    }

    // Run and blob bonuses are gated: no grooming for future value while
    // already in imminent danger.
    let gated = special && grooming && (height < w.building_gate_height || building);
    if gated {
        for color in Color::ALL {
            let Some(run) = colors.best_run(color) else {
                continue;
            };
            let base = if run.is_full_width() {
                w.run_bonus_full
            } else if run.width + 1 >= cols {
                w.run_bonus_close
            } else if run.width + 3 >= cols {
                w.run_bonus_near
            } else {
                continue;
            };
            let mut factor = 1.0;
            if run.color == ctx.piece_color {
                factor *= w.run_piece_color_factor;
            }
            let queued = ctx.queue_colors.iter().filter(|&&c| c == run.color).count();
            factor *= 1.0 + w.run_queue_color_factor * queued as f32;
            b.runs += base * factor;
        }

        for blob in colors.blobs() {
            if blob.enclosed && blob.anchored() {
                b.enclosure += w.enclosure_bonus_per_cell * blob.size() as f32;
            } else if blob.anchored() && blob.size() >= w.enclosure_partial_min_size {
                b.enclosure += w.enclosure_partial_per_cell * blob.size() as f32;
            }
        }

        if ctx.profile == StrategyProfile::Simple {
            let growth: usize = colors.runs().iter().map(|r| r.width - 1).sum();
            b.runs += w.run_growth_simple * growth as f32;
        }
    }

    let (horizontal_w, vertical_w) = match ctx.profile {
        StrategyProfile::Standard => (w.adjacency_horizontal, w.adjacency_vertical),
        StrategyProfile::Simple => (w.adjacency_simple, w.adjacency_simple),
    };
    let board = boards.board();
    for &(x, y) in analysis.placed_cells() {
        let own = |nx: usize, ny: usize| analysis.placed_cells().contains(&(nx, ny));
        let same = |nx: usize, ny: usize| {
            nx < board.cols()
                && ny < board.rows()
                && !own(nx, ny)
                && board.cell(nx, ny).color() == Some(ctx.piece_color)
        };
        if x > 0 && same(x - 1, y) {
            b.adjacency += horizontal_w;
        }
        if same(x + 1, y) {
            b.adjacency += horizontal_w;
        }
        if y > 0 && same(x, y - 1) {
            b.adjacency += vertical_w;
        }
        if same(x, y + 1) {
            b.adjacency += vertical_w;
        }
    }

    b
}

#[cfg(test)]
mod tests {
    use super::*;
    use squall_engine::{PieceShape, enumerate_placements};

    fn ctx<'a>(weights: &'a EvalWeights, queue: &'a [Color]) -> EvalContext<'a> {
        EvalContext {
            weights,
            profile: StrategyProfile::Standard,
            mode: Mode::ColorBuilding,
            skill: SkillLevel::Hurricane,
            ufo_active: false,
            piece_color: Color::Red,
            queue_colors: queue,
        }
    }

    fn single_cell_at(board: &Board, x: i32) -> CandidatePlacement {
        let rotations = PieceShape::from_ascii("#").rotations();
        enumerate_placements(board, &rotations)
            .into_iter()
            .find(|p| p.x == x)
            .unwrap()
    }

    #[test]
    fn test_breakdown_sums_to_score() {
        let board = Board::from_ascii(
            "
            ..........
            ..........
            R...G.....
            RRGGG..BB.
            ",
        );
        let weights = EvalWeights::for_skill(SkillLevel::Hurricane);
        let candidate = single_cell_at(&board, 2);
        let c = ctx(&weights, &[]);
        let (score, breakdown) = evaluate_placement(&board, &candidate, &c);
        assert!((score - breakdown.total()).abs() < 1e-4);
        // The score-only wrapper must agree exactly.
        assert!((score_placement(&board, &candidate, &c) - score).abs() < f32::EPSILON);
    }

    #[test]
    fn test_game_ending_scored_fixed() {
        let mut board = Board::new(3, 4);
        for y in 0..4 {
            board.set_cell(0, y, squall_engine::Cell::Color(Color::Blue));
        }
        let weights = EvalWeights::for_skill(SkillLevel::Tempest);
        let candidate = single_cell_at(&board, 0);
        assert!(candidate.game_ending);
        let (score, _) = evaluate_placement(&board, &candidate, &ctx(&weights, &[]));
        assert!((score - weights.game_ending_score).abs() < f32::EPSILON);
    }

    #[test]
    fn test_holes_penalized_less_while_building() {
        // Same structural board, once with a long run driving confidence up.
        let plain = Board::from_ascii(
            "
            ..........
            ..B.......
            ..........
            G.RRRRRR.G
            ",
        );
        let weights = EvalWeights::for_skill(SkillLevel::Hurricane);
        let candidate = single_cell_at(&plain, 1);
        let (_, breakdown) = evaluate_placement(&plain, &candidate, &ctx(&weights, &[]));
        // Confidence from the 6-wide red run: hole rate is below the maximum.
        let analysis = PlacementAnalysis::from_board(&plain, &candidate, Color::Red);
        let holes = analysis.board_analysis().num_holes();
        assert!(holes > 0);
        #[expect(clippy::cast_precision_loss)]
        let max_penalty = weights.hole_penalty * holes as f32;
        assert!(breakdown.holes.abs() < max_penalty);
    }

    #[test]
    fn test_full_width_run_dominates() {
        // Nine-wide red run missing only the last column; red single cell.
        let board = Board::from_ascii(
            "
            ..........
            ..........
            ..........
            RRRRRRRRR.
            ",
        );
        let weights = EvalWeights::for_skill(SkillLevel::Hurricane);
        let completing = single_cell_at(&board, 9);
        let c = ctx(&weights, &[]);
        let (completing_score, breakdown) = evaluate_placement(&board, &completing, &c);
        assert!(breakdown.runs >= weights.run_bonus_full);
        assert_eq!(breakdown.classify(), StrategyTag::Offensive);

        // Completing the span (and the line) must beat every alternative.
        for x in 0..9 {
            let alt = single_cell_at(&board, x);
            let (alt_score, _) = evaluate_placement(&board, &alt, &c);
            assert!(completing_score > alt_score, "column {x} outscored the span");
        }
    }

    #[test]
    fn test_clears_rewarded_in_emergency_band() {
        // One column short of a full bottom row, stack far above the
        // emergency height.
        let mut board = Board::new(4, 20);
        for y in 4..20 {
            for x in 0..3 {
                board.set_cell(x, y, squall_engine::Cell::Color(Color::Green));
            }
        }
        let weights = EvalWeights::for_skill(SkillLevel::Hurricane);
        let candidate = single_cell_at(&board, 3);
        let c = ctx(&weights, &[]);
        let (_, breakdown) = evaluate_placement(&board, &candidate, &c);
        assert!(breakdown.line_clears > 0.0, "emergency clear not rewarded");

        // The UFO flag inverts the reward into a penalty.
        let ufo = EvalContext { ufo_active: true, ..c };
        let (_, breakdown) = evaluate_placement(&board, &candidate, &ufo);
        assert!(breakdown.line_clears < 0.0, "ufo clear not penalized");
    }

    #[test]
    fn test_adjacency_prefers_horizontal_contact() {
        let board = Board::from_ascii(
            "
            ......
            ......
            ......
            ......
            RR.R..
            ",
        );
        let weights = EvalWeights::for_skill(SkillLevel::Hurricane);
        let c = ctx(&weights, &[]);
        // Beside the red pair (horizontal contact).
        let beside = single_cell_at(&board, 2);
        // On top of the lone red cell (vertical contact).
        let on_top = single_cell_at(&board, 3);
        let (_, beside_b) = evaluate_placement(&board, &beside, &c);
        let (_, on_top_b) = evaluate_placement(&board, &on_top, &c);
        assert!(beside_b.adjacency > on_top_b.adjacency);
    }

    #[test]
    fn test_breeze_skips_special_terms() {
        let board = Board::from_ascii(
            "
            ..........
            ..........
            ..........
            RRRRRRRRR.
            ",
        );
        let weights = EvalWeights::for_skill(SkillLevel::Breeze);
        let c = EvalContext {
            skill: SkillLevel::Breeze,
            ..ctx(&weights, &[])
        };
        let candidate = single_cell_at(&board, 9);
        let (_, breakdown) = evaluate_placement(&board, &candidate, &c);
        assert!(breakdown.runs.abs() < f32::EPSILON);
        assert!(breakdown.enclosure.abs() < f32::EPSILON);
        // Clears are plainly rewarded instead.
        assert!(breakdown.line_clears > 0.0);
    }

    #[test]
    fn test_classification_structure_dominated() {
        let board = Board::new(10, 20);
        let weights = EvalWeights::for_skill(SkillLevel::Hurricane);
        let candidate = single_cell_at(&board, 0);
        let (_, breakdown) = evaluate_placement(&board, &candidate, &ctx(&weights, &[]));
        // Single cell on an empty board: only height/bumpiness penalties.
        assert_eq!(breakdown.classify(), StrategyTag::Defensive);
    }

    #[test]
    fn test_survival_mode_suppresses_grooming() {
        let board = Board::from_ascii(
            "
            ..........
            ..........
            ..........
            RRRRRRRRR.
            ",
        );
        let weights = EvalWeights::for_skill(SkillLevel::Hurricane);
        let c = EvalContext {
            mode: Mode::Survival,
            ..ctx(&weights, &[])
        };
        let candidate = single_cell_at(&board, 9);
        let (_, breakdown) = evaluate_placement(&board, &candidate, &c);
        assert!(breakdown.runs.abs() < f32::EPSILON);
        assert!(breakdown.enclosure.abs() < f32::EPSILON);
    }
}
