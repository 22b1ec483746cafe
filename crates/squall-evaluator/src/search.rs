//! Multi-ply lookahead over the piece queue.
//!
//! Greedy-with-discount, not minimax: queue pieces are fixed and known, so
//! there is no adversary to minimize against, only diminishing confidence at
//! depth. Immediate scores carry full weight; the best continuation of the
//! second piece contributes 50%, the third 35% of that already-discounted
//! term, the fourth 25% similarly nested.

use arrayvec::ArrayVec;
use serde::{Deserialize, Serialize};
use squall_engine::{
    Board, CandidatePlacement, Color, Piece, QueuedPiece, enumerate_grounded,
    enumerate_placements,
};

use crate::{
    board_analysis::{BoardAnalysis, BoardMetrics},
    placement_evaluator::{
        EvalContext, ScoreBreakdown, ScoredPlacement, StrategyTag, evaluate_placement,
    },
};

/// Branching and discount configuration for the lookahead chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchParams {
    /// Continuations kept for the second piece.
    pub top_k_second: usize,
    /// Continuations kept for the third piece.
    pub top_k_third: usize,
    pub discount_second: f32,
    pub discount_third: f32,
    pub discount_fourth: f32,
    /// Applied when a queued piece has no legal placement in a branch:
    /// certain future difficulty, not impossibility, so the branch stays.
    pub unplaceable_penalty: f32,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            top_k_second: 5,
            top_k_third: 4,
            discount_second: 0.5,
            discount_third: 0.35,
            discount_fourth: 0.25,
            unplaceable_penalty: -200.0,
        }
    }
}

/// Outcome of one placement search.
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub best: ScoredPlacement,
    /// Runner-up placements, best first, at most 3.
    pub alternatives: ArrayVec<ScoredPlacement, 3>,
    /// Combined-score gap between the winner and the first runner-up.
    pub score_gap: f32,
    /// Deepest queue ply at which a piece was actually placed during the
    /// search (0..=3); an unplaceable ply ends the chain without counting.
    pub depth_used: usize,
    pub classification: StrategyTag,
    /// Metrics of the board after the chosen placement.
    pub metrics: BoardMetrics,
}

/// Instrumentation snapshot of one decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionMeta {
    pub chosen: ScoredPlacement,
    pub alternatives: Vec<ScoredPlacement>,
    pub score_gap: f32,
    pub metrics: BoardMetrics,
    pub lookahead_depth: usize,
    pub queue_colors: Vec<Color>,
    pub classification: StrategyTag,
}

impl DecisionMeta {
    #[must_use]
    pub fn from_search(result: &SearchResult, queue_colors: Vec<Color>) -> Self {
        Self {
            chosen: result.best.clone(),
            alternatives: result.alternatives.to_vec(),
            score_gap: result.score_gap,
            metrics: result.metrics,
            lookahead_depth: result.depth_used,
            queue_colors,
            classification: result.classification,
        }
    }
}

/// Selects the placement maximizing immediate score plus the discounted
/// lookahead chain. Returns `None` when no legal placement exists (the
/// caller treats that as an immediate forced drop, not an engine fault).
///
/// Ties resolve first-seen-wins under strict `>`, so generation order is
/// part of the decision contract.
#[must_use]
pub fn select_best_placement(
    board: &Board,
    piece: &Piece,
    queue: &[QueuedPiece],
    ctx: &EvalContext<'_>,
    params: &SearchParams,
    capture_breakdown: bool,
) -> Option<SearchResult> {
    let rotations = piece.rotations();
    let candidates = enumerate_placements(board, &rotations);
    if candidates.is_empty() {
        return None;
    }

    let mut depth_used = 0;
    let mut scored: Vec<(f32, ScoredPlacement, ScoreBreakdown)> =
        Vec::with_capacity(candidates.len());

    for candidate in &candidates {
        let (immediate, breakdown) = evaluate_placement(board, candidate, ctx);
        let mut combined = immediate;
        if !queue.is_empty() && !candidate.game_ending {
            let after = board_after(board, candidate, ctx.piece_color);
            if let Some(chain) = chain_value(&after, queue, 0, ctx, params, &mut depth_used) {
                combined += params.discount_second * chain;
            }
        }
        let placement = ScoredPlacement::new(
            candidate,
            combined,
            capture_breakdown.then_some(breakdown),
        );
        scored.push((combined, placement, breakdown));
    }

    // Strict max, first seen wins.
    let mut best_index = 0;
    for (i, (combined, _, _)) in scored.iter().enumerate().skip(1) {
        if *combined > scored[best_index].0 {
            best_index = i;
        }
    }
    let (best_score, best, best_breakdown) = scored.remove(best_index);

    // Runner-ups: remaining placements, best first (stable on ties).
    scored.sort_by(|a, b| b.0.total_cmp(&a.0));
    let alternatives: ArrayVec<ScoredPlacement, 3> = scored
        .iter()
        .take(3)
        .map(|(_, p, _)| p.clone())
        .collect();
    let score_gap = scored.first().map_or(0.0, |(s, _, _)| best_score - s);

    let mut after = board.clone();
    after.fill_shape(&best.shape, best.x, best.y, ctx.piece_color);
    let metrics = BoardAnalysis::from_board(&after).metrics();

    Some(SearchResult {
        classification: best_breakdown.classify(),
        best,
        alternatives,
        score_gap,
        depth_used,
        metrics,
    })
}

fn board_after(board: &Board, candidate: &CandidatePlacement, color: Color) -> Board {
    let mut after = board.clone();
    after.fill_shape(&candidate.shape, candidate.x, candidate.y, color);
    after
}

/// Best discounted value achievable with `queue[level]` on `board`.
///
/// `None` when the chain has run out of pieces or depth; the unplaceable
/// penalty when the piece fits nowhere. `deepest` records the furthest ply
/// a piece was actually placed at, across every branch explored.
fn chain_value(
    board: &Board,
    queue: &[QueuedPiece],
    level: usize,
    ctx: &EvalContext<'_>,
    params: &SearchParams,
    deepest: &mut usize,
) -> Option<f32> {
    if level >= 3 {
        return None;
    }
    let piece = queue.get(level)?;

    let remaining: Vec<Color> = queue[level + 1..].iter().map(|q| q.color).collect();
    let sub_ctx = EvalContext {
        piece_color: piece.color,
        queue_colors: &remaining,
        ..*ctx
    };

    let rotations = piece.shape.rotations();
    let candidates = enumerate_grounded(board, &rotations);
    if candidates.is_empty() {
        return Some(params.unplaceable_penalty);
    }
    *deepest = (*deepest).max(level + 1);

    let mut scored: Vec<(f32, &CandidatePlacement)> = candidates
        .iter()
        .map(|c| (evaluate_placement(board, c, &sub_ctx).0, c))
        .collect();
    scored.sort_by(|a, b| b.0.total_cmp(&a.0));

    let (top_k, next_discount) = match level {
        0 => (params.top_k_second, params.discount_third),
        1 => (params.top_k_third, params.discount_fourth),
        _ => (1, 0.0),
    };

    let mut best = f32::MIN;
    for (immediate, candidate) in scored.into_iter().take(top_k) {
        let mut value = immediate;
        if !candidate.game_ending {
            let after = board_after(board, candidate, piece.color);
            if let Some(deeper) = chain_value(&after, queue, level + 1, ctx, params, deepest) {
                value += next_discount * deeper;
            }
        }
        if value > best {
            best = value;
        }
    }
    Some(best)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::weights::{EvalWeights, StrategyProfile};
    use squall_engine::{Mode, PieceShape, SkillLevel};

    fn ctx<'a>(weights: &'a EvalWeights, queue_colors: &'a [Color]) -> EvalContext<'a> {
        EvalContext {
            weights,
            profile: StrategyProfile::Standard,
            mode: Mode::ColorBuilding,
            skill: SkillLevel::Hurricane,
            ufo_active: false,
            piece_color: Color::Red,
            queue_colors,
        }
    }

    fn single_red() -> Piece {
        Piece::new(PieceShape::from_ascii("#"), Color::Red, 0, 0)
    }

    #[test]
    fn test_empty_board_picks_first_column() {
        // Scenario: empty 10×20 board, single red cell, empty queue. Column 0
        // wins deterministically (first seen among the flattest options).
        let board = Board::new(10, 20);
        let weights = EvalWeights::for_skill(SkillLevel::Hurricane);
        let result = select_best_placement(
            &board,
            &single_red(),
            &[],
            &ctx(&weights, &[]),
            &SearchParams::default(),
            false,
        )
        .unwrap();
        assert_eq!(result.best.x, 0);
        assert_eq!(result.best.y, 19);
        assert_eq!(result.depth_used, 0);
    }

    #[test]
    fn test_span_completion_chosen_despite_line_clear() {
        // Scenario: 9-wide red run missing only column 9; the red piece must
        // complete the span even though that also completes the row.
        let board = Board::from_ascii(
            "
            ..........
            ..........
            ..........
            RRRRRRRRR.
            ",
        );
        let weights = EvalWeights::for_skill(SkillLevel::Hurricane);
        let result = select_best_placement(
            &board,
            &single_red(),
            &[],
            &ctx(&weights, &[]),
            &SearchParams::default(),
            true,
        )
        .unwrap();
        assert_eq!(result.best.x, 9);
        assert_eq!(result.classification, StrategyTag::Offensive);
        let breakdown = result.best.breakdown.unwrap();
        assert!(breakdown.runs > -breakdown.line_clears);
    }

    #[test]
    fn test_no_placement_returns_none() {
        let board = Board::new(2, 4);
        let wide = Piece::new(PieceShape::from_ascii("###"), Color::Blue, 0, 0);
        let weights = EvalWeights::for_skill(SkillLevel::Tempest);
        let result = select_best_placement(
            &board,
            &wide,
            &[],
            &ctx(&weights, &[]),
            &SearchParams::default(),
            false,
        );
        assert!(result.is_none());
    }

    #[test]
    fn test_lookahead_depth_reported() {
        let board = Board::new(6, 12);
        let weights = EvalWeights::for_skill(SkillLevel::Hurricane);
        let queue = vec![
            QueuedPiece::new(PieceShape::from_ascii("#"), Color::Green),
            QueuedPiece::new(PieceShape::from_ascii("#"), Color::Blue),
            QueuedPiece::new(PieceShape::from_ascii("#"), Color::Yellow),
            QueuedPiece::new(PieceShape::from_ascii("#"), Color::Cyan),
        ];
        let queue_colors: Vec<Color> = queue.iter().map(|q| q.color).collect();
        let result = select_best_placement(
            &board,
            &single_red(),
            &queue,
            &ctx(&weights, &queue_colors),
            &SearchParams::default(),
            false,
        )
        .unwrap();
        // Depth caps at three queue plies even with a longer queue.
        assert_eq!(result.depth_used, 3);
    }

    #[test]
    fn test_unplaceable_queue_piece_penalizes_branch_not_excludes() {
        // Queue piece too wide for the board: every branch takes the fixed
        // penalty, but a best placement is still produced.
        let board = Board::new(3, 6);
        let weights = EvalWeights::for_skill(SkillLevel::Hurricane);
        let queue = vec![QueuedPiece::new(
            PieceShape::from_ascii("#####"),
            Color::Green,
        )];
        let params = SearchParams::default();
        let with_queue = select_best_placement(
            &board,
            &single_red(),
            &queue,
            &ctx(&weights, &[Color::Green]),
            &params,
            false,
        )
        .unwrap();
        let without_queue = select_best_placement(
            &board,
            &single_red(),
            &[],
            &ctx(&weights, &[]),
            &params,
            false,
        )
        .unwrap();
        assert_eq!(with_queue.best.x, without_queue.best.x);
        let expected_drop = params.discount_second * params.unplaceable_penalty;
        assert!(
            (with_queue.best.score - without_queue.best.score - expected_drop).abs() < 1e-3,
            "branch penalty not applied"
        );
        // No queue piece was ever placed, so no depth was reached.
        assert_eq!(with_queue.depth_used, 0);
    }

    #[test]
    fn test_depth_stops_at_unplaceable_ply() {
        // The second queue piece fits nowhere on the 3-wide board: ply one is
        // simulated, ply two ends every branch, ply three is never reached.
        let board = Board::new(3, 8);
        let weights = EvalWeights::for_skill(SkillLevel::Hurricane);
        let queue = vec![
            QueuedPiece::new(PieceShape::from_ascii("#"), Color::Green),
            QueuedPiece::new(PieceShape::from_ascii("#####"), Color::Blue),
            QueuedPiece::new(PieceShape::from_ascii("#"), Color::Yellow),
        ];
        let queue_colors: Vec<Color> = queue.iter().map(|q| q.color).collect();
        let result = select_best_placement(
            &board,
            &single_red(),
            &queue,
            &ctx(&weights, &queue_colors),
            &SearchParams::default(),
            false,
        )
        .unwrap();
        assert_eq!(result.depth_used, 1);
    }

    #[test]
    fn test_runner_ups_and_gap() {
        let board = Board::new(10, 20);
        let weights = EvalWeights::for_skill(SkillLevel::Hurricane);
        let result = select_best_placement(
            &board,
            &single_red(),
            &[],
            &ctx(&weights, &[]),
            &SearchParams::default(),
            false,
        )
        .unwrap();
        assert_eq!(result.alternatives.len(), 3);
        assert!(result.score_gap >= 0.0);
        for pair in result.alternatives.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
        assert!(result.best.score >= result.alternatives[0].score);
    }

    #[test]
    fn test_decision_meta_round_trips() {
        let board = Board::new(10, 20);
        let weights = EvalWeights::for_skill(SkillLevel::Hurricane);
        let result = select_best_placement(
            &board,
            &single_red(),
            &[],
            &ctx(&weights, &[]),
            &SearchParams::default(),
            true,
        )
        .unwrap();
        let meta = DecisionMeta::from_search(&result, vec![Color::Red]);
        let json = serde_json::to_string(&meta).unwrap();
        let parsed: DecisionMeta = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.chosen, meta.chosen);
        assert_eq!(parsed.lookahead_depth, meta.lookahead_depth);
    }
}
