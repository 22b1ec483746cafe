//! Named weight tables for the placement evaluator.
//!
//! Every coefficient the evaluator uses lives here as configuration data.
//! The values are empirically tuned for this ruleset; treat the relative
//! magnitudes as load-bearing. In particular the line-clear penalties are
//! deliberately smaller than the achievable full-width run bonus, so a
//! placement that completes a color span is chosen even when it also clears
//! the row.

use serde::{Deserialize, Serialize};
use squall_engine::SkillLevel;

/// Evaluation strategy profile.
///
/// `Standard` favors wide runs (horizontal adjacency weighted above
/// vertical); `Simple` weights adjacency directions equally and rewards any
/// run growth uniformly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyProfile {
    #[default]
    Standard,
    Simple,
}

/// The full coefficient table for one skill level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalWeights {
    /// Per-hole penalty at zero event-building confidence.
    pub hole_penalty: f32,
    /// Per-hole penalty at full confidence; downstream mechanics can fill
    /// holes later, so grooming tolerates more imperfection.
    pub hole_penalty_building: f32,
    /// Per-row stack height penalty.
    pub height_penalty: f32,
    /// Height penalty while building and still below the first critical band.
    pub height_penalty_building: f32,
    pub bumpiness_penalty: f32,
    pub bumpiness_penalty_building: f32,
    /// Per-row penalty for well depth beyond 3.
    pub deep_well_penalty: f32,
    /// `(height threshold, flat penalty)` triples: moderate, high,
    /// near-topout. Applied unconditionally.
    pub critical_bands: [(usize, f32); 3],
    /// Stack height at which line clears flip from penalized to rewarded.
    pub emergency_height: usize,
    /// Per-line reward inside the emergency band.
    pub clear_reward_emergency: f32,
    /// Per-line reward when special-event logic is disabled (Breeze).
    pub clear_reward_plain: f32,
    /// Flat per-line penalty outside the emergency band.
    pub clear_base_penalty: f32,
    /// Additional per-line penalty scaled by run progress toward full width.
    pub clear_progress_penalty: f32,
    /// Run bonus once width reaches `cols - 3`.
    pub run_bonus_near: f32,
    /// Run bonus once width reaches `cols - 1`.
    pub run_bonus_close: f32,
    /// Full-width span bonus: the primary special event.
    pub run_bonus_full: f32,
    /// Multiplier when the run matches the active piece's color.
    pub run_piece_color_factor: f32,
    /// Additional factor per queued piece of the run's color.
    pub run_queue_color_factor: f32,
    /// Per-cell bonus for a fully enclosed, floor-and-side anchored blob.
    pub enclosure_bonus_per_cell: f32,
    /// Per-cell bonus for partial enclosure progress.
    pub enclosure_partial_per_cell: f32,
    /// Minimum blob size before partial progress counts.
    pub enclosure_partial_min_size: usize,
    pub adjacency_horizontal: f32,
    pub adjacency_vertical: f32,
    /// Adjacency weight (both directions) in the `Simple` profile.
    pub adjacency_simple: f32,
    /// Per-cell run growth reward in the `Simple` profile.
    pub run_growth_simple: f32,
    /// Run/blob bonuses only apply below this stack height unless an event
    /// is actively being built.
    pub building_gate_height: usize,
    /// Score assigned to placements that overflow the visible board.
    pub game_ending_score: f32,
}

impl EvalWeights {
    /// The tuned table for a skill level.
    ///
    /// The storm tiers currently share one table (their behavioral spread
    /// comes from the mode-machine thresholds); Breeze softens the critical
    /// bands to match its relaxed ruleset.
    #[must_use]
    pub fn for_skill(skill: SkillLevel) -> Self {
        let base = Self {
            hole_penalty: 30.0,
            hole_penalty_building: 12.0,
            height_penalty: 8.0,
            height_penalty_building: 4.0,
            bumpiness_penalty: 2.0,
            bumpiness_penalty_building: 1.0,
            deep_well_penalty: 15.0,
            critical_bands: [(10, 50.0), (14, 150.0), (17, 400.0)],
            emergency_height: 14,
            clear_reward_emergency: 300.0,
            clear_reward_plain: 100.0,
            clear_base_penalty: 40.0,
            clear_progress_penalty: 200.0,
            run_bonus_near: 80.0,
            run_bonus_close: 250.0,
            run_bonus_full: 1000.0,
            run_piece_color_factor: 1.5,
            run_queue_color_factor: 0.15,
            enclosure_bonus_per_cell: 50.0,
            enclosure_partial_per_cell: 8.0,
            enclosure_partial_min_size: 5,
            adjacency_horizontal: 12.0,
            adjacency_vertical: 6.0,
            adjacency_simple: 8.0,
            run_growth_simple: 10.0,
            building_gate_height: 9,
            game_ending_score: -10000.0,
        };
        match skill {
            SkillLevel::Breeze => Self {
                critical_bands: [(12, 50.0), (16, 150.0), (18, 400.0)],
                building_gate_height: 12,
                ..base
            },
            SkillLevel::Tempest | SkillLevel::Maelstrom | SkillLevel::Hurricane => base,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_run_bonus_beats_clear_penalty() {
        // The invariant behind choosing a span-completing placement even when
        // it clears the line: the achievable bonus must exceed the maximum
        // line-clear penalty.
        let w = EvalWeights::for_skill(SkillLevel::Hurricane);
        let max_clear_penalty = w.clear_base_penalty + w.clear_progress_penalty;
        assert!(w.run_bonus_full > max_clear_penalty);
    }

    #[test]
    fn test_critical_bands_escalate() {
        let w = EvalWeights::for_skill(SkillLevel::Tempest);
        let [(t1, p1), (t2, p2), (t3, p3)] = w.critical_bands;
        assert!(t1 < t2 && t2 < t3);
        assert!(p1 < p2 && p2 < p3);
    }

    #[test]
    fn test_building_rates_are_reductions() {
        let w = EvalWeights::for_skill(SkillLevel::Maelstrom);
        assert!(w.hole_penalty_building < w.hole_penalty);
        assert!(w.height_penalty_building < w.height_penalty);
        assert!(w.bumpiness_penalty_building < w.bumpiness_penalty);
    }
}
