//! Heuristic placement evaluation and lookahead search.
//!
//! This crate implements the scoring half of the engine:
//!
//! 1. **Board analysis** ([`board_analysis`]) - lazily computed structural
//!    metrics (column heights, holes, bumpiness, deep wells).
//! 2. **Color analysis** ([`color_analysis`]) - horizontal same-color runs
//!    and 4-connected blobs, the geometry behind "special event" detection.
//! 3. **Placement evaluation** ([`placement_evaluator`]) - a single
//!    multi-factor evaluator that always produces an itemized breakdown; a
//!    thin wrapper discards it when instrumentation is off.
//! 4. **Lookahead search** ([`search`]) - greedy-with-discount selection
//!    across up to three queued pieces.
//!
//! All coefficients live in [`weights::EvalWeights`] as named configuration
//! data. The values are empirically tuned for this ruleset; their relative
//! magnitudes are load-bearing and should not be changed without a
//! behavioral regression baseline.

pub mod board_analysis;
pub mod color_analysis;
pub mod placement_evaluator;
pub mod search;
pub mod weights;

pub use self::{
    board_analysis::{BoardAnalysis, BoardMetrics},
    color_analysis::{Blob, ColorAnalysis, Run},
    placement_evaluator::{
        EvalContext, PlacementAnalysis, ScoreBreakdown, ScoredPlacement, StrategyTag,
        evaluate_placement, score_placement,
    },
    search::{DecisionMeta, SearchParams, SearchResult, select_best_placement},
    weights::{EvalWeights, StrategyProfile},
};
