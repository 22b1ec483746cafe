use serde::{Deserialize, Serialize};

/// Configured difficulty ruleset.
///
/// `Breeze` is the relaxed tier: special-event scoring is disabled entirely
/// and the survival thresholds sit higher. The storm tiers share the full
/// special-event logic and differ only in their height thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillLevel {
    Breeze,
    Tempest,
    Maelstrom,
    Hurricane,
}

impl SkillLevel {
    /// Whether run/blob special-event scoring applies at this level.
    #[must_use]
    pub fn special_events_enabled(self) -> bool {
        !matches!(self, SkillLevel::Breeze)
    }

    /// Stack height at which the engine enters survival mode.
    ///
    /// Expressed as rows occupied out of the board's total height; thresholds
    /// assume the standard 20-row board.
    #[must_use]
    pub fn survival_enter_height(self) -> usize {
        match self {
            SkillLevel::Breeze => 14,
            SkillLevel::Tempest => 10,
            SkillLevel::Maelstrom => 11,
            SkillLevel::Hurricane => 12,
        }
    }

    /// Stack height at or below which the engine leaves survival mode.
    ///
    /// Strictly below [`Self::survival_enter_height`] to form the hysteresis
    /// band: oscillating exactly at the enter threshold must not flip modes
    /// every cycle.
    #[must_use]
    pub fn survival_exit_height(self) -> usize {
        match self {
            SkillLevel::Breeze => 8,
            SkillLevel::Tempest => 6,
            SkillLevel::Maelstrom => 7,
            SkillLevel::Hurricane => 8,
        }
    }
}

/// Strategy mode biasing the evaluator.
///
/// Owned by the pilot's engine state, recomputed once per decision cycle from
/// the current board, and read-only everywhere else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Grooming the board for a color special event.
    #[default]
    ColorBuilding,
    /// Stack is dangerously high; all color grooming yields to height control.
    Survival,
}
