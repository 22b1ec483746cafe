//! Mode machine and stuck-loop detection.

use squall_engine::{Color, Mode, Piece, SkillLevel};

/// Consecutive identical observations before a forced drop fires.
pub const STUCK_THRESHOLD: u32 = 3;

/// Full identity of a piece snapshot: anchor position plus the occupancy
/// signature of its current rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PieceKey {
    pub x: i32,
    pub y: i32,
    pub signature: u64,
}

impl PieceKey {
    #[must_use]
    pub fn of(piece: &Piece) -> Self {
        Self {
            x: piece.x,
            y: piece.y,
            signature: piece.shape.signature(),
        }
    }
}

/// All mutable per-session engine state, threaded through every decision.
///
/// Two independent stuck counters guard against livelock:
///
/// 1. the same-piece counter trips when decisions are repeatedly requested
///    for a piece whose color never changes, and
/// 2. the same-position counter trips when the piece's full identity key
///    (position plus rotation signature) is unchanged across consecutive
///    attempts. This one is suspended while the host signals a shake phase,
///    where the piece legitimately holds still.
///
/// Each counter resets when its tracked identity changes; both reset when a
/// forced drop fires, so the call after a forced drop starts from a clean
/// baseline.
#[derive(Debug)]
pub struct EngineState {
    skill: SkillLevel,
    mode: Mode,
    last_color: Option<Color>,
    same_piece_count: u32,
    last_key: Option<PieceKey>,
    same_position_count: u32,
}

impl EngineState {
    #[must_use]
    pub fn new(skill: SkillLevel) -> Self {
        Self {
            skill,
            mode: Mode::default(),
            last_color: None,
            same_piece_count: 0,
            last_key: None,
            same_position_count: 0,
        }
    }

    #[must_use]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    #[must_use]
    pub fn skill(&self) -> SkillLevel {
        self.skill
    }

    pub fn set_skill(&mut self, skill: SkillLevel) {
        self.skill = skill;
    }

    /// Recomputes the mode from the current stack height, once per decision
    /// cycle. Returns the new mode on a transition, `None` otherwise.
    ///
    /// The enter and exit thresholds differ (hysteresis): once in survival,
    /// the stack must fall to the exit height, not merely below the enter
    /// height, before color building resumes.
    pub fn update_mode(&mut self, stack_height: usize) -> Option<Mode> {
        let next = match self.mode {
            Mode::ColorBuilding if stack_height >= self.skill.survival_enter_height() => {
                Mode::Survival
            }
            Mode::Survival if stack_height <= self.skill.survival_exit_height() => {
                Mode::ColorBuilding
            }
            _ => return None,
        };
        self.mode = next;
        Some(next)
    }

    /// Registers one decision attempt for `piece`. Returns true when either
    /// stuck counter reaches the threshold, which the caller must turn into
    /// an immediate unconditional drop.
    pub fn observe_piece(&mut self, piece: &Piece, shake_active: bool) -> bool {
        if self.last_color == Some(piece.color) {
            self.same_piece_count += 1;
        } else {
            self.last_color = Some(piece.color);
            self.same_piece_count = 1;
        }

        if !shake_active {
            let key = PieceKey::of(piece);
            if self.last_key == Some(key) {
                self.same_position_count += 1;
            } else {
                self.last_key = Some(key);
                self.same_position_count = 1;
            }
        }

        let forced = self.same_piece_count >= STUCK_THRESHOLD
            || self.same_position_count >= STUCK_THRESHOLD;
        if forced {
            self.clear_stuck();
        }
        forced
    }

    /// Clears counters and mode; the skill level survives a reset.
    pub fn reset(&mut self) {
        self.mode = Mode::default();
        self.clear_stuck();
    }

    fn clear_stuck(&mut self) {
        self.last_color = None;
        self.same_piece_count = 0;
        self.last_key = None;
        self.same_position_count = 0;
    }
}
