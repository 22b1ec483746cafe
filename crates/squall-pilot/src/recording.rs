//! Append-only decision/event recording.
//!
//! A recording is created on start, appended to per decision and per
//! externally signaled event, and sealed on stop. Sealed recordings are
//! immutable; the export shape is a plain JSON document for external
//! persistence.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use squall_engine::{Mode, SkillLevel};
use squall_evaluator::{BoardMetrics, DecisionMeta, ScoredPlacement};

/// Export format version.
pub const RECORDING_VERSION: u32 = 1;

/// One decision appended to the log: the chosen placement (if any), the
/// board metric snapshot observed for that decision, and the full meta
/// snapshot when instrumentation was on.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionEntry {
    /// Milliseconds since the recording started.
    pub offset_ms: i64,
    pub placement: Option<ScoredPlacement>,
    /// Stack height, holes, and bumpiness of the request board.
    pub metrics: BoardMetrics,
    pub forced_drop: bool,
    pub mode: Mode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<DecisionMeta>,
}

/// An out-of-band event (mode switch, external game event).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventEntry {
    pub offset_ms: i64,
    pub event_type: String,
    pub data: serde_json::Value,
}

/// Terminal summary written when the recording is sealed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalState {
    pub cause: String,
    pub duration_ms: i64,
    pub decision_count: usize,
    pub final_metrics: BoardMetrics,
}

/// A sealed or in-progress recording in its export shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recording {
    pub version: u32,
    pub start_time: DateTime<Utc>,
    pub skill_level: SkillLevel,
    pub decisions: Vec<DecisionEntry>,
    pub events: Vec<EventEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_state: Option<FinalState>,
}

/// Recording lifecycle owner.
///
/// Start and stop are idempotent: starting while recording and stopping
/// while idle are both no-ops, so hosts can call them from state they do not
/// fully control.
#[derive(Debug, Default)]
pub struct Recorder {
    active: Option<Recording>,
}

impl Recorder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_recording(&self) -> bool {
        self.active.is_some()
    }

    pub fn start(&mut self, skill_level: SkillLevel) {
        if self.active.is_some() {
            return;
        }
        self.active = Some(Recording {
            version: RECORDING_VERSION,
            start_time: Utc::now(),
            skill_level,
            decisions: Vec::new(),
            events: Vec::new(),
            final_state: None,
        });
    }

    pub fn record_decision(
        &mut self,
        placement: Option<&ScoredPlacement>,
        metrics: BoardMetrics,
        forced_drop: bool,
        mode: Mode,
        meta: Option<&DecisionMeta>,
    ) {
        let Some(recording) = &mut self.active else {
            return;
        };
        let offset_ms = offset_since(recording.start_time);
        recording.decisions.push(DecisionEntry {
            offset_ms,
            placement: placement.cloned(),
            metrics,
            forced_drop,
            mode,
            meta: meta.cloned(),
        });
    }

    pub fn record_event(&mut self, event_type: &str, data: serde_json::Value) {
        let Some(recording) = &mut self.active else {
            return;
        };
        let offset_ms = offset_since(recording.start_time);
        recording.events.push(EventEntry {
            offset_ms,
            event_type: event_type.to_owned(),
            data,
        });
    }

    /// Seals and returns the recording; `None` when not recording.
    pub fn stop(&mut self, cause: &str, final_metrics: BoardMetrics) -> Option<Recording> {
        let mut recording = self.active.take()?;
        recording.final_state = Some(FinalState {
            cause: cause.to_owned(),
            duration_ms: offset_since(recording.start_time),
            decision_count: recording.decisions.len(),
            final_metrics,
        });
        Some(recording)
    }
}

fn offset_since(start: DateTime<Utc>) -> i64 {
    (Utc::now() - start).num_milliseconds()
}
