//! Decision issuing: engine state, the request pipeline, and recording.
//!
//! The pilot owns all mutable engine state. Evaluation itself is a pure
//! function of a board/piece/queue snapshot; everything stateful (the
//! survival-mode machine, stuck counters, the single-in-flight request slot,
//! the recording log) lives here and is touched only from the
//! decision-issuing context, never from within a computation.

pub mod pipeline;
pub mod recording;
pub mod state;

pub use self::{
    pipeline::{
        DecisionOutcome, DecisionPipeline, DecisionRequest, DecisionResponse, EngineReply,
        EngineRequest, PipelineError,
    },
    recording::{DecisionEntry, EventEntry, FinalState, Recorder, Recording},
    state::{EngineState, PieceKey, STUCK_THRESHOLD},
};
