//! Single-in-flight decision pipeline.
//!
//! One logical operation: request the best placement for a snapshot. The
//! computation runs on a worker thread when one is available, or inline with
//! the identical algorithm when it is not; both paths produce the same
//! decision for the same inputs. At most one computation is in flight at any
//! time; a request arriving while one is pending is rejected, and the
//! original request's result stays authoritative.
//!
//! All mutable engine state (mode, stuck counters, recording) is touched
//! only here, in the issuing context. The worker receives immutable
//! snapshots and the mode decided at issue time.

use std::{
    sync::mpsc::{self, TryRecvError},
    thread,
    time::{Duration, Instant},
};

use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use squall_engine::{Board, Color, Mode, Piece, QueuedPiece, SkillLevel};
use squall_evaluator::{
    BoardAnalysis, BoardMetrics, DecisionMeta, EvalContext, EvalWeights, ScoredPlacement,
    SearchParams, StrategyProfile, select_best_placement,
};

use crate::{
    recording::{Recorder, Recording},
    state::EngineState,
};

/// Bound on a shadow evaluation; advisory calls resolve to `None` instead of
/// stalling the caller.
pub const SHADOW_TIMEOUT: Duration = Duration::from_millis(500);

/// Window the worker gets to answer the setup handshake before the pipeline
/// falls back permanently to inline computation.
const WORKER_SETUP_WINDOW: Duration = Duration::from_millis(500);

/// One decision request: an independent, immutable snapshot of everything
/// the computation needs. Snapshots are not retained across requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionRequest {
    pub board: Board,
    pub piece: Piece,
    pub queue: Vec<QueuedPiece>,
    pub skill_level: SkillLevel,
    pub ufo_active: bool,
    pub shake_active: bool,
    pub capture_decision_meta: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionResponse {
    /// `None` with `forced_drop` set when no legal placement exists or a
    /// stuck counter fired.
    pub best_placement: Option<ScoredPlacement>,
    pub stack_height: usize,
    /// Snapshot of the request board, also carried into the recording.
    pub metrics: BoardMetrics,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision_meta: Option<DecisionMeta>,
    pub forced_drop: bool,
}

/// Every message the engine accepts, as one exhaustively matched enum.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum EngineRequest {
    Decide(DecisionRequest),
    Reset,
    StartRecording { skill_level: SkillLevel },
    StopRecording { board: Board, cause: String },
    RecordEvent { event_type: String, data: serde_json::Value },
    ShadowEvaluate(DecisionRequest),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum EngineReply {
    Decision(DecisionResponse),
    ShadowMeta { decision_meta: Option<DecisionMeta> },
    Recording { recording: Option<Recording> },
    Ack,
}

#[derive(Debug, Display, Error)]
pub enum PipelineError {
    #[display("a decision is already in flight")]
    DecisionInFlight,
}

/// Outcome of issuing a decision request.
#[derive(Debug)]
pub enum DecisionOutcome {
    /// Computed synchronously (inline path, or a forced drop that
    /// short-circuits computation entirely).
    Completed(DecisionResponse),
    /// Dispatched to the worker; retrieve via [`DecisionPipeline::poll_decision`]
    /// or [`DecisionPipeline::wait_decision`].
    Pending,
}

#[derive(Debug)]
pub struct DecisionPipeline {
    profile: StrategyProfile,
    params: SearchParams,
    state: EngineState,
    recorder: Recorder,
    worker: Option<Worker>,
    /// Generation of the pending request; the single-in-flight guard.
    in_flight: Option<u64>,
    /// Bumped per dispatch and per reset, so replies from before a reset
    /// never match and are dropped.
    generation: u64,
}

impl DecisionPipeline {
    /// Spawns the worker thread and verifies it within the setup window;
    /// on failure the pipeline runs inline for the whole session.
    #[must_use]
    pub fn new(skill: SkillLevel, profile: StrategyProfile, params: SearchParams) -> Self {
        let worker = Worker::spawn(profile, params.clone());
        Self {
            profile,
            params,
            state: EngineState::new(skill),
            recorder: Recorder::new(),
            worker,
            in_flight: None,
            generation: 0,
        }
    }

    /// A pipeline without a worker thread.
    #[must_use]
    pub fn inline(skill: SkillLevel, profile: StrategyProfile, params: SearchParams) -> Self {
        Self {
            profile,
            params,
            state: EngineState::new(skill),
            recorder: Recorder::new(),
            worker: None,
            in_flight: None,
            generation: 0,
        }
    }

    #[must_use]
    pub fn is_threaded(&self) -> bool {
        self.worker.is_some()
    }

    #[must_use]
    pub fn mode(&self) -> Mode {
        self.state.mode()
    }

    /// Issues a decision request.
    ///
    /// Mode and stuck-counter updates happen here, synchronously, before any
    /// dispatch; a tripped stuck counter short-circuits to a forced-drop
    /// response without computing placements at all.
    pub fn request_decision(
        &mut self,
        request: DecisionRequest,
    ) -> Result<DecisionOutcome, PipelineError> {
        if self.in_flight.is_some() {
            return Err(PipelineError::DecisionInFlight);
        }
        self.state.set_skill(request.skill_level);
        let metrics = BoardAnalysis::from_board(&request.board).metrics();
        if let Some(mode) = self.state.update_mode(metrics.stack_height) {
            self.recorder
                .record_event("modeSwitch", serde_json::json!({ "mode": mode }));
        }
        if self.state.observe_piece(&request.piece, request.shake_active) {
            let response = DecisionResponse {
                best_placement: None,
                stack_height: metrics.stack_height,
                metrics,
                decision_meta: None,
                forced_drop: true,
            };
            self.record_response(&response);
            return Ok(DecisionOutcome::Completed(response));
        }

        let mode = self.state.mode();
        if self.worker.is_some() {
            self.generation += 1;
            let job = WorkerJob::Decide {
                generation: self.generation,
                request: request.clone(),
                mode,
            };
            let sent = self.worker.as_ref().is_some_and(|w| w.tx.send(job).is_ok());
            if sent {
                self.in_flight = Some(self.generation);
                return Ok(DecisionOutcome::Pending);
            }
            // Worker thread is gone; degrade to inline from here on.
            self.worker = None;
        }
        let response = compute_decision(&request, mode, self.profile, &self.params);
        self.record_response(&response);
        Ok(DecisionOutcome::Completed(response))
    }

    /// Non-blocking check for the pending result. Replies whose generation
    /// does not match the pending request (issued before a reset) are
    /// silently dropped.
    pub fn poll_decision(&mut self) -> Option<DecisionResponse> {
        let expected = self.in_flight?;
        loop {
            let received = match self.worker.as_ref() {
                Some(worker) => worker.rx.try_recv(),
                None => Err(TryRecvError::Disconnected),
            };
            match received {
                Ok(WorkerReply::Decision {
                    generation,
                    response,
                }) if generation == expected => {
                    self.in_flight = None;
                    self.record_response(&response);
                    return Some(response);
                }
                Ok(_) => {}
                Err(TryRecvError::Empty) => return None,
                Err(TryRecvError::Disconnected) => {
                    self.in_flight = None;
                    self.worker = None;
                    return None;
                }
            }
        }
    }

    /// Blocks until the pending result arrives. `None` when nothing is
    /// pending or the worker disconnected.
    pub fn wait_decision(&mut self) -> Option<DecisionResponse> {
        let expected = self.in_flight?;
        loop {
            let received = match self.worker.as_ref() {
                Some(worker) => worker.rx.recv().ok(),
                None => None,
            };
            let Some(reply) = received else {
                self.in_flight = None;
                self.worker = None;
                return None;
            };
            if let WorkerReply::Decision {
                generation,
                response,
            } = reply
            {
                if generation == expected {
                    self.in_flight = None;
                    self.record_response(&response);
                    return Some(response);
                }
            }
        }
    }

    /// Issues a request and blocks for its result, degrading to an identical
    /// inline computation if the worker dies mid-flight.
    pub fn decide_blocking(
        &mut self,
        request: DecisionRequest,
    ) -> Result<DecisionResponse, PipelineError> {
        match self.request_decision(request.clone())? {
            DecisionOutcome::Completed(response) => Ok(response),
            DecisionOutcome::Pending => match self.wait_decision() {
                Some(response) => Ok(response),
                None => {
                    let response =
                        compute_decision(&request, self.state.mode(), self.profile, &self.params);
                    self.record_response(&response);
                    Ok(response)
                }
            },
        }
    }

    /// Identical scoring and lookahead without committing to a move; used
    /// for passive analysis of a human player's choices. Never touches the
    /// mode machine, stuck counters, or the recording.
    ///
    /// Resolves to `None` when a decision is already in flight or the worker
    /// does not answer within [`SHADOW_TIMEOUT`].
    pub fn shadow_evaluate(&mut self, request: &DecisionRequest) -> Option<DecisionMeta> {
        if self.in_flight.is_some() {
            return None;
        }
        let mode = self.state.mode();
        if self.worker.is_some() {
            self.generation += 1;
            let generation = self.generation;
            let job = WorkerJob::Shadow {
                generation,
                request: request.clone(),
                mode,
            };
            let sent = self.worker.as_ref().is_some_and(|w| w.tx.send(job).is_ok());
            if sent && let Some(worker) = self.worker.as_ref() {
                let deadline = Instant::now() + SHADOW_TIMEOUT;
                loop {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    match worker.rx.recv_timeout(remaining) {
                        Ok(WorkerReply::Shadow { generation: g, meta }) if g == generation => {
                            return meta;
                        }
                        Ok(_) => {}
                        Err(_) => return None,
                    }
                }
            }
            // Worker thread is gone; degrade to inline from here on.
            self.worker = None;
        }
        compute_shadow(request, mode, self.profile, &self.params)
    }

    /// Clears mode and stuck state and invalidates any outstanding worker
    /// result. The computation itself is not cancelled; its reply simply no
    /// longer matches any generation.
    pub fn reset(&mut self) {
        self.generation += 1;
        self.in_flight = None;
        self.state.reset();
    }

    pub fn start_recording(&mut self, skill_level: SkillLevel) {
        self.recorder.start(skill_level);
    }

    pub fn stop_recording(&mut self, board: &Board, cause: &str) -> Option<Recording> {
        let metrics = BoardAnalysis::from_board(board).metrics();
        self.recorder.stop(cause, metrics)
    }

    pub fn record_event(&mut self, event_type: &str, data: serde_json::Value) {
        self.recorder.record_event(event_type, data);
    }

    #[must_use]
    pub fn is_recording(&self) -> bool {
        self.recorder.is_recording()
    }

    /// Dispatches one engine message.
    pub fn handle(&mut self, request: EngineRequest) -> Result<EngineReply, PipelineError> {
        match request {
            EngineRequest::Decide(req) => self.decide_blocking(req).map(EngineReply::Decision),
            EngineRequest::Reset => {
                self.reset();
                Ok(EngineReply::Ack)
            }
            EngineRequest::StartRecording { skill_level } => {
                self.start_recording(skill_level);
                Ok(EngineReply::Ack)
            }
            EngineRequest::StopRecording { board, cause } => Ok(EngineReply::Recording {
                recording: self.stop_recording(&board, &cause),
            }),
            EngineRequest::RecordEvent { event_type, data } => {
                self.record_event(&event_type, data);
                Ok(EngineReply::Ack)
            }
            EngineRequest::ShadowEvaluate(req) => Ok(EngineReply::ShadowMeta {
                decision_meta: self.shadow_evaluate(&req),
            }),
        }
    }

    fn record_response(&mut self, response: &DecisionResponse) {
        self.recorder.record_decision(
            response.best_placement.as_ref(),
            response.metrics,
            response.forced_drop,
            self.state.mode(),
            response.decision_meta.as_ref(),
        );
    }
}

#[derive(Debug)]
enum WorkerJob {
    Ping,
    Decide {
        generation: u64,
        request: DecisionRequest,
        mode: Mode,
    },
    Shadow {
        generation: u64,
        request: DecisionRequest,
        mode: Mode,
    },
}

#[derive(Debug)]
enum WorkerReply {
    Pong,
    Decision {
        generation: u64,
        response: DecisionResponse,
    },
    Shadow {
        generation: u64,
        meta: Option<DecisionMeta>,
    },
}

#[derive(Debug)]
struct Worker {
    tx: mpsc::Sender<WorkerJob>,
    rx: mpsc::Receiver<WorkerReply>,
}

impl Worker {
    fn spawn(profile: StrategyProfile, params: SearchParams) -> Option<Self> {
        let (tx_job, rx_job) = mpsc::channel();
        let (tx_reply, rx_reply) = mpsc::channel();
        thread::spawn(move || worker_thread(profile, &params, &rx_job, &tx_reply));
        let worker = Self {
            tx: tx_job,
            rx: rx_reply,
        };
        if worker.tx.send(WorkerJob::Ping).is_err() {
            return None;
        }
        match worker.rx.recv_timeout(WORKER_SETUP_WINDOW) {
            Ok(WorkerReply::Pong) => Some(worker),
            _ => None,
        }
    }
}

fn worker_thread(
    profile: StrategyProfile,
    params: &SearchParams,
    rx: &mpsc::Receiver<WorkerJob>,
    tx: &mpsc::Sender<WorkerReply>,
) {
    while let Ok(job) = rx.recv() {
        let reply = match job {
            WorkerJob::Ping => WorkerReply::Pong,
            WorkerJob::Decide {
                generation,
                request,
                mode,
            } => WorkerReply::Decision {
                generation,
                response: compute_decision(&request, mode, profile, params),
            },
            WorkerJob::Shadow {
                generation,
                request,
                mode,
            } => WorkerReply::Shadow {
                generation,
                meta: compute_shadow(&request, mode, profile, params),
            },
        };
        if tx.send(reply).is_err() {
            return;
        }
    }
}

/// Pure decision computation: identical on the worker and inline paths.
fn compute_decision(
    request: &DecisionRequest,
    mode: Mode,
    profile: StrategyProfile,
    params: &SearchParams,
) -> DecisionResponse {
    let weights = EvalWeights::for_skill(request.skill_level);
    let queue_colors: Vec<Color> = request.queue.iter().map(|q| q.color).collect();
    let ctx = EvalContext {
        weights: &weights,
        profile,
        mode,
        skill: request.skill_level,
        ufo_active: request.ufo_active,
        piece_color: request.piece.color,
        queue_colors: &queue_colors,
    };
    let metrics = BoardAnalysis::from_board(&request.board).metrics();
    match select_best_placement(
        &request.board,
        &request.piece,
        &request.queue,
        &ctx,
        params,
        request.capture_decision_meta,
    ) {
        Some(result) => {
            let decision_meta = request
                .capture_decision_meta
                .then(|| DecisionMeta::from_search(&result, queue_colors.clone()));
            DecisionResponse {
                best_placement: Some(result.best),
                stack_height: metrics.stack_height,
                metrics,
                decision_meta,
                forced_drop: false,
            }
        }
        // Empty candidate set: the caller must drop immediately. Not an
        // engine fault.
        None => DecisionResponse {
            best_placement: None,
            stack_height: metrics.stack_height,
            metrics,
            decision_meta: None,
            forced_drop: true,
        },
    }
}

fn compute_shadow(
    request: &DecisionRequest,
    mode: Mode,
    profile: StrategyProfile,
    params: &SearchParams,
) -> Option<DecisionMeta> {
    let weights = EvalWeights::for_skill(request.skill_level);
    let queue_colors: Vec<Color> = request.queue.iter().map(|q| q.color).collect();
    let ctx = EvalContext {
        weights: &weights,
        profile,
        mode,
        skill: request.skill_level,
        ufo_active: request.ufo_active,
        piece_color: request.piece.color,
        queue_colors: &queue_colors,
    };
    select_best_placement(
        &request.board,
        &request.piece,
        &request.queue,
        &ctx,
        params,
        true,
    )
    .map(|result| DecisionMeta::from_search(&result, queue_colors))
}
