//! Kernel runner: the tick loop.
//!
//! One tick runs to completion before the next starts: inputs are
//! classified, candidates scored, the winner passed through volition, and
//! every state change routed through the reducer. Collaborators are called
//! with a timeout; a stalled call counts as a failure, never as a hang.

use crate::autonomy::{
    choose_autonomy_action, map_autonomy_action_to_action_type, ActionMapping, ActionType,
    AutonomyAction,
};
use crate::decision::should_ask_user;
use crate::embedding::EmbeddingGuard;
use crate::extraction::{extract_text, extract_usage};
use crate::intent::{Intent, IntentDetector};
use crate::llm::{CompletionParams, ReplyRequest, Responder};
use crate::reducer::{reduce, KernelEvent, ReducerLimits};
use crate::thalamus::{ThalamicDecision, ThalamicFilter};
use arc_swap::ArcSwap;
use noema_core::{
    content_hash, normalize_text, CandidateKind, EmbeddingProvider, Goal, KernelState,
    MemoryMatch, MemoryStore, NoemaConfig, NoemaError, NoemaResult, RandomSource, SearchQuery,
    SessionProvider, SharedConfig, Speaker, TelemetryBus, TelemetryEvent, TokenUsageLedger,
    TrajectoryPatch, Turn,
};
use noema_limbic::{
    ActionOutcome, Candidate, ExecutiveGate, LimbicSystem, ReasonCode, SpeechContext,
    VolitionDecision, VolitionSystem,
};
use serde::Serialize;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;

const CLARIFICATION: &str = "Which one do you mean? An id or a path would help.";
/// Novelty of a user line already said before in the conversation window.
const REPEATED_INPUT_NOVELTY: f64 = 0.2;
const GOAL_NOVELTY: f64 = 0.3;
const AUTONOMY_SALIENCE: f64 = 0.3;
const RECENT_OUTPUT_WINDOW: usize = 5;
/// Deferred user lines older than this are dropped unanswered.
const DEFERRED_INPUT_TTL_MS: i64 = 30_000;

// ============================================================================
// Public types
// ============================================================================

/// Injected collaborators. Swapped as a whole by [`KernelRunner::reconfigure`].
pub struct KernelDeps {
    pub embedder: Arc<dyn EmbeddingProvider>,
    pub store: Arc<dyn MemoryStore>,
    pub responder: Arc<dyn Responder>,
    pub session: Arc<dyn SessionProvider>,
}

/// Result of one tick. Everything except `Silent` is externally visible.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum KernelOutput {
    Speech { tick: u64, text: String },
    Action { tick: u64, action: ActionType, reason: String },
    Clarification { tick: u64, text: String },
    Silent { tick: u64, reason: ReasonCode },
}

impl KernelOutput {
    pub fn tick(&self) -> u64 {
        match self {
            KernelOutput::Speech { tick, .. }
            | KernelOutput::Action { tick, .. }
            | KernelOutput::Clarification { tick, .. }
            | KernelOutput::Silent { tick, .. } => *tick,
        }
    }

    pub fn is_visible(&self) -> bool {
        !matches!(self, KernelOutput::Silent { .. })
    }
}

// ============================================================================
// Internals
// ============================================================================

#[derive(Debug)]
enum Pending {
    User { text: String, at: i64 },
    Autonomy(AutonomyAction),
}

/// A stored user line waiting for an answer.
#[derive(Debug, Clone)]
struct UserLine {
    text: String,
    at: i64,
    decision: ThalamicDecision,
    novelty: f64,
}

impl UserLine {
    fn candidate(&self, label: String) -> Candidate {
        Candidate::new(CandidateKind::UserInput, self.at, label)
            .with_metadata(self.novelty, self.decision.salience)
    }
}

enum Stimulus {
    User(UserLine),
    Goal(Goal),
    /// Asked for through `submit_autonomy`.
    Requested(AutonomyAction),
    Autonomy(AutonomyAction),
}

/// Per-tick snapshot of configuration and collaborators.
struct TickCtx {
    cfg: Arc<NoemaConfig>,
    deps: Arc<KernelDeps>,
    limits: ReducerLimits,
    limbic: LimbicSystem,
    now: i64,
    /// Silence reference point before anything has happened.
    since: i64,
}

impl TickCtx {
    fn timeout(&self) -> Duration {
        self.cfg.kernel.provider_timeout()
    }
}

struct LoopHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

// ============================================================================
// KernelRunner
// ============================================================================

pub struct KernelRunner {
    config: SharedConfig,
    deps: ArcSwap<KernelDeps>,
    ledger: Arc<TokenUsageLedger>,
    telemetry: Arc<TelemetryBus>,
    embeddings: EmbeddingGuard,
    state: tokio::sync::Mutex<KernelState>,
    rng: Mutex<RandomSource>,
    inbox_tx: mpsc::UnboundedSender<Pending>,
    inbox_rx: Mutex<mpsc::UnboundedReceiver<Pending>>,
    /// User lines that lost a tick; retried before new input.
    deferred: Mutex<Vec<UserLine>>,
    outputs: broadcast::Sender<KernelOutput>,
    autonomy_loop: Mutex<Option<LoopHandle>>,
    first_tick_at: OnceLock<i64>,
}

impl KernelRunner {
    pub fn new(
        config: SharedConfig,
        deps: KernelDeps,
        ledger: Arc<TokenUsageLedger>,
        telemetry: Arc<TelemetryBus>,
    ) -> Arc<Self> {
        let rng = noema_core::create_rng(config.load().kernel.seed.as_deref());
        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();
        let (outputs, _) = broadcast::channel(64);
        Arc::new(Self {
            config,
            deps: ArcSwap::from_pointee(deps),
            ledger,
            embeddings: EmbeddingGuard::new(telemetry.clone()),
            telemetry,
            state: tokio::sync::Mutex::new(KernelState::default()),
            rng: Mutex::new(rng),
            inbox_tx,
            inbox_rx: Mutex::new(inbox_rx),
            deferred: Mutex::new(Vec::new()),
            outputs,
            autonomy_loop: Mutex::new(None),
            first_tick_at: OnceLock::new(),
        })
    }

    pub fn config(&self) -> SharedConfig {
        self.config.clone()
    }

    pub fn ledger(&self) -> &Arc<TokenUsageLedger> {
        &self.ledger
    }

    pub fn telemetry(&self) -> &Arc<TelemetryBus> {
        &self.telemetry
    }

    /// Consistent snapshot; waits for an in-flight tick to finish.
    pub async fn state(&self) -> KernelState {
        self.state.lock().await.clone()
    }

    pub fn subscribe_outputs(&self) -> broadcast::Receiver<KernelOutput> {
        self.outputs.subscribe()
    }

    /// Swap collaborators. An in-flight tick keeps the ones it started with.
    pub fn reconfigure(&self, deps: KernelDeps) {
        self.deps.store(Arc::new(deps));
        self.embeddings.reset();
        tracing::info!("Kernel collaborators reconfigured");
    }

    /// Queue a user line for the next tick.
    pub fn submit_input(&self, text: impl Into<String>) {
        self.submit_input_at(text, chrono::Utc::now().timestamp_millis());
    }

    pub fn submit_input_at(&self, text: impl Into<String>, at: i64) {
        self.enqueue(Pending::User { text: text.into(), at });
    }

    /// Queue a named self-initiated action for the next tick.
    ///
    /// Unknown names are rejected here and never reach dispatch.
    pub fn submit_autonomy(&self, name: &str) -> NoemaResult<ActionMapping> {
        let action: AutonomyAction = name.parse()?;
        self.enqueue(Pending::Autonomy(action));
        Ok(map_autonomy_action_to_action_type(action))
    }

    /// Apply an event outside a tick (focus, goals, sleep, ...).
    pub async fn dispatch(&self, event: KernelEvent) {
        let cfg = self.config.load_full();
        let limits = ReducerLimits::from(&cfg.kernel);
        let limbic = LimbicSystem::new(cfg.limbic.clone());
        let mut state = self.state.lock().await;
        *state = reduce(std::mem::take(&mut *state), &event, &limits, &limbic);
    }

    /// Add an active goal with a fresh id and return that id.
    pub async fn add_goal(&self, description: impl Into<String>, priority: f64) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        let goal = Goal {
            id: id.clone(),
            description: description.into(),
            priority: priority.clamp(0.0, 1.0),
            updated_at: chrono::Utc::now().timestamp_millis(),
        };
        self.dispatch(KernelEvent::GoalAdded { goal }).await;
        id
    }

    // ------------------------------------------------------------------------
    // Autonomy loop
    // ------------------------------------------------------------------------

    pub fn is_running(&self) -> bool {
        self.loop_slot()
            .as_ref()
            .is_some_and(|h| !h.task.is_finished())
    }

    /// Spawn the background tick loop. Returns `false` if one is already running.
    pub fn start_autonomy_loop(self: &Arc<Self>) -> bool {
        let mut slot = self.loop_slot();
        if slot.as_ref().is_some_and(|h| !h.task.is_finished()) {
            return false;
        }

        let (shutdown, mut shutdown_rx) = watch::channel(false);
        let runner = Arc::clone(self);
        let task = tokio::spawn(async move {
            tracing::info!("Autonomy loop started");
            loop {
                let interval = runner.config.load().kernel.tick_interval();
                tokio::select! {
                    _ = shutdown_rx.changed() => break,
                    _ = tokio::time::sleep(interval) => {
                        let now = chrono::Utc::now().timestamp_millis();
                        runner.tick_once(now).await;
                    }
                }
            }
            tracing::info!("Autonomy loop stopped");
        });
        *slot = Some(LoopHandle { shutdown, task });
        true
    }

    /// Stop the loop and wait for an in-flight tick. Safe to call repeatedly.
    pub async fn stop_autonomy_loop(&self) {
        let handle = self.loop_slot().take();
        let Some(handle) = handle else {
            return;
        };
        let _ = handle.shutdown.send(true);
        if let Err(e) = handle.task.await {
            tracing::warn!("Autonomy loop ended abnormally: {}", e);
        }
    }

    // ------------------------------------------------------------------------
    // Tick
    // ------------------------------------------------------------------------

    /// Run one full tick at `now` (unix milliseconds).
    pub async fn tick_once(&self, now: i64) -> KernelOutput {
        let started = std::time::Instant::now();
        let cfg = self.config.load_full();
        let ctx = TickCtx {
            limits: ReducerLimits::from(&cfg.kernel),
            limbic: LimbicSystem::new(cfg.limbic.clone()),
            deps: self.deps.load_full(),
            cfg,
            now,
            since: *self.first_tick_at.get_or_init(|| now),
        };

        let mut state = self.state.lock().await;
        self.apply(&mut state, KernelEvent::Tick { now }, &ctx);

        let mut stimuli: Vec<(String, Stimulus)> = Vec::new();
        let mut candidates = Vec::new();
        let mut has_user_input = false;

        for (i, line) in self.take_deferred().into_iter().enumerate() {
            let age_ms = now.saturating_sub(line.at);
            if age_ms > DEFERRED_INPUT_TTL_MS {
                tracing::info!("Deferred input expired after {}ms", age_ms);
                self.telemetry
                    .publish(TelemetryEvent::InputExpired { tick: state.tick, age_ms });
                continue;
            }
            let label = format!("deferred:{}", i);
            candidates.push(line.candidate(label.clone()));
            stimuli.push((label, Stimulus::User(line)));
            has_user_input = true;
        }

        for (i, pending) in self.drain_inbox().into_iter().enumerate() {
            match pending {
                Pending::User { text, at } => {
                    let decision = ThalamicFilter::classify(&text);
                    if !decision.store {
                        tracing::debug!("Dropped low-signal input ({} chars)", text.chars().count());
                        continue;
                    }
                    let novelty = input_novelty(&state, &text);
                    let turn = Turn { speaker: Speaker::User, text: text.clone(), at };
                    self.apply(&mut state, KernelEvent::UserInput { text: text.clone(), at }, &ctx);
                    self.persist(&ctx, &turn).await;

                    let line = UserLine { text, at, decision, novelty };
                    let label = format!("input:{}", i);
                    candidates.push(line.candidate(label.clone()));
                    stimuli.push((label, Stimulus::User(line)));
                    has_user_input = true;
                }
                Pending::Autonomy(action) => {
                    let label = format!("requested:{}", i);
                    candidates.push(
                        Candidate::new(CandidateKind::Autonomous, now, label.clone())
                            .with_metadata(1.0, 1.0),
                    );
                    stimuli.push((label, Stimulus::Requested(action)));
                }
            }
        }

        for goal in &state.goals.active {
            let label = format!("goal:{}", goal.id);
            candidates.push(
                Candidate::new(CandidateKind::GoalDriven, goal.updated_at, label.clone())
                    .with_metadata(GOAL_NOVELTY, goal.priority.clamp(0.0, 1.0)),
            );
            stimuli.push((label, Stimulus::Goal(goal.clone())));
        }

        if !has_user_input {
            let action = choose_autonomy_action(&state.limbic, &state.goals, &mut self.rng());
            let label = "autonomy".to_string();
            candidates.push(
                Candidate::new(CandidateKind::Autonomous, now, label.clone())
                    .with_metadata(state.limbic.clamped().curiosity, AUTONOMY_SALIENCE),
            );
            stimuli.push((label, Stimulus::Autonomy(action)));
        }

        let winner = ExecutiveGate::select_for_attention(candidates, now, &ctx.cfg.gate)
            .into_iter()
            .next()
            .and_then(|w| {
                let idx = stimuli.iter().position(|(label, _)| *label == w.candidate.label)?;
                Some((w.strength, stimuli.remove(idx).1))
            });

        let tick = state.tick;
        // Losers: user lines and explicit requests get another chance.
        for (_, stimulus) in stimuli {
            match stimulus {
                Stimulus::User(line) => self.defer(line, tick, "outranked"),
                Stimulus::Requested(action) => self.enqueue(Pending::Autonomy(action)),
                Stimulus::Goal(_) | Stimulus::Autonomy(_) => {}
            }
        }

        let output = match winner {
            None => KernelOutput::Silent { tick, reason: ReasonCode::NoContent },
            Some((pressure, Stimulus::User(line))) => {
                self.respond(&mut state, &ctx, line, pressure).await
            }
            Some((pressure, Stimulus::Goal(goal))) => {
                self.pursue_goal(&mut state, &ctx, &goal, pressure)
            }
            Some((pressure, Stimulus::Requested(action) | Stimulus::Autonomy(action))) => {
                self.act(&mut state, &ctx, action, pressure)
            }
        };
        drop(state);

        self.telemetry.publish(TelemetryEvent::TickCompleted {
            tick,
            duration_ms: started.elapsed().as_millis() as u64,
            outputs: usize::from(output.is_visible()),
        });
        // No subscribers is fine.
        let _ = self.outputs.send(output.clone());
        output
    }

    async fn respond(
        &self,
        state: &mut KernelState,
        ctx: &TickCtx,
        line: UserLine,
        pressure: f64,
    ) -> KernelOutput {
        let tick = state.tick;
        let text = line.text.as_str();
        if state.sleeping {
            let verdict = self.volition(state, ctx, text, pressure, false);
            return KernelOutput::Silent { tick, reason: verdict.reason };
        }

        let intent = IntentDetector::detect_intent_with_fuzzy(text);
        tracing::debug!("Input intent: {}", intent);

        if intent == Intent::Work && should_ask_user(state, text) {
            let verdict = self.volition(state, ctx, CLARIFICATION, pressure, false);
            if !verdict.should_speak {
                return self.hold_back(line, tick, verdict.reason);
            }
            self.speak(state, ctx, CLARIFICATION).await;
            return KernelOutput::Clarification { tick, text: CLARIFICATION.to_string() };
        }

        let memories = if line.decision.skip_embedding {
            Vec::new()
        } else {
            self.recall(ctx, text, intent).await
        };

        let session = &ctx.deps.session;
        let request = ReplyRequest {
            agent_id: session.agent_id(),
            session_id: session.session_id(),
            prompt: text.to_string(),
            intent,
            autonomy: None,
            memories,
            recent_turns: state.conversation.iter().cloned().collect(),
            trajectory: state.trajectory.clone(),
            params: CompletionParams::from_limbic(&state.limbic),
        };

        let reply = self.compose(state, ctx, &request).await;
        if reply.is_none() {
            self.apply(state, KernelEvent::ActionOutcome { outcome: ActionOutcome::Failure }, ctx);
        }
        let content = reply.unwrap_or_default();

        let verdict = self.volition(state, ctx, &content, pressure, false);
        if !verdict.should_speak {
            return self.hold_back(line, tick, verdict.reason);
        }
        self.speak(state, ctx, &content).await;
        self.apply(state, KernelEvent::ActionOutcome { outcome: ActionOutcome::Success }, ctx);
        KernelOutput::Speech { tick, text: content }
    }

    fn pursue_goal(&self, state: &mut KernelState, ctx: &TickCtx, goal: &Goal, pressure: f64) -> KernelOutput {
        let tick = state.tick;
        let description = format!("goal:{} {}", goal.id, goal.description);
        let verdict = self.volition(state, ctx, &description, pressure, true);
        if !verdict.should_speak {
            return KernelOutput::Silent { tick, reason: verdict.reason };
        }
        self.apply(state, KernelEvent::ActionTaken { description, at: ctx.now }, ctx);
        self.apply(
            state,
            KernelEvent::TrajectoryPatched {
                patch: TrajectoryPatch::next_step(goal.description.clone()),
                tick,
                at: ctx.now,
            },
            ctx,
        );
        KernelOutput::Action {
            tick,
            action: ActionType::Plan,
            reason: format!("goal_{}", goal.id),
        }
    }

    fn act(&self, state: &mut KernelState, ctx: &TickCtx, action: AutonomyAction, pressure: f64) -> KernelOutput {
        let tick = state.tick;
        let mapping = map_autonomy_action_to_action_type(action);
        let verdict = self.volition(state, ctx, &mapping.reason, pressure, true);
        if !verdict.should_speak {
            return KernelOutput::Silent { tick, reason: verdict.reason };
        }
        self.apply(
            state,
            KernelEvent::ActionTaken { description: mapping.reason.clone(), at: ctx.now },
            ctx,
        );
        self.apply(
            state,
            KernelEvent::TrajectoryPatched {
                patch: TrajectoryPatch::next_step(mapping.action.to_string()),
                tick,
                at: ctx.now,
            },
            ctx,
        );
        tracing::info!("Autonomous action: {} ({})", mapping.action, mapping.reason);
        KernelOutput::Action { tick, action: mapping.action, reason: mapping.reason }
    }

    // ------------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------------

    /// Silent reply. A line blocked only by the refractory window is retried.
    fn hold_back(&self, line: UserLine, tick: u64, reason: ReasonCode) -> KernelOutput {
        if reason == ReasonCode::SpeechRefractory {
            self.defer(line, tick, reason.as_str());
        }
        KernelOutput::Silent { tick, reason }
    }

    fn defer(&self, line: UserLine, tick: u64, reason: &str) {
        tracing::debug!("Deferring input to a later tick ({})", reason);
        self.telemetry.publish(TelemetryEvent::InputDeferred {
            tick,
            reason: reason.to_string(),
        });
        self.deferred
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(line);
    }

    fn take_deferred(&self) -> Vec<UserLine> {
        std::mem::take(&mut *self.deferred.lock().unwrap_or_else(PoisonError::into_inner))
    }

    fn apply(&self, state: &mut KernelState, event: KernelEvent, ctx: &TickCtx) {
        *state = reduce(std::mem::take(state), &event, &ctx.limits, &ctx.limbic);
    }

    fn volition(
        &self,
        state: &KernelState,
        ctx: &TickCtx,
        content: &str,
        pressure: f64,
        is_autonomous: bool,
    ) -> VolitionDecision {
        let mut recent = state.recent_outputs(RECENT_OUTPUT_WINDOW);
        recent.extend(state.thoughts.iter().rev().take(RECENT_OUTPUT_WINDOW).cloned());
        let limbic = state.limbic;

        let mut speech = SpeechContext::new(content, pressure, state.silence_ms(ctx.now, ctx.since), &limbic);
        speech.recent_outputs = &recent;
        speech.last_speech_at = state.last_speech_at;
        speech.now = Some(ctx.now);
        speech.is_autonomous = is_autonomous;
        speech.is_sleeping = state.sleeping;

        let verdict = VolitionSystem::new(ctx.cfg.volition.clone()).should_speak(&speech);
        self.telemetry.publish(TelemetryEvent::VolitionDecision {
            tick: state.tick,
            should_speak: verdict.should_speak,
            reason: verdict.reason.to_string(),
        });
        verdict
    }

    async fn speak(&self, state: &mut KernelState, ctx: &TickCtx, text: &str) {
        let turn = Turn { speaker: Speaker::Agent, text: text.to_string(), at: ctx.now };
        self.apply(state, KernelEvent::AgentSpoke { text: turn.text.clone(), at: turn.at }, ctx);
        self.persist(ctx, &turn).await;
    }

    /// Compose a reply. `None` on provider error, timeout or empty text.
    async fn compose(&self, state: &mut KernelState, ctx: &TickCtx, request: &ReplyRequest) -> Option<String> {
        let responder = ctx.deps.responder.clone();
        let payload = match self.bounded("responder", ctx.timeout(), responder.compose(request)).await {
            Ok(Ok(payload)) => payload,
            Ok(Err(e)) => {
                tracing::warn!("{}", NoemaError::Provider(e.to_string()));
                return None;
            }
            Err(_) => return None,
        };

        if let Some(usage) = extract_usage(&request.agent_id, "reply", &payload) {
            self.ledger.record(usage);
        }

        if let Some(raw) = payload.get("trajectory") {
            match serde_json::from_value::<TrajectoryPatch>(raw.clone()) {
                Ok(patch) => {
                    let tick = state.tick;
                    self.apply(state, KernelEvent::TrajectoryPatched { patch, tick, at: ctx.now }, ctx);
                }
                Err(e) => {
                    tracing::warn!("Ignoring malformed trajectory patch: {}", e);
                    self.telemetry
                        .publish(TelemetryEvent::json_parse_failure("reply.trajectory"));
                }
            }
        }

        extract_text(&payload).map(|t| t.trim().to_string())
    }

    /// Semantic recall; empty when embeddings or search are unavailable.
    async fn recall(&self, ctx: &TickCtx, text: &str, intent: Intent) -> Vec<MemoryMatch> {
        let embedding = self
            .embeddings
            .embed(ctx.deps.embedder.as_ref(), text, &ctx.cfg.embeddings, ctx.timeout())
            .await;
        if embedding.is_none() {
            tracing::debug!("No embedding, proceeding without semantic search");
            return Vec::new();
        }

        let query = SearchQuery {
            text: text.to_string(),
            embedding,
            limit: IntentDetector::get_retrieval_limit(intent),
        };
        match self.bounded("memory.search", ctx.timeout(), ctx.deps.store.semantic_search(&query)).await {
            Ok(mut matches) => {
                matches.truncate(query.limit);
                matches
            }
            Err(_) => Vec::new(),
        }
    }

    async fn persist(&self, ctx: &TickCtx, turn: &Turn) {
        let session = &ctx.deps.session;
        let hash = content_hash(&session.agent_id(), &turn.text);
        let session_id = session.session_id();
        let append = ctx.deps.store.append_turn(&session_id, &hash, turn);
        if let Ok(Err(e)) = self.bounded("memory.append", ctx.timeout(), append).await {
            tracing::warn!("{}", NoemaError::Storage(e.to_string()));
        }
    }

    /// Await `fut` for at most `timeout`; a timeout is logged and published.
    async fn bounded<T>(
        &self,
        callsite: &str,
        timeout: Duration,
        fut: impl Future<Output = T>,
    ) -> NoemaResult<T> {
        tokio::time::timeout(timeout, fut).await.map_err(|_| {
            let timeout_ms = timeout.as_millis() as u64;
            let err = NoemaError::ProviderTimeout { callsite: callsite.to_string(), timeout_ms };
            tracing::warn!("{}", err);
            self.telemetry.publish(TelemetryEvent::ProviderTimeout {
                callsite: callsite.to_string(),
                timeout_ms,
            });
            err
        })
    }

    fn drain_inbox(&self) -> Vec<Pending> {
        let mut rx = self.inbox_rx.lock().unwrap_or_else(PoisonError::into_inner);
        let mut items = Vec::new();
        while let Ok(item) = rx.try_recv() {
            items.push(item);
        }
        items
    }

    fn enqueue(&self, pending: Pending) {
        if self.inbox_tx.send(pending).is_err() {
            tracing::warn!("Kernel inbox closed, input dropped");
        }
    }

    fn rng(&self) -> MutexGuard<'_, RandomSource> {
        self.rng.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn loop_slot(&self) -> MutexGuard<'_, Option<LoopHandle>> {
        self.autonomy_loop.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Lower for a line the user already said within the conversation window.
fn input_novelty(state: &KernelState, text: &str) -> f64 {
    let normalized = normalize_text(text);
    let repeated = state
        .conversation
        .iter()
        .any(|t| t.speaker == Speaker::User && normalize_text(&t.text) == normalized);
    if repeated {
        REPEATED_INPUT_NOVELTY
    } else {
        1.0
    }
}
