//! Integration tests for the KernelRunner.
//!
//! These drive full ticks with the in-memory collaborators from
//! `providers::mock`, using explicit timestamps so every gate is
//! deterministic.

use noema_core::config::shared;
use noema_core::{
    EmbeddingProvider, Goal, LocalSession, NoemaConfig, NoemaError, SessionIds, Speaker,
    TelemetryBus, TelemetryEvent, TokenUsageLedger,
};
use noema_limbic::ReasonCode;
use noema_reasoning::providers::{
    BagOfWordsEmbedder, EchoResponder, FailingEmbedder, InMemoryStore, ScriptedResponder,
};
use noema_reasoning::{ActionType, KernelDeps, KernelEvent, KernelOutput, KernelRunner, Responder};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

const NOW: i64 = 1_700_000_000_000;

// ============================================================================
// Harness
// ============================================================================

fn test_config() -> NoemaConfig {
    let mut cfg = NoemaConfig::default();
    cfg.kernel.seed = Some("kernel-tests".into());
    cfg
}

struct Harness {
    runner: Arc<KernelRunner>,
    store: Arc<InMemoryStore>,
    telemetry: Arc<TelemetryBus>,
    ledger: Arc<TokenUsageLedger>,
}

fn deps(
    responder: Arc<dyn Responder>,
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<InMemoryStore>,
) -> KernelDeps {
    KernelDeps {
        embedder,
        store,
        responder,
        session: Arc::new(LocalSession::new("noema", &SessionIds::new())),
    }
}

fn harness_with(
    cfg: NoemaConfig,
    responder: Arc<dyn Responder>,
    embedder: Arc<dyn EmbeddingProvider>,
) -> Harness {
    let store = Arc::new(InMemoryStore::new());
    let telemetry = Arc::new(TelemetryBus::default());
    let ledger = Arc::new(TokenUsageLedger::default());
    let runner = KernelRunner::new(
        shared(cfg),
        deps(responder, embedder, store.clone()),
        ledger.clone(),
        telemetry.clone(),
    );
    Harness { runner, store, telemetry, ledger }
}

fn echo_harness() -> Harness {
    harness_with(
        test_config(),
        Arc::new(EchoResponder),
        Arc::new(BagOfWordsEmbedder::default()),
    )
}

// ============================================================================
// User input
// ============================================================================

#[tokio::test]
async fn test_user_input_gets_reply() {
    let h = echo_harness();
    h.runner.submit_input_at("hello there, how are you doing today?", NOW);

    let out = h.runner.tick_once(NOW).await;
    assert_eq!(
        out,
        KernelOutput::Speech {
            tick: 1,
            text: "You said: hello there, how are you doing today?".into()
        }
    );

    let state = h.runner.state().await;
    assert_eq!(state.conversation.len(), 2);
    assert_eq!(state.last_speech_at, Some(NOW));
    assert_eq!(state.last_input_at, Some(NOW));

    let stored = h.store.turns();
    assert_eq!(stored.len(), 2);
    assert_eq!(stored[0].turn.speaker, Speaker::User);
    assert!(stored[0].session_id.starts_with("sess_"));
    assert_eq!(stored[0].hash.as_str().len(), 64);

    let usage = h.ledger.snapshot();
    assert_eq!(usage.totals.calls, 1);
    assert_eq!(usage.totals.total_tokens, usage.totals.in_tokens + usage.totals.out_tokens);
    assert!(usage.by_op.contains_key("reply"));
}

#[tokio::test]
async fn test_low_signal_input_is_dropped() {
    let h = echo_harness();
    h.runner.submit_input_at("yo", NOW);

    let out = h.runner.tick_once(NOW).await;
    // Nothing stored; the self-initiated candidate is too weak right away
    assert_eq!(out, KernelOutput::Silent { tick: 1, reason: ReasonCode::BelowThreshold });
    assert!(h.runner.state().await.conversation.is_empty());
    assert!(h.store.turns().is_empty());
}

#[tokio::test]
async fn test_sleeping_agent_does_not_compose() {
    let responder = Arc::new(ScriptedResponder::new(vec![]));
    let h = harness_with(test_config(), responder.clone(), Arc::new(BagOfWordsEmbedder::default()));
    h.runner.dispatch(KernelEvent::SleepChanged { sleeping: true }).await;
    h.runner.submit_input_at("tell me something interesting please", NOW);

    let out = h.runner.tick_once(NOW).await;
    assert_eq!(out, KernelOutput::Silent { tick: 1, reason: ReasonCode::Sleeping });
    assert!(responder.requests().is_empty());
    // The input itself is still remembered
    assert_eq!(h.runner.state().await.conversation.len(), 1);
}

#[tokio::test]
async fn test_refractory_window_between_replies() {
    let h = echo_harness();
    h.runner.submit_input_at("what is the weather like over there?", NOW);
    assert!(matches!(h.runner.tick_once(NOW).await, KernelOutput::Speech { .. }));

    h.runner.submit_input_at("and how about tomorrow morning then?", NOW + 100);
    let out = h.runner.tick_once(NOW + 100).await;
    assert_eq!(out, KernelOutput::Silent { tick: 2, reason: ReasonCode::SpeechRefractory });
}

#[tokio::test]
async fn test_work_request_without_target_asks_first() {
    let h = echo_harness();
    h.runner.submit_input_at("can you fix the deploy for me", NOW);
    let out = h.runner.tick_once(NOW).await;
    assert!(matches!(out, KernelOutput::Clarification { tick: 1, .. }));

    let later = NOW + 10_000;
    h.runner.submit_input_at("ok the deploy script lives at ./deploy.sh", later);
    let out = h.runner.tick_once(later).await;
    assert!(matches!(out, KernelOutput::Speech { tick: 2, .. }), "got {:?}", out);
}

#[tokio::test]
async fn test_focus_suppresses_clarification() {
    let h = echo_harness();
    h.runner
        .dispatch(KernelEvent::FocusChanged {
            focus: noema_core::Focus::from_parts(Some("repo"), Some("noema"), Some("Noema")),
        })
        .await;
    h.runner.submit_input_at("can you fix the deploy for me", NOW);
    assert!(matches!(h.runner.tick_once(NOW).await, KernelOutput::Speech { .. }));
}

// ============================================================================
// Deferred input
// ============================================================================

fn deferred_reasons(h: &Harness) -> Vec<String> {
    h.telemetry
        .history()
        .into_iter()
        .filter_map(|e| match e {
            TelemetryEvent::InputDeferred { reason, .. } => Some(reason),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn test_two_inputs_in_one_tick_both_answered() {
    let h = echo_harness();
    h.runner.submit_input_at("what time does the market open tomorrow?", NOW);
    h.runner.submit_input_at("and where can I park near the market?", NOW);

    let out = h.runner.tick_once(NOW).await;
    assert_eq!(
        out,
        KernelOutput::Speech { tick: 1, text: "You said: what time does the market open tomorrow?".into() }
    );

    // Still inside the refractory window: held, not lost
    let out = h.runner.tick_once(NOW + 1_000).await;
    assert_eq!(out, KernelOutput::Silent { tick: 2, reason: ReasonCode::SpeechRefractory });

    let out = h.runner.tick_once(NOW + 4_000).await;
    assert_eq!(
        out,
        KernelOutput::Speech { tick: 3, text: "You said: and where can I park near the market?".into() }
    );
    assert_eq!(deferred_reasons(&h), vec!["outranked".to_string(), "SPEECH_REFRACTORY".to_string()]);

    // Each line is stored once, however many ticks it waited
    let state = h.runner.state().await;
    let user_turns = state.conversation.iter().filter(|t| t.speaker == Speaker::User).count();
    assert_eq!(user_turns, 2);
}

#[tokio::test]
async fn test_input_outranked_by_requested_action_is_answered_later() {
    let h = echo_harness();
    h.runner.submit_autonomy("REST").unwrap();
    h.runner.submit_input_at("could you tell me a short story?", NOW);

    let out = h.runner.tick_once(NOW).await;
    assert_eq!(
        out,
        KernelOutput::Action { tick: 1, action: ActionType::Rest, reason: "autonomy_rest".into() }
    );

    let out = h.runner.tick_once(NOW + 4_000).await;
    assert_eq!(
        out,
        KernelOutput::Speech { tick: 2, text: "You said: could you tell me a short story?".into() }
    );
}

#[tokio::test]
async fn test_stale_deferred_input_expires() {
    let h = echo_harness();
    h.runner.submit_input_at("what time does the market open tomorrow?", NOW);
    h.runner.submit_input_at("and where can I park near the market?", NOW);
    h.runner.tick_once(NOW).await;

    let out = h.runner.tick_once(NOW + 60_000).await;
    assert!(!matches!(out, KernelOutput::Speech { .. }), "got {:?}", out);
    assert!(h
        .telemetry
        .history()
        .iter()
        .any(|e| matches!(e, TelemetryEvent::InputExpired { tick: 2, age_ms: 60_000 })));
}

// ============================================================================
// Degraded collaborators
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_responder_timeout_is_a_failure_not_a_hang() {
    let mut cfg = test_config();
    cfg.kernel.provider_timeout_ms = 50;
    let responder = Arc::new(
        ScriptedResponder::new(vec![json!({"text": "too late"})]).with_delay(Duration::from_secs(10)),
    );
    let h = harness_with(cfg, responder, Arc::new(BagOfWordsEmbedder::default()));
    h.runner.submit_input_at("please summarize our last conversation", NOW);

    let out = h.runner.tick_once(NOW).await;
    assert_eq!(out, KernelOutput::Silent { tick: 1, reason: ReasonCode::NoContent });
    assert!(h.telemetry.history().iter().any(|e| matches!(
        e,
        TelemetryEvent::ProviderTimeout { callsite, timeout_ms: 50 } if callsite == "responder"
    )));
    // Failure feeds back into the limbic state
    assert!(h.runner.state().await.limbic.frustration > 0.1);
    assert_eq!(h.ledger.snapshot().totals.calls, 0);
}

#[tokio::test]
async fn test_failed_embedding_skips_search() {
    let embedder = Arc::new(FailingEmbedder::default());
    let h = harness_with(test_config(), Arc::new(EchoResponder), embedder.clone());
    h.runner.submit_input_at("do you remember what we talked about last week?", NOW);

    let out = h.runner.tick_once(NOW).await;
    assert!(matches!(out, KernelOutput::Speech { .. }));
    assert_eq!(embedder.calls(), 1);
    assert_eq!(h.store.search_count(), 0);
    assert!(h.telemetry.history().iter().any(|e| matches!(
        e,
        TelemetryEvent::EmbeddingsCooldown { cooldown_active: false, fail_count: 1 }
    )));
}

#[tokio::test]
async fn test_trajectory_patch_from_reply() {
    let responder = Arc::new(ScriptedResponder::new(vec![
        json!({"text": "noted", "trajectory": {"nextStep": "observe", "outcome": "ok"}}),
        json!({"text": "again", "trajectory": 5}),
    ]));
    let h = harness_with(test_config(), responder, Arc::new(BagOfWordsEmbedder::default()));

    h.runner.submit_input_at("let us keep an eye on the garden", NOW);
    h.runner.tick_once(NOW).await;
    let t = h.runner.state().await.trajectory.unwrap();
    assert_eq!(t.next_step.as_deref(), Some("observe"));
    assert_eq!((t.tick_number, t.updated_at), (Some(1), Some(NOW)));

    let later = NOW + 5_000;
    h.runner.submit_input_at("and the flowers near the fence too", later);
    h.runner.tick_once(later).await;
    assert!(h
        .telemetry
        .history()
        .contains(&TelemetryEvent::json_parse_failure("reply.trajectory")));
    // Malformed patch leaves the previous trajectory alone
    assert_eq!(h.runner.state().await.trajectory.unwrap().tick_number, Some(1));
}

// ============================================================================
// Self-initiated acts
// ============================================================================

#[tokio::test]
async fn test_requested_autonomy_action() {
    let h = echo_harness();
    let err = h.runner.submit_autonomy("DANCE").unwrap_err();
    assert!(matches!(err, NoemaError::UnmappedAutonomyAction(_)));

    let mapping = h.runner.submit_autonomy("REFLECT").unwrap();
    assert_eq!(mapping.action, ActionType::Note);

    let out = h.runner.tick_once(NOW).await;
    assert_eq!(
        out,
        KernelOutput::Action { tick: 1, action: ActionType::Note, reason: "autonomy_reflect".into() }
    );
    let state = h.runner.state().await;
    assert_eq!(state.thoughts.back().map(String::as_str), Some("autonomy_reflect"));
    assert_eq!(state.trajectory.unwrap().next_step.as_deref(), Some("note"));
    assert_eq!(state.last_speech_at, Some(NOW));
}

#[tokio::test]
async fn test_goal_drives_planning() {
    let h = echo_harness();
    h.runner
        .dispatch(KernelEvent::GoalAdded {
            goal: Goal {
                id: "g1".into(),
                description: "write the report".into(),
                priority: 1.0,
                updated_at: NOW,
            },
        })
        .await;

    let out = h.runner.tick_once(NOW).await;
    assert_eq!(
        out,
        KernelOutput::Action { tick: 1, action: ActionType::Plan, reason: "goal_g1".into() }
    );
    let state = h.runner.state().await;
    assert_eq!(state.trajectory.unwrap().next_step.as_deref(), Some("write the report"));
}

#[tokio::test]
async fn test_seeded_runs_are_reproducible() {
    async fn run() -> Vec<KernelOutput> {
        let h = echo_harness();
        let mut outs = Vec::new();
        for k in 0..8 {
            outs.push(h.runner.tick_once(NOW + k * 120_000).await);
        }
        outs
    }
    assert_eq!(run().await, run().await);
}

// ============================================================================
// Lifecycle
// ============================================================================

#[tokio::test]
async fn test_outputs_are_broadcast() {
    let h = echo_harness();
    let mut rx = h.runner.subscribe_outputs();
    h.runner.submit_input_at("is anybody listening out there?", NOW);
    let out = h.runner.tick_once(NOW).await;
    assert_eq!(rx.recv().await.unwrap(), out);
    assert!(h
        .telemetry
        .history()
        .iter()
        .any(|e| matches!(e, TelemetryEvent::TickCompleted { tick: 1, outputs: 1, .. })));
}

#[tokio::test]
async fn test_loop_start_stop_idempotent() {
    let mut cfg = test_config();
    cfg.kernel.tick_interval_ms = 10;
    let h = harness_with(cfg, Arc::new(EchoResponder), Arc::new(BagOfWordsEmbedder::default()));

    // Stopping a loop that never started is fine
    h.runner.stop_autonomy_loop().await;

    assert!(h.runner.start_autonomy_loop());
    assert!(!h.runner.start_autonomy_loop());
    assert!(h.runner.is_running());

    tokio::time::sleep(Duration::from_millis(60)).await;
    h.runner.stop_autonomy_loop().await;
    h.runner.stop_autonomy_loop().await;
    assert!(!h.runner.is_running());
    assert!(h.runner.state().await.tick >= 1);

    // And it can be started again
    assert!(h.runner.start_autonomy_loop());
    h.runner.stop_autonomy_loop().await;
}

#[tokio::test]
async fn test_reconfigure_takes_effect_next_tick() {
    let first = Arc::new(ScriptedResponder::new(vec![json!({"text": "from first"})]));
    let h = harness_with(test_config(), first.clone(), Arc::new(BagOfWordsEmbedder::default()));

    let second = Arc::new(ScriptedResponder::new(vec![json!({"text": "from second"})]));
    h.runner.reconfigure(deps(
        second,
        Arc::new(BagOfWordsEmbedder::default()),
        h.store.clone(),
    ));

    h.runner.submit_input_at("which responder is answering now?", NOW);
    let out = h.runner.tick_once(NOW).await;
    assert_eq!(out, KernelOutput::Speech { tick: 1, text: "from second".into() });
    assert!(first.requests().is_empty());
}

#[tokio::test]
async fn test_add_goal_generates_id() {
    let h = echo_harness();
    let id = h.runner.add_goal("learn the names of the plants", 2.0).await;
    let state = h.runner.state().await;
    let goal = state.goals.find(&id).unwrap();
    assert_eq!(goal.priority, 1.0);

    h.runner.dispatch(KernelEvent::GoalCompleted { id: id.clone() }).await;
    assert_eq!(h.runner.state().await.goals.completed, vec![id]);
}
