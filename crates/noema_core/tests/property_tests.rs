//! Property-based tests for noema_core.
//!
//! Uses proptest to verify invariants that must hold for ALL possible inputs,
//! not just hand-picked examples.

use noema_core::{
    apply_trajectory_update, content_hash, create_rng, AgentTrajectory, TokenUsageInput,
    TokenUsageLedger, TrajectoryPatch,
};
use proptest::prelude::*;

// ============================================================================
// Strategies
// ============================================================================

fn arb_field() -> impl Strategy<Value = Option<String>> {
    proptest::option::of("[a-z]{1,8}")
}

fn arb_patch() -> impl Strategy<Value = TrajectoryPatch> {
    (arb_field(), arb_field(), arb_field(), arb_field()).prop_map(
        |(next_step, outcome, friction, retry_policy)| TrajectoryPatch {
            next_step,
            outcome,
            friction,
            retry_policy,
        },
    )
}

fn arb_count() -> impl Strategy<Value = f64> {
    prop_oneof![
        0.0f64..10_000.0,
        -10_000.0f64..0.0,
        Just(f64::NAN),
        Just(f64::INFINITY),
        Just(f64::NEG_INFINITY),
    ]
}

// ============================================================================
// Trajectory
// ============================================================================

proptest! {
    /// Applying P1 then P2 equals applying the field-wise override of P1 by P2,
    /// except for the stamp, which always comes from the latest call.
    #[test]
    fn trajectory_patches_compose(p1 in arb_patch(), p2 in arb_patch(), t1 in 0u64..1000, t2 in 0u64..1000) {
        let stepwise = {
            let a = apply_trajectory_update(None, &p1, t1, Some(10));
            apply_trajectory_update(Some(&a), &p2, t2, Some(20))
        };
        let merged = apply_trajectory_update(None, &p1.clone().overridden_by(&p2), t2, Some(20));
        prop_assert_eq!(stepwise, merged);
    }

    #[test]
    fn trajectory_stamp_always_latest(current in arb_patch(), patch in arb_patch(), tick in 0u64..1000, now in 0i64..1_000_000) {
        let base: AgentTrajectory = apply_trajectory_update(None, &current, 0, Some(0));
        let out = apply_trajectory_update(Some(&base), &patch, tick, Some(now));
        prop_assert_eq!(out.tick_number, Some(tick));
        prop_assert_eq!(out.updated_at, Some(now));
    }
}

// ============================================================================
// Token ledger
// ============================================================================

proptest! {
    #[test]
    fn ledger_views_stay_consistent(
        entries in proptest::collection::vec((0usize..3, arb_count(), arb_count()), 0..40)
    ) {
        let ledger = TokenUsageLedger::new(8);
        for (op, inp, out) in &entries {
            ledger.record(TokenUsageInput::new("agent", format!("op{}", op), *inp, *out));
        }
        let snap = ledger.snapshot();
        let by_op_total: u64 = snap.by_op.values().map(|t| t.total_tokens).sum();
        let by_op_calls: u64 = snap.by_op.values().map(|t| t.calls).sum();
        prop_assert_eq!(by_op_total, snap.totals.total_tokens);
        prop_assert_eq!(by_op_calls, entries.len() as u64);
        prop_assert_eq!(snap.recent.len(), entries.len().min(8));
        prop_assert_eq!(snap.totals.total_tokens, snap.totals.in_tokens + snap.totals.out_tokens);
    }
}

// ============================================================================
// Randomness and hashing
// ============================================================================

proptest! {
    #[test]
    fn seeded_rng_reproducible(seed in ".{0,24}") {
        let mut a = create_rng(Some(&seed));
        let mut b = create_rng(Some(&seed));
        for _ in 0..10 {
            let x = a.next_f64();
            prop_assert!((0.0..1.0).contains(&x));
            prop_assert_eq!(x.to_bits(), b.next_f64().to_bits());
        }
    }

    #[test]
    fn content_hash_whitespace_insensitive(words in proptest::collection::vec("[a-zA-Z]{1,6}", 1..6)) {
        let tight = words.join(" ");
        let loose = format!("  {}\t", words.join("   "));
        prop_assert_eq!(content_hash("agent", &tight), content_hash("agent", &loose));
    }
}
