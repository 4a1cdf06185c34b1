//! Token usage ledger
//!
//! Accumulates per-operation token consumption reported by LLM-adjacent
//! call sites. Several call sites may record concurrently; writes are
//! serialized and a snapshot is taken under a single read guard, so the
//! three views (totals, per-op, recent) always agree with each other.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, VecDeque};
use std::sync::{PoisonError, RwLock};

/// Raw usage report as produced by a call site. Numbers may be garbage.
#[derive(Debug, Clone, Default)]
pub struct TokenUsageInput {
    pub agent_id: String,
    pub op: String,
    pub in_tokens: f64,
    pub out_tokens: f64,
    /// `None` means "not reported": the total is derived from in + out.
    pub total_tokens: Option<f64>,
    /// Unix milliseconds; `None` stamps the recording time.
    pub at: Option<i64>,
}

impl TokenUsageInput {
    pub fn new(agent_id: impl Into<String>, op: impl Into<String>, in_tokens: f64, out_tokens: f64) -> Self {
        Self {
            agent_id: agent_id.into(),
            op: op.into(),
            in_tokens,
            out_tokens,
            total_tokens: None,
            at: None,
        }
    }

    /// Decode a loosely shaped JSON payload (`agentId`, `op`, `inTokens`,
    /// `outTokens`, `totalTokens`, `at`). `null` counts as missing; other
    /// non-numeric values become invalid numbers and are zeroed on record.
    pub fn from_value(value: &Value) -> Self {
        let num = |key: &str| -> f64 {
            match value.get(key) {
                Some(Value::Null) | None => 0.0,
                Some(v) => v.as_f64().unwrap_or(f64::NAN),
            }
        };
        let text = |key: &str| -> String {
            value
                .get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        Self {
            agent_id: text("agentId"),
            op: text("op"),
            in_tokens: num("inTokens"),
            out_tokens: num("outTokens"),
            total_tokens: value
                .get("totalTokens")
                .filter(|v| !v.is_null())
                .map(|v| v.as_f64().unwrap_or(f64::NAN)),
            at: value.get("at").and_then(Value::as_i64),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsageEntry {
    pub agent_id: String,
    pub op: String,
    pub in_tokens: u64,
    pub out_tokens: u64,
    pub total_tokens: u64,
    pub at: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageTotals {
    pub in_tokens: u64,
    pub out_tokens: u64,
    pub total_tokens: u64,
    pub calls: u64,
}

impl UsageTotals {
    fn add(&mut self, entry: &TokenUsageEntry) {
        self.in_tokens = self.in_tokens.saturating_add(entry.in_tokens);
        self.out_tokens = self.out_tokens.saturating_add(entry.out_tokens);
        self.total_tokens = self.total_tokens.saturating_add(entry.total_tokens);
        self.calls += 1;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerSnapshot {
    pub totals: UsageTotals,
    pub by_op: BTreeMap<String, UsageTotals>,
    /// Oldest first.
    pub recent: Vec<TokenUsageEntry>,
}

#[derive(Debug, Default)]
struct LedgerInner {
    totals: UsageTotals,
    by_op: BTreeMap<String, UsageTotals>,
    recent: VecDeque<TokenUsageEntry>,
}

pub struct TokenUsageLedger {
    inner: RwLock<LedgerInner>,
    recent_capacity: usize,
}

impl Default for TokenUsageLedger {
    fn default() -> Self {
        Self::new(50)
    }
}

/// Non-negative finite numbers pass through (truncated); anything else is 0.
fn coerce_count(v: f64) -> u64 {
    if v.is_finite() && v >= 0.0 {
        v.trunc() as u64
    } else {
        0
    }
}

impl TokenUsageLedger {
    pub fn new(recent_capacity: usize) -> Self {
        Self {
            inner: RwLock::new(LedgerInner::default()),
            recent_capacity: recent_capacity.max(1),
        }
    }

    /// Clear back to the empty state.
    pub fn reset(&self) {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        *inner = LedgerInner::default();
    }

    /// Normalize and record one usage report. Returns the stored entry.
    pub fn record(&self, input: TokenUsageInput) -> TokenUsageEntry {
        let in_tokens = coerce_count(input.in_tokens);
        let out_tokens = coerce_count(input.out_tokens);
        let total_tokens = match input.total_tokens {
            Some(total) => coerce_count(total),
            None => in_tokens.saturating_add(out_tokens),
        };
        let entry = TokenUsageEntry {
            agent_id: input.agent_id,
            op: input.op,
            in_tokens,
            out_tokens,
            total_tokens,
            at: input
                .at
                .unwrap_or_else(|| chrono::Utc::now().timestamp_millis()),
        };

        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        inner.totals.add(&entry);
        inner.by_op.entry(entry.op.clone()).or_default().add(&entry);
        inner.recent.push_back(entry.clone());
        while inner.recent.len() > self.recent_capacity {
            inner.recent.pop_front();
        }
        drop(inner);

        tracing::trace!(
            "TokenUsageLedger: {} {} in={} out={} total={}",
            entry.agent_id,
            entry.op,
            entry.in_tokens,
            entry.out_tokens,
            entry.total_tokens
        );
        entry
    }

    /// Point-in-time copy of all three views.
    pub fn snapshot(&self) -> LedgerSnapshot {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        LedgerSnapshot {
            totals: inner.totals,
            by_op: inner.by_op.clone(),
            recent: inner.recent.iter().cloned().collect(),
        }
    }
}
