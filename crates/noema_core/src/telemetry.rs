//! Structured status events for external observability.
//!
//! Publishing never fails back into the caller: a bus with no subscribers
//! still keeps a bounded history for later inspection.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};
use tokio::sync::broadcast;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TelemetryEvent {
    /// Embedding provider health after a failure or a recovery.
    EmbeddingsCooldown {
        #[serde(rename = "cooldownActive")]
        cooldown_active: bool,
        #[serde(rename = "failCount")]
        fail_count: u32,
    },
    /// Upstream output could not be parsed; the caller default was used.
    JsonParseFailure { callsite: String },
    /// A collaborator call exceeded its timeout.
    ProviderTimeout { callsite: String, timeout_ms: u64 },
    VolitionDecision {
        tick: u64,
        should_speak: bool,
        reason: String,
    },
    /// A stored user line was not answered this tick and will be retried.
    InputDeferred { tick: u64, reason: String },
    /// A deferred user line waited too long and was dropped unanswered.
    InputExpired { tick: u64, age_ms: i64 },
    TickCompleted {
        tick: u64,
        duration_ms: u64,
        outputs: usize,
    },
}

impl TelemetryEvent {
    pub fn json_parse_failure(callsite: impl Into<String>) -> Self {
        TelemetryEvent::JsonParseFailure {
            callsite: callsite.into(),
        }
    }
}

pub struct TelemetryBus {
    tx: broadcast::Sender<TelemetryEvent>,
    history: Mutex<VecDeque<TelemetryEvent>>,
    history_capacity: usize,
}

impl Default for TelemetryBus {
    fn default() -> Self {
        Self::new(256)
    }
}

impl TelemetryBus {
    pub fn new(history_capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(64);
        Self {
            tx,
            history: Mutex::new(VecDeque::new()),
            history_capacity: history_capacity.max(1),
        }
    }

    pub fn publish(&self, event: TelemetryEvent) {
        tracing::debug!("telemetry: {:?}", event);
        {
            let mut history = self.history.lock().unwrap_or_else(PoisonError::into_inner);
            history.push_back(event.clone());
            while history.len() > self.history_capacity {
                history.pop_front();
            }
        }
        // No receivers is not an error for a publisher.
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TelemetryEvent> {
        self.tx.subscribe()
    }

    /// Oldest first.
    pub fn history(&self) -> Vec<TelemetryEvent> {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    pub fn reset(&self) {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_without_subscribers() {
        let bus = TelemetryBus::new(2);
        bus.publish(TelemetryEvent::json_parse_failure("a"));
        bus.publish(TelemetryEvent::json_parse_failure("b"));
        bus.publish(TelemetryEvent::json_parse_failure("c"));
        let history = bus.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0], TelemetryEvent::json_parse_failure("b"));
        bus.reset();
        assert!(bus.history().is_empty());
    }

    #[tokio::test]
    async fn test_subscriber_receives() {
        let bus = TelemetryBus::default();
        let mut rx = bus.subscribe();
        bus.publish(TelemetryEvent::EmbeddingsCooldown {
            cooldown_active: true,
            fail_count: 3,
        });
        let ev = rx.recv().await.unwrap();
        assert!(matches!(ev, TelemetryEvent::EmbeddingsCooldown { fail_count: 3, .. }));
    }

    #[test]
    fn test_wire_shape() {
        let json = serde_json::to_value(TelemetryEvent::EmbeddingsCooldown {
            cooldown_active: true,
            fail_count: 2,
        })
        .unwrap();
        assert_eq!(json["kind"], "embeddings_cooldown");
        assert_eq!(json["cooldownActive"], true);
        assert_eq!(json["failCount"], 2);
    }
}
