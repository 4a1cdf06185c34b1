//! Failure accounting around the embedding collaborator.
//!
//! A `None`, an empty vector, or a timeout all count as one failure.
//! After `cooldown_after_failures` consecutive failures the provider is
//! left alone for `cooldown_secs`; callers get `None` and carry on without
//! semantic search. The first success clears the counter.

use noema_core::{EmbeddingProvider, EmbeddingsConfig, TelemetryBus, TelemetryEvent};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Default)]
struct GuardState {
    fail_count: u32,
    cooldown_until: Option<Instant>,
}

pub struct EmbeddingGuard {
    telemetry: Arc<TelemetryBus>,
    state: Mutex<GuardState>,
}

impl EmbeddingGuard {
    pub fn new(telemetry: Arc<TelemetryBus>) -> Self {
        Self {
            telemetry,
            state: Mutex::new(GuardState::default()),
        }
    }

    pub fn fail_count(&self) -> u32 {
        self.lock().fail_count
    }

    pub fn cooldown_active(&self) -> bool {
        self.lock()
            .cooldown_until
            .is_some_and(|until| Instant::now() < until)
    }

    /// Forget all failures, e.g. after the provider was swapped.
    pub fn reset(&self) {
        *self.lock() = GuardState::default();
    }

    pub async fn embed(
        &self,
        provider: &dyn EmbeddingProvider,
        text: &str,
        config: &EmbeddingsConfig,
        timeout: Duration,
    ) -> Option<Vec<f32>> {
        if self.cooldown_active() {
            tracing::debug!("EmbeddingGuard: cooldown active, skipping provider");
            return None;
        }

        let result = match tokio::time::timeout(timeout, provider.generate_embedding(text)).await {
            Ok(v) => v.filter(|e| !e.is_empty()),
            Err(_) => {
                tracing::warn!("EmbeddingGuard: provider timed out ({}ms)", timeout.as_millis());
                self.telemetry.publish(TelemetryEvent::ProviderTimeout {
                    callsite: "embedding".to_string(),
                    timeout_ms: timeout.as_millis() as u64,
                });
                None
            }
        };

        match result {
            Some(embedding) => {
                self.record_success();
                Some(embedding)
            }
            None => {
                self.record_failure(config);
                None
            }
        }
    }

    fn record_success(&self) {
        let recovered = {
            let mut state = self.lock();
            let had_failures = state.fail_count > 0;
            *state = GuardState::default();
            had_failures
        };
        if recovered {
            tracing::info!("EmbeddingGuard: provider recovered");
            self.telemetry.publish(TelemetryEvent::EmbeddingsCooldown {
                cooldown_active: false,
                fail_count: 0,
            });
        }
    }

    fn record_failure(&self, config: &EmbeddingsConfig) {
        let (fail_count, cooldown_active) = {
            let mut state = self.lock();
            state.fail_count = state.fail_count.saturating_add(1);
            let engage = state.fail_count >= config.cooldown_after_failures.max(1);
            if engage {
                state.cooldown_until =
                    Some(Instant::now() + Duration::from_secs(config.cooldown_secs));
            }
            (state.fail_count, engage)
        };
        if cooldown_active {
            tracing::warn!(
                "EmbeddingGuard: {} consecutive failures, cooling down for {}s",
                fail_count,
                config.cooldown_secs
            );
        }
        self.telemetry.publish(TelemetryEvent::EmbeddingsCooldown {
            cooldown_active,
            fail_count,
        });
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, GuardState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
