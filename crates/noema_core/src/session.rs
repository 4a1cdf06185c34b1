use crate::SessionProvider;
use std::sync::atomic::{AtomicI64, Ordering};

/// Issues `sess_<token>` ids where the token is wall-clock milliseconds,
/// bumped forward when two ids are requested within the same millisecond.
#[derive(Debug, Default)]
pub struct SessionIds {
    last: AtomicI64,
}

impl SessionIds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self) -> String {
        self.next_at(chrono::Utc::now().timestamp_millis())
    }

    /// Same as [`next`](Self::next) with an explicit clock reading.
    pub fn next_at(&self, now_ms: i64) -> String {
        let mut current = self.last.load(Ordering::Relaxed);
        loop {
            let candidate = now_ms.max(current + 1);
            match self.last.compare_exchange_weak(
                current,
                candidate,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return format!("sess_{}", candidate),
                Err(actual) => current = actual,
            }
        }
    }
}

/// Fixed agent identity with a session id minted at construction.
#[derive(Debug, Clone)]
pub struct LocalSession {
    agent_id: String,
    session_id: String,
}

impl LocalSession {
    pub fn new(agent_id: impl Into<String>, ids: &SessionIds) -> Self {
        Self {
            agent_id: agent_id.into(),
            session_id: ids.next(),
        }
    }
}

impl SessionProvider for LocalSession {
    fn agent_id(&self) -> String {
        self.agent_id.clone()
    }

    fn session_id(&self) -> String {
        self.session_id.clone()
    }
}
