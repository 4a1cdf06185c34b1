use crate::autonomy::AutonomyAction;
use crate::intent::Intent;
use anyhow::Result;
use async_trait::async_trait;
use noema_core::{AgentTrajectory, LimbicState, MemoryMatch, Turn};

/// Parameters for reply generation, modulated by limbic state
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionParams {
    pub max_tokens: u32,
    /// Sampling temperature (0.0 - 2.0)
    pub temperature: f32,
}

impl Default for CompletionParams {
    fn default() -> Self {
        Self {
            max_tokens: 512,
            temperature: 0.7,
        }
    }
}

impl CompletionParams {
    /// Curious agents sample wider, frightened ones narrower.
    pub fn from_limbic(limbic: &LimbicState) -> Self {
        let l = limbic.clamped();
        let temperature = (0.5 + l.curiosity * 0.4 - l.fear * 0.2).clamp(0.1, 1.2);
        Self {
            temperature: temperature as f32,
            ..Default::default()
        }
    }
}

/// Everything a responder needs to compose one utterance.
#[derive(Debug, Clone)]
pub struct ReplyRequest {
    pub agent_id: String,
    pub session_id: String,
    /// User text, or a short description of the self-initiated intention.
    pub prompt: String,
    pub intent: Intent,
    /// Set when the tick was not triggered by user input.
    pub autonomy: Option<AutonomyAction>,
    pub memories: Vec<MemoryMatch>,
    /// Oldest first.
    pub recent_turns: Vec<Turn>,
    pub trajectory: Option<AgentTrajectory>,
    pub params: CompletionParams,
}

#[async_trait]
pub trait Responder: Send + Sync {
    /// Return the provider's raw payload. Reply text, token usage and an
    /// optional `trajectory` patch are pulled out of it by the caller.
    async fn compose(&self, request: &ReplyRequest) -> Result<serde_json::Value>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_follow_limbic() {
        let curious = CompletionParams::from_limbic(&LimbicState::new(0.0, 1.0, 0.5, 0.0));
        let scared = CompletionParams::from_limbic(&LimbicState::new(1.0, 0.0, 0.5, 0.0));
        assert!(curious.temperature > scared.temperature);
        assert!(scared.temperature >= 0.1);
        assert_eq!(curious.max_tokens, 512);
    }
}
