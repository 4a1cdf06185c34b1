//! Volition: the final go/no-go for emitting speech or action.
//!
//! Gating order is fixed: empty content, sleep, refractory window, then the
//! urge-versus-threshold comparison. Limbic state and recent outputs only
//! bias the last step.

use noema_core::{LimbicState, VolitionConfig};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReasonCode {
    NoContent,
    Sleeping,
    SpeechRefractory,
    BelowThreshold,
    UrgeAboveThreshold,
}

impl ReasonCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReasonCode::NoContent => "NO_CONTENT",
            ReasonCode::Sleeping => "SLEEPING",
            ReasonCode::SpeechRefractory => "SPEECH_REFRACTORY",
            ReasonCode::BelowThreshold => "BELOW_THRESHOLD",
            ReasonCode::UrgeAboveThreshold => "URGE_ABOVE_THRESHOLD",
        }
    }
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolitionDecision {
    pub should_speak: bool,
    pub reason: ReasonCode,
}

impl VolitionDecision {
    fn reject(reason: ReasonCode) -> Self {
        Self {
            should_speak: false,
            reason,
        }
    }
}

/// Everything the gate looks at for one decision.
#[derive(Debug, Clone)]
pub struct SpeechContext<'a> {
    pub content: &'a str,
    /// Internal pressure to act, typically the winning candidate's strength.
    pub pressure: f64,
    pub silence_duration_ms: i64,
    pub limbic: &'a LimbicState,
    /// Newest first.
    pub recent_outputs: &'a [String],
    pub last_speech_at: Option<i64>,
    /// Unix milliseconds; defaults to the wall clock.
    pub now: Option<i64>,
    pub is_autonomous: bool,
    pub is_sleeping: bool,
}

impl<'a> SpeechContext<'a> {
    pub fn new(content: &'a str, pressure: f64, silence_duration_ms: i64, limbic: &'a LimbicState) -> Self {
        Self {
            content,
            pressure,
            silence_duration_ms,
            limbic,
            recent_outputs: &[],
            last_speech_at: None,
            now: None,
            is_autonomous: false,
            is_sleeping: false,
        }
    }
}

fn wall_clock_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

pub struct VolitionSystem {
    config: VolitionConfig,
}

impl Default for VolitionSystem {
    fn default() -> Self {
        Self::new(VolitionConfig::default())
    }
}

impl VolitionSystem {
    pub fn new(config: VolitionConfig) -> Self {
        Self { config }
    }

    /// Saturating, monotonic in silence length; 0 at no silence.
    pub fn silence_bonus(&self, silence_ms: i64) -> f64 {
        let s = silence_ms.max(0) as f64;
        let half = self.config.silence_half_saturation_ms.max(1.0);
        self.config.silence_bonus_max * s / (s + half)
    }

    pub fn urge(&self, pressure: f64, silence_ms: i64) -> f64 {
        let pressure = if pressure.is_finite() { pressure.max(0.0) } else { 0.0 };
        pressure + self.silence_bonus(silence_ms)
    }

    pub fn threshold(&self, ctx: &SpeechContext<'_>) -> f64 {
        let limbic = ctx.limbic.clamped();
        let mut threshold = self.config.urge_threshold
            - limbic.frustration * self.config.frustration_threshold_relief
            + limbic.fear * self.config.fear_threshold_penalty;
        let content = ctx.content.trim();
        if ctx
            .recent_outputs
            .iter()
            .any(|prev| prev.trim().eq_ignore_ascii_case(content))
        {
            threshold += self.config.repetition_penalty;
        }
        if ctx.is_autonomous {
            threshold += self.config.autonomous_threshold_penalty;
        }
        threshold
    }

    pub fn should_speak(&self, ctx: &SpeechContext<'_>) -> VolitionDecision {
        if ctx.content.trim().is_empty() {
            return VolitionDecision::reject(ReasonCode::NoContent);
        }
        if ctx.is_sleeping {
            return VolitionDecision::reject(ReasonCode::Sleeping);
        }
        let now = ctx.now.unwrap_or_else(wall_clock_ms);
        if let Some(last) = ctx.last_speech_at {
            if now.saturating_sub(last) < self.config.refractory_ms {
                return VolitionDecision::reject(ReasonCode::SpeechRefractory);
            }
        }

        let urge = self.urge(ctx.pressure, ctx.silence_duration_ms);
        let threshold = self.threshold(ctx);
        tracing::debug!(
            "VolitionSystem: urge={:.3} threshold={:.3} autonomous={}",
            urge,
            threshold,
            ctx.is_autonomous
        );
        if urge >= threshold {
            VolitionDecision {
                should_speak: true,
                reason: ReasonCode::UrgeAboveThreshold,
            }
        } else {
            VolitionDecision::reject(ReasonCode::BelowThreshold)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000_000;

    #[test]
    fn test_empty_content() {
        let v = VolitionSystem::default();
        let calm = LimbicState::calm();
        let d = v.should_speak(&SpeechContext::new("", 1.0, 0, &calm));
        assert_eq!(d, VolitionDecision { should_speak: false, reason: ReasonCode::NoContent });
        let d = v.should_speak(&SpeechContext::new("   \n", 1.0, 0, &calm));
        assert_eq!(d.reason, ReasonCode::NoContent);
    }

    #[test]
    fn test_sleeping_beats_everything() {
        let v = VolitionSystem::default();
        let calm = LimbicState::calm();
        let mut ctx = SpeechContext::new("hello", 10.0, i64::MAX / 2, &calm);
        ctx.is_sleeping = true;
        ctx.last_speech_at = Some(NOW - 100);
        ctx.now = Some(NOW);
        assert_eq!(v.should_speak(&ctx).reason, ReasonCode::Sleeping);
    }

    #[test]
    fn test_refractory_window() {
        let v = VolitionSystem::default();
        let calm = LimbicState::calm();
        let mut ctx = SpeechContext::new("hello", 1.0, 0, &calm);
        ctx.last_speech_at = Some(NOW - 100);
        ctx.now = Some(NOW);
        assert_eq!(v.should_speak(&ctx).reason, ReasonCode::SpeechRefractory);

        ctx.last_speech_at = Some(NOW - 10_000);
        assert!(v.should_speak(&ctx).should_speak);
    }

    #[test]
    fn test_refractory_falls_back_to_wall_clock() {
        let v = VolitionSystem::default();
        let calm = LimbicState::calm();
        let mut ctx = SpeechContext::new("hello", 1.0, 0, &calm);
        ctx.last_speech_at = Some(chrono::Utc::now().timestamp_millis());
        assert_eq!(v.should_speak(&ctx).reason, ReasonCode::SpeechRefractory);

        ctx.last_speech_at = Some(NOW);
        assert!(v.should_speak(&ctx).should_speak);
    }

    #[test]
    fn test_threshold_and_silence_bonus() {
        let v = VolitionSystem::default();
        let calm = LimbicState::calm();
        let mut ctx = SpeechContext::new("hello", 0.4, 0, &calm);
        ctx.now = Some(NOW);
        assert_eq!(v.should_speak(&ctx).reason, ReasonCode::BelowThreshold);

        // Long silence tips the same pressure over the line
        ctx.silence_duration_ms = 600_000;
        assert_eq!(v.should_speak(&ctx).reason, ReasonCode::UrgeAboveThreshold);
    }

    #[test]
    fn test_silence_bonus_saturates() {
        let v = VolitionSystem::default();
        assert_eq!(v.silence_bonus(0), 0.0);
        assert!(v.silence_bonus(1_000) < v.silence_bonus(10_000));
        assert!(v.silence_bonus(i64::MAX) <= 0.4 + 1e-12);
        assert_eq!(v.silence_bonus(-5), 0.0);
    }

    #[test]
    fn test_frustration_lowers_threshold_and_repetition_raises_it() {
        let v = VolitionSystem::default();
        let calm = LimbicState::calm();
        let frustrated = LimbicState::new(0.1, 0.5, 0.5, 1.0);
        let base = v.threshold(&SpeechContext::new("x", 0.0, 0, &calm));
        let lowered = v.threshold(&SpeechContext::new("x", 0.0, 0, &frustrated));
        assert!(lowered < base);

        let recent = vec!["Hello".to_string()];
        let mut ctx = SpeechContext::new("hello", 0.0, 0, &calm);
        ctx.recent_outputs = &recent;
        assert!(v.threshold(&ctx) > base);
    }

    #[test]
    fn test_autonomous_needs_more_urge() {
        let v = VolitionSystem::default();
        let calm = LimbicState::calm();
        let mut ctx = SpeechContext::new("note", 0.6, 0, &calm);
        ctx.now = Some(NOW);
        assert!(v.should_speak(&ctx).should_speak);
        ctx.is_autonomous = true;
        assert_eq!(v.should_speak(&ctx).reason, ReasonCode::BelowThreshold);
    }

    #[test]
    fn test_reason_wire_format() {
        let json = serde_json::to_string(&ReasonCode::SpeechRefractory).unwrap();
        assert_eq!(json, "\"SPEECH_REFRACTORY\"");
    }
}
