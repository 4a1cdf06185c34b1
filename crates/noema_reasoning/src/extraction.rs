//! Provider output extraction.
//!
//! Upstream payloads come in several shapes. Each shape is handled by one
//! small pure strategy; strategies are tried in order and the first
//! non-empty result wins. JSON embedded in model text gets the same
//! treatment, with a caller default and a telemetry event when nothing parses.

use noema_core::{TelemetryBus, TelemetryEvent, TokenUsageInput};
use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::LazyLock;

static RE_FENCED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```(?:[A-Za-z]+)?\s*([\s\S]*?)```").unwrap());

// ============================================================================
// Combinator
// ============================================================================

/// Results that can be "present but empty".
pub trait Blank {
    fn is_blank(&self) -> bool;
}

impl Blank for String {
    fn is_blank(&self) -> bool {
        self.trim().is_empty()
    }
}

impl Blank for Value {
    fn is_blank(&self) -> bool {
        self.is_null()
    }
}

/// A named, pure extraction step.
pub struct Strategy<I: ?Sized, T> {
    pub name: &'static str,
    pub run: fn(&I) -> Option<T>,
}

/// Run strategies in order and keep the first non-blank result.
pub fn first_non_empty<I: ?Sized, T: Blank>(strategies: &[Strategy<I, T>], input: &I) -> Option<T> {
    strategies.iter().find_map(|s| {
        let out = (s.run)(input).filter(|v| !v.is_blank())?;
        tracing::trace!("extraction: strategy '{}' matched", s.name);
        Some(out)
    })
}

// ============================================================================
// Text strategies
// ============================================================================

fn choices_message_content(v: &Value) -> Option<String> {
    v.pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn content_blocks_text(v: &Value) -> Option<String> {
    match v.get("content")? {
        Value::String(s) => Some(s.clone()),
        Value::Array(blocks) => {
            let joined: String = blocks
                .iter()
                .filter_map(|b| b.get("text").and_then(Value::as_str))
                .collect();
            Some(joined)
        }
        _ => None,
    }
}

fn output_text(v: &Value) -> Option<String> {
    v.get("output_text").and_then(Value::as_str).map(str::to_string)
}

fn plain_text(v: &Value) -> Option<String> {
    v.get("text").and_then(Value::as_str).map(str::to_string)
}

fn bare_string(v: &Value) -> Option<String> {
    v.as_str().map(str::to_string)
}

pub const TEXT_STRATEGIES: &[Strategy<Value, String>] = &[
    Strategy { name: "choices_message_content", run: choices_message_content },
    Strategy { name: "content_blocks_text", run: content_blocks_text },
    Strategy { name: "output_text", run: output_text },
    Strategy { name: "text", run: plain_text },
    Strategy { name: "bare_string", run: bare_string },
];

/// Reply text from any supported payload shape.
pub fn extract_text(payload: &Value) -> Option<String> {
    first_non_empty(TEXT_STRATEGIES, payload)
}

// ============================================================================
// JSON strategies
// ============================================================================

fn direct_json(text: &str) -> Option<Value> {
    serde_json::from_str(text.trim()).ok()
}

fn fenced_json(text: &str) -> Option<Value> {
    RE_FENCED
        .captures_iter(text)
        .find_map(|c| serde_json::from_str(c.get(1)?.as_str().trim()).ok())
}

fn outermost(text: &str, open: char, close: char) -> Option<Value> {
    let start = text.find(open)?;
    let end = text.rfind(close)?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&text[start..=end]).ok()
}

fn outermost_object(text: &str) -> Option<Value> {
    outermost(text, '{', '}')
}

fn outermost_array(text: &str) -> Option<Value> {
    outermost(text, '[', ']')
}

pub const JSON_STRATEGIES: &[Strategy<str, Value>] = &[
    Strategy { name: "direct", run: direct_json },
    Strategy { name: "fenced_block", run: fenced_json },
    Strategy { name: "outermost_object", run: outermost_object },
    Strategy { name: "outermost_array", run: outermost_array },
];

/// First JSON value found in model text, if any.
pub fn parse_json_lenient(text: &str) -> Option<Value> {
    first_non_empty(JSON_STRATEGIES, text)
}

/// Decode `T` from model text, or fall back to `default`.
///
/// Every JSON strategy is tried against `T`, not just the first one that
/// yields a value. On total failure a `JsonParseFailure` event tagged with
/// `callsite` is published.
pub fn parse_json_or_default<T: DeserializeOwned>(
    text: &str,
    default: T,
    callsite: &str,
    telemetry: &TelemetryBus,
) -> T {
    let decoded = JSON_STRATEGIES.iter().find_map(|s| {
        let value = (s.run)(text)?;
        serde_json::from_value::<T>(value).ok()
    });
    match decoded {
        Some(v) => v,
        None => {
            tracing::warn!("Could not parse JSON at '{}', using default", callsite);
            telemetry.publish(TelemetryEvent::json_parse_failure(callsite));
            default
        }
    }
}

// ============================================================================
// Usage
// ============================================================================

fn first_number(v: &Value, pointers: &[&str]) -> Option<Value> {
    pointers.iter().find_map(|p| v.pointer(p).cloned())
}

/// Token usage from OpenAI, Anthropic or Ollama style payloads.
///
/// Returns `None` when the payload reports no usage at all. Values are
/// passed through untouched; the ledger does the coercion.
pub fn extract_usage(agent_id: &str, op: &str, payload: &Value) -> Option<TokenUsageInput> {
    let input = first_number(
        payload,
        &["/usage/prompt_tokens", "/usage/input_tokens", "/prompt_eval_count"],
    );
    let output = first_number(
        payload,
        &["/usage/completion_tokens", "/usage/output_tokens", "/eval_count"],
    );
    let total = first_number(payload, &["/usage/total_tokens"]);
    if input.is_none() && output.is_none() && total.is_none() {
        return None;
    }

    let mut raw = serde_json::json!({ "agentId": agent_id, "op": op });
    if let Some(map) = raw.as_object_mut() {
        if let Some(v) = input {
            map.insert("inTokens".into(), v);
        }
        if let Some(v) = output {
            map.insert("outTokens".into(), v);
        }
        if let Some(v) = total {
            map.insert("totalTokens".into(), v);
        }
    }
    Some(TokenUsageInput::from_value(&raw))
}
