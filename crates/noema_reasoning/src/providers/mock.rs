//! Mock collaborators: deterministic, no network, no API keys.

use crate::llm::{ReplyRequest, Responder};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use noema_core::{
    normalize_text, ContentHash, EmbeddingProvider, MemoryMatch, MemoryStore, SearchQuery, Turn,
};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// Cosine similarity in [-1, 1]; 0 for mismatched or zero vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

// ============================================================================
// Embedders
// ============================================================================

/// Hashes each normalized word into one of `dims` buckets.
#[derive(Debug, Clone)]
pub struct BagOfWordsEmbedder {
    dims: usize,
}

impl BagOfWordsEmbedder {
    pub fn new(dims: usize) -> Self {
        Self { dims: dims.max(1) }
    }

    pub fn embed(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; self.dims];
        for word in normalize_text(text).split(' ').filter(|w| !w.is_empty()) {
            // FNV-1a
            let mut h: u64 = 0xcbf29ce484222325;
            for b in word.bytes() {
                h ^= u64::from(b);
                h = h.wrapping_mul(0x100000001b3);
            }
            v[(h % self.dims as u64) as usize] += 1.0;
        }
        v
    }
}

impl Default for BagOfWordsEmbedder {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl EmbeddingProvider for BagOfWordsEmbedder {
    async fn generate_embedding(&self, text: &str) -> Option<Vec<f32>> {
        let v = self.embed(text);
        v.iter().any(|x| *x != 0.0).then_some(v)
    }
}

/// Always fails; counts how often it was asked.
#[derive(Debug, Default)]
pub struct FailingEmbedder {
    calls: AtomicUsize,
}

impl FailingEmbedder {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingProvider for FailingEmbedder {
    async fn generate_embedding(&self, _text: &str) -> Option<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        None
    }
}

// ============================================================================
// Store
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct StoredTurn {
    pub session_id: String,
    pub hash: ContentHash,
    pub turn: Turn,
}

/// Append-only turn log plus a fixed set of embedded memories.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    turns: Mutex<Vec<StoredTurn>>,
    memories: Vec<(String, Vec<f32>)>,
    searches: AtomicUsize,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed memories, embedded with `embedder`.
    pub fn with_memories(embedder: &BagOfWordsEmbedder, texts: &[&str]) -> Self {
        Self {
            memories: texts
                .iter()
                .map(|t| (t.to_string(), embedder.embed(t)))
                .collect(),
            ..Self::default()
        }
    }

    pub fn turns(&self) -> Vec<StoredTurn> {
        self.turns.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn search_count(&self) -> usize {
        self.searches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MemoryStore for InMemoryStore {
    async fn semantic_search(&self, query: &SearchQuery) -> Vec<MemoryMatch> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        let Some(embedding) = &query.embedding else {
            return Vec::new();
        };
        let mut matches: Vec<MemoryMatch> = self
            .memories
            .iter()
            .map(|(text, v)| MemoryMatch {
                text: text.clone(),
                score: cosine_similarity(embedding, v),
            })
            .filter(|m| m.score > 0.0)
            .collect();
        matches.sort_by(|a, b| b.score.total_cmp(&a.score));
        matches.truncate(query.limit);
        matches
    }

    async fn append_turn(&self, session_id: &str, hash: &ContentHash, turn: &Turn) -> Result<()> {
        self.turns
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(StoredTurn {
                session_id: session_id.to_string(),
                hash: hash.clone(),
                turn: turn.clone(),
            });
        Ok(())
    }
}

// ============================================================================
// Responders
// ============================================================================

/// Anthropic-shaped payload that repeats the prompt, with word-count usage.
#[derive(Debug, Default)]
pub struct EchoResponder;

#[async_trait]
impl Responder for EchoResponder {
    async fn compose(&self, request: &ReplyRequest) -> Result<Value> {
        let mut text = format!("You said: {}", request.prompt.trim());
        if let Some(top) = request.memories.first() {
            text.push_str(&format!(" (reminds me of: {})", top.text));
        }
        let input_tokens = request.prompt.split_whitespace().count();
        let output_tokens = text.split_whitespace().count();
        Ok(json!({
            "content": [{ "type": "text", "text": text }],
            "usage": { "input_tokens": input_tokens, "output_tokens": output_tokens },
        }))
    }
}

/// Replays queued payloads in order, optionally after a delay.
/// Errors once the script runs out.
#[derive(Debug, Default)]
pub struct ScriptedResponder {
    script: Mutex<VecDeque<Value>>,
    delay: Option<Duration>,
    requests: Mutex<Vec<ReplyRequest>>,
}

impl ScriptedResponder {
    pub fn new(payloads: Vec<Value>) -> Self {
        Self {
            script: Mutex::new(payloads.into()),
            ..Self::default()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Requests seen so far, oldest first.
    pub fn requests(&self) -> Vec<ReplyRequest> {
        self.requests.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

#[async_trait]
impl Responder for ScriptedResponder {
    async fn compose(&self, request: &ReplyRequest) -> Result<Value> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .ok_or_else(|| anyhow!("script exhausted"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::Intent;
    use crate::llm::CompletionParams;

    fn request(prompt: &str) -> ReplyRequest {
        ReplyRequest {
            agent_id: "noema".into(),
            session_id: "sess_1".into(),
            prompt: prompt.into(),
            intent: Intent::Now,
            autonomy: None,
            memories: vec![],
            recent_turns: vec![],
            trajectory: None,
            params: CompletionParams::default(),
        }
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }

    #[tokio::test]
    async fn test_store_search_ranks_by_similarity() {
        let embedder = BagOfWordsEmbedder::default();
        let store = InMemoryStore::with_memories(
            &embedder,
            &["the cat sleeps on the sofa", "quarterly tax report"],
        );
        let query = SearchQuery {
            text: "where does the cat sleep".into(),
            embedding: embedder.generate_embedding("where does the cat sleep").await,
            limit: 5,
        };
        let matches = store.semantic_search(&query).await;
        assert_eq!(matches[0].text, "the cat sleeps on the sofa");

        let blind = SearchQuery { embedding: None, ..query };
        assert!(store.semantic_search(&blind).await.is_empty());
    }

    #[tokio::test]
    async fn test_echo_payload_shape() {
        let payload = EchoResponder.compose(&request("hello there")).await.unwrap();
        assert_eq!(payload["content"][0]["text"], "You said: hello there");
        assert_eq!(payload["usage"]["input_tokens"], 2);
    }

    #[tokio::test]
    async fn test_scripted_runs_out() {
        let r = ScriptedResponder::new(vec![json!({"text": "one"})]);
        assert_eq!(r.compose(&request("a")).await.unwrap()["text"], "one");
        assert!(r.compose(&request("b")).await.is_err());
        assert_eq!(r.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_embedders() {
        assert!(BagOfWordsEmbedder::default().generate_embedding("   ").await.is_none());
        let failing = FailingEmbedder::default();
        assert!(failing.generate_embedding("x").await.is_none());
        assert_eq!(failing.calls(), 1);
    }
}
