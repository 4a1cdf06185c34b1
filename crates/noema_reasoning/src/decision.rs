use noema_core::KernelState;
use regex::Regex;
use std::sync::LazyLock;

static RE_ID_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(id|uuid|key|ref|ticket|file|path)\s*[:=]\s*\S+").unwrap()
});
static RE_ABS_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^/[^/\s]+(/[^/\s]*)+$|^/[^/\s]+\.[A-Za-z0-9]{1,8}$").unwrap()
});
static RE_REL_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\./|\.\./|~/)\S+").unwrap());
static RE_WIN_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z]:[\\/]\S*").unwrap());
static RE_FILE_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[\w.-]+(/[\w.-]+)*/[\w.-]+\.[A-Za-z0-9]{1,8}$").unwrap()
});

static DEFAULT_ENGINE: LazyLock<DecisionEngine> = LazyLock::new(DecisionEngine::with_defaults);

// ============================================================================
// IdRule trait
// ============================================================================

/// One way an input can name its own target.
pub trait IdRule: Send + Sync {
    fn matches(&self, input: &str) -> bool;

    /// Name for logging.
    fn name(&self) -> &str;
}

/// Split on whitespace and strip wrapping punctuation.
fn tokens(input: &str) -> impl Iterator<Item = &str> {
    input
        .split_whitespace()
        .map(|t| {
            t.trim_matches(|c: char| matches!(c, '"' | '\'' | '`' | '(' | ')' | '[' | ']' | '<' | '>' | ',' | ';' | '!' | '?'))
                .trim_end_matches(|c: char| c == '.' || c == ':')
        })
        .filter(|t| !t.is_empty())
}

// ============================================================================
// Built-in rules
// ============================================================================

/// `id=42`, `ticket: ABC-1`, `path=/tmp/x` and friends.
pub struct KeyValueIdRule;

impl IdRule for KeyValueIdRule {
    fn matches(&self, input: &str) -> bool {
        RE_ID_MARKER.is_match(input)
    }

    fn name(&self) -> &str { "key_value_id" }
}

/// Absolute, relative, home, Windows, or `dir/file.ext` paths.
pub struct PathLikeRule;

impl IdRule for PathLikeRule {
    fn matches(&self, input: &str) -> bool {
        tokens(input).any(|t| {
            RE_ABS_PATH.is_match(t)
                || RE_REL_PATH.is_match(t)
                || RE_WIN_PATH.is_match(t)
                || RE_FILE_PATH.is_match(t)
        })
    }

    fn name(&self) -> &str { "path_like" }
}

/// Hyphenated, simple, braced or urn UUIDs.
pub struct UuidRule;

impl IdRule for UuidRule {
    fn matches(&self, input: &str) -> bool {
        tokens(input).any(|t| t.len() >= 32 && uuid::Uuid::parse_str(t).is_ok())
    }

    fn name(&self) -> &str { "uuid" }
}

// ============================================================================
// DecisionEngine
// ============================================================================

pub struct DecisionEngine {
    rules: Vec<Box<dyn IdRule>>,
}

impl Default for DecisionEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl DecisionEngine {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Engine with the key/value, path and UUID rules.
    pub fn with_defaults() -> Self {
        let mut engine = Self::new();
        engine.add_rule(Box::new(KeyValueIdRule));
        engine.add_rule(Box::new(PathLikeRule));
        engine.add_rule(Box::new(UuidRule));
        engine
    }

    pub fn add_rule(&mut self, rule: Box<dyn IdRule>) {
        self.rules.push(rule);
    }

    pub fn input_contains_explicit_id(&self, input: &str) -> bool {
        for rule in &self.rules {
            if rule.matches(input) {
                tracing::debug!("DecisionEngine: rule '{}' matched", rule.name());
                return true;
            }
        }
        false
    }

    /// False when focus or the input itself already identifies the target.
    pub fn should_ask_user(&self, state: &KernelState, input: &str) -> bool {
        if state.focus.is_some() {
            return false;
        }
        !self.input_contains_explicit_id(input)
    }
}

/// [`DecisionEngine::input_contains_explicit_id`] with the default rules.
pub fn input_contains_explicit_id(input: &str) -> bool {
    DEFAULT_ENGINE.input_contains_explicit_id(input)
}

/// [`DecisionEngine::should_ask_user`] with the default rules.
pub fn should_ask_user(state: &KernelState, input: &str) -> bool {
    DEFAULT_ENGINE.should_ask_user(state, input)
}

// ============================================================================
// Tests
// ============================================================================
