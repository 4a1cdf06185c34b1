//! Intent detection
//!
//! Ordered trigger phrases per intent, matched on whole words after
//! lowercasing and stripping diacritics, so "recuérdame" and "recuerdame"
//! behave the same. First matching intent wins; the default is `Now`.

use crate::fuzzy::classify_intent_fuzzy;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Intent {
    Recall,
    History,
    Opinion,
    Work,
    Plan,
    Now,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Recall => "RECALL",
            Intent::History => "HISTORY",
            Intent::Opinion => "OPINION",
            Intent::Work => "WORK",
            Intent::Plan => "PLAN",
            Intent::Now => "NOW",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Evaluation order matters: earlier entries win.
const TRIGGERS: &[(Intent, &[&str])] = &[
    (
        Intent::Recall,
        &[
            "remember",
            "do you recall",
            "remind me",
            "what did i tell you",
            "recuerdas",
            "te acuerdas",
            "recuerdame",
            "lembra",
            "voce lembra",
        ],
    ),
    (
        Intent::History,
        &[
            "last time",
            "earlier",
            "yesterday",
            "history",
            "previously",
            "la ultima vez",
            "ayer",
            "historial",
            "antes",
            "ontem",
        ],
    ),
    (
        Intent::Opinion,
        &[
            "what do you think",
            "your opinion",
            "do you like",
            "how do you feel about",
            "que piensas",
            "tu opinion",
            "que opinas",
            "o que voce acha",
        ],
    ),
    (
        Intent::Work,
        &[
            "work",
            "task",
            "project",
            "deadline",
            "bug",
            "deploy",
            "trabajo",
            "tarea",
            "proyecto",
            "trabalho",
            "projeto",
        ],
    ),
    (
        Intent::Plan,
        &[
            "plan",
            "next step",
            "schedule",
            "tomorrow",
            "planear",
            "manana",
            "amanha",
            "proximo paso",
        ],
    ),
];

/// Map common accented Latin letters to their base letter.
fn fold_char(c: char) -> char {
    match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' => 'a',
        'è' | 'é' | 'ê' | 'ë' => 'e',
        'ì' | 'í' | 'î' | 'ï' => 'i',
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' => 'o',
        'ù' | 'ú' | 'û' | 'ü' => 'u',
        'ñ' => 'n',
        'ç' => 'c',
        'ý' | 'ÿ' => 'y',
        _ => c,
    }
}

/// Lowercase, strip diacritics, and reduce to space-separated word tokens.
pub fn normalize_for_matching(text: &str) -> String {
    let folded: String = text
        .to_lowercase()
        .chars()
        .map(fold_char)
        .map(|c| if c.is_alphanumeric() || c == '\'' { c } else { ' ' })
        .collect();
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn contains_phrase(padded: &str, phrase: &str) -> bool {
    padded.contains(&format!(" {} ", phrase))
}

pub struct IntentDetector;

impl IntentDetector {
    pub fn detect_intent(text: &str) -> Intent {
        let padded = format!(" {} ", normalize_for_matching(text));
        for (intent, phrases) in TRIGGERS {
            if phrases.iter().any(|p| contains_phrase(&padded, p)) {
                tracing::trace!("IntentDetector: '{}' -> {}", text, intent);
                return *intent;
            }
        }
        Intent::Now
    }

    /// Phrase match first; when that yields `Now`, try to recover a typo'd verb.
    pub fn detect_intent_with_fuzzy(text: &str) -> Intent {
        match Self::detect_intent(text) {
            Intent::Now => classify_intent_fuzzy(text).unwrap_or(Intent::Now),
            intent => intent,
        }
    }

    /// How many memory items to fetch for an intent.
    pub fn get_retrieval_limit(intent: Intent) -> usize {
        match intent {
            Intent::Recall => 12,
            Intent::History => 8,
            Intent::Work => 6,
            Intent::Plan => 5,
            Intent::Opinion => 4,
            Intent::Now => 3,
        }
    }
}
