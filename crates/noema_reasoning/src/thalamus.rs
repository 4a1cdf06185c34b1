//! Thalamic filter: decides how much effort an input line deserves.
//!
//! Pure function of the trimmed input. Length is counted in characters.

use serde::{Deserialize, Serialize};

/// Below this many characters an input is dropped unless whitelisted.
const MIN_LENGTH: usize = 3;
const SHORT_LENGTH: usize = 20;
const MEDIUM_LENGTH: usize = 80;

const ACK_SALIENCE: f64 = 0.1;
const SHORT_SALIENCE: f64 = 0.3;
const MEDIUM_SALIENCE: f64 = 0.6;
const LONG_SALIENCE: f64 = 0.9;

/// Low-signal tokens that still carry conversational meaning.
const ACKNOWLEDGEMENTS: &[&str] = &[
    "ok", "k", "kk", "okay", "yes", "no", "yep", "nope", "sure", "thanks", "thx", "ty", "hmm",
    "hm", "si", "sí", "vale", "gracias", "claro", "sim", "não", "nao", "obrigado",
];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThalamicDecision {
    pub store: bool,
    pub salience: f64,
    pub skip_embedding: bool,
}

impl ThalamicDecision {
    pub const DISCARD: ThalamicDecision = ThalamicDecision {
        store: false,
        salience: 0.0,
        skip_embedding: true,
    };
}

fn is_acknowledgement(trimmed: &str) -> bool {
    let lowered = trimmed
        .trim_end_matches(|c: char| c == '!' || c == '.' || c == '?')
        .to_lowercase();
    ACKNOWLEDGEMENTS.contains(&lowered.as_str())
}

pub struct ThalamicFilter;

impl ThalamicFilter {
    pub fn classify(text: &str) -> ThalamicDecision {
        let trimmed = text.trim();
        if is_acknowledgement(trimmed) {
            return ThalamicDecision {
                store: true,
                salience: ACK_SALIENCE,
                skip_embedding: true,
            };
        }

        let len = trimmed.chars().count();
        let decision = if len < MIN_LENGTH {
            ThalamicDecision::DISCARD
        } else if len < SHORT_LENGTH {
            ThalamicDecision {
                store: true,
                salience: SHORT_SALIENCE,
                skip_embedding: true,
            }
        } else if len < MEDIUM_LENGTH {
            ThalamicDecision {
                store: true,
                salience: MEDIUM_SALIENCE,
                skip_embedding: false,
            }
        } else {
            ThalamicDecision {
                store: true,
                salience: LONG_SALIENCE,
                skip_embedding: false,
            }
        };
        tracing::trace!("ThalamicFilter: len={} -> {:?}", len, decision);
        decision
    }
}
