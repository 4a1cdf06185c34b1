//! Edit-distance fallback for typo'd verbs.
//!
//! Tolerance is a single edit: distance 0 or 1 is accepted, 2 or more is
//! rejected. Tokens shorter than four characters must match exactly.

use crate::intent::{normalize_for_matching, Intent};

/// Levenshtein distance over Unicode scalar values.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = if ca == cb { 0 } else { 1 };
            curr[j + 1] = (curr[j] + 1).min(prev[j + 1] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

const MAX_DISTANCE: usize = 1;
const MIN_FUZZY_LEN: usize = 4;

/// Canonical verbs per intent, in evaluation order.
const VERBS: &[(Intent, &[&str])] = &[
    (Intent::Recall, &["remember", "recall", "remind", "recuerda", "lembra"]),
    (Intent::History, &["review", "revisit", "history"]),
    (Intent::Opinion, &["opine", "opinion", "evaluate", "judge"]),
    (Intent::Work, &["fix", "build", "deploy", "debug", "implement", "refactor"]),
    (Intent::Plan, &["schedule", "organize", "prepare", "planear"]),
];

/// Words that never carry the verb of a request.
const STOP_WORDS: &[&str] = &[
    "i", "you", "we", "me", "my", "the", "a", "an", "to", "and", "please", "can", "could",
    "would", "will", "do", "does", "let", "lets", "let's", "us", "just", "now", "pls", "hey",
    "por", "favor", "puedes", "podrias", "te", "el", "la", "voce", "pode",
];

/// First alphabetic, non-stop-word token of at least three characters.
pub fn extract_verb_token(text: &str) -> Option<String> {
    normalize_for_matching(text)
        .split(' ')
        .filter(|t| !STOP_WORDS.contains(t))
        .find(|t| t.chars().count() >= 3 && t.chars().all(char::is_alphabetic))
        .map(str::to_string)
}

pub fn classify_intent_fuzzy(text: &str) -> Option<Intent> {
    let token = extract_verb_token(text)?;
    let mut best: Option<(usize, Intent)> = None;
    for (intent, verbs) in VERBS {
        for verb in *verbs {
            let d = levenshtein(&token, verb);
            if best.map_or(true, |(bd, _)| d < bd) {
                best = Some((d, *intent));
            }
        }
    }

    let (distance, intent) = best?;
    let accepted = distance == 0
        || (distance <= MAX_DISTANCE && token.chars().count() >= MIN_FUZZY_LEN);
    tracing::trace!(
        "FuzzyMatcher: token='{}' best={} distance={} accepted={}",
        token,
        intent,
        distance,
        accepted
    );
    accepted.then_some(intent)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levenshtein_reference_pairs() {
        assert_eq!(levenshtein("test", "test"), 0);
        assert_eq!(levenshtein("test", "tast"), 1);
        assert_eq!(levenshtein("test", "testt"), 1);
        assert_eq!(levenshtein("test", "tes"), 1);
        assert_eq!(levenshtein("test", "tset"), 2);
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("kitten", "sitting"), 3);
    }

    #[test]
    fn test_levenshtein_unicode() {
        assert_eq!(levenshtein("mañana", "manana"), 1);
        assert_eq!(levenshtein("über", "uber"), 1);
    }

    #[test]
    fn test_single_typo_recovered() {
        assert_eq!(classify_intent_fuzzy("remembr the trip"), Some(Intent::Recall));
        assert_eq!(classify_intent_fuzzy("please deplyo it"), None);
        assert_eq!(classify_intent_fuzzy("can you debgu this"), None);
        assert_eq!(classify_intent_fuzzy("can you debug this"), Some(Intent::Work));
        assert_eq!(classify_intent_fuzzy("pls shedule it"), Some(Intent::Plan));
    }

    #[test]
    fn test_rejects_distant_and_missing_verbs() {
        assert_eq!(classify_intent_fuzzy("hello there"), None);
        assert_eq!(classify_intent_fuzzy("thank you"), None);
        assert_eq!(classify_intent_fuzzy("42 !!"), None);
        assert_eq!(classify_intent_fuzzy(""), None);
    }

    #[test]
    fn test_extract_verb_token_skips_stop_words() {
        assert_eq!(extract_verb_token("Could you please Review it"), Some("review".to_string()));
        assert_eq!(extract_verb_token("I, me, you"), None);
    }

    #[test]
    fn test_short_tokens_need_exact_match() {
        assert_eq!(classify_intent_fuzzy("fix the sink"), Some(Intent::Work));
        // one edit from "fix" but too short to trust
        assert_eq!(classify_intent_fuzzy("mix the paint"), None);
        assert_eq!(classify_intent_fuzzy("six of them"), None);
        assert_eq!(classify_intent_fuzzy("fixx the sink"), Some(Intent::Work));
    }
}
