//! Deterministic lexical backend: hashed bag-of-words embeddings, regex
//! intent rules, pattern entity extraction and a keyword emotion table.
//!
//! Lets the engine run end to end without a neural inference service.

use std::sync::LazyLock;

use regex::Regex;

use crate::backend::{EmotionReading, EntitySpan, InferenceBackend, IntentPrediction};
use crate::error::BackendError;
use crate::tokenizer::tokenize;

pub const DEFAULT_DIMENSION: usize = 64;

const RULE_CONFIDENCE: f64 = 0.9;
const FALLBACK_CONFIDENCE: f64 = 0.5;

struct IntentRule {
    label: &'static str,
    pattern: LazyLock<Regex>,
}

macro_rules! intent_rule {
    ($label:expr, $re:expr) => {
        IntentRule {
            label: $label,
            pattern: LazyLock::new(|| Regex::new($re).unwrap()),
        }
    };
}

/// First match wins.
static INTENT_RULES: [IntentRule; 12] = [
    intent_rule!("IDENTITY_INTRODUCTION", r"(?i)\b(my name is|i am called|call me)\b"),
    intent_rule!(
        "IDENTITY_QUERY",
        r"(?i)\bwhat(?:\s+is|'s)\s+(?:my|your)\s+name\b|\bwho am i\b|\bwho are you\b"
    ),
    intent_rule!(
        "ENTITY_QUERY",
        r"(?i)\bwhat(?:\s+is|'s)\s+(?:my|her|his|its|their)\s+\w+|\bwhat\s+\w+\s+is\s+my\b|\bwho\s+is\s+\w+"
    ),
    intent_rule!(
        "ENTITY_INTRODUCTION",
        r"(?i)\bmy\s+\w+(?:'s)?\s+(?:\w+\s+)?is\b|\b(?:her|his|its|their)\s+name\s+is\b"
    ),
    intent_rule!(
        "GREETING",
        r"(?i)^\s*(hi|hello|hey|greetings|good (morning|afternoon|evening))\b"
    ),
    intent_rule!("FAREWELL", r"(?i)\b(bye|goodbye|see you|farewell|good night)\b"),
    intent_rule!("GRATITUDE", r"(?i)\b(thanks|thank you|appreciate it)\b"),
    intent_rule!("HELP_REQUEST", r"(?i)\b(help|assist|support)\b"),
    intent_rule!(
        "NEGATIVE_FEEDBACK",
        r"(?i)\b(wrong|not helpful|useless|terrible|that's bad)\b"
    ),
    intent_rule!(
        "POSITIVE_FEEDBACK",
        r"(?i)\b(great|awesome|perfect|well done|love it|nice)\b"
    ),
    intent_rule!(
        "INFORMATION_REQUEST",
        r"(?i)\b(tell me about|explain|describe|information (on|about))\b"
    ),
    intent_rule!(
        "QUESTION",
        r"(?i)\?\s*$|^\s*(what|why|how|when|where|who|which|can|could|would|is|are|do|does)\b"
    ),
];

struct EntityPattern {
    pattern: LazyLock<Regex>,
    /// Entity type per capture group.
    groups: &'static [&'static str],
}

macro_rules! entity_pattern {
    ($re:expr, $groups:expr) => {
        EntityPattern {
            pattern: LazyLock::new(|| Regex::new($re).unwrap()),
            groups: $groups,
        }
    };
}

/// First match wins. Group types index capture groups 1..
static ENTITY_PATTERNS: [EntityPattern; 6] = [
    entity_pattern!(r"(?i)\bmy\s+(name)\s+is\s+(\w+)", &["attribute", "person"]),
    entity_pattern!(
        r"(?i)\bmy\s+(\w+)'s\s+name\s+is\s+(\w+)",
        &["relation", "name"]
    ),
    entity_pattern!(
        r"(?i)\b(her|his|its|their)\s+(name)\s+is\s+(\w+)",
        &["pronoun", "attribute", "name"]
    ),
    entity_pattern!(
        r"(?i)\bmy\s+favou?rite\s+(\w+)\s+is\s+([\w ]*\w)",
        &["category", "value"]
    ),
    entity_pattern!(
        r"(?i)\bwhat(?:\s+is|'s)\s+my\s+(\w+)'s\s+(name)\b",
        &["relation", "attribute"]
    ),
    entity_pattern!(
        r"(?i)\bmy\s+(\w+)\s+is\s+(?:(?:a|an|the)\s+)?(\w+)",
        &["thing", "value"]
    ),
];

static PROPER_NOUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b[A-Z][a-z]+\b").unwrap());

const EMOTIONS: &[(&str, f64, f64, &[&str])] = &[
    (
        "joy",
        0.8,
        0.7,
        &["happy", "glad", "great", "love", "excited", "awesome", "wonderful", "fantastic"],
    ),
    (
        "sadness",
        -0.7,
        0.3,
        &["sad", "unhappy", "lonely", "depressed", "miss", "lost", "grief", "crying"],
    ),
    (
        "anger",
        -0.8,
        0.9,
        &["angry", "mad", "furious", "annoyed", "hate", "frustrated"],
    ),
    (
        "fear",
        -0.6,
        0.8,
        &["scared", "afraid", "worried", "anxious", "nervous", "terrified"],
    ),
];

/// 64-bit FNV-1a.
fn fnv1a(s: &str) -> u64 {
    s.bytes().fold(0xcbf2_9ce4_8422_2325, |h, b| {
        (h ^ u64::from(b)).wrapping_mul(0x0100_0000_01b3)
    })
}

#[derive(Clone, Debug)]
pub struct LexicalBackend {
    dimension: usize,
}

impl Default for LexicalBackend {
    fn default() -> Self {
        Self::new(DEFAULT_DIMENSION)
    }
}

impl LexicalBackend {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Each token lands on two hashed dimensions with a hashed sign;
    /// the result is L2-normalized.
    pub fn embed(&self, text: &str) -> Vec<f64> {
        let dim = self.dimension as u64;
        let mut v = vec![0.0; self.dimension];
        for token in tokenize(text) {
            let h = fnv1a(&token);
            let sign = if h & 1 == 0 { 1.0 } else { -1.0 };
            v[(h % dim) as usize] += sign;
            v[((h >> 32) % dim) as usize] += sign * 0.5;
        }
        let norm = v.iter().map(|x| x * x).sum::<f64>().sqrt();
        if norm > 0.0 {
            v.iter_mut().for_each(|x| *x /= norm);
        }
        v
    }

    pub fn classify(&self, text: &str) -> IntentPrediction {
        INTENT_RULES
            .iter()
            .find(|rule| rule.pattern.is_match(text))
            .map(|rule| IntentPrediction {
                label: rule.label.to_string(),
                confidence: RULE_CONFIDENCE,
            })
            .unwrap_or_else(|| IntentPrediction {
                label: "GENERAL_CONVERSATION".to_string(),
                confidence: FALLBACK_CONFIDENCE,
            })
    }

    pub fn entities(&self, text: &str) -> Vec<EntitySpan> {
        for ep in &ENTITY_PATTERNS {
            let Some(caps) = ep.pattern.captures(text) else {
                continue;
            };
            return ep
                .groups
                .iter()
                .enumerate()
                .filter_map(|(i, ty)| {
                    let m = caps.get(i + 1)?;
                    Some(EntitySpan {
                        text: m.as_str().to_string(),
                        entity_type: ty.to_string(),
                        confidence: RULE_CONFIDENCE,
                        span: (m.start(), m.end()),
                    })
                })
                .collect();
        }

        // Capitalized words past the first are taken as proper nouns
        let first_word_end = text.find(char::is_whitespace).unwrap_or(text.len());
        PROPER_NOUN
            .find_iter(text)
            .filter(|m| m.start() >= first_word_end)
            .map(|m| EntitySpan {
                text: m.as_str().to_string(),
                entity_type: "proper_noun".to_string(),
                confidence: FALLBACK_CONFIDENCE,
                span: (m.start(), m.end()),
            })
            .collect()
    }

    pub fn emotion(&self, text: &str) -> EmotionReading {
        let tokens = tokenize(text);
        EMOTIONS
            .iter()
            .map(|(label, valence, arousal, words)| {
                let hits = tokens.iter().filter(|t| words.contains(&t.as_str())).count();
                (hits, *label, *valence, *arousal)
            })
            .filter(|(hits, ..)| *hits > 0)
            // Earlier table rows win ties
            .fold(None, |best: Option<(usize, &str, f64, f64)>, cur| match best {
                Some(b) if b.0 >= cur.0 => Some(b),
                _ => Some(cur),
            })
            .map(|(hits, label, valence, arousal)| EmotionReading {
                label: label.to_string(),
                valence,
                arousal,
                confidence: (0.6 + 0.1 * hits as f64).min(0.95),
            })
            .unwrap_or_else(EmotionReading::neutral)
    }
}

impl InferenceBackend for LexicalBackend {
    async fn encode(&self, text: &str) -> Result<Vec<f64>, BackendError> {
        Ok(self.embed(text))
    }

    async fn classify_intent(&self, text: &str) -> Result<IntentPrediction, BackendError> {
        Ok(self.classify(text))
    }

    async fn extract_entities(&self, text: &str) -> Result<Vec<EntitySpan>, BackendError> {
        Ok(self.entities(text))
    }

    async fn analyze_emotion(&self, text: &str) -> Result<EmotionReading, BackendError> {
        Ok(self.emotion(text))
    }
}
