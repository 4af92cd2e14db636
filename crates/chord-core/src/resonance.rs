use serde::Serialize;

use crate::constants::HARMONIC_FACTOR;
use crate::signature::PrimeSignature;
use crate::tokenizer::context_words;

/// Ordered word → signature table.
#[derive(Clone, Debug, Default)]
pub struct Vocabulary {
    entries: Vec<(String, PrimeSignature)>,
}

impl Vocabulary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a word, keeping first-insertion position.
    pub fn insert(&mut self, word: &str, signature: PrimeSignature) {
        match self.entries.iter_mut().find(|(w, _)| w == word) {
            Some(entry) => entry.1 = signature,
            None => self.entries.push((word.to_string(), signature)),
        }
    }

    pub fn get(&self, word: &str) -> Option<&PrimeSignature> {
        self.entries.iter().find(|(w, _)| w == word).map(|(_, s)| s)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PrimeSignature)> {
        self.entries.iter().map(|(w, s)| (w.as_str(), s))
    }
}

/// One ranked word.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ResonanceResult {
    pub word: String,
    pub resonance: f64,
    pub shared_primes: Vec<u64>,
    /// Target primes reached through a harmonic neighbour of an input prime.
    pub harmonic_matches: Vec<u64>,
    pub coherence_score: f64,
}

/// Harmonic neighbours of `p`, integers > 1, de-duplicated.
fn harmonic_candidates(p: u64) -> Vec<u64> {
    let mut out: Vec<u64> = Vec::with_capacity(6);
    for c in [
        p.checked_mul(2),
        p.checked_mul(3),
        p.checked_add(2),
        p.checked_sub(2),
        Some(p / 2),
        Some(p / 3),
    ]
    .into_iter()
    .flatten()
    {
        if c > 1 && !out.contains(&c) {
            out.push(c);
        }
    }
    out
}

/// Score one target signature against the input.
pub fn score(input: &PrimeSignature, word: &str, target: &PrimeSignature) -> ResonanceResult {
    let mut shared_primes = Vec::new();
    let mut direct = 0.0;
    let mut harmonic = 0.0;
    let mut harmonic_matches = Vec::new();

    for (p, w1) in input.iter() {
        if let Some(w2) = target.get(p) {
            shared_primes.push(p);
            direct += (w1 as f64 * w2 as f64).sqrt();
        }
        for candidate in harmonic_candidates(p) {
            if let Some(w2) = target.get(candidate) {
                harmonic += (w1 as f64 * w2 as f64).sqrt();
                if !harmonic_matches.contains(&candidate) {
                    harmonic_matches.push(candidate);
                }
            }
        }
    }

    ResonanceResult {
        word: word.to_string(),
        resonance: direct + HARMONIC_FACTOR * harmonic,
        shared_primes,
        harmonic_matches,
        coherence_score: input.coherence(target),
    }
}

/// Stable descending sort by resonance.
fn sort_descending(results: &mut [ResonanceResult]) {
    results.sort_by(|a, b| b.resonance.total_cmp(&a.resonance));
}

/// Rank vocabulary words by resonance with `input`. Zero-resonance words
/// are dropped; equal scores keep vocabulary order.
pub fn rank(input: &PrimeSignature, vocabulary: &Vocabulary, count: usize) -> Vec<ResonanceResult> {
    let mut results: Vec<ResonanceResult> = vocabulary
        .iter()
        .map(|(word, target)| score(input, word, target))
        .filter(|r| r.resonance > 0.0)
        .collect();
    sort_descending(&mut results);
    results.truncate(count);
    results
}

/// Multiply resonance by `boost` for words that literally occur in any of
/// the context texts, then re-rank.
pub fn apply_contextual_weighting(
    mut results: Vec<ResonanceResult>,
    context_texts: &[String],
    boost: f64,
) -> Vec<ResonanceResult> {
    let words: std::collections::HashSet<String> = context_texts
        .iter()
        .flat_map(|t| context_words(t))
        .collect();

    for r in &mut results {
        if words.contains(&r.word.to_lowercase()) {
            r.resonance *= boost;
        }
    }
    sort_descending(&mut results);
    results
}
