//! Prime signatures: sparse prime→weight factorizations of embedding vectors.
//!
//! Each embedding dimension owns one prime (dimension i ↦ i-th prime). A
//! component contributes its prime with weight ⌊|v|·1000⌋+1 once it clears
//! the encoding threshold. Magnitude, coherence and blend are defined over
//! these sparse maps; absent primes contribute zero.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::constants::{ENCODE_THRESHOLD, WEIGHT_SCALE};

/// Sparse mapping prime → positive weight. Keys iterate in ascending order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrimeSignature(BTreeMap<u64, u64>);

impl PrimeSignature {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from (prime, weight) pairs, summing repeated primes and
    /// skipping zero weights.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (u64, u64)>) -> Self {
        let mut sig = Self::new();
        for (prime, weight) in pairs {
            sig.accumulate(prime, weight);
        }
        sig
    }

    fn accumulate(&mut self, prime: u64, weight: u64) {
        if weight > 0 {
            let entry = self.0.entry(prime).or_default();
            *entry = entry.saturating_add(weight);
        }
    }

    pub fn get(&self, prime: u64) -> Option<u64> {
        self.0.get(&prime).copied()
    }

    pub fn contains(&self, prime: u64) -> bool {
        self.0.contains_key(&prime)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u64, u64)> + '_ {
        self.0.iter().map(|(&p, &w)| (p, w))
    }

    pub fn primes(&self) -> impl Iterator<Item = u64> + '_ {
        self.0.keys().copied()
    }

    /// Euclidean norm of the weight vector. 0 for an empty signature.
    pub fn magnitude(&self) -> f64 {
        self.0
            .values()
            .map(|&w| (w as f64) * (w as f64))
            .sum::<f64>()
            .sqrt()
    }

    /// Normalized shared-factor similarity in [0, 1].
    ///
    /// Each shared prime contributes the geometric mean √(wA·wB); the
    /// magnitude of those contributions is divided by √(|A|·|B|).
    pub fn coherence(&self, other: &Self) -> f64 {
        if self.is_empty() || other.is_empty() {
            return 0.0;
        }
        let shared_sq: f64 = self
            .0
            .iter()
            .filter_map(|(p, &wa)| other.0.get(p).map(|&wb| wa as f64 * wb as f64))
            .sum();
        let denom = (self.magnitude() * other.magnitude()).sqrt();
        if denom <= 0.0 {
            return 0.0;
        }
        (shared_sq.sqrt() / denom).clamp(0.0, 1.0)
    }

    /// Per-prime ⌊wA·ratio⌋ + ⌊wB·(1−ratio)⌋ over the union of keys.
    /// Primes whose blended weight floors to zero are dropped.
    pub fn blend(&self, other: &Self, ratio: f64) -> Self {
        let ratio = ratio.clamp(0.0, 1.0);
        let mut out = Self::new();
        for prime in self.primes().chain(other.primes()) {
            if out.contains(prime) {
                continue;
            }
            let wa = self.get(prime).unwrap_or(0) as f64;
            let wb = other.get(prime).unwrap_or(0) as f64;
            let blended =
                ((wa * ratio).floor() as u64).saturating_add((wb * (1.0 - ratio)).floor() as u64);
            out.accumulate(prime, blended);
        }
        out
    }

    /// Every weight scaled by `factor` and floored, never below 1.
    pub fn amplified(&self, factor: f64) -> Self {
        Self(
            self.0
                .iter()
                .map(|(&p, &w)| (p, ((w as f64 * factor).floor() as u64).max(1)))
                .collect(),
        )
    }

    /// Additive union of two signatures.
    pub fn merged(&self, other: &Self) -> Self {
        let mut out = self.clone();
        for (p, w) in other.iter() {
            out.accumulate(p, w);
        }
        out
    }

    /// The `n` heaviest (prime, weight) pairs; ties favour the smaller prime.
    pub fn top_primes(&self, n: usize) -> Vec<(u64, u64)> {
        let mut pairs: Vec<(u64, u64)> = self.iter().collect();
        pairs.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        pairs.truncate(n);
        pairs
    }
}

/// Memoized list of the first primes, grown by trial division on demand.
#[derive(Clone, Debug, Default)]
pub struct PrimeCache {
    primes: Vec<u64>,
}

impl PrimeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The first `n` primes.
    pub fn first(&mut self, n: usize) -> &[u64] {
        let mut candidate = self.primes.last().map_or(2, |&p| p + 1);
        while self.primes.len() < n {
            if self.is_prime(candidate) {
                self.primes.push(candidate);
            }
            candidate += 1;
        }
        &self.primes[..n]
    }

    /// Trial division by the primes already cached; valid for candidates
    /// larger than every cached prime.
    fn is_prime(&self, candidate: u64) -> bool {
        self.primes
            .iter()
            .take_while(|&&p| p * p <= candidate)
            .all(|&p| candidate % p != 0)
    }

    pub fn len(&self) -> usize {
        self.primes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.primes.is_empty()
    }
}

/// Embedding → PrimeSignature encoder owning its prime cache.
#[derive(Clone, Debug)]
pub struct SignatureEncoder {
    cache: PrimeCache,
    threshold: f64,
}

impl Default for SignatureEncoder {
    fn default() -> Self {
        Self::new(ENCODE_THRESHOLD)
    }
}

impl SignatureEncoder {
    pub fn new(threshold: f64) -> Self {
        Self {
            cache: PrimeCache::new(),
            threshold,
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Encode an embedding. Deterministic for identical input.
    pub fn encode(&mut self, embedding: &[f64]) -> PrimeSignature {
        let threshold = self.threshold;
        let primes = self.cache.first(embedding.len());
        let prime_count = primes.len();
        if prime_count == 0 {
            return PrimeSignature::new();
        }

        PrimeSignature::from_pairs(
            embedding
                .iter()
                .enumerate()
                .filter(|(_, v)| v.is_finite() && v.abs() > threshold)
                .map(|(i, v)| {
                    // `as` saturates at u64::MAX for huge components
                    let weight = ((v.abs() * WEIGHT_SCALE).floor() as u64).saturating_add(1);
                    (primes[i % prime_count], weight)
                }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn sig(pairs: &[(u64, u64)]) -> PrimeSignature {
        PrimeSignature::from_pairs(pairs.iter().copied())
    }

    #[test]
    fn test_prime_cache_first_primes() {
        let mut cache = PrimeCache::new();
        assert_eq!(cache.first(10), &[2, 3, 5, 7, 11, 13, 17, 19, 23, 29]);
        // Shrinking request reuses the memoized list
        assert_eq!(cache.first(3), &[2, 3, 5]);
        assert_eq!(cache.len(), 10);
        assert_eq!(cache.first(12)[11], 37);
    }

    #[test]
    fn test_encode_weights_and_threshold() {
        let mut enc = SignatureEncoder::default();
        let s = enc.encode(&[0.5, 0.01, -0.25, 0.0]);
        assert_eq!(s.get(2), Some(501));
        assert_eq!(s.get(3), None);
        assert_eq!(s.get(5), Some(251));
        assert_eq!(s.len(), 2);
    }

    #[test]
    fn test_encode_empty_and_zero() {
        let mut enc = SignatureEncoder::default();
        assert!(enc.encode(&[]).is_empty());
        assert!(enc.encode(&[0.0; 16]).is_empty());
    }

    #[test]
    fn test_encode_skips_non_finite() {
        let mut enc = SignatureEncoder::default();
        let s = enc.encode(&[f64::NAN, f64::INFINITY, 0.75]);
        assert_eq!(s.len(), 1);
        assert_eq!(s.get(5), Some(751));
    }

    #[test]
    fn test_encode_saturates_huge_components() {
        let mut enc = SignatureEncoder::default();
        let s = enc.encode(&[1e19, 0.5, -f64::MAX]);
        assert_eq!(s.get(2), Some(u64::MAX));
        assert_eq!(s.get(3), Some(501));
        assert_eq!(s.get(5), Some(u64::MAX));

        let merged = s.merged(&s);
        assert_eq!(merged.get(2), Some(u64::MAX));
        assert_eq!(merged.get(3), Some(1002));
        assert_eq!(s.blend(&s, 0.5).len(), 3);
        assert!(s.magnitude().is_finite());
        assert!((0.0..=1.0).contains(&s.coherence(&merged)));
    }

    #[test]
    fn test_magnitude() {
        assert_eq!(PrimeSignature::new().magnitude(), 0.0);
        assert_relative_eq!(sig(&[(2, 3), (3, 4)]).magnitude(), 5.0);
    }

    #[test]
    fn test_coherence_identity_and_empty() {
        let a = sig(&[(2, 10), (5, 3), (11, 7)]);
        assert_relative_eq!(a.coherence(&a), 1.0, epsilon = 1e-12);
        assert_eq!(PrimeSignature::new().coherence(&a), 0.0);
        assert_eq!(a.coherence(&PrimeSignature::new()), 0.0);
    }

    #[test]
    fn test_coherence_disjoint_is_zero() {
        let a = sig(&[(2, 10)]);
        let b = sig(&[(3, 10)]);
        assert_eq!(a.coherence(&b), 0.0);
    }

    #[test]
    fn test_blend() {
        let a = sig(&[(2, 10), (3, 4)]);
        let b = sig(&[(3, 20), (5, 1)]);
        let c = a.blend(&b, 0.5);
        assert_eq!(c.get(2), Some(5));
        assert_eq!(c.get(3), Some(12));
        // floor(1 * 0.5) = 0 drops the prime
        assert_eq!(c.get(5), None);
    }

    #[test]
    fn test_amplified_and_merged() {
        let a = sig(&[(2, 10), (3, 1)]);
        let amp = a.amplified(1.3);
        assert_eq!(amp.get(2), Some(13));
        assert_eq!(amp.get(3), Some(1));
        let m = a.merged(&sig(&[(3, 2), (7, 4)]));
        assert_eq!(m.get(3), Some(3));
        assert_eq!(m.get(7), Some(4));
    }

    #[test]
    fn test_top_primes_tie_break() {
        let a = sig(&[(7, 5), (3, 5), (2, 9), (11, 1)]);
        assert_eq!(a.top_primes(3), vec![(2, 9), (3, 5), (7, 5)]);
    }

    proptest! {
        #[test]
        fn prop_encode_is_deterministic(v in prop::collection::vec(-1.0f64..1.0, 0..64)) {
            let mut enc = SignatureEncoder::default();
            let first = enc.encode(&v);
            let second = enc.encode(&v);
            prop_assert_eq!(first, second);
        }

        #[test]
        fn prop_coherence_symmetric_and_bounded(
            a in prop::collection::vec(-1.0f64..1.0, 1..48),
            b in prop::collection::vec(-1.0f64..1.0, 1..48),
        ) {
            let mut enc = SignatureEncoder::default();
            let (sa, sb) = (enc.encode(&a), enc.encode(&b));
            let ab = sa.coherence(&sb);
            let ba = sb.coherence(&sa);
            prop_assert!((ab - ba).abs() < 1e-12);
            prop_assert!((0.0..=1.0).contains(&ab));
        }

        #[test]
        fn prop_keys_are_first_n_primes(v in prop::collection::vec(-1.0f64..1.0, 1..40)) {
            let mut enc = SignatureEncoder::default();
            let s = enc.encode(&v);
            let primes = PrimeCache::new().first(v.len()).to_vec();
            for p in s.primes() {
                prop_assert!(primes.contains(&p));
            }
            for (_, w) in s.iter() {
                prop_assert!(w >= 1);
            }
        }
    }
}
