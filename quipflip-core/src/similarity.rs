//! A deterministic stand-in sentence encoder. Any implementation satisfying
//! [`crate::validator::SimilarityModel`]'s contract may substitute this one.
//!
//! Embeds a phrase as a bag-of-character-trigrams frequency vector and
//! scores pairs by cosine similarity. No external model, no I/O, same output
//! for the same input every time — the contract the validator requires.

use std::collections::HashMap;

use crate::validator::SimilarityModel;

#[derive(Default)]
pub struct TrigramCosineModel;

fn trigrams(phrase: &str) -> HashMap<[u8; 3], u32> {
    let bytes: Vec<u8> = std::iter::once(b' ')
        .chain(phrase.bytes())
        .chain(std::iter::once(b' '))
        .collect();
    let mut counts = HashMap::new();
    if bytes.len() >= 3 {
        for w in bytes.windows(3) {
            *counts.entry([w[0], w[1], w[2]]).or_insert(0) += 1;
        }
    }
    counts
}

fn cosine(a: &HashMap<[u8; 3], u32>, b: &HashMap<[u8; 3], u32>) -> f32 {
    let dot: u32 = a
        .iter()
        .map(|(k, v)| v * b.get(k).copied().unwrap_or(0))
        .sum();
    let norm_a: f32 = (a.values().map(|v| v * v).sum::<u32>() as f32).sqrt();
    let norm_b: f32 = (b.values().map(|v| v * v).sum::<u32>() as f32).sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot as f32 / (norm_a * norm_b)
}

impl SimilarityModel for TrigramCosineModel {
    fn similarity(&self, a: &str, b: &str) -> f32 {
        cosine(&trigrams(a), &trigrams(b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_phrases_score_one() {
        let m = TrigramCosineModel;
        assert!((m.similarity("FAMOUS", "FAMOUS") - 1.0).abs() < 1e-6);
    }

    #[test]
    fn deterministic_across_calls() {
        let m = TrigramCosineModel;
        let a = m.similarity("FAMOUS", "FAMOUSLY");
        let b = m.similarity("FAMOUS", "FAMOUSLY");
        assert_eq!(a, b);
    }

    #[test]
    fn unrelated_phrases_score_low() {
        let m = TrigramCosineModel;
        assert!(m.similarity("FAMOUS", "ZEBRA QUILT") < 0.3);
    }
}
