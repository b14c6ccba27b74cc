//! Deterministic feature-hashing embedder.
//!
//! Each lowercase alphanumeric token (and each adjacent token pair) is
//! hashed with SHA-256 into one of `dimension` buckets with a hash-derived
//! sign; the bucket vector is then L2-normalized. No network, no model:
//! useful for local runs and as a stand-in when no embedding API is
//! configured.

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::embedder::Embedder;
use crate::error::CapabilityError;

/// Weight of a token bigram relative to a single token.
const BIGRAM_WEIGHT: f32 = 0.5;

#[derive(Debug)]
pub struct HashingEmbedder {
    dimension: usize,
}

impl HashingEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    /// Synchronous embedding; [`Embedder::embed`] delegates here.
    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let tokens = tokenize(text);
        let mut vector = vec![0.0f32; self.dimension];

        for token in &tokens {
            self.accumulate(&mut vector, token.as_bytes(), 1.0);
        }
        for pair in tokens.windows(2) {
            let bigram = format!("{} {}", pair[0], pair[1]);
            self.accumulate(&mut vector, bigram.as_bytes(), BIGRAM_WEIGHT);
        }

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut vector {
                *x /= norm;
            }
        }
        vector
    }

    fn accumulate(&self, vector: &mut [f32], feature: &[u8], weight: f32) {
        let digest = Sha256::digest(feature);
        let mut bucket_bytes = [0u8; 8];
        bucket_bytes.copy_from_slice(&digest[..8]);
        let bucket = (u64::from_le_bytes(bucket_bytes) % self.dimension as u64) as usize;
        let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
        vector[bucket] += sign * weight;
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

#[async_trait]
impl Embedder for HashingEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, CapabilityError> {
        Ok(self.embed_text(text))
    }
}

#[cfg(test)]
mod tests {
    use takeone_core::similarity::cosine_similarity;

    use super::*;

    #[test]
    fn same_text_same_vector() {
        let e = HashingEmbedder::new(64);
        assert_eq!(e.embed_text("pouring espresso"), e.embed_text("pouring espresso"));
    }

    #[test]
    fn vectors_have_fixed_width_and_unit_norm() {
        let e = HashingEmbedder::new(32);
        let v = e.embed_text("A barista pours a shot of espresso.");
        assert_eq!(v.len(), 32);
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn empty_text_is_zero_vector() {
        let e = HashingEmbedder::new(16);
        assert!(e.embed_text("  ...  ").iter().all(|x| *x == 0.0));
    }

    #[test]
    fn tokenization_ignores_case_and_punctuation() {
        let e = HashingEmbedder::new(64);
        assert_eq!(e.embed_text("Espresso, please!"), e.embed_text("espresso please"));
    }

    #[test]
    fn shared_words_score_higher_than_disjoint_text() {
        let e = HashingEmbedder::new(4096);
        let query = e.embed_text("espresso");
        let close = e.embed_text("pouring espresso");
        let far = e.embed_text("tea ceremony");
        assert!(cosine_similarity(&query, &close) > cosine_similarity(&query, &far));
    }

    #[tokio::test]
    async fn trait_reports_dimension() {
        let e = HashingEmbedder::new(8);
        assert_eq!(Embedder::dimension(&e), 8);
        assert_eq!(e.embed("x").await.unwrap().len(), 8);
    }
}
