use async_trait::async_trait;

use crate::error::CapabilityError;

/// Given text, return a fixed-length numeric vector.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Width of every vector this embedder produces.
    fn dimension(&self) -> usize;

    async fn embed(&self, text: &str) -> Result<Vec<f32>, CapabilityError>;

    /// Embed several texts, preserving input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, CapabilityError> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }
}

/// Fail with [`CapabilityError::DimensionMismatch`] unless `vector` has
/// exactly `expected` components.
pub fn check_dimension(vector: &[f32], expected: usize) -> Result<(), CapabilityError> {
    if vector.len() != expected {
        return Err(CapabilityError::DimensionMismatch {
            expected,
            actual: vector.len(),
        });
    }
    Ok(())
}
