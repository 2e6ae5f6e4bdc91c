use crate::error::EvalError;

/// A sentence-embedding model, seen only through the similarity it assigns
/// to two texts. Implementations are built once per run and handed to the
/// scorer.
pub trait SentenceEmbedder: Send + Sync {
    /// Cosine similarity in `[-1, 1]`.
    fn similarity(&self, a: &str, b: &str) -> Result<f64, EvalError>;
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    let dot: f64 = a
        .iter()
        .zip(b.iter())
        .map(|(x, y)| *x as f64 * *y as f64)
        .sum();
    let norm_a = a.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
    let norm_b = b.iter().map(|y| (*y as f64).powi(2)).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

/// Adapts any text -> vector encoder into a [`SentenceEmbedder`].
pub struct VectorEmbedder<F> {
    encode: F,
}

impl<F> VectorEmbedder<F>
where
    F: Fn(&str) -> Result<Vec<f32>, EvalError> + Send + Sync,
{
    pub fn new(encode: F) -> Self {
        VectorEmbedder { encode }
    }
}

impl<F> SentenceEmbedder for VectorEmbedder<F>
where
    F: Fn(&str) -> Result<Vec<f32>, EvalError> + Send + Sync,
{
    fn similarity(&self, a: &str, b: &str) -> Result<f64, EvalError> {
        let a = (self.encode)(a)?;
        let b = (self.encode)(b)?;
        if a.len() != b.len() {
            return Err(EvalError::Embedding(format!(
                "embedding dimensions differ: {} vs {}",
                a.len(),
                b.len()
            )));
        }
        Ok(cosine_similarity(&a, &b))
    }
}
