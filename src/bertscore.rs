use crate::error::EvalError;

/// A BERTScore model comparing a candidate response to its reference by
/// contextual token embeddings. Only the F1 component is used.
pub trait BertScorer: Send + Sync {
    fn f1(&self, reference: &str, candidate: &str) -> Result<f64, EvalError>;
}

/// Clamps a reported F1 into `[0, 1]`; anything that is not a number is an
/// error.
pub fn check_bertscore(f1: f64) -> Result<f64, EvalError> {
    if f1.is_nan() {
        return Err(EvalError::BertScore("scorer returned NaN".to_string()));
    }
    Ok(f1.clamp(0.0, 1.0))
}
