use indexmap::IndexMap;
use pyo3::prelude::*;

use crate::{
    bertscore::{BertScorer, check_bertscore},
    embedding::{SentenceEmbedder, VectorEmbedder},
    error::EvalError,
    judge::{ResponseJudge, check_judge_score, parse_judge_score},
    normalize, parse_calls, scorer,
    word_f1::word_f1_opt,
};

/// `None` on either side scores 0.
#[pyfunction]
#[pyo3(name = "word_f1", signature = (pred, gold))]
pub fn py_word_f1(pred: Option<&str>, gold: Option<&str>) -> f64 {
    word_f1_opt(pred, gold)
}

#[pyfunction]
#[pyo3(name = "normalize_value")]
pub fn py_normalize_value(value: &str, field: &str) -> String {
    normalize::normalize_value(value, field)
}

/// Returns the decoded calls as a JSON array of `{"name", "parameters"}`.
#[pyfunction]
#[pyo3(name = "decode_function_list")]
pub fn py_decode_function_list(function_calls: &str) -> PyResult<String> {
    let calls = parse_calls::decode_function_list(function_calls)?;
    Ok(serde_json::to_string(&calls).map_err(EvalError::from)?)
}

/// Both arguments are JSON objects mapping a conversation id to the function
/// names of that conversation.
#[pyfunction]
#[pyo3(name = "function_accuracy")]
pub fn py_function_accuracy(gold: &str, pred: &str) -> PyResult<String> {
    let gold: IndexMap<String, Vec<String>> = serde_json::from_str(gold).map_err(EvalError::from)?;
    let pred: IndexMap<String, Vec<String>> = serde_json::from_str(pred).map_err(EvalError::from)?;
    let accuracy = scorer::function_accuracy(&gold, &pred);
    Ok(serde_json::to_string(&accuracy).map_err(EvalError::from)?)
}

/// Embedding similarity computed by a Python callable `(a, b) -> float`,
/// e.g. a sentence-transformers model wrapped on the Python side.
pub struct PyEmbedder {
    callback: Py<PyAny>,
}

impl PyEmbedder {
    pub fn new(callback: Py<PyAny>) -> Self {
        PyEmbedder { callback }
    }
}

impl SentenceEmbedder for PyEmbedder {
    fn similarity(&self, a: &str, b: &str) -> Result<f64, EvalError> {
        Python::attach(|py| {
            let result = self
                .callback
                .call1(py, (a, b))
                .map_err(|e| EvalError::Embedding(e.to_string()))?;
            result
                .bind(py)
                .extract::<f64>()
                .map_err(|e| EvalError::Embedding(e.to_string()))
        })
    }
}

/// Wraps a Python encoder `text -> list[float]` (such as a bound
/// `model.encode`) so that the cosine similarity is computed here.
pub fn py_encoder_embedder(
    callback: Py<PyAny>,
) -> VectorEmbedder<impl Fn(&str) -> Result<Vec<f32>, EvalError> + Send + Sync> {
    VectorEmbedder::new(move |text: &str| {
        Python::attach(|py| {
            let result = callback
                .call1(py, (text,))
                .map_err(|e| EvalError::Embedding(e.to_string()))?;
            result
                .bind(py)
                .extract::<Vec<f32>>()
                .map_err(|e| EvalError::Embedding(e.to_string()))
        })
    })
}

/// LLM judge reached through a Python callable `(gold, generated) -> int | str`.
pub struct PyJudge {
    callback: Py<PyAny>,
}

impl PyJudge {
    pub fn new(callback: Py<PyAny>) -> Self {
        PyJudge { callback }
    }
}

impl ResponseJudge for PyJudge {
    fn judge(&self, gold: &str, generated: &str) -> Result<i64, EvalError> {
        Python::attach(|py| {
            let result = self
                .callback
                .call1(py, (gold, generated))
                .map_err(|e| EvalError::Judge(e.to_string()))?;
            let result = result.bind(py);
            if let Ok(score) = result.extract::<i64>() {
                return check_judge_score(score);
            }
            let reply = result
                .extract::<String>()
                .map_err(|e| EvalError::Judge(e.to_string()))?;
            parse_judge_score(&reply)
        })
    }
}

/// BERTScore F1 from a Python callable `(reference, candidate) -> float`,
/// typically wrapping `bert_score.BERTScorer.score`.
pub struct PyBertScorer {
    callback: Py<PyAny>,
}

impl PyBertScorer {
    pub fn new(callback: Py<PyAny>) -> Self {
        PyBertScorer { callback }
    }
}

impl BertScorer for PyBertScorer {
    fn f1(&self, reference: &str, candidate: &str) -> Result<f64, EvalError> {
        Python::attach(|py| {
            let result = self
                .callback
                .call1(py, (reference, candidate))
                .map_err(|e| EvalError::BertScore(e.to_string()))?;
            let f1 = result
                .bind(py)
                .extract::<f64>()
                .map_err(|e| EvalError::BertScore(e.to_string()))?;
            check_bertscore(f1)
        })
    }
}
