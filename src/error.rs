use pyo3::{
    PyErr,
    exceptions::{PyIOError, PyValueError},
};

/// Errors surfaced at the boundaries of the harness (files, JSON, config,
/// external collaborators). Matching and scoring themselves never fail.
#[derive(Debug, thiserror::Error)]
pub enum EvalError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("malformed function call at index {index}: {reason}")]
    MalformedCall { index: usize, reason: String },

    #[error("malformed record '{id}': {reason}")]
    MalformedRecord { id: String, reason: String },

    #[error("failed to parse function calls: {0}")]
    Parse(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("embedding failed: {0}")]
    Embedding(String),

    #[error("judge failed: {0}")]
    Judge(String),

    #[error("BERTScore failed: {0}")]
    BertScore(String),
}

impl EvalError {
    pub fn io(path: impl AsRef<std::path::Path>, source: std::io::Error) -> Self {
        EvalError::Io {
            path: path.as_ref().display().to_string(),
            source,
        }
    }
}

impl From<EvalError> for PyErr {
    fn from(err: EvalError) -> Self {
        match err {
            EvalError::Io { .. } => PyIOError::new_err(err.to_string()),
            _ => PyValueError::new_err(err.to_string()),
        }
    }
}
