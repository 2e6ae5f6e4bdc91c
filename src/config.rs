use std::{fmt, str::FromStr};

use ordered_float::NotNan;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{error::EvalError, function_call::ReturnValue};

pub const THRESHOLD_ENV: &str = "NPC_EVAL_MATCH_THRESHOLD";
pub const UNMATCHED_RETURN_ENV: &str = "NPC_EVAL_UNMATCHED_RETURN";

/// Score a `search_*` call's fuzzy fields must strictly exceed to count as a
/// match. Changing it changes which search calls are scored as correct, so
/// record it alongside any reported numbers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MatchThreshold(NotNan<f64>);

impl MatchThreshold {
    pub const DEFAULT: f64 = 0.4;

    pub fn new(value: f64) -> Result<Self, EvalError> {
        let value = NotNan::new(value)
            .map_err(|_| EvalError::Config("match threshold must not be NaN".to_string()))?;
        if !(0.0..=1.0).contains(&value.into_inner()) {
            return Err(EvalError::Config(format!(
                "match threshold must be within [0, 1], got {}",
                value
            )));
        }
        Ok(MatchThreshold(value))
    }

    pub fn value(&self) -> f64 {
        self.0.into_inner()
    }

    pub fn is_exceeded_by(&self, score: f64) -> bool {
        score > self.value()
    }
}

impl Default for MatchThreshold {
    fn default() -> Self {
        MatchThreshold(NotNan::new(Self::DEFAULT).expect("default threshold is a number"))
    }
}

impl FromStr for MatchThreshold {
    type Err = EvalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: f64 = s
            .trim()
            .parse()
            .map_err(|e| EvalError::Config(format!("invalid match threshold '{}': {}", s, e)))?;
        MatchThreshold::new(value)
    }
}

impl fmt::Display for MatchThreshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What an unmatched call gets as its return value. Keep one choice for a
/// whole evaluation run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnmatchedReturn {
    /// `[{"information": "n/a"}]`
    #[default]
    Placeholder,
    /// `[]`
    Empty,
}

impl UnmatchedReturn {
    pub fn payload(&self) -> Vec<ReturnValue> {
        match self {
            UnmatchedReturn::Placeholder => {
                let mut entry = ReturnValue::new();
                entry.insert("information".to_string(), json!("n/a"));
                vec![entry]
            }
            UnmatchedReturn::Empty => Vec::new(),
        }
    }
}

impl FromStr for UnmatchedReturn {
    type Err = EvalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "placeholder" | "n/a" => Ok(UnmatchedReturn::Placeholder),
            "empty" => Ok(UnmatchedReturn::Empty),
            other => Err(EvalError::Config(format!(
                "unknown unmatched return policy '{}', expected 'placeholder' or 'empty'",
                other
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EvalConfig {
    pub match_threshold: MatchThreshold,
    pub unmatched_return: UnmatchedReturn,
}

impl EvalConfig {
    /// Reads `.env` (if present) and then the process environment.
    pub fn from_env() -> Result<Self, EvalError> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                return Err(EvalError::Config(format!("failed to read .env: {}", e)));
            }
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, EvalError> {
        let mut config = EvalConfig::default();
        if let Some(raw) = lookup(THRESHOLD_ENV) {
            config.match_threshold = raw.parse()?;
        }
        if let Some(raw) = lookup(UNMATCHED_RETURN_ENV) {
            config.unmatched_return = raw.parse()?;
        }
        Ok(config)
    }
}
