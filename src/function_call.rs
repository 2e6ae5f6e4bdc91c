use indexmap::IndexMap;
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::error::EvalError;

/// One entry of a function's return list, e.g. `{"price": "50G"}`.
pub type ReturnValue = IndexMap<String, serde_json::Value>;

/// A call proposed by an agent. It carries no return values until the
/// executor annotates it.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct GeneratedCall {
    pub name: String,
    pub parameters: IndexMap<String, String>,
}

/// A function call with its return values: either a gold call from the
/// dataset or a generated call after it went through the executor.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct FunctionCall {
    pub name: String,
    pub parameters: IndexMap<String, String>,
    #[serde(rename = "return", alias = "return_values", default)]
    pub return_values: Vec<ReturnValue>,
}

impl GeneratedCall {
    pub fn new(name: impl Into<String>) -> Self {
        GeneratedCall {
            name: name.into(),
            parameters: IndexMap::new(),
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    /// Builds the executor output for this call. The generated call itself
    /// is left untouched.
    pub fn annotate(&self, return_values: Vec<ReturnValue>) -> FunctionCall {
        FunctionCall {
            name: self.name.clone(),
            parameters: self.parameters.clone(),
            return_values,
        }
    }
}

/// Parses a JSON array of calls, reporting the index of the first entry that
/// does not fit the expected shape.
pub fn parse_call_list<T: DeserializeOwned>(value: &serde_json::Value) -> Result<Vec<T>, EvalError> {
    let serde_json::Value::Array(entries) = value else {
        return Err(EvalError::MalformedCall {
            index: 0,
            reason: format!("expected a JSON array of function calls, got {}", value),
        });
    };
    entries
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            serde_json::from_value(entry.clone()).map_err(|e| EvalError::MalformedCall {
                index,
                reason: format!("{} in {}", e, entry),
            })
        })
        .collect()
}

pub fn parse_call_list_str<T: DeserializeOwned>(json: &str) -> Result<Vec<T>, EvalError> {
    let value: serde_json::Value = serde_json::from_str(json)?;
    parse_call_list(&value)
}
