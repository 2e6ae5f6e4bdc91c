use std::path::Path;

use indexmap::IndexMap;
use log::{debug, warn};
use serde::{Deserialize, Deserializer, Serialize};

use crate::{error::EvalError, function_call::FunctionCall, utils::load_json};

const TURN_PREFIX: &str = "turn_";

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct GoldTurn {
    #[serde(default)]
    pub gold_functions: Vec<FunctionCall>,
    #[serde(default)]
    pub gold_response: String,
}

/// The parts of a dataset conversation the scorers need. Persona, knowledge
/// and dialogue text are left in the file.
#[derive(Clone, Debug, PartialEq)]
pub struct Conversation {
    pub data_id: String,
    pub function_list_id: Option<String>,
    pub turns: Vec<GoldTurn>,
}

fn id_to_string(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn deserialize_data_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    id_to_string(&value)
        .ok_or_else(|| serde::de::Error::custom(format!("data_id must be a string or number, got {}", value)))
}

impl Conversation {
    /// Builds a conversation from one dataset entry. Turns are ordered by the
    /// number in their `turn_<n>` key, not by their position in the file.
    pub fn from_value(value: &serde_json::Value, fallback_id: String) -> Result<Self, EvalError> {
        let serde_json::Value::Object(entry) = value else {
            return Err(EvalError::MalformedRecord {
                id: fallback_id,
                reason: "conversation is not a JSON object".to_string(),
            });
        };
        let data_id = match entry.get("data_id") {
            Some(id) => id_to_string(id).ok_or_else(|| EvalError::MalformedRecord {
                id: fallback_id.clone(),
                reason: format!("data_id must be a string or number, got {}", id),
            })?,
            None => fallback_id,
        };
        let function_list_id = entry
            .get("function_list_id")
            .and_then(|v| v.as_str())
            .filter(|id| !id.is_empty())
            .map(str::to_string);

        let mut numbered_turns = Vec::new();
        for (key, turn) in entry.iter() {
            let Some(number) = key.strip_prefix(TURN_PREFIX) else {
                continue;
            };
            let number: u32 = number.parse().map_err(|_| EvalError::MalformedRecord {
                id: data_id.clone(),
                reason: format!("turn key '{}' does not end in a number", key),
            })?;
            let turn: GoldTurn =
                serde_json::from_value(turn.clone()).map_err(|e| EvalError::MalformedRecord {
                    id: data_id.clone(),
                    reason: format!("{}: {}", key, e),
                })?;
            numbered_turns.push((number, turn));
        }
        numbered_turns.sort_by_key(|(number, _)| *number);

        Ok(Conversation {
            data_id,
            function_list_id,
            turns: numbered_turns.into_iter().map(|(_, turn)| turn).collect(),
        })
    }
}

/// Parses a dataset array. Entries without an id are named
/// `conversation_<n>`; entries without any turn are dropped.
pub fn parse_conversations(value: &serde_json::Value) -> Result<Vec<Conversation>, EvalError> {
    let entries: Vec<&serde_json::Value> = match value {
        serde_json::Value::Array(entries) => entries.iter().collect(),
        single @ serde_json::Value::Object(_) => vec![single],
        other => {
            return Err(EvalError::MalformedRecord {
                id: "<dataset>".to_string(),
                reason: format!("expected an array of conversations, got {}", other),
            });
        }
    };
    let mut conversations = Vec::new();
    for entry in entries {
        let fallback_id = format!("conversation_{}", conversations.len());
        let conversation = Conversation::from_value(entry, fallback_id)?;
        if conversation.turns.is_empty() {
            debug!("skipping conversation {} without turns", conversation.data_id);
            continue;
        }
        conversations.push(conversation);
    }
    Ok(conversations)
}

pub fn load_conversations(path: impl AsRef<Path>) -> Result<Vec<Conversation>, EvalError> {
    parse_conversations(&load_json(path)?)
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct CalledFunction {
    #[serde(default)]
    pub name: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ToolCallRecord {
    pub function: CalledFunction,
}

/// What the agent produced for one turn.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TurnOutput {
    #[serde(default)]
    pub tool_calls: Vec<ToolCallRecord>,
    #[serde(default)]
    pub response: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ConversationResult {
    #[serde(deserialize_with = "deserialize_data_id")]
    pub data_id: String,
    #[serde(default)]
    pub outputs: Vec<TurnOutput>,
}

pub fn parse_results(value: &serde_json::Value) -> Result<Vec<ConversationResult>, EvalError> {
    let serde_json::Value::Array(entries) = value else {
        return Err(EvalError::MalformedRecord {
            id: "<results>".to_string(),
            reason: "expected an array of conversation results".to_string(),
        });
    };
    entries
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            serde_json::from_value(entry.clone()).map_err(|e| EvalError::MalformedRecord {
                id: entry
                    .get("data_id")
                    .and_then(id_to_string)
                    .unwrap_or_else(|| format!("#{}", index)),
                reason: e.to_string(),
            })
        })
        .collect()
}

pub fn load_results(path: impl AsRef<Path>) -> Result<Vec<ConversationResult>, EvalError> {
    parse_results(&load_json(path)?)
}

/// Gold function names per conversation, in turn order, duplicates kept.
pub fn gold_function_names(conversations: &[Conversation]) -> IndexMap<String, Vec<String>> {
    conversations
        .iter()
        .map(|conversation| {
            let names = conversation
                .turns
                .iter()
                .flat_map(|turn| turn.gold_functions.iter())
                .map(|call| call.name.clone())
                .filter(|name| !name.is_empty())
                .collect();
            (conversation.data_id.clone(), names)
        })
        .collect()
}

pub fn predicted_function_names(results: &[ConversationResult]) -> IndexMap<String, Vec<String>> {
    results
        .iter()
        .map(|result| {
            let names = result
                .outputs
                .iter()
                .flat_map(|output| output.tool_calls.iter())
                .map(|call| call.function.name.clone())
                .filter(|name| !name.is_empty())
                .collect();
            (result.data_id.clone(), names)
        })
        .collect()
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ResponsePair {
    pub data_id: String,
    pub turn: usize,
    pub gold_response: String,
    pub generated_response: String,
}

/// Lines up each gold turn with the agent's response for the same turn.
/// Conversations without results and turns without an output are skipped
/// with a warning.
pub fn pair_responses(conversations: &[Conversation], results: &[ConversationResult]) -> Vec<ResponsePair> {
    let by_id: IndexMap<&str, &ConversationResult> =
        results.iter().map(|r| (r.data_id.as_str(), r)).collect();
    let mut pairs = Vec::new();
    for conversation in conversations {
        let Some(result) = by_id.get(conversation.data_id.as_str()) else {
            warn!("no results for conversation {}", conversation.data_id);
            continue;
        };
        if result.outputs.len() != conversation.turns.len() {
            warn!(
                "conversation {} has {} gold turns but {} outputs",
                conversation.data_id,
                conversation.turns.len(),
                result.outputs.len()
            );
        }
        for (turn, (gold, output)) in conversation.turns.iter().zip(result.outputs.iter()).enumerate() {
            pairs.push(ResponsePair {
                data_id: conversation.data_id.clone(),
                turn,
                gold_response: gold.gold_response.clone(),
                generated_response: output.response.clone(),
            });
        }
    }
    pairs
}
