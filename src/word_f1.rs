use std::{
    collections::{HashMap, HashSet},
    sync::LazyLock,
};

use serde::Serialize;

// parameter listings separate alternatives with pipes: "Avis Wind | Short Sword"
static TOKEN_SEPARATOR: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"[ |]+").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Default)]
pub struct Overlap {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

fn token_counts(text: &str) -> (HashMap<String, usize>, usize) {
    let lowered = text.to_lowercase();
    let mut counts = HashMap::new();
    let mut total = 0;
    for token in TOKEN_SEPARATOR.split(&lowered).filter(|t| !t.is_empty()) {
        *counts.entry(token.to_string()).or_insert(0) += 1;
        total += 1;
    }
    (counts, total)
}

/// Token-level precision, recall and F1 of `pred` against `gold`, using
/// multiset intersection of lowercased tokens.
pub fn word_prf(pred: &str, gold: &str) -> Overlap {
    let (pred_counts, pred_total) = token_counts(pred);
    let (gold_counts, gold_total) = token_counts(gold);
    if pred_total == 0 || gold_total == 0 {
        return Overlap::default();
    }
    let num_same: usize = gold_counts
        .iter()
        .map(|(token, &count)| count.min(pred_counts.get(token).copied().unwrap_or(0)))
        .sum();
    if num_same == 0 {
        return Overlap::default();
    }
    let precision = num_same as f64 / pred_total as f64;
    let recall = num_same as f64 / gold_total as f64;
    let f1 = 2.0 * precision * recall / (precision + recall);
    Overlap {
        precision,
        recall,
        f1,
    }
}

pub fn word_f1(pred: &str, gold: &str) -> f64 {
    word_prf(pred, gold).f1
}

/// Like [`word_f1`], but a missing input scores zero without tokenizing.
pub fn word_f1_opt(pred: Option<&str>, gold: Option<&str>) -> f64 {
    match (pred, gold) {
        (Some(pred), Some(gold)) => word_f1(pred, gold),
        _ => 0.0,
    }
}

/// Word F1 for free-text responses: whitespace tokens, case preserved, and
/// each distinct token counted once.
pub fn unigram_set_f1(gold: &str, pred: &str) -> f64 {
    let gold_tokens: HashSet<&str> = gold.split_whitespace().collect();
    let pred_tokens: HashSet<&str> = pred.split_whitespace().collect();
    let common = gold_tokens.intersection(&pred_tokens).count();
    if common == 0 {
        return 0.0;
    }
    let precision = common as f64 / pred_tokens.len() as f64;
    let recall = common as f64 / gold_tokens.len() as f64;
    2.0 * precision * recall / (precision + recall)
}
