use indexmap::IndexMap;
use serde::Serialize;

use crate::{
    config::MatchThreshold,
    function_call::{FunctionCall, GeneratedCall},
    function_kind::FunctionKind,
    normalize::{is_operator_field, normalize_value},
    word_f1::word_f1,
};

/// Field-name keywords whose values must match losslessly even in fuzzy mode.
const EXACT_KEYWORDS: [&str; 3] = ["reward", "price", "attack"];

pub fn is_exact_field(field: &str) -> bool {
    !is_operator_field(field) && EXACT_KEYWORDS.iter().any(|k| field.contains(k))
}

/// Result of matching one generated call against a gold set. Every variant
/// but `Matched` is a normal no-match; the variant records why the last
/// candidate was rejected.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum MatchOutcome {
    Matched(usize),
    UnrecognizedFunction,
    NoGoldWithName,
    ParameterNamesDiffer,
    ParameterValuesDiffer,
    ExactFieldsDiffer { generated: String, gold: String },
    BelowThreshold { score: f64 },
}

impl MatchOutcome {
    pub fn index(&self) -> Option<usize> {
        match self {
            MatchOutcome::Matched(index) => Some(*index),
            _ => None,
        }
    }
}

/// The two strings a search call is compared by.
#[derive(Debug, PartialEq, Eq)]
struct SearchBuckets {
    /// `key_value` pairs of price/reward/attack fields
    exact: String,
    /// `key value` pairs of everything else
    fuzzy: String,
}

impl SearchBuckets {
    fn from_parameters(parameters: &IndexMap<String, String>) -> Self {
        let mut exact = Vec::new();
        let mut fuzzy = Vec::new();
        for (key, value) in parameters {
            let value = normalize_value(value, key);
            if value.is_empty() {
                continue;
            }
            if is_exact_field(key) {
                exact.push(format!("{}_{}", key, value));
            } else {
                fuzzy.push(format!("{} {}", key, value));
            }
        }
        SearchBuckets {
            exact: exact.join(" "),
            fuzzy: fuzzy.join(" "),
        }
    }
}

/// Two empty buckets agree; otherwise the bucket strings are scored by word F1.
fn bucket_score(generated: &str, gold: &str) -> f64 {
    if generated.is_empty() && gold.is_empty() {
        1.0
    } else {
        word_f1(generated, gold)
    }
}

fn sorted_keys(parameters: &IndexMap<String, String>) -> Vec<&String> {
    let mut keys: Vec<&String> = parameters.keys().collect();
    keys.sort();
    keys
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CallMatcher {
    threshold: MatchThreshold,
}

impl CallMatcher {
    pub fn new(threshold: MatchThreshold) -> Self {
        CallMatcher { threshold }
    }

    /// Index of the first gold call the generated call matches.
    pub fn find_match(&self, call: &GeneratedCall, gold: &[FunctionCall]) -> Option<usize> {
        self.explain(call, gold).index()
    }

    pub fn explain(&self, call: &GeneratedCall, gold: &[FunctionCall]) -> MatchOutcome {
        let kind = FunctionKind::classify(&call.name);
        if kind == FunctionKind::Unrecognized {
            return MatchOutcome::UnrecognizedFunction;
        }
        let mut outcome = MatchOutcome::NoGoldWithName;
        for (index, gold_call) in gold.iter().enumerate() {
            if gold_call.name != call.name {
                continue;
            }
            let verdict = match kind {
                FunctionKind::Exact => exact_match(call, gold_call),
                FunctionKind::Fuzzy => self.search_match(call, gold_call),
                FunctionKind::Unrecognized => unreachable!("filtered above"),
            };
            match verdict {
                Ok(()) => return MatchOutcome::Matched(index),
                Err(rejection) => outcome = rejection,
            }
        }
        outcome
    }

    fn search_match(&self, call: &GeneratedCall, gold_call: &FunctionCall) -> Result<(), MatchOutcome> {
        let generated = SearchBuckets::from_parameters(&call.parameters);
        let gold = SearchBuckets::from_parameters(&gold_call.parameters);

        if bucket_score(&generated.exact, &gold.exact) != 1.0 {
            return Err(MatchOutcome::ExactFieldsDiffer {
                generated: generated.exact,
                gold: gold.exact,
            });
        }
        let score = bucket_score(&generated.fuzzy, &gold.fuzzy);
        if self.threshold.is_exceeded_by(score) {
            Ok(())
        } else {
            Err(MatchOutcome::BelowThreshold { score })
        }
    }
}

fn exact_match(call: &GeneratedCall, gold_call: &FunctionCall) -> Result<(), MatchOutcome> {
    let generated_keys = sorted_keys(&call.parameters);
    let gold_keys = sorted_keys(&gold_call.parameters);
    if generated_keys != gold_keys {
        return Err(MatchOutcome::ParameterNamesDiffer);
    }
    let values_equal = generated_keys.iter().all(|key| {
        call.parameters[key.as_str()].to_lowercase() == gold_call.parameters[key.as_str()].to_lowercase()
    });
    if values_equal {
        Ok(())
    } else {
        Err(MatchOutcome::ParameterValuesDiffer)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn gold(value: serde_json::Value) -> Vec<FunctionCall> {
        serde_json::from_value(value).unwrap()
    }

    fn search_item(params: &[(&str, &str)]) -> GeneratedCall {
        params
            .iter()
            .fold(GeneratedCall::new("search_item"), |call, (k, v)| call.with_param(*k, *v))
    }

    #[test]
    fn check_matches_case_insensitively() {
        let gold = gold(json!([{
            "name": "check_price",
            "parameters": {"item_name": "avis wind"},
            "return": [{"price": "50G"}]
        }]));
        let call = GeneratedCall::new("check_price").with_param("item_name", "Avis Wind");
        assert_eq!(CallMatcher::default().find_match(&call, &gold), Some(0));
    }

    #[test]
    fn check_rejects_any_differing_value() {
        let gold = gold(json!([{
            "name": "check_price",
            "parameters": {"item_name": "avis wind", "shop": "north"},
            "return": []
        }]));
        let call = GeneratedCall::new("check_price")
            .with_param("shop", "North")
            .with_param("item_name", "Avis Wind");
        assert_eq!(CallMatcher::default().find_match(&call, &gold), Some(0));

        let wrong = GeneratedCall::new("check_price")
            .with_param("shop", "south")
            .with_param("item_name", "Avis Wind");
        assert_eq!(
            CallMatcher::default().explain(&wrong, &gold),
            MatchOutcome::ParameterValuesDiffer
        );
    }

    #[test]
    fn check_rejects_different_parameter_names() {
        let gold = gold(json!([{
            "name": "check_attack",
            "parameters": {"item_name": "short sword"},
            "return": []
        }]));
        let call = GeneratedCall::new("check_attack").with_param("weapon", "short sword");
        assert_eq!(
            CallMatcher::default().explain(&call, &gold),
            MatchOutcome::ParameterNamesDiffer
        );
        let extra = GeneratedCall::new("check_attack")
            .with_param("item_name", "short sword")
            .with_param("item_type", "sword");
        assert_eq!(CallMatcher::default().find_match(&extra, &gold), None);
    }

    #[test]
    fn name_must_be_equal() {
        let gold = gold(json!([{
            "name": "check_price",
            "parameters": {"item_name": "avis wind"},
            "return": []
        }]));
        let call = GeneratedCall::new("check_type").with_param("item_name", "avis wind");
        assert_eq!(
            CallMatcher::default().explain(&call, &gold),
            MatchOutcome::NoGoldWithName
        );
    }

    #[test]
    fn actions_never_match() {
        let gold = gold(json!([{
            "name": "equip",
            "parameters": {"item_name": "avis wind"},
            "return": []
        }]));
        let call = GeneratedCall::new("equip").with_param("item_name", "avis wind");
        assert_eq!(
            CallMatcher::default().explain(&call, &gold),
            MatchOutcome::UnrecognizedFunction
        );
    }

    #[test]
    fn first_matching_gold_entry_wins() {
        let gold = gold(json!([
            {"name": "check_price", "parameters": {"item_name": "bow"}, "return": [{"price": "10G"}]},
            {"name": "check_price", "parameters": {"item_name": "avis wind"}, "return": [{"price": "50G"}]},
            {"name": "check_price", "parameters": {"item_name": "Avis Wind"}, "return": [{"price": "99G"}]}
        ]));
        let call = GeneratedCall::new("check_price").with_param("item_name", "AVIS WIND");
        assert_eq!(CallMatcher::default().find_match(&call, &gold), Some(1));
    }

    #[test]
    fn search_rejects_differing_price_regardless_of_other_fields() {
        let gold = gold(json!([{
            "name": "search_item",
            "parameters": {"item_type": "spear", "item_price": "200G"},
            "return": [{"item_name": "many"}]
        }]));
        let call = search_item(&[("item_type", "spear"), ("item_price", "100G")]);
        match CallMatcher::default().explain(&call, &gold) {
            MatchOutcome::ExactFieldsDiffer { generated, gold } => {
                assert_eq!(generated, "item_price_100");
                assert_eq!(gold, "item_price_200");
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn search_normalizes_currency_before_comparing() {
        let gold = gold(json!([{
            "name": "search_item",
            "parameters": {"item_type": "spear", "item_price": "1,000 Gold", "item_price_operator": "or less"},
            "return": [{"item_name": "Avis Wind"}]
        }]));
        let call = search_item(&[
            ("item_type", "spear"),
            ("item_price", "1000G"),
            ("item_price_operator", "or less"),
        ]);
        assert_eq!(CallMatcher::default().find_match(&call, &gold), Some(0));
    }

    #[test]
    fn search_threshold_is_strict() {
        // generated fuzzy bucket: 2 tokens, gold: 8 tokens, 2 shared -> F1 = 0.4
        let gold = gold(json!([{
            "name": "search_item",
            "parameters": {"item_type": "spear", "item_description": "light and easy to handle"},
            "return": []
        }]));
        let call = search_item(&[("item_type", "spear")]);
        assert_eq!(
            CallMatcher::default().explain(&call, &gold),
            MatchOutcome::BelowThreshold { score: 0.4 }
        );

        let lenient = CallMatcher::new(MatchThreshold::new(0.39).unwrap());
        assert_eq!(lenient.find_match(&call, &gold), Some(0));
    }

    #[test]
    fn search_accepts_partial_overlap_above_threshold() {
        let gold = gold(json!([{
            "name": "search_item",
            "parameters": {"item_type": "spear", "item_description": "light", "item_name": "Avis Wind"},
            "return": []
        }]));
        // 4 of 7 gold tokens recovered, F1 = 8/11
        let call = search_item(&[("item_type", "Spear"), ("item_description", "light"), ("item_name", "")]);
        assert_eq!(CallMatcher::default().find_match(&call, &gold), Some(0));
    }

    #[test]
    fn search_without_exact_fields_compares_fuzzy_bucket_only() {
        let gold = gold(json!([{
            "name": "search_quest",
            "parameters": {"quest_level": "A", "quest_description": "investigation"},
            "return": []
        }]));
        let call = GeneratedCall::new("search_quest")
            .with_param("quest_level", "a")
            .with_param("quest_description", "investigation");
        assert_eq!(CallMatcher::default().find_match(&call, &gold), Some(0));
    }

    #[test]
    fn missing_exact_field_is_a_mismatch() {
        let gold = gold(json!([{
            "name": "search_quest",
            "parameters": {"quest_reward": "10G", "quest_level": "A"},
            "return": []
        }]));
        let call = GeneratedCall::new("search_quest").with_param("quest_level", "A");
        assert!(matches!(
            CallMatcher::default().explain(&call, &gold),
            MatchOutcome::ExactFieldsDiffer { .. }
        ));
    }

    #[test]
    fn operator_fields_belong_to_the_fuzzy_bucket() {
        let params: IndexMap<String, String> = [
            ("item_attack", "120"),
            ("item_attack_operator", "or more"),
            ("item_name", "Avis Wind | Short Sword"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        let buckets = SearchBuckets::from_parameters(&params);
        assert_eq!(buckets.exact, "item_attack_120");
        assert_eq!(
            buckets.fuzzy,
            "item_attack_operator or more item_name Avis Wind | Short Sword"
        );
    }
}
