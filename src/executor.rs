use log::debug;
use pyo3::{PyResult, pyclass, pymethods};

use crate::{
    config::{EvalConfig, MatchThreshold, UnmatchedReturn},
    error::EvalError,
    function_call::{FunctionCall, GeneratedCall, parse_call_list_str},
    matcher::{CallMatcher, MatchOutcome},
};

/// Answers an agent's function calls for one turn from that turn's gold
/// calls, and records every call it was asked to run.
///
/// A matched call gets a copy of the gold return values; an unmatched call
/// gets the configured unmatched payload. The call log lives as long as the
/// executor: the harness builds one executor per turn, but a caller that
/// reuses one across turns gets a log spanning all of them.
#[pyclass]
pub struct Executor {
    gold_functions: Vec<FunctionCall>,
    matcher: CallMatcher,
    unmatched_return: UnmatchedReturn,
    function_call_stats: Vec<GeneratedCall>,
}

#[pymethods]
impl Executor {
    /// `gold_functions` is a JSON array of `{"name", "parameters", "return"}`.
    /// Unset options fall back to the environment configuration.
    #[new]
    #[pyo3(signature = (gold_functions, threshold=None, unmatched_return=None))]
    fn py_new(
        gold_functions: String,
        threshold: Option<f64>,
        unmatched_return: Option<String>,
    ) -> PyResult<Self> {
        let mut config = EvalConfig::from_env()?;
        if let Some(threshold) = threshold {
            config.match_threshold = MatchThreshold::new(threshold)?;
        }
        if let Some(unmatched_return) = unmatched_return {
            config.unmatched_return = unmatched_return.parse()?;
        }
        let gold_functions: Vec<FunctionCall> = parse_call_list_str(&gold_functions)?;
        Ok(Executor::new(gold_functions, &config))
    }

    /// Takes a JSON array of `{"name", "parameters"}` and returns the same
    /// calls with `"return"` filled in.
    #[pyo3(name = "execute")]
    fn py_execute(&mut self, function_list: String) -> PyResult<String> {
        Ok(self.execute_json(&function_list)?)
    }

    #[getter(function_call_stats)]
    fn py_function_call_stats(&self) -> PyResult<String> {
        Ok(serde_json::to_string(&self.function_call_stats).map_err(EvalError::from)?)
    }

    #[getter(called_function_names)]
    fn py_called_function_names(&self) -> Vec<String> {
        self.called_function_names()
    }
}

impl Executor {
    pub fn new(gold_functions: Vec<FunctionCall>, config: &EvalConfig) -> Self {
        Executor {
            gold_functions,
            matcher: CallMatcher::new(config.match_threshold),
            unmatched_return: config.unmatched_return,
            function_call_stats: Vec::new(),
        }
    }

    pub fn gold_functions(&self) -> &[FunctionCall] {
        &self.gold_functions
    }

    pub fn execute(&mut self, function_list: &[GeneratedCall]) -> Vec<FunctionCall> {
        function_list
            .iter()
            .map(|call| {
                self.function_call_stats.push(call.clone());
                match self.matcher.explain(call, &self.gold_functions) {
                    MatchOutcome::Matched(index) => {
                        debug!("{} matched gold call #{}", call.name, index);
                        call.annotate(self.gold_functions[index].return_values.clone())
                    }
                    rejection => {
                        debug!("{} did not match: {:?}", call.name, rejection);
                        call.annotate(self.unmatched_return.payload())
                    }
                }
            })
            .collect()
    }

    pub fn execute_json(&mut self, function_list: &str) -> Result<String, EvalError> {
        let calls: Vec<GeneratedCall> = parse_call_list_str(function_list)?;
        let executed = self.execute(&calls);
        Ok(serde_json::to_string(&executed)?)
    }

    /// Every call passed to `execute`, in order, as it was before annotation.
    pub fn call_log(&self) -> &[GeneratedCall] {
        &self.function_call_stats
    }

    pub fn called_function_names(&self) -> Vec<String> {
        self.function_call_stats
            .iter()
            .map(|call| call.name.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn gold(value: serde_json::Value) -> Vec<FunctionCall> {
        serde_json::from_value(value).unwrap()
    }

    fn calls(value: serde_json::Value) -> Vec<GeneratedCall> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn check_attack_end_to_end() {
        let mut executor = Executor::new(
            gold(json!([{
                "name": "check_attack",
                "parameters": {"item_name": "Avis Wind"},
                "return": [{"attack": "120"}]
            }])),
            &EvalConfig::default(),
        );
        let output = executor.execute(&calls(json!([
            {"name": "check_attack", "parameters": {"item_name": "avis wind"}}
        ])));
        assert_eq!(
            serde_json::to_value(&output).unwrap(),
            json!([{
                "name": "check_attack",
                "parameters": {"item_name": "avis wind"},
                "return": [{"attack": "120"}]
            }])
        );
    }

    #[test]
    fn output_is_one_to_one_and_always_annotated() {
        let mut executor = Executor::new(
            gold(json!([
                {"name": "check_price", "parameters": {"item_name": "avis wind"}, "return": [{"price": "50G"}]}
            ])),
            &EvalConfig::default(),
        );
        let input = calls(json!([
            {"name": "sell", "parameters": {"item_names": "avis wind"}},
            {"name": "check_price", "parameters": {"item_name": "Avis Wind"}},
            {"name": "check_price", "parameters": {"item_name": "short sword"}}
        ]));
        let before = input.clone();
        let output = executor.execute(&input);

        assert_eq!(input, before);
        assert_eq!(output.len(), input.len());
        for (out, inp) in output.iter().zip(input.iter()) {
            assert_eq!(out.name, inp.name);
            assert_eq!(out.parameters, inp.parameters);
            assert!(!out.return_values.is_empty());
        }
        assert_eq!(output[0].return_values[0]["information"], json!("n/a"));
        assert_eq!(output[1].return_values[0]["price"], json!("50G"));
        assert_eq!(output[2].return_values[0]["information"], json!("n/a"));
    }

    #[test]
    fn empty_unmatched_policy() {
        let config = EvalConfig {
            unmatched_return: UnmatchedReturn::Empty,
            ..EvalConfig::default()
        };
        let mut executor = Executor::new(Vec::new(), &config);
        let output = executor.execute(&[GeneratedCall::new("check_price").with_param("item_name", "bow")]);
        assert_eq!(output.len(), 1);
        assert!(output[0].return_values.is_empty());
    }

    #[test]
    fn gold_is_not_mutated_and_log_accumulates() {
        let gold_calls = gold(json!([
            {"name": "check_type", "parameters": {"item_name": "bow"}, "return": [{"type": "bow"}]}
        ]));
        let mut executor = Executor::new(gold_calls.clone(), &EvalConfig::default());
        executor.execute(&[GeneratedCall::new("check_type").with_param("item_name", "Bow")]);
        executor.execute(&[
            GeneratedCall::new("search_item").with_param("item_type", "bow"),
            GeneratedCall::new("equip").with_param("item_name", "bow"),
        ]);
        assert_eq!(executor.gold_functions(), gold_calls.as_slice());
        assert_eq!(
            executor.called_function_names(),
            vec!["check_type", "search_item", "equip"]
        );
        // logged as passed in, not annotated
        assert_eq!(executor.call_log()[0].parameters["item_name"], "Bow");
    }

    #[test]
    fn json_boundary_reports_malformed_calls() {
        let mut executor = Executor::new(Vec::new(), &EvalConfig::default());
        let err = executor
            .execute_json(r#"[{"name": "check_price", "parameters": {"item_name": "a"}}, {"parameters": {}}]"#)
            .unwrap_err();
        assert!(matches!(err, EvalError::MalformedCall { index: 1, .. }));
        assert_eq!(executor.call_log().len(), 0);

        let ok = executor
            .execute_json(r#"[{"name": "check_price", "parameters": {"item_name": "a"}}]"#)
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&ok).unwrap();
        assert_eq!(value[0]["return"], json!([{"information": "n/a"}]));
    }
}
