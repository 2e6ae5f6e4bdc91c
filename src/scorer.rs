use indexmap::{IndexMap, IndexSet};
use log::warn;
use pyo3::{Py, PyAny, PyResult, pyclass, pymethods};
use serde::{Deserialize, Serialize};

use crate::{
    bertscore::BertScorer,
    bleu::sentence_bleu,
    embedding::SentenceEmbedder,
    error::EvalError,
    judge::{JUDGE_FAILURE_SCORE, ResponseJudge},
    python_interface::{PyBertScorer, PyEmbedder, PyJudge, py_encoder_embedder},
    word_f1::unigram_set_f1,
};

pub const WORD_F1: &str = "word_f1";
pub const BLEU: &str = "bleu";
pub const EMBEDDING_SIMILARITY: &str = "embedding_similarity";
pub const BERTSCORE_F1: &str = "bertscore_f1";
pub const BLEU_PLUS_BERTSCORE: &str = "bleu_plus_bertscore_f1";
pub const LLM_SCORE: &str = "llm_score";
pub const FUNCTION_ACCURACY: &str = "function_accuracy";

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct FunctionMatchDetail {
    pub id: String,
    pub gold: Vec<String>,
    pub pred: Vec<String>,
    pub matched: Vec<String>,
}

/// Function-name accuracy over a run
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct FunctionAccuracy {
    pub accuracy: f64,
    pub correct_count: usize,
    pub total_count: usize,
    pub details: Vec<FunctionMatchDetail>,
}

/// Compares, per conversation id, the set of gold function names with the
/// set of predicted ones. Accuracy is micro-averaged over distinct gold
/// names: `sum |gold ∩ pred| / sum |gold|`, and 0 when there is no gold name
/// at all.
pub fn function_accuracy(
    gold: &IndexMap<String, Vec<String>>,
    pred: &IndexMap<String, Vec<String>>,
) -> FunctionAccuracy {
    let mut correct_count = 0;
    let mut total_count = 0;
    let mut details = Vec::new();
    for (id, gold_names) in gold.iter() {
        let gold_set: IndexSet<&String> = gold_names.iter().collect();
        let pred_set: IndexSet<&String> = pred
            .get(id)
            .map(|names| names.iter().collect())
            .unwrap_or_default();
        let matched: Vec<String> = gold_set
            .intersection(&pred_set)
            .map(|name| name.to_string())
            .collect();
        total_count += gold_set.len();
        correct_count += matched.len();
        details.push(FunctionMatchDetail {
            id: id.clone(),
            gold: gold_set.iter().map(|name| name.to_string()).collect(),
            pred: pred_set.iter().map(|name| name.to_string()).collect(),
            matched,
        });
    }
    let accuracy = if total_count == 0 {
        0.0
    } else {
        correct_count as f64 / total_count as f64
    };
    FunctionAccuracy {
        accuracy,
        correct_count,
        total_count,
        details,
    }
}

/// Text similarity of one generated response to its gold response.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ScoreRecord {
    pub word_f1: f64,
    pub bleu: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding_similarity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bertscore_f1: Option<f64>,
    /// 1..=5, or -1 when the judge failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub llm_score: Option<i64>,
}

/// Which optional collaborators took part in a run. Their metrics are
/// reported exactly when they are configured, even if every call failed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collaborators {
    pub embedder: bool,
    pub bert_scorer: bool,
    pub judge: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ScoreSummary {
    pub turn_count: usize,
    pub averages: IndexMap<String, f64>,
    /// Turns a configured collaborator could not score, per metric.
    pub failed_turns: IndexMap<String, usize>,
}

fn average(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / count as f64)
}

/// Unweighted means over all turns, `0.0` when there is nothing to average.
///
/// Embedding and BERTScore means cover the turns that got a value; the judge
/// mean includes its `-1` failures, as they are part of the recorded score.
/// `bleu_plus_bertscore_f1` is the sum of the two means.
pub fn summarize(records: &[ScoreRecord], collaborators: Collaborators) -> ScoreSummary {
    let mut averages = IndexMap::new();
    let mut failed_turns = IndexMap::new();
    let bleu = average(records.iter().map(|r| r.bleu)).unwrap_or(0.0);
    averages.insert(
        WORD_F1.to_string(),
        average(records.iter().map(|r| r.word_f1)).unwrap_or(0.0),
    );
    averages.insert(BLEU.to_string(), bleu);
    if collaborators.embedder {
        averages.insert(
            EMBEDDING_SIMILARITY.to_string(),
            average(records.iter().filter_map(|r| r.embedding_similarity)).unwrap_or(0.0),
        );
        failed_turns.insert(
            EMBEDDING_SIMILARITY.to_string(),
            records.iter().filter(|r| r.embedding_similarity.is_none()).count(),
        );
    }
    if collaborators.bert_scorer {
        let bertscore = average(records.iter().filter_map(|r| r.bertscore_f1)).unwrap_or(0.0);
        averages.insert(BERTSCORE_F1.to_string(), bertscore);
        averages.insert(BLEU_PLUS_BERTSCORE.to_string(), bleu + bertscore);
        failed_turns.insert(
            BERTSCORE_F1.to_string(),
            records.iter().filter(|r| r.bertscore_f1.is_none()).count(),
        );
    }
    if collaborators.judge {
        averages.insert(
            LLM_SCORE.to_string(),
            average(records.iter().filter_map(|r| r.llm_score.map(|s| s as f64))).unwrap_or(0.0),
        );
        failed_turns.insert(
            LLM_SCORE.to_string(),
            records
                .iter()
                .filter(|r| r.llm_score.is_none_or(|s| s == JUDGE_FAILURE_SCORE))
                .count(),
        );
    }
    ScoreSummary {
        turn_count: records.len(),
        averages,
        failed_turns,
    }
}

/// Scores generated responses turn by turn and keeps the records for the
/// run summary. The embedding model, the BERTScore model and the judge are
/// optional and are supplied by the caller.
#[pyclass]
pub struct ResponseScorer {
    embedder: Option<Box<dyn SentenceEmbedder>>,
    bert_scorer: Option<Box<dyn BertScorer>>,
    judge: Option<Box<dyn ResponseJudge>>,
    records: Vec<ScoreRecord>,
}

#[pymethods]
impl ResponseScorer {
    /// `embedder(a, b) -> float` and `encoder(text) -> list[float]` are two
    /// ways to supply the embedding model; pass at most one.
    #[new]
    #[pyo3(signature = (embedder=None, judge=None, encoder=None, bertscore=None))]
    fn py_new(
        embedder: Option<Py<PyAny>>,
        judge: Option<Py<PyAny>>,
        encoder: Option<Py<PyAny>>,
        bertscore: Option<Py<PyAny>>,
    ) -> PyResult<Self> {
        let mut scorer = ResponseScorer::new();
        match (embedder, encoder) {
            (Some(_), Some(_)) => {
                return Err(EvalError::Config(
                    "pass either embedder or encoder, not both".to_string(),
                )
                .into());
            }
            (Some(embedder), None) => {
                scorer = scorer.with_embedder(Box::new(PyEmbedder::new(embedder)));
            }
            (None, Some(encoder)) => {
                scorer = scorer.with_embedder(Box::new(py_encoder_embedder(encoder)));
            }
            (None, None) => {}
        }
        if let Some(judge) = judge {
            scorer = scorer.with_judge(Box::new(PyJudge::new(judge)));
        }
        if let Some(bertscore) = bertscore {
            scorer = scorer.with_bert_scorer(Box::new(PyBertScorer::new(bertscore)));
        }
        Ok(scorer)
    }

    #[pyo3(name = "score_turn")]
    fn py_score_turn(&mut self, gold: String, generated: String) -> PyResult<String> {
        let record = self.score_turn(&gold, &generated);
        Ok(serde_json::to_string(&record).map_err(EvalError::from)?)
    }

    #[pyo3(name = "summary")]
    fn py_summary(&self) -> PyResult<String> {
        Ok(serde_json::to_string(&self.summary()).map_err(EvalError::from)?)
    }
}

impl ResponseScorer {
    pub fn new() -> Self {
        ResponseScorer {
            embedder: None,
            bert_scorer: None,
            judge: None,
            records: Vec::new(),
        }
    }

    pub fn with_embedder(mut self, embedder: Box<dyn SentenceEmbedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn with_bert_scorer(mut self, bert_scorer: Box<dyn BertScorer>) -> Self {
        self.bert_scorer = Some(bert_scorer);
        self
    }

    pub fn with_judge(mut self, judge: Box<dyn ResponseJudge>) -> Self {
        self.judge = Some(judge);
        self
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            embedder: self.embedder.is_some(),
            bert_scorer: self.bert_scorer.is_some(),
            judge: self.judge.is_some(),
        }
    }

    pub fn score_turn(&mut self, gold: &str, generated: &str) -> ScoreRecord {
        let embedding_similarity = self.embedder.as_ref().and_then(|embedder| {
            embedder
                .similarity(gold, generated)
                .inspect_err(|e| warn!("embedding similarity unavailable for this turn: {}", e))
                .ok()
        });
        let bertscore_f1 = self.bert_scorer.as_ref().and_then(|bert_scorer| {
            bert_scorer
                .f1(gold, generated)
                .inspect_err(|e| warn!("BERTScore unavailable for this turn: {}", e))
                .ok()
        });
        let llm_score = self.judge.as_ref().map(|judge| {
            judge.judge(gold, generated).unwrap_or_else(|e| {
                warn!("LLM judge failed, recording {}: {}", JUDGE_FAILURE_SCORE, e);
                JUDGE_FAILURE_SCORE
            })
        });
        let record = ScoreRecord {
            word_f1: unigram_set_f1(gold, generated),
            bleu: sentence_bleu(gold, generated),
            embedding_similarity,
            bertscore_f1,
            llm_score,
        };
        self.records.push(record.clone());
        record
    }

    pub fn records(&self) -> &[ScoreRecord] {
        &self.records
    }

    pub fn summary(&self) -> ScoreSummary {
        summarize(&self.records, self.collaborators())
    }
}

impl Default for ResponseScorer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(entries: &[(&str, &[&str])]) -> IndexMap<String, Vec<String>> {
        entries
            .iter()
            .map(|(id, names)| (id.to_string(), names.iter().map(|n| n.to_string()).collect()))
            .collect()
    }

    #[test]
    fn accuracy_is_micro_averaged_over_name_sets() {
        let gold = names(&[
            ("1", &["check_price", "check_price", "search_item"]),
            ("2", &["check_attack"]),
        ]);
        let pred = names(&[
            ("1", &["check_price", "sell"]),
            ("2", &["check_attack", "check_attack"]),
        ]);
        let result = function_accuracy(&gold, &pred);
        // gold sets: {check_price, search_item}, {check_attack}
        assert_eq!(result.total_count, 3);
        assert_eq!(result.correct_count, 2);
        assert!((result.accuracy - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(result.details[0].matched, vec!["check_price"]);
        assert_eq!(result.details[0].pred, vec!["check_price", "sell"]);
    }

    #[test]
    fn zero_gold_functions_gives_zero_accuracy() {
        let gold = names(&[("1", &[]), ("2", &[])]);
        let pred = names(&[("1", &["check_price"])]);
        let result = function_accuracy(&gold, &pred);
        assert_eq!(result.accuracy, 0.0);
        assert_eq!(result.total_count, 0);

        let empty = function_accuracy(&IndexMap::new(), &IndexMap::new());
        assert_eq!(empty.accuracy, 0.0);
    }

    #[test]
    fn missing_predictions_count_as_misses() {
        let gold = names(&[("1", &["check_type"])]);
        let result = function_accuracy(&gold, &IndexMap::new());
        assert_eq!(result.correct_count, 0);
        assert_eq!(result.total_count, 1);
    }

    struct FixedEmbedder(f64);

    impl SentenceEmbedder for FixedEmbedder {
        fn similarity(&self, _a: &str, _b: &str) -> Result<f64, EvalError> {
            Ok(self.0)
        }
    }

    struct FailingJudge;

    impl ResponseJudge for FailingJudge {
        fn judge(&self, _gold: &str, _generated: &str) -> Result<i64, EvalError> {
            Err(EvalError::Judge("unreachable".to_string()))
        }
    }

    struct FixedJudge(i64);

    impl ResponseJudge for FixedJudge {
        fn judge(&self, _gold: &str, _generated: &str) -> Result<i64, EvalError> {
            Ok(self.0)
        }
    }

    #[test]
    fn plain_scorer_reports_lexical_metrics_only() {
        let mut scorer = ResponseScorer::new();
        let record = scorer.score_turn("The spear costs 50 gold", "The spear costs 50 gold");
        assert!((record.word_f1 - 1.0).abs() < 1e-9);
        assert!((record.bleu - 1.0).abs() < 1e-9);
        assert_eq!(record.embedding_similarity, None);
        assert_eq!(record.llm_score, None);

        let summary = scorer.summary();
        assert_eq!(summary.turn_count, 1);
        assert_eq!(summary.averages.keys().collect::<Vec<_>>(), vec![WORD_F1, BLEU]);
    }

    #[test]
    fn judge_failure_becomes_sentinel() {
        let mut scorer = ResponseScorer::new().with_judge(Box::new(FailingJudge));
        let record = scorer.score_turn("gold", "generated");
        assert_eq!(record.llm_score, Some(JUDGE_FAILURE_SCORE));
        let summary = scorer.summary();
        assert_eq!(summary.averages[LLM_SCORE], -1.0);
        assert_eq!(summary.failed_turns[LLM_SCORE], 1);
    }

    #[test]
    fn summary_averages_every_turn_equally() {
        let mut scorer = ResponseScorer::new()
            .with_embedder(Box::new(FixedEmbedder(0.5)))
            .with_judge(Box::new(FixedJudge(4)));
        scorer.score_turn("a b", "a b");
        scorer.score_turn("a b", "c d");
        let summary = scorer.summary();
        assert_eq!(summary.turn_count, 2);
        assert!((summary.averages[WORD_F1] - 0.5).abs() < 1e-9);
        assert!((summary.averages[EMBEDDING_SIMILARITY] - 0.5).abs() < 1e-9);
        assert!((summary.averages[LLM_SCORE] - 4.0).abs() < 1e-9);
        assert_eq!(scorer.records().len(), 2);
    }

    #[test]
    fn empty_run_summary_is_zero() {
        let summary = summarize(&[], Collaborators::default());
        assert_eq!(summary.turn_count, 0);
        assert_eq!(summary.averages[WORD_F1], 0.0);
        assert_eq!(summary.averages[BLEU], 0.0);
        assert!(!summary.averages.contains_key(LLM_SCORE));
        assert!(summary.failed_turns.is_empty());

        let with_judge = summarize(
            &[],
            Collaborators {
                judge: true,
                ..Collaborators::default()
            },
        );
        assert_eq!(with_judge.averages[LLM_SCORE], 0.0);
    }

    struct FailingEmbedder;

    impl SentenceEmbedder for FailingEmbedder {
        fn similarity(&self, _a: &str, _b: &str) -> Result<f64, EvalError> {
            Err(EvalError::Embedding("model not loaded".to_string()))
        }
    }

    #[test]
    fn embedding_failure_is_reported_not_hidden() {
        let mut scorer = ResponseScorer::new().with_embedder(Box::new(FailingEmbedder));
        let record = scorer.score_turn("a", "a");
        assert_eq!(record.embedding_similarity, None);

        let summary = scorer.summary();
        assert_eq!(summary.averages[EMBEDDING_SIMILARITY], 0.0);
        assert_eq!(summary.failed_turns[EMBEDDING_SIMILARITY], 1);
    }

    #[test]
    fn embedding_mean_covers_scored_turns_only() {
        let records = vec![
            ScoreRecord {
                word_f1: 1.0,
                bleu: 1.0,
                embedding_similarity: Some(0.8),
                bertscore_f1: None,
                llm_score: None,
            },
            ScoreRecord {
                word_f1: 0.0,
                bleu: 0.0,
                embedding_similarity: None,
                bertscore_f1: None,
                llm_score: None,
            },
        ];
        let summary = summarize(
            &records,
            Collaborators {
                embedder: true,
                ..Collaborators::default()
            },
        );
        assert!((summary.averages[EMBEDDING_SIMILARITY] - 0.8).abs() < 1e-9);
        assert_eq!(summary.failed_turns[EMBEDDING_SIMILARITY], 1);
    }

    struct FixedBertScorer(f64);

    impl BertScorer for FixedBertScorer {
        fn f1(&self, _reference: &str, _candidate: &str) -> Result<f64, EvalError> {
            Ok(self.0)
        }
    }

    #[test]
    fn bertscore_is_averaged_and_added_to_bleu() {
        let mut scorer = ResponseScorer::new().with_bert_scorer(Box::new(FixedBertScorer(0.9)));
        let record = scorer.score_turn("The spear costs 50 gold", "The spear costs 50 gold");
        assert_eq!(record.bertscore_f1, Some(0.9));
        scorer.score_turn("a b", "c d");

        let summary = scorer.summary();
        assert!((summary.averages[BERTSCORE_F1] - 0.9).abs() < 1e-9);
        assert!((summary.averages[BLEU] - 0.5).abs() < 1e-9);
        assert!((summary.averages[BLEU_PLUS_BERTSCORE] - 1.4).abs() < 1e-9);
        assert_eq!(summary.failed_turns[BERTSCORE_F1], 0);
    }
}
