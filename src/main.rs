use std::{
    path::{Path, PathBuf},
    process::ExitCode,
};

use chrono::Local;
use clap::{Parser, Subcommand};
use log::{error, info, warn};
use serde_json::json;

use npc_eval::{
    config::{EvalConfig, MatchThreshold, UnmatchedReturn},
    dataset::{
        Conversation, ConversationResult, gold_function_names, load_conversations, load_results,
        pair_responses, predicted_function_names,
    },
    error::EvalError,
    executor::Executor,
    function_call::{FunctionCall, GeneratedCall, parse_call_list},
    function_lists::FUNCTION_LISTS,
    parse_calls::decode_function_list,
    paths::{BASE_SCORE_PATH, DEFAULT_DATASET_PATH, DEFAULT_RESULTS_PATH},
    scorer::{FUNCTION_ACCURACY, ResponseScorer, function_accuracy},
    utils::{load_json, write_json_to_file},
};

#[derive(Parser)]
#[command(name = "npc-eval")]
#[command(about = "Score NPC dialogue agent runs against gold conversations", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Function-name accuracy of the calls an agent made
    Functions {
        /// Dataset with gold turns
        #[arg(short, long, default_value_os_t = DEFAULT_DATASET_PATH.to_path_buf())]
        dataset: PathBuf,

        /// Agent results (`[{data_id, outputs}]`)
        #[arg(short, long, default_value_os_t = DEFAULT_RESULTS_PATH.to_path_buf())]
        results: PathBuf,

        /// Where to write the report (defaults to a timestamped file under scores/)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Word-F1 and BLEU of the agent's responses
    Responses {
        #[arg(short, long, default_value_os_t = DEFAULT_DATASET_PATH.to_path_buf())]
        dataset: PathBuf,

        #[arg(short, long, default_value_os_t = DEFAULT_RESULTS_PATH.to_path_buf())]
        results: PathBuf,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Answer generated calls from a list of gold calls and print the result
    Execute {
        /// JSON array of gold calls with their return values
        #[arg(short, long)]
        gold: PathBuf,

        /// Generated calls, as a JSON array or a Python call list
        #[arg(short, long)]
        calls: PathBuf,

        /// Overrides NPC_EVAL_MATCH_THRESHOLD
        #[arg(long)]
        threshold: Option<MatchThreshold>,

        /// Overrides NPC_EVAL_UNMATCHED_RETURN (`placeholder` or `empty`)
        #[arg(long)]
        unmatched_return: Option<UnmatchedReturn>,
    },
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Functions {
            dataset,
            results,
            output,
        } => score_functions(&dataset, &results, output),
        Commands::Responses {
            dataset,
            results,
            output,
        } => score_responses(&dataset, &results, output),
        Commands::Execute {
            gold,
            calls,
            threshold,
            unmatched_return,
        } => execute_calls(&gold, &calls, threshold, unmatched_return),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn report_path(output: Option<PathBuf>, kind: &str) -> PathBuf {
    output.unwrap_or_else(|| {
        BASE_SCORE_PATH.join(format!("{}_{}.json", kind, Local::now().format("%Y%m%d_%H%M%S")))
    })
}

fn warn_undeclared_functions(conversations: &[Conversation], results: &[ConversationResult]) {
    let predicted = predicted_function_names(results);
    for conversation in conversations {
        let Some(list_id) = &conversation.function_list_id else {
            continue;
        };
        let Some(function_list) = FUNCTION_LISTS.get(list_id) else {
            warn!(
                "conversation {} uses unknown function list {}",
                conversation.data_id, list_id
            );
            continue;
        };
        for name in predicted.get(&conversation.data_id).into_iter().flatten() {
            if !function_list.declares(name) {
                warn!(
                    "conversation {} called {}, which {} does not declare",
                    conversation.data_id, name, list_id
                );
            }
        }
    }
}

fn score_functions(dataset: &Path, results: &Path, output: Option<PathBuf>) -> Result<(), EvalError> {
    let conversations = load_conversations(dataset)?;
    let results = load_results(results)?;
    warn_undeclared_functions(&conversations, &results);

    let gold = gold_function_names(&conversations);
    let pred = predicted_function_names(&results);
    let accuracy = function_accuracy(&gold, &pred);
    info!(
        "function accuracy: {:.2}% ({}/{})",
        accuracy.accuracy * 100.0,
        accuracy.correct_count,
        accuracy.total_count
    );

    let report = json!({
        "evaluated_at": Local::now().to_rfc3339(),
        "dataset": dataset.display().to_string(),
        FUNCTION_ACCURACY: accuracy.accuracy,
        "correct_count": accuracy.correct_count,
        "total_count": accuracy.total_count,
        "details": accuracy.details,
    });
    let path = report_path(output, "functions");
    write_json_to_file(&path, &report)?;
    info!("report written to {}", path.display());
    Ok(())
}

fn score_responses(dataset: &Path, results: &Path, output: Option<PathBuf>) -> Result<(), EvalError> {
    let conversations = load_conversations(dataset)?;
    let results = load_results(results)?;

    let mut scorer = ResponseScorer::new();
    let mut turns = Vec::new();
    for pair in pair_responses(&conversations, &results) {
        let record = scorer.score_turn(&pair.gold_response, &pair.generated_response);
        turns.push(json!({
            "data_id": pair.data_id,
            "turn": pair.turn,
            "generated_response": pair.generated_response,
            "gold_response": pair.gold_response,
            "word_f1": record.word_f1,
            "bleu": record.bleu,
        }));
    }
    let summary = scorer.summary();
    for (metric, value) in summary.averages.iter() {
        info!("average {}: {:.4}", metric, value);
    }

    let report = json!({
        "evaluated_at": Local::now().to_rfc3339(),
        "dataset": dataset.display().to_string(),
        "turn_count": summary.turn_count,
        "averages": summary.averages,
        "turns": turns,
    });
    let path = report_path(output, "responses");
    write_json_to_file(&path, &report)?;
    info!("report written to {}", path.display());
    Ok(())
}

fn load_generated_calls(path: &Path) -> Result<Vec<GeneratedCall>, EvalError> {
    if path.extension().is_some_and(|ext| ext == "json") {
        return parse_call_list(&load_json(path)?);
    }
    let text = std::fs::read_to_string(path).map_err(|e| EvalError::io(path, e))?;
    decode_function_list(&text)
}

fn execute_calls(
    gold: &Path,
    calls: &Path,
    threshold: Option<MatchThreshold>,
    unmatched_return: Option<UnmatchedReturn>,
) -> Result<(), EvalError> {
    let mut config = EvalConfig::from_env()?;
    if let Some(threshold) = threshold {
        config.match_threshold = threshold;
    }
    if let Some(unmatched_return) = unmatched_return {
        config.unmatched_return = unmatched_return;
    }
    info!(
        "match threshold {}, unmatched return {:?}",
        config.match_threshold, config.unmatched_return
    );

    let gold_functions: Vec<FunctionCall> = parse_call_list(&load_json(gold)?)?;
    let generated = load_generated_calls(calls)?;
    let mut executor = Executor::new(gold_functions, &config);
    let executed = executor.execute(&generated);
    println!("{}", serde_json::to_string_pretty(&executed)?);
    Ok(())
}
