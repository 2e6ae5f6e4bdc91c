use pyo3::prelude::*;

pub mod bertscore;
pub mod bleu;
pub mod config;
pub mod dataset;
pub mod embedding;
pub mod error;
pub mod executor;
pub mod function_call;
pub mod function_kind;
pub mod function_lists;
pub mod judge;
pub mod matcher;
pub mod normalize;
pub mod parse_calls;
pub mod paths;
pub mod python_interface;
pub mod scorer;
pub mod utils;
pub mod word_f1;

#[pymodule]
pub mod npc_eval {
    #[pymodule_export]
    use super::executor::Executor;
    #[pymodule_export]
    use super::scorer::ResponseScorer;
    #[pymodule_export]
    use super::python_interface::{
        py_decode_function_list, py_function_accuracy, py_normalize_value, py_word_f1,
    };
}
