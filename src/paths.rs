use std::{path::PathBuf, sync::LazyLock};

pub static DEFAULT_DATASET_PATH: LazyLock<PathBuf> =
    LazyLock::new(|| PathBuf::from("data/task1_sample.json"));

pub static DEFAULT_RESULTS_PATH: LazyLock<PathBuf> =
    LazyLock::new(|| PathBuf::from("results/responses.json"));

pub static BASE_SCORE_PATH: LazyLock<PathBuf> = LazyLock::new(|| PathBuf::from("scores"));
