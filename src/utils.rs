use std::{
    fs::{File, create_dir_all},
    io::{BufRead, BufReader, Write},
    path::Path,
};

use serde::Serialize;

use crate::error::EvalError;

pub fn load_json_lines(file_path: impl AsRef<Path>) -> Result<Vec<serde_json::Value>, EvalError> {
    let file_path = file_path.as_ref();
    let file = File::open(file_path).map_err(|e| EvalError::io(file_path, e))?;
    let reader = BufReader::new(file);

    let mut results = Vec::new();
    for line in reader.lines() {
        let line = line.map_err(|e| EvalError::io(file_path, e))?;
        if line.trim().is_empty() {
            continue;
        }
        results.push(serde_json::from_str(&line)?);
    }
    Ok(results)
}

/// Loads a whole JSON document. `.jsonl` files are read line by line and
/// returned as one array.
pub fn load_json(file_path: impl AsRef<Path>) -> Result<serde_json::Value, EvalError> {
    let file_path = file_path.as_ref();
    if file_path.extension().is_some_and(|ext| ext == "jsonl") {
        return Ok(serde_json::Value::Array(load_json_lines(file_path)?));
    }
    let file = File::open(file_path).map_err(|e| EvalError::io(file_path, e))?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}

pub fn write_json_to_file(
    file_path: impl AsRef<Path>,
    value: &impl Serialize,
) -> Result<(), EvalError> {
    let file_path = file_path.as_ref();
    if let Some(parent) = file_path.parent() {
        create_dir_all(parent).map_err(|e| EvalError::io(parent, e))?;
    }
    let mut file = File::create(file_path).map_err(|e| EvalError::io(file_path, e))?;
    serde_json::to_writer_pretty(&mut file, value)?;
    writeln!(file).map_err(|e| EvalError::io(file_path, e))?;
    file.flush().map_err(|e| EvalError::io(file_path, e))?;
    Ok(())
}
