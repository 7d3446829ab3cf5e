//! Load model snapshots from JSON

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use super::Model;

/// Errors raised while reading a model snapshot
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("failed to read model: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid model JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("duplicate item names: {}", .0.join(", "))]
    DuplicateNames(Vec<String>),
}

/// Load a model from a JSON file
pub fn load_model<P: AsRef<Path>>(path: P) -> Result<Model, ModelError> {
    let file = File::open(path)?;
    load_model_from_reader(BufReader::new(file))
}

/// Load a model from any reader (e.g., string buffer, stdin)
pub fn load_model_from_reader<R: Read>(reader: R) -> Result<Model, ModelError> {
    let model: Model = serde_json::from_reader(reader)?;

    let duplicates = model.duplicate_names();
    if !duplicates.is_empty() {
        return Err(ModelError::DuplicateNames(duplicates));
    }

    Ok(model)
}
