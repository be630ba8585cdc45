use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReckonError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Structurally invalid input file. Fatal for the whole run.
    #[error("Data format error in {}: {reason}", file.display())]
    DataFormat { file: PathBuf, reason: String },

    #[error("No transactions found for {0}")]
    EmptyInput(String),

    #[error("Unknown family: {0}")]
    UnknownFamily(String),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, ReckonError>;
