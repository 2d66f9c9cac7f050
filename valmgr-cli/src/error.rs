use std::path::PathBuf;

use thiserror::Error;
use valmgr_lib::ValidationError;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config {}: {source}", .path.display())]
    Config {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("unknown log level: {0}")]
    LogLevel(String),
    #[error("failed to initialize logger: {0}")]
    Logger(#[from] log::SetLoggerError),
    #[error("failed to create log file {}: {source}", .path.display())]
    LogFile {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("{}: {source}", .path.display())]
    ModelState {
        path: PathBuf,
        source: ValidationError,
    },
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),
    #[error("output error: {0}")]
    Output(#[from] serde_json::Error),
}
