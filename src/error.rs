//! Error types for ndefence.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NdefenceError {
    #[error("Invalid IPv4 address: {0}")]
    InvalidAddress(String),

    #[error("Malformed log line: {0}")]
    MalformedLine(String),

    #[error("Input validation failed: {0}")]
    InputValidation(String),

    #[error("Log file is empty: {0}")]
    EmptyLog(String),

    #[error("File system error: {0}")]
    FileSystem(String),

    #[error("External process failed: {0}")]
    ExternalProcess(String),

    #[error("Configuration error: {0}")]
    Config(String),
}
