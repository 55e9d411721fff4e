//! Error types for the engine.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("invalid scan configuration: {0}")]
    Config(String),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("failed to parse request body: {0}")]
    BodyParse(String),

    #[error("failed to compile regex: {0}")]
    RegexCompile(#[from] regex::Error),

    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("failed to read raw request file: {0}")]
    RawRequest(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;
