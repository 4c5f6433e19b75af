//! Recoverable runtime errors
//!
//! Value-level failures (division by zero, bad indices, ...) are not errors:
//! they go through the panic protocol. This type covers the few places where
//! the embedder gets a chance to react: loading configuration and decoding
//! string payloads at the host boundary.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration parse error: {0}")]
    ConfigParse(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("String is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
}

pub type Result<T> = std::result::Result<T, RuntimeError>;
