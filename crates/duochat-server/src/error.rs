//! Error handling for the duochat server

use thiserror::Error;

/// Server-specific error types
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Duochat engine error: {0}")]
    Engine(#[from] duochat_core::DuochatError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid bind address: {0}")]
    InvalidAddress(#[from] std::net::AddrParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("TOML parsing error: {0}")]
    TomlParsing(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerialization(#[from] toml::ser::Error),
}

/// Result type for server operations
pub type Result<T> = std::result::Result<T, ServerError>;
