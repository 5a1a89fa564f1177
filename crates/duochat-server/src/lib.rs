//! Duochat server library
//!
//! Command line parsing, layered configuration and the WebSocket transport
//! that connects clients to a `DispatchRouter`.

pub mod cli;
pub mod config;
pub mod error;
pub mod transport;

pub use cli::Cli;
pub use config::ServerConfig;
pub use error::{Result, ServerError};
pub use transport::WebSocketServer;
