//! Centralized Configuration Management
//!
//! This module consolidates the configuration structures used by the engine
//! so the runtime and the server binary share one consistent interface.

use core::time::Duration;
use serde::{Deserialize, Serialize};

use crate::{DuochatError, DuochatResult};

// ----------------------------------------------------------------------------
// Typing Configuration
// ----------------------------------------------------------------------------

/// Configuration for the typing indicator debounce
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TypingConfig {
    /// Inactivity window after which a typing indicator expires
    pub inactivity_window_ms: u64,
}

impl Default for TypingConfig {
    fn default() -> Self {
        Self {
            inactivity_window_ms: 2_000,
        }
    }
}

impl TypingConfig {
    /// Short window used by tests driving a paused clock
    pub fn testing() -> Self {
        Self {
            inactivity_window_ms: 50,
        }
    }

    pub fn inactivity_window(&self) -> Duration {
        Duration::from_millis(self.inactivity_window_ms)
    }
}

// ----------------------------------------------------------------------------
// Directory Configuration
// ----------------------------------------------------------------------------

/// How the router consults the user directory
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectoryConfig {
    /// Drop `register` events for identities the directory does not know
    pub require_known_users: bool,
}

// ----------------------------------------------------------------------------
// Channel Configuration
// ----------------------------------------------------------------------------

/// Buffer sizing for the transport side
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    /// Inbound frames buffered per connection before the reader applies backpressure
    pub inbound_buffer_size: usize,
    /// Largest inbound text frame accepted, in bytes
    pub max_frame_bytes: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            inbound_buffer_size: 64,
            max_frame_bytes: 64 * 1024,
        }
    }
}

impl ChannelConfig {
    /// Create configuration for low-memory environments
    pub fn low_memory() -> Self {
        Self {
            inbound_buffer_size: 16,
            max_frame_bytes: 16 * 1024,
        }
    }
}

// ----------------------------------------------------------------------------
// Top-level Configuration
// ----------------------------------------------------------------------------

/// Complete engine configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DuochatConfig {
    pub typing: TypingConfig,
    pub directory: DirectoryConfig,
    pub channels: ChannelConfig,
}

impl DuochatConfig {
    /// Configuration tuned for tests
    pub fn testing() -> Self {
        Self {
            typing: TypingConfig::testing(),
            ..Self::default()
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> DuochatResult<()> {
        if self.typing.inactivity_window_ms == 0 {
            return Err(DuochatError::config_error(
                "typing.inactivity_window_ms must be greater than zero",
            ));
        }
        if self.channels.inbound_buffer_size == 0 {
            return Err(DuochatError::config_error(
                "channels.inbound_buffer_size must be greater than zero",
            ));
        }
        if self.channels.max_frame_bytes < 64 {
            return Err(DuochatError::config_error(
                "channels.max_frame_bytes must be at least 64",
            ));
        }
        Ok(())
    }
}
