//! Router Builder API
//!
//! Builder-style construction for consumers (server, tests) that want a
//! `DispatchRouter` without wiring every collaborator by hand.

use std::sync::Arc;

use duochat_core::{
    DuochatConfig, DuochatResult, InMemoryMessageStore, InMemoryUserDirectory, MessageStore,
    SystemTimeSource, TimeSource, UserDirectory,
};
use tracing::info;

use crate::logic::DispatchRouter;

// ----------------------------------------------------------------------------
// Router Builder
// ----------------------------------------------------------------------------

/// Builder for a shared `DispatchRouter`
///
/// Collaborators not supplied fall back to the in-memory implementations and
/// the system clock.
#[derive(Default)]
pub struct RouterBuilder {
    config: DuochatConfig,
    store: Option<Arc<dyn MessageStore>>,
    directory: Option<Arc<dyn UserDirectory>>,
    time_source: Option<Arc<dyn TimeSource>>,
}

impl RouterBuilder {
    /// Create a new router builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the engine configuration
    pub fn with_config(mut self, config: DuochatConfig) -> Self {
        self.config = config;
        self
    }

    /// Use `store` for message persistence
    pub fn with_store(mut self, store: Arc<dyn MessageStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Use `directory` for user lookups
    pub fn with_directory(mut self, directory: Arc<dyn UserDirectory>) -> Self {
        self.directory = Some(directory);
        self
    }

    /// Use `time_source` for message and read timestamps
    pub fn with_time_source(mut self, time_source: Arc<dyn TimeSource>) -> Self {
        self.time_source = Some(time_source);
        self
    }

    /// Set the typing inactivity window
    pub fn typing_window_ms(mut self, window_ms: u64) -> Self {
        self.config.typing.inactivity_window_ms = window_ms;
        self
    }

    /// Only accept registrations for identities the directory knows
    pub fn require_known_users(mut self, enabled: bool) -> Self {
        self.config.directory.require_known_users = enabled;
        self
    }

    /// Validate the configuration and build the router
    ///
    /// Must be called inside a tokio runtime: typing timers are spawned on it.
    pub fn build(self) -> DuochatResult<Arc<DispatchRouter>> {
        self.config.validate()?;

        let time_source: Arc<dyn TimeSource> = match self.time_source {
            Some(time_source) => time_source,
            None => Arc::new(SystemTimeSource),
        };
        let store: Arc<dyn MessageStore> = match self.store {
            Some(store) => store,
            None => Arc::new(InMemoryMessageStore::new()),
        };
        let directory: Arc<dyn UserDirectory> = match self.directory {
            Some(directory) => directory,
            None => Arc::new(InMemoryUserDirectory::with_time_source(Arc::clone(
                &time_source,
            ))),
        };

        info!(
            typing_window_ms = self.config.typing.inactivity_window_ms,
            require_known_users = self.config.directory.require_known_users,
            "building dispatch router"
        );

        Ok(Arc::new(DispatchRouter::new(
            self.config,
            store,
            directory,
            time_source,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_builder_defaults() {
        let router = RouterBuilder::new().build().unwrap();
        assert_eq!(router.config().typing.inactivity_window_ms, 2000);
        assert!(!router.config().directory.require_known_users);
        assert!(router.online_identities().is_empty());
    }

    #[tokio::test]
    async fn test_builder_overrides() {
        let router = RouterBuilder::new()
            .typing_window_ms(250)
            .require_known_users(true)
            .build()
            .unwrap();
        assert_eq!(router.config().typing.inactivity_window_ms, 250);
        assert!(router.config().directory.require_known_users);
    }

    #[tokio::test]
    async fn test_builder_rejects_invalid_config() {
        let result = RouterBuilder::new().typing_window_ms(0).build();
        assert!(result.is_err());
    }
}
