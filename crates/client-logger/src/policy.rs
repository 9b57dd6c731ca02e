// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use crate::config::{Environment, LoggerConfig};
use crate::record::{Level, LevelSet};

/// Runtime switches shared by every logger handle and the dispatcher.
///
/// Mutations apply to the next log call. The dispatcher re-reads
/// `send_to_backend` when it is about to dispatch.
#[derive(Debug)]
pub struct Policy {
    environment: Environment,
    enabled: AtomicBool,
    send_to_backend: AtomicBool,
    production_levels: AtomicU8,
}

impl Policy {
    #[must_use]
    pub fn new(config: &LoggerConfig) -> Self {
        Self {
            environment: config.environment,
            enabled: AtomicBool::new(config.enabled),
            send_to_backend: AtomicBool::new(config.send_to_backend),
            production_levels: AtomicU8::new(config.production_levels.bits()),
        }
    }

    #[must_use]
    pub fn environment(&self) -> Environment {
        self.environment
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    #[must_use]
    pub fn send_to_backend(&self) -> bool {
        self.send_to_backend.load(Ordering::Relaxed)
    }

    pub fn set_send_to_backend(&self, send: bool) {
        self.send_to_backend.store(send, Ordering::Relaxed);
    }

    #[must_use]
    pub fn production_levels(&self) -> LevelSet {
        LevelSet::from_bits(self.production_levels.load(Ordering::Relaxed))
    }

    pub fn set_production_levels(&self, levels: LevelSet) {
        self.production_levels
            .store(levels.bits(), Ordering::Relaxed);
    }

    /// Whether a record at `level` should be handed to the dispatcher.
    ///
    /// Development forwards warnings and errors only, whatever the production
    /// filter says.
    #[must_use]
    pub fn forwards(&self, level: Level) -> bool {
        if !self.send_to_backend() {
            return false;
        }
        match self.environment {
            Environment::Development => matches!(level, Level::Warning | Level::Error),
            Environment::Production => self.production_levels().contains(level),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(environment: Environment) -> Policy {
        Policy::new(&LoggerConfig {
            environment,
            ..Default::default()
        })
    }

    #[test]
    fn test_development_forwards_warnings_and_errors_only() {
        let policy = policy(Environment::Development);
        policy.set_production_levels(Level::ALL.into_iter().collect());

        assert!(!policy.forwards(Level::Debug));
        assert!(!policy.forwards(Level::Info));
        assert!(policy.forwards(Level::Warning));
        assert!(policy.forwards(Level::Error));
    }

    #[test]
    fn test_production_uses_level_filter() {
        let policy = policy(Environment::Production);
        assert!(policy.forwards(Level::Error));
        assert!(!policy.forwards(Level::Info));

        policy.set_production_levels([Level::Info].into_iter().collect());
        assert!(policy.forwards(Level::Info));
        assert!(!policy.forwards(Level::Error));
    }

    #[test]
    fn test_forwarding_switch() {
        let policy = policy(Environment::Production);
        policy.set_send_to_backend(false);
        assert!(!policy.forwards(Level::Error));

        policy.set_send_to_backend(true);
        assert!(policy.forwards(Level::Error));
    }

    #[test]
    fn test_enabled_switch() {
        let policy = policy(Environment::Development);
        assert!(policy.enabled());
        policy.set_enabled(false);
        assert!(!policy.enabled());
    }
}
