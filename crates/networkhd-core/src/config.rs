// ── Runtime coordinator configuration ──
//
// Describes *how* the coordinator talks to one controller: connection
// parameters plus polling and retry tuning. Never touches disk; the
// config crate (or any embedder) builds a `CoordinatorConfig` and hands
// it in.

use std::time::Duration;

pub use networkhd_api::{ConnectionConfig, HostKeyPolicy};

use crate::error::CoreError;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);
pub const MIN_POLL_INTERVAL: Duration = Duration::from_secs(10);
pub const MAX_POLL_INTERVAL: Duration = Duration::from_secs(300);

/// Polling, retry, and caching knobs for a `Coordinator`.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    pub connection: ConnectionConfig,
    /// Period of the background full refresh.
    pub poll_interval: Duration,
    /// Attempts per query before giving up on that source for this cycle.
    pub retry_attempts: u32,
    /// Pause between query attempts.
    pub retry_delay: Duration,
    /// Attempts to open the session during setup.
    pub connect_attempts: u32,
    pub connect_delay: Duration,
    /// How long static device info and controller metadata are reused.
    pub static_info_ttl: Duration,
    /// How long setup waits for a first successful refresh.
    pub setup_wait_timeout: Duration,
}

impl CoordinatorConfig {
    pub fn new(connection: ConnectionConfig) -> Self {
        Self {
            connection,
            poll_interval: DEFAULT_POLL_INTERVAL,
            retry_attempts: 3,
            retry_delay: Duration::from_secs(2),
            connect_attempts: 3,
            connect_delay: Duration::from_secs(2),
            static_info_ttl: Duration::from_secs(600),
            setup_wait_timeout: Duration::from_secs(30),
        }
    }

    /// Reject settings the coordinator cannot run with.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.connection.host.trim().is_empty() {
            return Err(CoreError::Config {
                message: "host must not be empty".into(),
            });
        }
        if !(MIN_POLL_INTERVAL..=MAX_POLL_INTERVAL).contains(&self.poll_interval) {
            return Err(CoreError::Config {
                message: format!(
                    "poll interval must be between {}s and {}s, got {}s",
                    MIN_POLL_INTERVAL.as_secs(),
                    MAX_POLL_INTERVAL.as_secs(),
                    self.poll_interval.as_secs()
                ),
            });
        }
        if self.retry_attempts == 0 || self.connect_attempts == 0 {
            return Err(CoreError::Config {
                message: "retry and connect attempts must be at least 1".into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let cfg = CoordinatorConfig::new(ConnectionConfig::new("10.0.0.2"));
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.retry_attempts, 3);
    }

    #[test]
    fn poll_interval_bounds_are_enforced() {
        let mut cfg = CoordinatorConfig::new(ConnectionConfig::new("10.0.0.2"));
        cfg.poll_interval = Duration::from_secs(5);
        assert!(matches!(cfg.validate(), Err(CoreError::Config { .. })));

        cfg.poll_interval = Duration::from_secs(300);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn empty_host_is_rejected() {
        let cfg = CoordinatorConfig::new(ConnectionConfig::new("  "));
        assert!(cfg.validate().is_err());
    }
}
