//! Sync subsystem configuration.
//!
//! Provides [`SyncConfig`], the tuning knobs shared by the sync engine, the
//! scheduler and the connectivity monitor. Defaults mirror the production
//! policy: a pass every five minutes while online, one fixed-delay retry after a
//! transient failure, and a queue entry dropped after five failed attempts.

use std::time::Duration;

use serde::{Deserialize, Serialize};

const DEFAULT_PERIODIC_INTERVAL_SECS: u64 = 5 * 60;
const DEFAULT_RETRY_DELAY_SECS: u64 = 30;
const DEFAULT_MAX_QUEUE_ATTEMPTS: u32 = 5;
const DEFAULT_PASS_TIMEOUT_SECS: u64 = 120;
const DEFAULT_QUEUE_BATCH_LIMIT: usize = 500;
const DEFAULT_PROBE_INTERVAL_SECS: u64 = 15;

/// Tuning for reconciliation, scheduling and reachability probing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Interval between periodic passes while online
    pub periodic_interval: Duration,
    /// Fixed delay before retrying a transiently failed pass
    pub retry_delay: Duration,
    /// Queue entries reaching this many failed attempts are dropped
    pub max_queue_attempts: u32,
    /// Deadline for one reconciliation pass
    pub pass_timeout: Duration,
    /// Maximum queue entries settled per pass
    pub queue_batch_limit: usize,
    /// Interval between reachability probes
    pub probe_interval: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            periodic_interval: Duration::from_secs(DEFAULT_PERIODIC_INTERVAL_SECS),
            retry_delay: Duration::from_secs(DEFAULT_RETRY_DELAY_SECS),
            max_queue_attempts: DEFAULT_MAX_QUEUE_ATTEMPTS,
            pass_timeout: Duration::from_secs(DEFAULT_PASS_TIMEOUT_SECS),
            queue_batch_limit: DEFAULT_QUEUE_BATCH_LIMIT,
            probe_interval: Duration::from_secs(DEFAULT_PROBE_INTERVAL_SECS),
        }
    }
}

impl SyncConfig {
    /// Set the periodic sync interval
    #[must_use]
    pub const fn with_periodic_interval(mut self, interval: Duration) -> Self {
        self.periodic_interval = interval;
        self
    }

    /// Set the transient-failure retry delay
    #[must_use]
    pub const fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Set the per-entry attempt ceiling
    #[must_use]
    pub const fn with_max_queue_attempts(mut self, attempts: u32) -> Self {
        self.max_queue_attempts = attempts;
        self
    }

    /// Set the per-pass deadline
    #[must_use]
    pub const fn with_pass_timeout(mut self, timeout: Duration) -> Self {
        self.pass_timeout = timeout;
        self
    }

    /// Set how many queue entries one pass settles
    #[must_use]
    pub const fn with_queue_batch_limit(mut self, limit: usize) -> Self {
        self.queue_batch_limit = limit;
        self
    }

    /// Set the reachability probe interval
    #[must_use]
    pub const fn with_probe_interval(mut self, interval: Duration) -> Self {
        self.probe_interval = interval;
        self
    }

    /// Reject values that would spin the scheduler or never drop entries.
    pub fn validate(&self) -> Result<(), String> {
        if self.periodic_interval.is_zero() {
            return Err("periodic_interval must be greater than zero".to_string());
        }
        if self.probe_interval.is_zero() {
            return Err("probe_interval must be greater than zero".to_string());
        }
        if self.pass_timeout.is_zero() {
            return Err("pass_timeout must be greater than zero".to_string());
        }
        if self.max_queue_attempts == 0 {
            return Err("max_queue_attempts must be at least 1".to_string());
        }
        if self.queue_batch_limit == 0 {
            return Err("queue_batch_limit must be at least 1".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_sync_policy() {
        let config = SyncConfig::default();
        assert_eq!(config.periodic_interval, Duration::from_secs(300));
        assert_eq!(config.retry_delay, Duration::from_secs(30));
        assert_eq!(config.max_queue_attempts, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_interval() {
        let config = SyncConfig::default().with_periodic_interval(Duration::ZERO);
        let error = config.validate().unwrap_err();
        assert!(error.contains("periodic_interval"));
    }

    #[test]
    fn partial_json_uses_defaults() {
        let config: SyncConfig =
            serde_json::from_str(r#"{"max_queue_attempts": 3}"#).expect("config should parse");
        assert_eq!(config.max_queue_attempts, 3);
        assert_eq!(config.retry_delay, Duration::from_secs(30));
    }
}
