//! Connection state machine primitives

use std::time::Duration;

use serde::{Deserialize, Serialize};

use shared::util::now_millis;

use crate::core::RealtimeConfig;

/// Connection lifecycle
///
/// ```text
/// Disconnected → Connecting → Connected
///                    ▲            │ error
///                    └─ Reconnecting ──(max retries)──► Failed
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
    /// Gave up after `max_retries`; only a manual reconnect resumes
    Failed,
}

/// Connection bookkeeping, owned by the manager task and mirrored for
/// callers observing connection state
#[derive(Debug, Clone)]
pub struct ConnectionState {
    pub status: ConnectionStatus,
    pub retry_attempts: u32,
    /// Unix millis of the last successful handshake
    pub last_connected_at: Option<i64>,
}

impl ConnectionState {
    pub fn new() -> Self {
        Self {
            status: ConnectionStatus::Disconnected,
            retry_attempts: 0,
            last_connected_at: None,
        }
    }
}

impl Default for ConnectionState {
    fn default() -> Self {
        Self::new()
    }
}

/// Exponential backoff: `min(initial * 2^attempts, max)`
pub fn retry_delay(config: &RealtimeConfig, attempts: u32) -> Duration {
    let initial = config.initial_retry_delay.as_millis() as u64;
    let max = config.max_retry_delay.as_millis() as u64;
    let factor = 2u64.saturating_pow(attempts.min(32));
    Duration::from_millis(initial.saturating_mul(factor).min(max))
}

/// Fail-fast guard over consecutive connection failures, independent of
/// the status state machine.
///
/// Once failures reach the threshold the breaker opens for a cooldown
/// window; attempts made while open are rejected without any network
/// call. It closes again on the next success.
#[derive(Debug)]
pub struct CircuitBreaker {
    threshold: u32,
    cooldown: Duration,
    consecutive_failures: u32,
    open_until: Option<i64>,
}

impl CircuitBreaker {
    pub fn new(config: &RealtimeConfig) -> Self {
        Self {
            threshold: config.breaker_threshold,
            cooldown: config.breaker_cooldown,
            consecutive_failures: 0,
            open_until: None,
        }
    }

    /// Gate an attempt: `Err(open_until)` while the cooldown is running.
    pub fn check(&mut self) -> Result<(), i64> {
        if let Some(until) = self.open_until {
            if now_millis() < until {
                return Err(until);
            }
            // cooldown elapsed — let the next attempt probe the backend
            self.open_until = None;
        }
        Ok(())
    }

    /// Unix millis until which the breaker is open, if it is
    pub fn open_until(&self) -> Option<i64> {
        self.open_until.filter(|until| now_millis() < *until)
    }

    pub fn record_success(&mut self) {
        self.consecutive_failures = 0;
        self.open_until = None;
    }

    pub fn record_failure(&mut self) {
        self.consecutive_failures += 1;
        if self.consecutive_failures >= self.threshold && self.open_until.is_none() {
            let until = now_millis() + self.cooldown.as_millis() as i64;
            self.open_until = Some(until);
            tracing::warn!(
                failures = self.consecutive_failures,
                open_until = until,
                "Circuit breaker opened"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> RealtimeConfig {
        RealtimeConfig {
            initial_retry_delay: Duration::from_millis(100),
            max_retry_delay: Duration::from_secs(30),
            ..RealtimeConfig::default()
        }
    }

    #[test]
    fn test_retry_delay_doubles_per_attempt() {
        let config = config();
        assert_eq!(retry_delay(&config, 0), Duration::from_millis(100));
        assert_eq!(retry_delay(&config, 1), Duration::from_millis(200));
        assert_eq!(retry_delay(&config, 2), Duration::from_millis(400));
    }

    #[test]
    fn test_retry_delay_never_exceeds_the_cap() {
        let config = config();
        for attempts in 0..200 {
            assert!(retry_delay(&config, attempts) <= config.max_retry_delay);
        }
        assert_eq!(retry_delay(&config, 63), config.max_retry_delay);
    }

    #[test]
    fn test_breaker_opens_at_threshold_and_closes_on_success() {
        let config = RealtimeConfig {
            breaker_threshold: 3,
            breaker_cooldown: Duration::from_secs(60),
            ..RealtimeConfig::default()
        };
        let mut breaker = CircuitBreaker::new(&config);

        breaker.record_failure();
        breaker.record_failure();
        assert!(breaker.check().is_ok());

        breaker.record_failure();
        assert!(breaker.check().is_err());
        assert!(breaker.open_until().is_some());

        breaker.record_success();
        assert!(breaker.check().is_ok());
        assert_eq!(breaker.open_until(), None);
    }

    #[test]
    fn test_breaker_reopens_after_cooldown_elapses() {
        let config = RealtimeConfig {
            breaker_threshold: 1,
            breaker_cooldown: Duration::from_millis(20),
            ..RealtimeConfig::default()
        };
        let mut breaker = CircuitBreaker::new(&config);

        breaker.record_failure();
        assert!(breaker.check().is_err());

        std::thread::sleep(Duration::from_millis(30));
        // cooldown over: the next attempt is allowed through
        assert!(breaker.check().is_ok());
    }
}
