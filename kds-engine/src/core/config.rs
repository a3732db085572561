//! Engine configuration
//!
//! All tuning constants live here with their production defaults. The
//! scoring weights and retry thresholds are deliberately overridable:
//! they are hand-tuned values, not derived ones, and deployments adjust
//! them per kitchen.

use std::time::Duration;

/// Top-level engine configuration, injected at [`crate::KitchenEngine`] init
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    pub cache: CacheConfig,
    pub realtime: RealtimeConfig,
    pub scoring: ScoringConfig,
    pub attention: AttentionConfig,
}

/// Cache sizing and per-tier TTLs
///
/// TTLs are deliberately short and tiered by volatility: station lists
/// rarely change, active-order views must reflect kitchen reality within
/// seconds, joined detail views sit in between.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Max cached entries before LRU eviction kicks in
    pub capacity: usize,
    /// Station list TTL
    pub stations_ttl: Duration,
    /// Per-station and all-active order view TTL
    pub active_orders_ttl: Duration,
    /// Joined order/table/seat lookup TTL
    pub detail_ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: 512,
            stations_ttl: Duration::from_secs(90),
            active_orders_ttl: Duration::from_secs(4),
            detail_ttl: Duration::from_secs(15),
        }
    }
}

/// Connection manager tuning
#[derive(Debug, Clone)]
pub struct RealtimeConfig {
    /// First retry delay; doubles per attempt up to `max_retry_delay`
    pub initial_retry_delay: Duration,
    pub max_retry_delay: Duration,
    /// Automatic retries before the manager gives up (`Failed` status)
    pub max_retries: u32,
    /// Consecutive failures before the circuit breaker opens
    pub breaker_threshold: u32,
    /// How long the breaker stays open once tripped
    pub breaker_cooldown: Duration,
    /// Subscription handshake timeout — attempts not `Connected` within
    /// this window count as failed
    pub subscribe_timeout: Duration,
    /// Interval between health-check pings while connected
    pub health_check_interval: Duration,
    /// Events for the same record id inside this window are dropped
    pub dedup_window: Duration,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            initial_retry_delay: Duration::from_secs(1),
            max_retry_delay: Duration::from_secs(30),
            max_retries: 10,
            breaker_threshold: 5,
            breaker_cooldown: Duration::from_secs(60),
            subscribe_timeout: Duration::from_secs(10),
            health_check_interval: Duration::from_secs(30),
            dedup_window: Duration::from_millis(1000),
        }
    }
}

/// Table priority scoring weights
///
/// `entry_score = (priority + 1) * (1 + age_weight + item_weight)` where
/// `age_weight = min(age_minutes / age_divisor_minutes, age_weight_cap)`
/// and `item_weight = min(item_count / item_divisor, item_weight_cap)`.
#[derive(Debug, Clone)]
pub struct ScoringConfig {
    pub age_divisor_minutes: f64,
    pub age_weight_cap: f64,
    pub item_divisor: f64,
    pub item_weight_cap: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            age_divisor_minutes: 15.0,
            age_weight_cap: 3.0,
            item_divisor: 5.0,
            item_weight_cap: 2.0,
        }
    }
}

/// Thresholds for the needs-attention filter
///
/// An entry is flagged when any one of these trips.
#[derive(Debug, Clone)]
pub struct AttentionConfig {
    /// Order age in minutes beyond which the entry is at risk
    pub max_age_minutes: i64,
    pub min_priority: i32,
    pub min_recalls: i32,
}

impl Default for AttentionConfig {
    fn default() -> Self {
        Self {
            max_age_minutes: 20,
            min_priority: 5,
            min_recalls: 2,
        }
    }
}
