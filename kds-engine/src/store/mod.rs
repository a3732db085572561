//! Persistent store and change-feed seams
//!
//! The relational store lives outside this crate; the engine reaches it
//! through two traits:
//!
//! - [`EngineStore`] — typed row CRUD, one method per query shape the
//!   engine needs (no generic predicate plumbing)
//! - [`ChangeFeed`] — push-based subscription to row-level changes,
//!   delivered as typed [`ChangeEvent`]s over an mpsc channel
//!
//! [`MemoryStore`] implements both in-process for tests and embedding.

mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

use shared::{ActiveEntry, ChangeEvent, OrderInfo, OrderStatus, RoutingEntry, Station};

/// Store-level errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Record not found: {0}")]
    NotFound(String),

    /// Network/timeout failure — retryable at the connection-manager layer
    #[error("Transient store failure: {0}")]
    Transient(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Handle for an active change-feed subscription
pub type SubscriptionId = u64;

/// Change-feed subscription topics, one per record type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeedTopic {
    Entries,
    Stations,
    Orders,
}

impl FeedTopic {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedTopic::Entries => "routing_entries",
            FeedTopic::Stations => "stations",
            FeedTopic::Orders => "orders",
        }
    }
}

impl std::fmt::Display for FeedTopic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Row access for the engine, one method per query shape.
///
/// Active-entry listings are ordered by `priority` descending then
/// `routed_at` ascending; implementations must preserve that contract.
#[async_trait]
pub trait EngineStore: Send + Sync {
    /// Active stations ordered by display position
    async fn list_stations(&self) -> StoreResult<Vec<Station>>;

    async fn get_order(&self, order_id: &str) -> StoreResult<Option<OrderInfo>>;

    /// Advance an order's status (readiness side effect of bumping)
    async fn set_order_status(&self, order_id: &str, status: OrderStatus) -> StoreResult<()>;

    async fn insert_entry(&self, entry: RoutingEntry) -> StoreResult<RoutingEntry>;

    async fn get_entry(&self, entry_id: &str) -> StoreResult<Option<RoutingEntry>>;

    /// Full-row update; `NotFound` when the entry does not exist
    async fn update_entry(&self, entry: RoutingEntry) -> StoreResult<RoutingEntry>;

    /// All entries with `completed_at = NULL`
    async fn active_entries(&self) -> StoreResult<Vec<RoutingEntry>>;

    async fn active_entries_for_station(&self, station_id: &str)
        -> StoreResult<Vec<RoutingEntry>>;

    /// Every entry for the order, active or completed
    async fn entries_for_order(&self, order_id: &str) -> StoreResult<Vec<RoutingEntry>>;

    async fn active_entries_for_table(&self, table_id: &str) -> StoreResult<Vec<RoutingEntry>>;

    /// Every entry belonging to an order still open on the floor, joined
    /// with its order context. Completed entries stay in this view until
    /// the upstream collaborator closes the order, so table groupings can
    /// show bumped items as done rather than dropping them.
    async fn entries_with_orders(&self) -> StoreResult<Vec<ActiveEntry>>;
}

/// Push-based change subscription primitive.
#[async_trait]
pub trait ChangeFeed: Send + Sync {
    /// Subscribe to row changes for a topic.
    ///
    /// Resolves once the subscription handshake completes; afterwards
    /// events are delivered on `sink` until [`Self::unsubscribe`].
    async fn subscribe(
        &self,
        topic: FeedTopic,
        sink: mpsc::Sender<ChangeEvent>,
    ) -> StoreResult<SubscriptionId>;

    async fn unsubscribe(&self, id: SubscriptionId) -> StoreResult<()>;

    /// Lightweight no-op query used by the periodic health check
    async fn ping(&self) -> StoreResult<()>;
}
