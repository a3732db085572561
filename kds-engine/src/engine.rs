//! Engine facade - explicit lifecycle and the consumer API
//!
//! [`KitchenEngine`] owns every service (cache, registry, router,
//! ledger, connection manager) as an explicitly constructed object:
//! built by [`KitchenEngine::init`], torn down by
//! [`KitchenEngine::shutdown`], injected into consumers rather than
//! reached through ambient globals. Cloning is shallow — all services
//! are shared handles.
//!
//! Display consumers read through the cache with a direct-fetch
//! fallback; kitchen mutations go through the ledger; order intake gets
//! a fire-and-forget routing entry point that never throws back.

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use shared::util::now_millis;
use shared::{ActiveEntry, ChangeEvent, RoutingEntry, Station, TableGroup};

use crate::cache::{keys, CacheService, CacheStats};
use crate::core::{EngineConfig, EngineResult};
use crate::ledger::RoutingLedger;
use crate::realtime::{ConnectionState, ConnectionStatus, RealtimeManager};
use crate::routing::{RoutingEngine, RoutingOutcome};
use crate::stations::StationRegistry;
use crate::store::{ChangeFeed, EngineStore, FeedTopic};
use crate::tables;
use crate::utils::validate_id;

#[derive(Clone)]
pub struct KitchenEngine {
    config: EngineConfig,
    store: Arc<dyn EngineStore>,
    cache: CacheService,
    registry: StationRegistry,
    router: RoutingEngine,
    ledger: RoutingLedger,
    realtime: RealtimeManager,
    shutdown: CancellationToken,
}

impl std::fmt::Debug for KitchenEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KitchenEngine")
            .field("cache", &self.cache)
            .field("connection", &self.connection_status())
            .finish()
    }
}

impl KitchenEngine {
    /// Construct the engine and bring the live-update channel up.
    ///
    /// Subscribes to the entry, order, and station change topics. A feed
    /// that cannot connect yet does not fail init: the connection
    /// manager keeps retrying in the background and every read path
    /// falls back to direct fetches until live updates arrive.
    pub async fn init(
        store: Arc<dyn EngineStore>,
        feed: Arc<dyn ChangeFeed>,
        config: EngineConfig,
    ) -> Self {
        let cache = CacheService::new(config.cache.capacity);
        let shutdown = CancellationToken::new();
        let registry = StationRegistry::new(Arc::clone(&store), cache.clone(), &config.cache);
        let router = RoutingEngine::new(Arc::clone(&store), registry.clone(), cache.clone());
        let ledger = RoutingLedger::new(Arc::clone(&store), cache.clone());
        let realtime = RealtimeManager::start(
            feed,
            cache.clone(),
            config.realtime.clone(),
            shutdown.clone(),
        );

        for topic in [FeedTopic::Entries, FeedTopic::Orders, FeedTopic::Stations] {
            if let Err(e) = realtime.watch(topic).await {
                tracing::warn!(
                    topic = %topic,
                    error = %e,
                    "Live updates unavailable at init, retrying in background"
                );
            }
        }

        tracing::info!("Kitchen engine initialized");
        Self {
            config,
            store,
            cache,
            registry,
            router,
            ledger,
            realtime,
            shutdown,
        }
    }

    /// Tear down background tasks and the feed subscriptions. Idempotent.
    pub fn shutdown(&self) {
        tracing::info!("Shutting down kitchen engine");
        self.shutdown.cancel();
    }

    // ── Order intake ────────────────────────────────────────────────

    /// Fire-and-forget routing for a newly created order.
    ///
    /// Never throws back into the order-creation path: failures are
    /// logged and the order can be re-routed manually.
    pub fn route(&self, order_id: &str) {
        let router = self.router.clone();
        let order_id = order_id.to_string();
        tokio::spawn(async move {
            match router.dispatch_order(&order_id).await {
                Ok(outcome) if outcome.failed > 0 => tracing::warn!(
                    order_id = %order_id,
                    routed = outcome.routed,
                    failed = outcome.failed,
                    "Order only partially routed"
                ),
                Ok(outcome) => tracing::debug!(
                    order_id = %order_id,
                    routed = outcome.routed,
                    "Order routed"
                ),
                Err(e) => tracing::error!(
                    order_id = %order_id,
                    error = %e,
                    "Order routing failed"
                ),
            }
        });
    }

    /// Route synchronously and report the outcome, for callers that wait
    pub async fn route_order(&self, order_id: &str) -> EngineResult<RoutingOutcome> {
        self.router.dispatch_order(order_id).await
    }

    // ── Display reads ───────────────────────────────────────────────

    pub async fn list_stations(&self) -> EngineResult<Vec<Station>> {
        self.registry.list_active().await
    }

    pub async fn list_active_orders_for_station(
        &self,
        station_id: &str,
    ) -> EngineResult<Vec<RoutingEntry>> {
        validate_id(station_id, "station_id")?;
        let store = Arc::clone(&self.store);
        let id = station_id.to_string();
        self.cache
            .get_or_fetch(
                &keys::station_orders_key(station_id),
                self.config.cache.active_orders_ttl,
                &[keys::TAG_ORDERS.to_string(), keys::tag_station(station_id)],
                || async move { Ok(store.active_entries_for_station(&id).await?) },
            )
            .await
    }

    pub async fn list_all_active_orders(&self) -> EngineResult<Vec<RoutingEntry>> {
        let store = Arc::clone(&self.store);
        self.cache
            .get_or_fetch(
                &keys::all_active_orders_key(),
                self.config.cache.active_orders_ttl,
                &[keys::TAG_ORDERS.to_string()],
                || async move { Ok(store.active_entries().await?) },
            )
            .await
    }

    /// Per-table priority view, hottest table first
    pub async fn get_table_groups(&self) -> EngineResult<Vec<TableGroup>> {
        let snapshot = self.joined_snapshot().await?;
        Ok(tables::group_by_table(
            &snapshot,
            &self.config.scoring,
            now_millis(),
        ))
    }

    /// At-risk entries, independent of table grouping
    pub async fn needs_attention(&self) -> EngineResult<Vec<ActiveEntry>> {
        let snapshot = self.joined_snapshot().await?;
        Ok(tables::needs_attention(
            &snapshot,
            &self.config.attention,
            now_millis(),
        ))
    }

    // ── Kitchen mutations ───────────────────────────────────────────

    pub async fn start_prep(&self, entry_id: &str) -> EngineResult<RoutingEntry> {
        self.ledger.start_prep(entry_id).await
    }

    pub async fn bump(&self, entry_id: &str, actor_id: &str) -> EngineResult<RoutingEntry> {
        self.ledger.bump(entry_id, actor_id).await
    }

    pub async fn recall(&self, entry_id: &str) -> EngineResult<RoutingEntry> {
        self.ledger.recall(entry_id).await
    }

    pub async fn update_priority(
        &self,
        entry_id: &str,
        priority: i32,
    ) -> EngineResult<RoutingEntry> {
        self.ledger.update_priority(entry_id, priority).await
    }

    pub async fn add_notes(&self, entry_id: &str, notes: &str) -> EngineResult<RoutingEntry> {
        self.ledger.add_notes(entry_id, notes).await
    }

    pub async fn bulk_bump_by_table(&self, table_id: &str, actor_id: &str) -> EngineResult<usize> {
        self.ledger.bulk_bump_by_table(table_id, actor_id).await
    }

    // ── Connection observability ────────────────────────────────────

    /// `Failed` means: stop trusting live updates, offer a reconnect
    pub fn connection_status(&self) -> ConnectionStatus {
        self.realtime.status()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.realtime.state()
    }

    /// Manual reconnect after the manager gave up
    pub async fn reconnect(&self) -> EngineResult<()> {
        self.realtime.reconnect().await
    }

    /// Deduplicated change events, after cache invalidation
    pub fn subscribe_changes(&self) -> broadcast::Receiver<ChangeEvent> {
        self.realtime.subscribe_events()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    // ── Internals ───────────────────────────────────────────────────

    async fn joined_snapshot(&self) -> EngineResult<Vec<ActiveEntry>> {
        let store = Arc::clone(&self.store);
        self.cache
            .get_or_fetch(
                &keys::joined_entries_key(),
                self.config.cache.detail_ttl,
                &[keys::TAG_ORDERS.to_string()],
                || async move { Ok(store.entries_with_orders().await?) },
            )
            .await
    }
}
