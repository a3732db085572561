//! In-process store + change feed
//!
//! Backs tests and single-process embedding with the same seams the
//! remote store implements. Change events are emitted synchronously with
//! each mutation, best-effort: a slow subscriber drops events rather
//! than blocking the mutation path.
//!
//! Failure injection switches (`fail_next_subscribes`, `set_fail_ping`,
//! `set_fail_order_status`) exist for exercising the retry, breaker, and
//! durable-bump paths.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;
use tokio::sync::mpsc;

use shared::{
    ActiveEntry, ChangeEvent, OrderInfo, OrderStatus, RecordChange, RoutingEntry, Station,
};

use super::{ChangeFeed, EngineStore, FeedTopic, StoreError, StoreResult, SubscriptionId};

#[derive(Default)]
pub struct MemoryStore {
    stations: RwLock<HashMap<String, Station>>,
    orders: RwLock<HashMap<String, OrderInfo>>,
    entries: RwLock<HashMap<String, RoutingEntry>>,
    subscribers: DashMap<SubscriptionId, (FeedTopic, mpsc::Sender<ChangeEvent>)>,
    next_sub_id: AtomicU64,
    // Failure injection (tests)
    fail_subscribes: AtomicU32,
    fail_ping: AtomicBool,
    fail_order_status: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Seeding ─────────────────────────────────────────────────────

    pub fn seed_station(&self, station: Station) {
        self.stations.write().insert(station.id.clone(), station);
    }

    pub fn seed_order(&self, order: OrderInfo) {
        self.orders.write().insert(order.id.clone(), order);
    }

    // ── Failure injection ───────────────────────────────────────────

    /// Fail the next `n` subscribe attempts with a transient error
    pub fn fail_next_subscribes(&self, n: u32) {
        self.fail_subscribes.store(n, Ordering::SeqCst);
    }

    pub fn set_fail_ping(&self, fail: bool) {
        self.fail_ping.store(fail, Ordering::SeqCst);
    }

    /// Make `set_order_status` fail — exercises the durable-bump path
    pub fn set_fail_order_status(&self, fail: bool) {
        self.fail_order_status.store(fail, Ordering::SeqCst);
    }

    // ── Internals ───────────────────────────────────────────────────

    fn emit(&self, topic: FeedTopic, event: ChangeEvent) {
        let mut closed = Vec::new();
        for sub in self.subscribers.iter() {
            let (sub_topic, sink) = sub.value();
            if *sub_topic != topic {
                continue;
            }
            match sink.try_send(event.clone()) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    tracing::warn!(topic = %topic, "Feed subscriber full, event dropped");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    closed.push(*sub.key());
                }
            }
        }
        for id in closed {
            self.subscribers.remove(&id);
        }
    }

    /// Listing order contract: priority desc, then routed-time asc
    fn sort_active(entries: &mut [RoutingEntry]) {
        entries.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then(a.routed_at.cmp(&b.routed_at))
        });
    }
}

#[async_trait]
impl EngineStore for MemoryStore {
    async fn list_stations(&self) -> StoreResult<Vec<Station>> {
        let mut stations: Vec<Station> = self
            .stations
            .read()
            .values()
            .filter(|s| s.is_active)
            .cloned()
            .collect();
        stations.sort_by_key(|s| s.position);
        Ok(stations)
    }

    async fn get_order(&self, order_id: &str) -> StoreResult<Option<OrderInfo>> {
        Ok(self.orders.read().get(order_id).cloned())
    }

    async fn set_order_status(&self, order_id: &str, status: OrderStatus) -> StoreResult<()> {
        if self.fail_order_status.load(Ordering::SeqCst) {
            return Err(StoreError::Transient("order status write refused".into()));
        }
        let updated = {
            let mut orders = self.orders.write();
            let Some(order) = orders.get_mut(order_id) else {
                return Err(StoreError::NotFound(format!("order {order_id}")));
            };
            let old = order.clone();
            order.status = status;
            (old, order.clone())
        };
        self.emit(
            FeedTopic::Orders,
            ChangeEvent::Order(RecordChange::Updated {
                old: Some(updated.0),
                new: updated.1,
            }),
        );
        Ok(())
    }

    async fn insert_entry(&self, entry: RoutingEntry) -> StoreResult<RoutingEntry> {
        self.entries
            .write()
            .insert(entry.id.clone(), entry.clone());
        self.emit(
            FeedTopic::Entries,
            ChangeEvent::Entry(RecordChange::Inserted { new: entry.clone() }),
        );
        Ok(entry)
    }

    async fn get_entry(&self, entry_id: &str) -> StoreResult<Option<RoutingEntry>> {
        Ok(self.entries.read().get(entry_id).cloned())
    }

    async fn update_entry(&self, entry: RoutingEntry) -> StoreResult<RoutingEntry> {
        let old = {
            let mut entries = self.entries.write();
            let Some(existing) = entries.get_mut(&entry.id) else {
                return Err(StoreError::NotFound(format!("routing entry {}", entry.id)));
            };
            let old = existing.clone();
            *existing = entry.clone();
            old
        };
        self.emit(
            FeedTopic::Entries,
            ChangeEvent::Entry(RecordChange::Updated {
                old: Some(old),
                new: entry.clone(),
            }),
        );
        Ok(entry)
    }

    async fn active_entries(&self) -> StoreResult<Vec<RoutingEntry>> {
        let mut entries: Vec<RoutingEntry> = self
            .entries
            .read()
            .values()
            .filter(|e| e.is_active())
            .cloned()
            .collect();
        Self::sort_active(&mut entries);
        Ok(entries)
    }

    async fn active_entries_for_station(
        &self,
        station_id: &str,
    ) -> StoreResult<Vec<RoutingEntry>> {
        let mut entries: Vec<RoutingEntry> = self
            .entries
            .read()
            .values()
            .filter(|e| e.is_active() && e.station_id == station_id)
            .cloned()
            .collect();
        Self::sort_active(&mut entries);
        Ok(entries)
    }

    async fn entries_for_order(&self, order_id: &str) -> StoreResult<Vec<RoutingEntry>> {
        let mut entries: Vec<RoutingEntry> = self
            .entries
            .read()
            .values()
            .filter(|e| e.order_id == order_id)
            .cloned()
            .collect();
        entries.sort_by_key(|e| e.sequence);
        Ok(entries)
    }

    async fn active_entries_for_table(&self, table_id: &str) -> StoreResult<Vec<RoutingEntry>> {
        let order_ids: Vec<String> = {
            let orders = self.orders.read();
            orders
                .values()
                .filter(|o| o.table_id == table_id)
                .map(|o| o.id.clone())
                .collect()
        };
        let mut entries: Vec<RoutingEntry> = self
            .entries
            .read()
            .values()
            .filter(|e| e.is_active() && order_ids.contains(&e.order_id))
            .cloned()
            .collect();
        Self::sort_active(&mut entries);
        Ok(entries)
    }

    async fn entries_with_orders(&self) -> StoreResult<Vec<ActiveEntry>> {
        let orders = self.orders.read();
        let mut entries: Vec<RoutingEntry> = self.entries.read().values().cloned().collect();
        Self::sort_active(&mut entries);
        Ok(entries
            .into_iter()
            .filter_map(|entry| {
                let order = orders.get(&entry.order_id)?.clone();
                Some(ActiveEntry { entry, order })
            })
            .collect())
    }
}

#[async_trait]
impl ChangeFeed for MemoryStore {
    async fn subscribe(
        &self,
        topic: FeedTopic,
        sink: mpsc::Sender<ChangeEvent>,
    ) -> StoreResult<SubscriptionId> {
        let pending_failures = self.fail_subscribes.load(Ordering::SeqCst);
        if pending_failures > 0 {
            self.fail_subscribes
                .store(pending_failures - 1, Ordering::SeqCst);
            return Err(StoreError::Transient("subscribe handshake refused".into()));
        }
        let id = self.next_sub_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.subscribers.insert(id, (topic, sink));
        Ok(id)
    }

    async fn unsubscribe(&self, id: SubscriptionId) -> StoreResult<()> {
        self.subscribers.remove(&id);
        Ok(())
    }

    async fn ping(&self) -> StoreResult<()> {
        if self.fail_ping.load(Ordering::SeqCst) {
            return Err(StoreError::Transient("ping refused".into()));
        }
        Ok(())
    }
}
