use std::collections::BTreeSet;
use std::sync::Arc;

use shared::models::clamp_priority;
use shared::util::now_millis;
use shared::{OrderStatus, RoutingEntry};

use crate::cache::{keys, CacheService};
use crate::core::{EngineError, EngineResult};
use crate::store::EngineStore;
use crate::utils::{truncate_notes, validate_id};

#[derive(Clone)]
pub struct RoutingLedger {
    store: Arc<dyn EngineStore>,
    cache: CacheService,
}

impl RoutingLedger {
    pub fn new(store: Arc<dyn EngineStore>, cache: CacheService) -> Self {
        Self { store, cache }
    }

    // ── Lifecycle operations ────────────────────────────────────────

    /// Mark preparation started. Idempotent: a started entry is
    /// returned unchanged.
    pub async fn start_prep(&self, entry_id: &str) -> EngineResult<RoutingEntry> {
        let mut entry = self.fetch_required(entry_id).await?;
        if entry.started_at.is_some() {
            return Ok(entry);
        }
        entry.started_at = Some(now_millis());
        self.write_back(entry).await
    }

    /// Complete a station's portion of an order.
    ///
    /// The bump itself is durable: the follow-up order-readiness check
    /// is best-effort and its failure never rolls the bump back.
    pub async fn bump(&self, entry_id: &str, actor_id: &str) -> EngineResult<RoutingEntry> {
        validate_id(actor_id, "actor_id")?;
        let mut entry = self.fetch_required(entry_id).await?;
        if entry.completed_at.is_some() {
            return Ok(entry);
        }

        let now = now_millis();
        entry.completed_at = Some(now);
        entry.bumped_at = Some(now);
        entry.bumped_by = Some(actor_id.to_string());
        if let Some(started) = entry.started_at {
            entry.actual_prep_time = Some((now - started) / 1000);
        }
        let entry = self.write_back(entry).await?;

        if let Err(e) = self.promote_if_ready(&entry.order_id).await {
            tracing::warn!(
                order_id = %entry.order_id,
                entry_id = %entry.id,
                error = %e,
                "Readiness check failed after bump; entry stays bumped"
            );
            // the order view may now be stale, drop it too
            self.cache.invalidate_by_tags(&[
                keys::TAG_ORDERS.to_string(),
                keys::tag_order(&entry.order_id),
            ]);
        }
        Ok(entry)
    }

    /// Reopen a completed entry (undo a bump).
    pub async fn recall(&self, entry_id: &str) -> EngineResult<RoutingEntry> {
        let mut entry = self.fetch_required(entry_id).await?;
        entry.recall_count += 1;
        entry.recalled_at = Some(now_millis());
        entry.completed_at = None;
        entry.bumped_at = None;
        entry.bumped_by = None;
        let entry = self.write_back(entry).await?;

        // A recalled order cannot stay ready; demotion is best-effort.
        if let Err(e) = self
            .store
            .set_order_status(&entry.order_id, OrderStatus::Pending)
            .await
        {
            tracing::warn!(
                order_id = %entry.order_id,
                error = %e,
                "Failed to demote order status after recall"
            );
        }
        Ok(entry)
    }

    /// Reprioritize an entry; out-of-range input is normalized.
    pub async fn update_priority(&self, entry_id: &str, priority: i32) -> EngineResult<RoutingEntry> {
        let mut entry = self.fetch_required(entry_id).await?;
        entry.priority = clamp_priority(priority);
        self.write_back(entry).await
    }

    /// Attach kitchen notes; over-long notes are truncated, not rejected.
    pub async fn add_notes(&self, entry_id: &str, notes: &str) -> EngineResult<RoutingEntry> {
        let mut entry = self.fetch_required(entry_id).await?;
        entry.notes = Some(truncate_notes(notes));
        self.write_back(entry).await
    }

    /// Complete every active entry for every order at a table in one
    /// logical step, returning the count affected. Used when a whole
    /// table's order is delivered at once.
    pub async fn bulk_bump_by_table(&self, table_id: &str, actor_id: &str) -> EngineResult<usize> {
        validate_id(table_id, "table_id")?;
        validate_id(actor_id, "actor_id")?;

        let entries = self.store.active_entries_for_table(table_id).await?;
        let now = now_millis();

        let mut tags: Vec<String> = vec![keys::TAG_ORDERS.to_string(), keys::tag_table(table_id)];
        for entry in &entries {
            tags.push(keys::tag_station(&entry.station_id));
            tags.push(keys::tag_order(&entry.order_id));
        }

        let mut affected = 0;
        let mut first_error: Option<EngineError> = None;
        let mut touched_orders = BTreeSet::new();
        for mut entry in entries {
            entry.completed_at = Some(now);
            entry.bumped_at = Some(now);
            entry.bumped_by = Some(actor_id.to_string());
            if let Some(started) = entry.started_at {
                entry.actual_prep_time = Some((now - started) / 1000);
            }
            let entry_id = entry.id.clone();
            match self.store.update_entry(entry).await {
                Ok(updated) => {
                    affected += 1;
                    touched_orders.insert(updated.order_id);
                }
                Err(e) => {
                    tracing::error!(
                        table_id = %table_id,
                        entry_id = %entry_id,
                        error = %e,
                        "Bulk bump failed for entry"
                    );
                    first_error.get_or_insert(e.into());
                }
            }
        }

        // one invalidation for the whole batch, even on partial failure
        self.cache.invalidate_by_tags(&tags);

        if affected == 0
            && let Some(e) = first_error
        {
            return Err(e);
        }

        for order_id in touched_orders {
            if let Err(e) = self.promote_if_ready(&order_id).await {
                tracing::warn!(order_id = %order_id, error = %e, "Readiness check failed after bulk bump");
            }
        }

        tracing::info!(table_id = %table_id, affected, "Bulk bumped table");
        Ok(affected)
    }

    // ── Internals ───────────────────────────────────────────────────

    async fn fetch_required(&self, entry_id: &str) -> EngineResult<RoutingEntry> {
        validate_id(entry_id, "entry_id")?;
        self.store
            .get_entry(entry_id)
            .await?
            .ok_or_else(|| EngineError::not_found(format!("routing entry {entry_id}")))
    }

    /// Persist an updated entry. Tags are invalidated whether or not the
    /// write succeeds — a stale cache is worse than a failed mutation
    /// with a fresh one.
    async fn write_back(&self, entry: RoutingEntry) -> EngineResult<RoutingEntry> {
        let tags = vec![
            keys::TAG_ORDERS.to_string(),
            keys::tag_station(&entry.station_id),
            keys::tag_order(&entry.order_id),
        ];
        let result = self.store.update_entry(entry).await;
        self.cache.invalidate_by_tags(&tags);
        Ok(result?)
    }

    /// An order is ready iff every sibling entry is completed.
    async fn promote_if_ready(&self, order_id: &str) -> EngineResult<()> {
        let entries = self.store.entries_for_order(order_id).await?;
        if !entries.is_empty() && entries.iter().all(|e| e.completed_at.is_some()) {
            self.store
                .set_order_status(order_id, OrderStatus::Ready)
                .await?;
            tracing::info!(order_id = %order_id, "All entries bumped, order marked ready");
        }
        Ok(())
    }
}
