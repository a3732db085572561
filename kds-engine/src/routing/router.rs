//! Keyword routing of new orders to preparation stations
//!
//! Beverage orders go straight to the bar. Food orders scan the
//! concatenated lowercased item text against the keyword table below;
//! each matching station type contributes one target, sequence follows
//! table iteration order. Unmatched orders fall back to expo, else the
//! first active station.
//!
//! Dispatch is best-effort: one station's insert failure never blocks
//! the others, and the fire-and-forget entry point never throws back
//! into the order-creation path.

use std::sync::Arc;

use shared::util::now_millis;
use shared::{OrderInfo, OrderKind, RoutingEntry, Station, StationType};

use crate::cache::{keys, CacheService};
use crate::core::{EngineError, EngineResult};
use crate::stations::StationRegistry;
use crate::store::EngineStore;
use crate::utils::validate_id;

/// Station-type → keyword lists, scanned in this order
const KEYWORD_TABLE: &[(StationType, &[&str])] = &[
    (
        StationType::Grill,
        &["steak", "burger", "chicken", "ribs", "brisket", "kebab"],
    ),
    (
        StationType::Fryer,
        &["fries", "wings", "nuggets", "tempura", "calamari", "onion rings"],
    ),
    (
        StationType::Salad,
        &["salad", "greens", "slaw", "caesar"],
    ),
    (
        StationType::Prep,
        &["soup", "sandwich", "wrap", "toast"],
    ),
    (
        StationType::Dessert,
        &["cake", "ice cream", "brownie", "sundae", "tart"],
    ),
];

/// Grill work fires ahead of everything else
const GRILL_PRIORITY: i32 = 2;
const DEFAULT_PRIORITY: i32 = 1;

/// One computed dispatch target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingTarget {
    pub station_id: String,
    pub station_type: StationType,
    pub sequence: i32,
    pub priority: i32,
}

/// Per-order dispatch result — partial success is allowed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RoutingOutcome {
    pub routed: usize,
    pub failed: usize,
}

#[derive(Clone)]
pub struct RoutingEngine {
    store: Arc<dyn EngineStore>,
    registry: StationRegistry,
    cache: CacheService,
}

impl RoutingEngine {
    pub fn new(
        store: Arc<dyn EngineStore>,
        registry: StationRegistry,
        cache: CacheService,
    ) -> Self {
        Self {
            store,
            registry,
            cache,
        }
    }

    /// Compute target stations for an order without touching the ledger
    pub async fn route(&self, order: &OrderInfo) -> EngineResult<Vec<RoutingTarget>> {
        let stations = self.registry.require_active().await?;
        Ok(compute_targets(order, &stations))
    }

    /// Look up the order and dispatch it to its target stations
    pub async fn dispatch_order(&self, order_id: &str) -> EngineResult<RoutingOutcome> {
        validate_id(order_id, "order_id")?;
        let order = self
            .store
            .get_order(order_id)
            .await?
            .ok_or_else(|| EngineError::not_found(format!("order {order_id}")))?;
        self.dispatch(&order).await
    }

    /// Insert one routing entry per target, best-effort.
    ///
    /// Failures are logged per station and counted; the touched cache
    /// tags are invalidated even on partial failure.
    pub async fn dispatch(&self, order: &OrderInfo) -> EngineResult<RoutingOutcome> {
        let targets = self.route(order).await?;
        let routed_at = now_millis();

        let inserts = targets.iter().map(|target| {
            let entry = RoutingEntry::new(
                order.id.as_str(),
                target.station_id.as_str(),
                target.sequence,
                target.priority,
                routed_at,
            );
            let store = Arc::clone(&self.store);
            async move { (target, store.insert_entry(entry).await) }
        });

        let mut outcome = RoutingOutcome::default();
        let mut tags = vec![
            keys::TAG_ORDERS.to_string(),
            keys::tag_order(&order.id),
            keys::tag_table(&order.table_id),
        ];
        for (target, result) in futures::future::join_all(inserts).await {
            match result {
                Ok(entry) => {
                    outcome.routed += 1;
                    tags.push(keys::tag_station(&entry.station_id));
                    tracing::debug!(
                        order_id = %order.id,
                        station_id = %entry.station_id,
                        sequence = entry.sequence,
                        priority = entry.priority,
                        "Order routed to station"
                    );
                }
                Err(e) => {
                    outcome.failed += 1;
                    tracing::warn!(
                        order_id = %order.id,
                        station_id = %target.station_id,
                        error = %e,
                        "Failed to route order to station"
                    );
                }
            }
        }

        self.cache.invalidate_by_tags(&tags);
        Ok(outcome)
    }
}

/// Pure target computation over a non-empty, position-ordered station list
fn compute_targets(order: &OrderInfo, stations: &[Station]) -> Vec<RoutingTarget> {
    let first_of_type =
        |wanted: StationType| stations.iter().find(|s| s.station_type == wanted);

    if order.kind == OrderKind::Beverage {
        let station = first_of_type(StationType::Bar)
            .or_else(|| first_of_type(StationType::Expo))
            .or_else(|| stations.first());
        return station
            .map(|s| {
                vec![RoutingTarget {
                    station_id: s.id.clone(),
                    station_type: s.station_type,
                    sequence: 1,
                    priority: DEFAULT_PRIORITY,
                }]
            })
            .unwrap_or_default();
    }

    let text = order.item_text();
    let mut targets = Vec::new();
    let mut sequence = 1;
    for (station_type, keywords) in KEYWORD_TABLE {
        if !keywords.iter().any(|kw| text.contains(kw)) {
            continue;
        }
        let Some(station) = first_of_type(*station_type) else {
            continue;
        };
        targets.push(RoutingTarget {
            station_id: station.id.clone(),
            station_type: *station_type,
            sequence,
            priority: if *station_type == StationType::Grill {
                GRILL_PRIORITY
            } else {
                DEFAULT_PRIORITY
            },
        });
        sequence += 1;
    }

    if targets.is_empty()
        && let Some(station) = first_of_type(StationType::Expo).or_else(|| stations.first())
    {
        targets.push(RoutingTarget {
            station_id: station.id.clone(),
            station_type: station.station_type,
            sequence: 1,
            priority: DEFAULT_PRIORITY,
        });
    }

    targets
}
