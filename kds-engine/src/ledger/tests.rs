use std::sync::Arc;
use std::time::Duration;

use shared::{OrderInfo, OrderItem, OrderKind, OrderStatus, RoutingEntry, Station, StationType};

use crate::cache::{keys, CacheService};
use crate::core::EngineError;
use crate::store::{EngineStore, MemoryStore};

use super::RoutingLedger;

struct Fixture {
    store: Arc<MemoryStore>,
    cache: CacheService,
    ledger: RoutingLedger,
}

fn fixture() -> Fixture {
    let store = Arc::new(MemoryStore::new());
    store.seed_station(Station::new("grill-1", "Grill", StationType::Grill));
    let cache = CacheService::new(64);
    let ledger = RoutingLedger::new(store.clone(), cache.clone());
    Fixture {
        store,
        cache,
        ledger,
    }
}

async fn seed_order_with_entries(fx: &Fixture, order_id: &str, stations: &[&str]) -> Vec<String> {
    fx.store.seed_order(OrderInfo {
        id: order_id.to_string(),
        items: vec![OrderItem::new("Ribeye Steak")],
        table_id: "table-1".into(),
        seat_id: None,
        created_at: shared::util::now_millis(),
        kind: OrderKind::Food,
        status: OrderStatus::Pending,
    });
    let mut entry_ids = Vec::new();
    for (i, station_id) in stations.iter().enumerate() {
        let entry = RoutingEntry::new(
            order_id,
            *station_id,
            (i + 1) as i32,
            1,
            shared::util::now_millis(),
        );
        entry_ids.push(entry.id.clone());
        fx.store.insert_entry(entry).await.unwrap();
    }
    entry_ids
}

#[tokio::test]
async fn test_bump_sets_completion_fields_together() {
    let fx = fixture();
    let ids = seed_order_with_entries(&fx, "o1", &["grill-1"]).await;

    let bumped = fx.ledger.bump(&ids[0], "chef-9").await.unwrap();
    assert!(bumped.completed_at.is_some());
    assert!(bumped.bumped_at.is_some());
    assert_eq!(bumped.bumped_by.as_deref(), Some("chef-9"));
}

#[tokio::test]
async fn test_bump_then_recall_round_trip() {
    let fx = fixture();
    let ids = seed_order_with_entries(&fx, "o1", &["grill-1"]).await;

    fx.ledger.bump(&ids[0], "chef-9").await.unwrap();
    let recalled = fx.ledger.recall(&ids[0]).await.unwrap();

    assert_eq!(recalled.completed_at, None);
    assert_eq!(recalled.bumped_at, None);
    assert_eq!(recalled.bumped_by, None);
    assert_eq!(recalled.recall_count, 1);
    assert!(recalled.recalled_at.is_some());

    // a recalled order is active again and no longer ready
    let order = fx.store.get_order("o1").await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::Pending);
}

#[tokio::test]
async fn test_start_prep_is_idempotent() {
    let fx = fixture();
    let ids = seed_order_with_entries(&fx, "o1", &["grill-1"]).await;

    let first = fx.ledger.start_prep(&ids[0]).await.unwrap();
    tokio::time::sleep(Duration::from_millis(5)).await;
    let second = fx.ledger.start_prep(&ids[0]).await.unwrap();

    assert_eq!(first.started_at, second.started_at);
}

#[tokio::test]
async fn test_order_ready_only_when_every_entry_is_bumped() {
    let fx = fixture();
    fx.store
        .seed_station(Station::new("fryer-1", "Fryer", StationType::Fryer));
    fx.store
        .seed_station(Station::new("salad-1", "Salad", StationType::Salad));
    let ids = seed_order_with_entries(&fx, "o1", &["grill-1", "fryer-1", "salad-1"]).await;

    fx.ledger.bump(&ids[0], "chef-9").await.unwrap();
    fx.ledger.bump(&ids[1], "chef-9").await.unwrap();
    let order = fx.store.get_order("o1").await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::Pending);

    fx.ledger.bump(&ids[2], "chef-9").await.unwrap();
    let order = fx.store.get_order("o1").await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::Ready);
}

#[tokio::test]
async fn test_bump_survives_readiness_update_failure() {
    let fx = fixture();
    let ids = seed_order_with_entries(&fx, "o1", &["grill-1"]).await;

    fx.store.set_fail_order_status(true);
    let bumped = fx.ledger.bump(&ids[0], "chef-9").await.unwrap();
    assert!(bumped.completed_at.is_some());

    // entry stays bumped even though the status write was refused
    let stored = fx.store.get_entry(&ids[0]).await.unwrap().unwrap();
    assert!(stored.completed_at.is_some());
    let order = fx.store.get_order("o1").await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::Pending);
}

#[tokio::test]
async fn test_priority_updates_are_clamped() {
    let fx = fixture();
    let ids = seed_order_with_entries(&fx, "o1", &["grill-1"]).await;

    let entry = fx.ledger.update_priority(&ids[0], 42).await.unwrap();
    assert_eq!(entry.priority, 10);
    let entry = fx.ledger.update_priority(&ids[0], -3).await.unwrap();
    assert_eq!(entry.priority, 0);
}

#[tokio::test]
async fn test_long_notes_are_truncated() {
    let fx = fixture();
    let ids = seed_order_with_entries(&fx, "o1", &["grill-1"]).await;

    let entry = fx.ledger.add_notes(&ids[0], &"x".repeat(600)).await.unwrap();
    assert_eq!(entry.notes.unwrap().len(), 500);
}

#[tokio::test]
async fn test_recall_missing_entry_is_not_found() {
    let fx = fixture();
    match fx.ledger.recall("no-such-entry").await {
        Err(EngineError::NotFound(_)) => {}
        other => panic!("expected NotFound, got {other:?}"),
    }
}

#[tokio::test]
async fn test_malformed_ids_are_rejected_before_io() {
    let fx = fixture();
    assert!(matches!(
        fx.ledger.bump("bad id!", "chef-9").await,
        Err(EngineError::Validation(_))
    ));
    assert!(matches!(
        fx.ledger.bulk_bump_by_table("table 1", "chef-9").await,
        Err(EngineError::Validation(_))
    ));
}

#[tokio::test]
async fn test_bulk_bump_completes_the_whole_table() {
    let fx = fixture();
    fx.store
        .seed_station(Station::new("fryer-1", "Fryer", StationType::Fryer));
    let first = seed_order_with_entries(&fx, "o1", &["grill-1", "fryer-1"]).await;
    let _second = seed_order_with_entries(&fx, "o2", &["grill-1"]).await;

    let affected = fx
        .ledger
        .bulk_bump_by_table("table-1", "runner-2")
        .await
        .unwrap();
    assert_eq!(affected, 3);

    for order_id in ["o1", "o2"] {
        let order = fx.store.get_order(order_id).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Ready);
    }
    let entry = fx.store.get_entry(&first[0]).await.unwrap().unwrap();
    assert_eq!(entry.bumped_by.as_deref(), Some("runner-2"));
}

#[tokio::test]
async fn test_bump_invalidates_cached_station_view() {
    let fx = fixture();
    let ids = seed_order_with_entries(&fx, "o1", &["grill-1"]).await;

    // a display consumer cached the station view moments ago
    fx.cache.set(
        keys::station_orders_key("grill-1"),
        vec![ids[0].clone()],
        Duration::from_secs(60),
        &[
            keys::TAG_ORDERS.to_string(),
            keys::tag_station("grill-1"),
        ],
    );

    fx.ledger.bump(&ids[0], "chef-9").await.unwrap();

    // tag invalidation beats the TTL
    assert_eq!(
        fx.cache
            .get::<Vec<String>>(&keys::station_orders_key("grill-1")),
        None
    );
}
