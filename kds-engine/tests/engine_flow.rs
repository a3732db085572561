//! End-to-end engine flow against the in-process store

use std::sync::Arc;
use std::time::Duration;

use kds_engine::realtime::ConnectionStatus;
use kds_engine::store::EngineStore;
use kds_engine::{EngineConfig, KitchenEngine, MemoryStore};
use shared::{
    OrderInfo, OrderItem, OrderKind, OrderStatus, Station, StationType, TableStatus,
};

fn station(id: &str, name: &str, station_type: StationType, position: i32) -> Station {
    let mut station = Station::new(id, name, station_type);
    station.position = position;
    station
}

fn order(id: &str, table_id: &str, kind: OrderKind, items: &[&str]) -> OrderInfo {
    OrderInfo {
        id: id.to_string(),
        items: items.iter().map(|name| OrderItem::new(*name)).collect(),
        table_id: table_id.to_string(),
        seat_id: None,
        created_at: shared::util::now_millis(),
        kind,
        status: OrderStatus::Pending,
    }
}

async fn engine_with_kitchen() -> (Arc<MemoryStore>, KitchenEngine) {
    let store = Arc::new(MemoryStore::new());
    store.seed_station(station("grill-1", "Grill", StationType::Grill, 0));
    store.seed_station(station("fryer-1", "Fryer", StationType::Fryer, 1));
    store.seed_station(station("salad-1", "Salad", StationType::Salad, 2));
    store.seed_station(station("expo-1", "Expo", StationType::Expo, 3));
    store.seed_station(station("bar-1", "Bar", StationType::Bar, 4));

    let engine = KitchenEngine::init(
        store.clone(),
        store.clone(),
        EngineConfig::default(),
    )
    .await;
    (store, engine)
}

#[tokio::test]
async fn test_order_flows_from_intake_to_ready() {
    let (store, engine) = engine_with_kitchen().await;
    store.seed_order(order("o1", "t1", OrderKind::Food, &["Cheeseburger", "Fries"]));

    let outcome = engine.route_order("o1").await.unwrap();
    assert_eq!(outcome.routed, 2);
    assert_eq!(outcome.failed, 0);

    // grill fires first and hotter
    let grill = engine
        .list_active_orders_for_station("grill-1")
        .await
        .unwrap();
    assert_eq!(grill.len(), 1);
    assert_eq!(grill[0].priority, 2);
    assert_eq!(grill[0].sequence, 1);
    let fryer = engine
        .list_active_orders_for_station("fryer-1")
        .await
        .unwrap();
    assert_eq!(fryer.len(), 1);
    assert_eq!(fryer[0].priority, 1);
    assert_eq!(fryer[0].sequence, 2);

    engine.start_prep(&grill[0].id).await.unwrap();
    let groups = engine.get_table_groups().await.unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].table_id, "t1");
    assert_eq!(groups[0].status, TableStatus::Preparing);

    // the station view was cached just above; bumping must evict it
    engine.bump(&grill[0].id, "chef-1").await.unwrap();
    let grill_after = engine
        .list_active_orders_for_station("grill-1")
        .await
        .unwrap();
    assert!(grill_after.is_empty());

    // one of two entries done — not ready yet
    let o1 = store.get_order("o1").await.unwrap().unwrap();
    assert_eq!(o1.status, OrderStatus::Pending);

    engine.bump(&fryer[0].id, "chef-1").await.unwrap();
    let o1 = store.get_order("o1").await.unwrap().unwrap();
    assert_eq!(o1.status, OrderStatus::Ready);

    let groups = engine.get_table_groups().await.unwrap();
    assert_eq!(groups[0].status, TableStatus::Ready);
}

#[tokio::test]
async fn test_beverage_order_goes_to_the_bar() {
    let (store, engine) = engine_with_kitchen().await;
    store.seed_order(order("o2", "t2", OrderKind::Beverage, &["Draft Beer"]));

    let outcome = engine.route_order("o2").await.unwrap();
    assert_eq!(outcome.routed, 1);

    let bar = engine.list_active_orders_for_station("bar-1").await.unwrap();
    assert_eq!(bar.len(), 1);
    assert_eq!(bar[0].order_id, "o2");
    assert!(engine
        .list_active_orders_for_station("grill-1")
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_fire_and_forget_routing_never_throws() {
    let (store, engine) = engine_with_kitchen().await;

    // unknown order: logged, not thrown
    engine.route("missing-order");

    store.seed_order(order("o3", "t3", OrderKind::Food, &["Caesar Salad"]));
    engine.route("o3");

    // routing runs in the background; poll until it lands
    let mut routed = Vec::new();
    for _ in 0..50 {
        routed = store.active_entries_for_station("salad-1").await.unwrap();
        if !routed.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(routed.len(), 1);
    assert_eq!(routed[0].order_id, "o3");
}

#[tokio::test]
async fn test_bulk_bump_readies_the_whole_table() {
    let (store, engine) = engine_with_kitchen().await;
    store.seed_order(order("o4", "t4", OrderKind::Food, &["Burger"]));
    store.seed_order(order("o5", "t4", OrderKind::Food, &["Wings", "Greens"]));
    engine.route_order("o4").await.unwrap();
    engine.route_order("o5").await.unwrap();

    let affected = engine.bulk_bump_by_table("t4", "runner-1").await.unwrap();
    assert_eq!(affected, 3);

    assert!(engine.list_all_active_orders().await.unwrap().is_empty());
    for id in ["o4", "o5"] {
        let o = store.get_order(id).await.unwrap().unwrap();
        assert_eq!(o.status, OrderStatus::Ready);
    }
}

#[tokio::test]
async fn test_repeated_recalls_flag_the_entry() {
    let (store, engine) = engine_with_kitchen().await;
    store.seed_order(order("o6", "t6", OrderKind::Food, &["Steak"]));
    engine.route_order("o6").await.unwrap();

    let entry = &engine.list_all_active_orders().await.unwrap()[0];
    assert!(engine.needs_attention().await.unwrap().is_empty());

    for _ in 0..2 {
        engine.bump(&entry.id, "chef-1").await.unwrap();
        engine.recall(&entry.id).await.unwrap();
    }

    let flagged = engine.needs_attention().await.unwrap();
    assert_eq!(flagged.len(), 1);
    assert_eq!(flagged[0].entry.recall_count, 2);
}

#[tokio::test]
async fn test_malformed_identifiers_are_rejected() {
    let (_store, engine) = engine_with_kitchen().await;

    assert!(engine
        .list_active_orders_for_station("grill 1; --")
        .await
        .is_err());
    assert!(engine.bump("bad id!", "chef-1").await.is_err());
    assert!(engine.route_order("").await.is_err());
}

#[tokio::test]
async fn test_lifecycle_connects_and_shuts_down() {
    let (_store, engine) = engine_with_kitchen().await;
    assert_eq!(engine.connection_status(), ConnectionStatus::Connected);

    let mut changes = engine.subscribe_changes();
    engine.shutdown();

    // worker tears down and stops broadcasting
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(engine.connection_status(), ConnectionStatus::Disconnected);
    assert!(matches!(
        changes.try_recv(),
        Err(tokio::sync::broadcast::error::TryRecvError::Empty
            | tokio::sync::broadcast::error::TryRecvError::Closed)
    ));
}
