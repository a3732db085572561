//! Cache key builders and invalidation tags
//!
//! Centralized so mutation paths and read paths can never drift apart on
//! spelling. Every ledger mutation invalidates [`TAG_ORDERS`] plus the
//! narrower station/order/table tags it touches.

use shared::ChangeEvent;

// ── Tags ────────────────────────────────────────────────────────────

pub const TAG_STATIONS: &str = "stations";
pub const TAG_ORDERS: &str = "orders";

pub fn tag_station(station_id: &str) -> String {
    format!("station:{station_id}")
}

pub fn tag_table(table_id: &str) -> String {
    format!("table:{table_id}")
}

pub fn tag_order(order_id: &str) -> String {
    format!("order:{order_id}")
}

// ── Keys ────────────────────────────────────────────────────────────

pub fn stations_key() -> String {
    "stations:all".to_string()
}

pub fn station_orders_key(station_id: &str) -> String {
    format!("orders:station:{station_id}")
}

pub fn all_active_orders_key() -> String {
    "orders:active".to_string()
}

/// Joined active-entry snapshot backing the table grouping views
pub fn joined_entries_key() -> String {
    "orders:joined".to_string()
}

// ── Event mapping ───────────────────────────────────────────────────

/// Tags invalidated when a change event arrives on the feed
pub fn tags_for_event(event: &ChangeEvent) -> Vec<String> {
    match event {
        ChangeEvent::Entry(change) => {
            let entry = change.latest();
            vec![
                TAG_ORDERS.to_string(),
                tag_station(&entry.station_id),
                tag_order(&entry.order_id),
            ]
        }
        ChangeEvent::Station(_) => vec![TAG_STATIONS.to_string()],
        ChangeEvent::Order(change) => {
            let order = change.latest();
            vec![
                TAG_ORDERS.to_string(),
                tag_table(&order.table_id),
                tag_order(&order.id),
            ]
        }
    }
}
