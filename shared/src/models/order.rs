//! Order context consumed at routing and aggregation time
//!
//! Orders are owned by the upstream intake collaborator; the engine
//! reads them once when routing and joins them into display views.

use serde::{Deserialize, Serialize};

/// Coarse order type used by the routing decision
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderKind {
    #[default]
    Food,
    Beverage,
    Dessert,
}

/// Order readiness, advanced by the ledger when every assignment completes
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[default]
    Pending,
    Ready,
}

/// One line item on an order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderItem {
    pub name: String,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
}

fn default_quantity() -> i32 {
    1
}

impl OrderItem {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            quantity: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderInfo {
    pub id: String,
    pub items: Vec<OrderItem>,
    pub table_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seat_id: Option<String>,
    /// Unix millis
    pub created_at: i64,
    pub kind: OrderKind,
    #[serde(default)]
    pub status: OrderStatus,
}

impl OrderInfo {
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Concatenated lowercased item text scanned by the routing keyword table
    pub fn item_text(&self) -> String {
        self.items
            .iter()
            .map(|item| item.name.to_lowercase())
            .collect::<Vec<_>>()
            .join(" ")
    }
}
