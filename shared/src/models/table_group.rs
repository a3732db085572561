//! Derived per-table views for the kitchen display
//!
//! These are explicit joined record shapes: a routing entry always
//! travels with its order context, so consumers match exhaustively
//! instead of defensively probing optional fields.

use serde::{Deserialize, Serialize};

use super::{OrderInfo, RoutingEntry};

/// Table status is derived from entry lifecycle state, never stored
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TableStatus {
    /// No entry picked up yet
    Waiting,
    /// At least one entry started, not all completed
    Preparing,
    /// Every entry completed
    Ready,
}

/// A routing entry joined with its order context
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActiveEntry {
    pub entry: RoutingEntry,
    pub order: OrderInfo,
}

/// Seat-level sub-grouping inside a table group
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SeatGroup {
    /// None groups entries whose order carries no seat reference
    pub seat_id: Option<String>,
    pub entries: Vec<ActiveEntry>,
}

/// All active entries at one physical table, scored for display priority
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TableGroup {
    pub table_id: String,
    pub status: TableStatus,
    /// Mean of the per-entry priority scores
    pub score: f64,
    /// Creation timestamp of the oldest order at the table (tie-breaker)
    pub oldest_created_at: i64,
    pub entries: Vec<ActiveEntry>,
    pub seats: Vec<SeatGroup>,
}
