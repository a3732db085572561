//! Typed change-feed events
//!
//! The persistent store pushes row-level changes tagged with the kind of
//! change and before/after snapshots. Events are a discriminated union
//! per record type so handlers match exhaustively on what changed.

use serde::{Deserialize, Serialize};

use crate::models::{OrderInfo, RoutingEntry, Station};

/// A row-level change with before/after snapshots
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "op", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecordChange<T> {
    Inserted {
        new: T,
    },
    Updated {
        /// Old snapshot when the transport delivers it
        old: Option<T>,
        new: T,
    },
    Deleted {
        old: T,
    },
}

impl<T> RecordChange<T> {
    /// The most recent snapshot carried by the change
    pub fn latest(&self) -> &T {
        match self {
            RecordChange::Inserted { new } => new,
            RecordChange::Updated { new, .. } => new,
            RecordChange::Deleted { old } => old,
        }
    }
}

/// One change-feed event, discriminated by record type
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "record", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeEvent {
    Entry(RecordChange<RoutingEntry>),
    Station(RecordChange<Station>),
    Order(RecordChange<OrderInfo>),
}

impl ChangeEvent {
    /// Identity used for duplicate-delivery suppression
    pub fn record_id(&self) -> &str {
        match self {
            ChangeEvent::Entry(change) => &change.latest().id,
            ChangeEvent::Station(change) => &change.latest().id,
            ChangeEvent::Order(change) => &change.latest().id,
        }
    }
}
