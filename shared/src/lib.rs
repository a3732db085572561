//! Shared types for the KDS engine workspace
//!
//! Domain records, typed change-feed events, and utility functions used
//! by the engine crate and by display-layer consumers.

pub mod event;
pub mod models;
pub mod util;

// Re-exports
pub use event::{ChangeEvent, RecordChange};
pub use models::{
    ActiveEntry, OrderInfo, OrderItem, OrderKind, OrderStatus, PrepState, RoutingEntry, SeatGroup,
    Station, StationType, TableGroup, TableStatus,
};
pub use serde::{Deserialize, Serialize};
