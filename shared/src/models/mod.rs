//! Domain model records
//!
//! | Model | Description |
//! |-------|-------------|
//! | [`Station`] | Kitchen preparation station (grill, fryer, ...) |
//! | [`RoutingEntry`] | One order×station assignment lifecycle record |
//! | [`OrderInfo`] | Order context read at routing/aggregation time |
//! | [`TableGroup`] | Derived per-table display view |

mod order;
mod routing_entry;
mod station;
mod table_group;

pub use order::{OrderInfo, OrderItem, OrderKind, OrderStatus};
pub use routing_entry::{
    clamp_priority, clamp_sequence, PrepState, RoutingEntry, PRIORITY_MAX, PRIORITY_MIN,
    SEQUENCE_MIN,
};
pub use station::{Station, StationType};
pub use table_group::{ActiveEntry, SeatGroup, TableGroup, TableStatus};
