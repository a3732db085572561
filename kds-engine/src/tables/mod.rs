//! Per-table aggregation for the kitchen display

mod aggregator;

pub use aggregator::{group_by_table, needs_attention, score_entry, table_status};
