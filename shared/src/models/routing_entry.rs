//! Order-to-station assignment lifecycle record

use serde::{Deserialize, Serialize};

use crate::util;

/// Priority bounds — values outside are normalized, never rejected
pub const PRIORITY_MIN: i32 = 0;
pub const PRIORITY_MAX: i32 = 10;

/// Sequence numbers start at 1
pub const SEQUENCE_MIN: i32 = 1;

/// Normalize a priority into the valid range
pub fn clamp_priority(priority: i32) -> i32 {
    priority.clamp(PRIORITY_MIN, PRIORITY_MAX)
}

/// Normalize a sequence number into the valid range
pub fn clamp_sequence(sequence: i32) -> i32 {
    sequence.max(SEQUENCE_MIN)
}

/// Preparation lifecycle state, derived from the timestamp fields
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PrepState {
    /// Dispatched to a station, not yet picked up
    Routed,
    /// Preparation in progress
    Started,
    /// Bumped — terminal unless recalled
    Completed,
}

/// The core mutable record: one order's assignment to one station
///
/// `completed_at = None` means the entry is active. Completion fields
/// (`completed_at`, `bumped_at`, `bumped_by`) are always set together;
/// recall clears all three and increments `recall_count`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoutingEntry {
    pub id: String,
    pub order_id: String,
    pub station_id: String,
    pub sequence: i32,
    pub priority: i32,
    /// Unix millis, set at creation
    pub routed_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bumped_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bumped_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recalled_at: Option<i64>,
    #[serde(default)]
    pub recall_count: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Estimated preparation time in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_prep_time: Option<i64>,
    /// Actual preparation time in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_prep_time: Option<i64>,
}

impl RoutingEntry {
    /// Create a fresh entry in the `Routed` state
    ///
    /// Out-of-range `sequence`/`priority` input is normalized here so an
    /// invalid target can never produce an inconsistent record.
    pub fn new(
        order_id: impl Into<String>,
        station_id: impl Into<String>,
        sequence: i32,
        priority: i32,
        routed_at: i64,
    ) -> Self {
        Self {
            id: util::new_record_id(),
            order_id: order_id.into(),
            station_id: station_id.into(),
            sequence: clamp_sequence(sequence),
            priority: clamp_priority(priority),
            routed_at,
            started_at: None,
            completed_at: None,
            bumped_by: None,
            bumped_at: None,
            recalled_at: None,
            recall_count: 0,
            notes: None,
            estimated_prep_time: None,
            actual_prep_time: None,
        }
    }

    /// An entry is active until it is bumped
    pub fn is_active(&self) -> bool {
        self.completed_at.is_none()
    }

    pub fn prep_state(&self) -> PrepState {
        if self.completed_at.is_some() {
            PrepState::Completed
        } else if self.started_at.is_some() {
            PrepState::Started
        } else {
            PrepState::Routed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_entry_normalizes_out_of_range_input() {
        let entry = RoutingEntry::new("order-1", "station-1", 0, 99, 1000);
        assert_eq!(entry.sequence, SEQUENCE_MIN);
        assert_eq!(entry.priority, PRIORITY_MAX);

        let entry = RoutingEntry::new("order-1", "station-1", -5, -3, 1000);
        assert_eq!(entry.sequence, 1);
        assert_eq!(entry.priority, 0);
    }

    #[test]
    fn test_prep_state_derivation() {
        let mut entry = RoutingEntry::new("order-1", "station-1", 1, 1, 1000);
        assert_eq!(entry.prep_state(), PrepState::Routed);
        assert!(entry.is_active());

        entry.started_at = Some(2000);
        assert_eq!(entry.prep_state(), PrepState::Started);

        entry.completed_at = Some(3000);
        assert_eq!(entry.prep_state(), PrepState::Completed);
        assert!(!entry.is_active());
    }
}
