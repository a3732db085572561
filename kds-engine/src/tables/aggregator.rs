//! Pure aggregation over joined entry snapshots
//!
//! The display reads table groups, not raw entries: entries group by
//! table (and by seat inside each table), score by priority, order age,
//! and order size, and sort hottest-first. Everything here is a pure
//! function of the snapshot and an explicit `now`, so groupings are
//! recomputed on read rather than stored.

use shared::{ActiveEntry, SeatGroup, TableGroup, TableStatus};

use crate::core::{AttentionConfig, ScoringConfig};

const MILLIS_PER_MINUTE: f64 = 60_000.0;

/// Composite display priority for one entry.
///
/// `(priority + 1) * (1 + age_weight + item_weight)` — age and item
/// weights are capped so one pathological order cannot drown the board.
pub fn score_entry(active: &ActiveEntry, scoring: &ScoringConfig, now: i64) -> f64 {
    let age_minutes = (now - active.order.created_at) as f64 / MILLIS_PER_MINUTE;
    let age_weight = (age_minutes / scoring.age_divisor_minutes).min(scoring.age_weight_cap);
    let item_weight =
        (active.order.item_count() as f64 / scoring.item_divisor).min(scoring.item_weight_cap);
    (active.entry.priority as f64 + 1.0) * (1.0 + age_weight + item_weight)
}

/// Derived table status — never stored.
pub fn table_status(entries: &[ActiveEntry]) -> TableStatus {
    if entries.iter().all(|e| e.entry.completed_at.is_some()) {
        TableStatus::Ready
    } else if entries.iter().any(|e| e.entry.started_at.is_some()) {
        TableStatus::Preparing
    } else {
        TableStatus::Waiting
    }
}

/// Group a joined snapshot into display-ordered table groups.
///
/// Tables sort by descending score; equal scores break by ascending
/// oldest-order timestamp so the longest-waiting table wins.
pub fn group_by_table(entries: &[ActiveEntry], scoring: &ScoringConfig, now: i64) -> Vec<TableGroup> {
    let mut buckets: Vec<(String, Vec<ActiveEntry>)> = Vec::new();
    for active in entries {
        let table_id = &active.order.table_id;
        match buckets.iter_mut().find(|(id, _)| id == table_id) {
            Some((_, bucket)) => bucket.push(active.clone()),
            None => buckets.push((table_id.clone(), vec![active.clone()])),
        }
    }

    let mut groups: Vec<TableGroup> = buckets
        .into_iter()
        .map(|(table_id, entries)| {
            let total: f64 = entries
                .iter()
                .map(|e| score_entry(e, scoring, now))
                .sum();
            let score = total / entries.len() as f64;
            let oldest_created_at = entries
                .iter()
                .map(|e| e.order.created_at)
                .min()
                .unwrap_or(now);
            TableGroup {
                status: table_status(&entries),
                score,
                oldest_created_at,
                seats: group_by_seat(&entries),
                table_id,
                entries,
            }
        })
        .collect();

    groups.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.oldest_created_at.cmp(&b.oldest_created_at))
    });
    groups
}

/// Active entries at risk, independent of table grouping.
///
/// Any single trip wires the flag: order too old, priority raised high,
/// or the entry has bounced back to the kitchen repeatedly.
pub fn needs_attention(
    entries: &[ActiveEntry],
    attention: &AttentionConfig,
    now: i64,
) -> Vec<ActiveEntry> {
    entries
        .iter()
        .filter(|active| active.entry.is_active())
        .filter(|active| {
            let age_minutes = (now - active.order.created_at) / MILLIS_PER_MINUTE as i64;
            age_minutes > attention.max_age_minutes
                || active.entry.priority >= attention.min_priority
                || active.entry.recall_count >= attention.min_recalls
        })
        .cloned()
        .collect()
}

/// Seat-level detail view inside one table, in first-seen order
fn group_by_seat(entries: &[ActiveEntry]) -> Vec<SeatGroup> {
    let mut seats: Vec<SeatGroup> = Vec::new();
    for active in entries {
        let seat_id = active.order.seat_id.clone();
        match seats.iter_mut().find(|g| g.seat_id == seat_id) {
            Some(group) => group.entries.push(active.clone()),
            None => seats.push(SeatGroup {
                seat_id,
                entries: vec![active.clone()],
            }),
        }
    }
    seats
}
