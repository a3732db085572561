//! Duplicate-delivery suppression
//!
//! The underlying transport may deliver the same change twice in quick
//! succession (redelivery on reconnect, at-least-once push). Events for
//! a record id already seen inside the window are dropped.

use std::collections::HashMap;
use std::time::{Duration, Instant};

pub struct DedupWindow {
    window: Duration,
    seen: HashMap<String, Instant>,
}

impl DedupWindow {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            seen: HashMap::new(),
        }
    }

    /// Whether an event for `record_id` should be processed now
    pub fn accept(&mut self, record_id: &str) -> bool {
        let now = Instant::now();
        self.seen
            .retain(|_, last| now.duration_since(*last) < self.window);
        match self.seen.get(record_id) {
            Some(last) if now.duration_since(*last) < self.window => false,
            _ => {
                self.seen.insert(record_id.to_string(), now);
                true
            }
        }
    }
}
