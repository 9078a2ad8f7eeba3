//! Bounded transition trail for diagnostics.
//!
//! The machine appends a [`TransitionRecord`] on every node change. The
//! trail is telemetry only: transition logic never reads it.

use core::fmt;
use std::collections::VecDeque;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use trellis_context::{EdgeGuid, NodeGuid};

/// Why the machine changed node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransitionReason {
    /// Entry node entered by `start()`.
    Start,
    /// Host-forced transition via `try_enter_node`.
    Manual,
    /// A node called `request_enter_node`.
    Requested,
    /// An edge condition passed during automatic resolution.
    AutoEdge,
    /// An external event bound to a node fired.
    ExternalEvent,
}

impl TransitionReason {
    /// Returns the reason as a static string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            TransitionReason::Start => "start",
            TransitionReason::Manual => "manual",
            TransitionReason::Requested => "requested",
            TransitionReason::AutoEdge => "auto_edge",
            TransitionReason::ExternalEvent => "external_event",
        }
    }
}

impl fmt::Display for TransitionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One node change.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionRecord {
    /// When the transition happened, per the machine's clock.
    pub timestamp: Instant,
    /// Machine frame counter at the time of the transition.
    pub frame: u64,
    /// Node left, `None` for the start transition.
    pub from: Option<NodeGuid>,
    /// Node entered.
    pub to: NodeGuid,
    /// Why the transition happened.
    pub reason: TransitionReason,
    /// Edge traversed, for automatic transitions.
    pub edge: Option<EdgeGuid>,
    /// Source port of the traversed edge.
    pub from_port: Option<String>,
}

/// Fixed-capacity ring of transition records, oldest evicted first.
#[derive(Debug, Clone)]
pub struct TransitionHistory {
    records: VecDeque<TransitionRecord>,
    capacity: usize,
    total: u64,
}

impl TransitionHistory {
    /// Default number of records kept.
    pub const DEFAULT_CAPACITY: usize = 64;

    /// Creates an empty history keeping at most `capacity` records.
    ///
    /// A capacity of zero records nothing.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: VecDeque::with_capacity(capacity),
            capacity,
            total: 0,
        }
    }

    /// Appends a record, evicting the oldest when full.
    pub fn push(&mut self, record: TransitionRecord) {
        self.total += 1;
        if self.capacity == 0 {
            return;
        }
        while self.records.len() >= self.capacity {
            self.records.pop_front();
        }
        self.records.push_back(record);
    }

    /// Iterates records from oldest to newest.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &TransitionRecord> + ExactSizeIterator {
        self.records.iter()
    }

    /// Returns the newest record.
    #[must_use]
    pub fn last(&self) -> Option<&TransitionRecord> {
        self.records.back()
    }

    /// Returns the number of records currently kept.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if no records are kept.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Returns the maximum number of records kept.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the number of records ever pushed, including evicted ones.
    #[must_use]
    pub fn total_recorded(&self) -> u64 {
        self.total
    }

    /// Removes all records.
    pub fn clear(&mut self) {
        self.records.clear();
    }
}

impl Default for TransitionHistory {
    fn default() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn record(to: &str, frame: u64) -> TransitionRecord {
        TransitionRecord {
            timestamp: Instant::now(),
            frame,
            from: None,
            to: NodeGuid::from(to),
            reason: TransitionReason::AutoEdge,
            edge: None,
            from_port: None,
        }
    }

    #[test]
    fn evicts_oldest_first() {
        let mut history = TransitionHistory::with_capacity(2);
        history.push(record("a", 0));
        history.push(record("b", 1));
        history.push(record("c", 2));

        let kept: Vec<&str> = history.iter().map(|r| r.to.as_str()).collect();
        assert_eq!(kept, vec!["b", "c"]);
        assert_eq!(history.total_recorded(), 3);
        assert_eq!(history.last().map(|r| r.frame), Some(2));
    }

    #[test]
    fn zero_capacity_records_nothing() {
        let mut history = TransitionHistory::with_capacity(0);
        history.push(record("a", 0));
        assert!(history.is_empty());
        assert_eq!(history.total_recorded(), 1);
    }

    #[test]
    fn reason_display() {
        assert_eq!(TransitionReason::ExternalEvent.to_string(), "external_event");
    }

    proptest! {
        #[test]
        fn never_exceeds_capacity(capacity in 0usize..16, pushes in 0usize..64) {
            let mut history = TransitionHistory::with_capacity(capacity);
            for i in 0..pushes {
                history.push(record("n", i as u64));
            }
            prop_assert_eq!(history.len(), pushes.min(capacity));
            if let Some(last) = history.last() {
                prop_assert_eq!(last.frame, (pushes - 1) as u64);
            }
        }
    }
}
