//! Request-correlation table
//!
//! Maps each in-flight [`RequestId`] to the sink that will receive its
//! completion. Responses are routed through [`PendingTable::settle`], the
//! single dispatch point; a sink can be taken out at most once, so every
//! request completes exactly once even when responses arrive out of order.

use crate::message::RequestId;
use std::collections::HashMap;

/// Correlation table from request id to pending sink
#[derive(Debug)]
pub struct PendingTable<S> {
    next_id: u64,
    entries: HashMap<RequestId, S>,
}

impl<S> Default for PendingTable<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> PendingTable<S> {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: 1,
            entries: HashMap::new(),
        }
    }

    /// Register a sink and allocate a fresh id for it
    pub fn issue(&mut self, sink: S) -> RequestId {
        let id = RequestId(self.next_id);
        self.next_id += 1;
        self.entries.insert(id, sink);
        id
    }

    /// Remove the sink for `id`
    ///
    /// Returns `None` for unknown ids and for ids that were already settled.
    pub fn settle(&mut self, id: RequestId) -> Option<S> {
        self.entries.remove(&id)
    }

    /// Remove every outstanding sink, oldest first
    pub fn drain(&mut self) -> Vec<(RequestId, S)> {
        let mut drained: Vec<_> = self.entries.drain().collect();
        drained.sort_by_key(|(id, _)| *id);
        drained
    }

    #[inline]
    #[must_use]
    pub fn contains(&self, id: RequestId) -> bool {
        self.entries.contains_key(&id)
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique() {
        let mut table = PendingTable::new();
        let a = table.issue("a");
        let b = table.issue("b");
        assert_ne!(a, b);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn settles_out_of_order_exactly_once() {
        let mut table = PendingTable::new();
        let a = table.issue("a");
        let b = table.issue("b");

        assert_eq!(table.settle(b), Some("b"));
        assert_eq!(table.settle(b), None);
        assert!(table.contains(a));
        assert_eq!(table.settle(a), Some("a"));
        assert!(table.is_empty());
    }

    #[test]
    fn unknown_ids_are_ignored() {
        let mut table: PendingTable<()> = PendingTable::new();
        assert_eq!(table.settle(RequestId(99)), None);
    }

    #[test]
    fn drain_empties_in_issue_order() {
        let mut table = PendingTable::new();
        let ids: Vec<_> = (0..5).map(|i| table.issue(i)).collect();
        let drained = table.drain();
        assert_eq!(drained.iter().map(|(id, _)| *id).collect::<Vec<_>>(), ids);
        assert!(table.is_empty());

        // ids keep increasing after a drain
        let next = table.issue(9);
        assert!(next > ids[4]);
    }
}
