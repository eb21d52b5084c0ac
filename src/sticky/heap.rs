//! Load-ordered index of group members.

use std::collections::BTreeSet;

/// Orders members by how many partitions they hold, member id breaking ties,
/// so walking the entries visits the least loaded member first.
///
/// Entries are keyed by `(count, id)` and the count must always match the
/// length of the member's partition list in the plan. Callers keep the two in
/// lock-step by removing an entry *before* mutating the list it tracks and
/// reinserting it with the new length afterwards; an entry whose key went
/// stale can no longer be found for removal.
#[derive(Debug, Default)]
pub(super) struct LoadHeap {
    entries: BTreeSet<(usize, String)>,
}

impl LoadHeap {
    pub(super) fn insert(&mut self, count: usize, member: &str) {
        self.entries.insert((count, member.to_string()));
    }

    pub(super) fn remove(&mut self, count: usize, member: &str) -> bool {
        self.entries.remove(&(count, member.to_string()))
    }

    /// Iterates members from least to most loaded.
    pub(super) fn ascend(&self) -> impl Iterator<Item = (usize, &str)> + '_ {
        self.entries
            .iter()
            .map(|(count, member)| (*count, member.as_str()))
    }

    pub(super) fn min(&self) -> Option<(usize, &str)> {
        self.entries
            .first()
            .map(|(count, member)| (*count, member.as_str()))
    }

    pub(super) fn max(&self) -> Option<(usize, &str)> {
        self.entries
            .last()
            .map(|(count, member)| (*count, member.as_str()))
    }
}
