//! Checksum-addressed index of in-flight and completed materializations.
//!
//! Two instances live inside the workspace state, one per branch. The index
//! is plain data: every method assumes the caller holds the workspace mutex,
//! which is what keeps refcount transitions and map mutations atomic with
//! respect to each other.

use crate::lazy::LazySolution;
use solhost_solution::Checksum;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Default)]
pub(crate) struct ChecksumCache {
    entries: HashMap<Checksum, Arc<LazySolution>>,
    /// One-deep pin on the most recently requested entry. While occupied it
    /// holds exactly one supplementary reference, which is what lets a
    /// back-to-back request for the same checksum skip reconstruction.
    last_requested: Option<(Checksum, Arc<LazySolution>)>,
}

impl ChecksumCache {
    /// Look up `checksum`, preferring the last-requested pin, taking a
    /// reference on the hit.
    pub(crate) fn try_fast_get(&self, checksum: &Checksum) -> Option<Arc<LazySolution>> {
        if let Some((pinned, entry)) = &self.last_requested
            && pinned == checksum
        {
            entry.retain();
            return Some(Arc::clone(entry));
        }
        if let Some(entry) = self.entries.get(checksum) {
            entry.retain();
            return Some(Arc::clone(entry));
        }
        None
    }

    /// Hit: take a reference on the existing entry. Miss: install the entry
    /// produced by `make`, whose starting reference belongs to the caller.
    /// Returns the entry and whether it was created here.
    pub(crate) fn get_or_create(
        &mut self,
        checksum: &Checksum,
        make: impl FnOnce() -> Arc<LazySolution>,
    ) -> (Arc<LazySolution>, bool) {
        if let Some(entry) = self.entries.get(checksum) {
            entry.retain();
            return (Arc::clone(entry), false);
        }
        let entry = make();
        self.entries.insert(checksum.clone(), Arc::clone(&entry));
        (entry, true)
    }

    /// Pin `entry` as most recently requested, taking a reference on it.
    ///
    /// The previously pinned entry is handed back with its reference
    /// transferred to the caller, who must release it only after dropping
    /// the workspace mutex: that release can cascade into cleanup, which
    /// needs the lock again.
    #[must_use]
    pub(crate) fn swap_last_requested(
        &mut self,
        entry: &Arc<LazySolution>,
    ) -> Option<Arc<LazySolution>> {
        entry.retain();
        let prior = self
            .last_requested
            .replace((entry.checksum().clone(), Arc::clone(entry)));
        prior.map(|(_, prior)| prior)
    }

    /// Erase `entry`'s mapping, but only if it is still the stored object; a
    /// newer entry installed under the same checksum must not be disturbed.
    pub(crate) fn remove_if_current(&mut self, entry: &Arc<LazySolution>) {
        let is_current = self
            .entries
            .get(entry.checksum())
            .is_some_and(|current| Arc::ptr_eq(current, entry));
        if is_current {
            self.entries.remove(entry.checksum());
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn last_requested_checksum(&self) -> Option<&Checksum> {
        self.last_requested.as_ref().map(|(checksum, _)| checksum)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lazy::Branch;
    use solhost_solution::{SolutionId, SolutionSnapshot};

    fn entry_for(data: &[u8]) -> Arc<LazySolution> {
        let checksum = Checksum::from_data(data);
        LazySolution::spawn(checksum.clone(), Branch::Any, move |_cancel| async move {
            Ok(SolutionSnapshot::new(
                checksum,
                SolutionId::new_random(),
                None,
            ))
        })
    }

    #[tokio::test]
    async fn fast_get_misses_an_empty_cache() {
        let cache = ChecksumCache::default();
        assert!(cache.try_fast_get(&Checksum::from_data(b"missing")).is_none());
    }

    #[tokio::test]
    async fn fast_get_bumps_on_map_hit() {
        let mut cache = ChecksumCache::default();
        let (entry, created) = cache.get_or_create(&Checksum::from_data(b"a"), || entry_for(b"a"));
        assert!(created);
        assert_eq!(entry.ref_count(), 1);

        let hit = cache.try_fast_get(&Checksum::from_data(b"a")).unwrap();
        assert!(Arc::ptr_eq(&entry, &hit));
        assert_eq!(entry.ref_count(), 2);
    }

    #[tokio::test]
    async fn get_or_create_reuses_existing_entry() {
        let mut cache = ChecksumCache::default();
        let checksum = Checksum::from_data(b"b");
        let (first, created_first) = cache.get_or_create(&checksum, || entry_for(b"b"));
        let (second, created_second) = cache.get_or_create(&checksum, || entry_for(b"b"));

        assert!(created_first);
        assert!(!created_second);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.ref_count(), 2);
    }

    #[tokio::test]
    async fn repinning_the_same_entry_keeps_one_supplementary_reference() {
        let mut cache = ChecksumCache::default();
        let checksum = Checksum::from_data(b"c");
        let (entry, _) = cache.get_or_create(&checksum, || entry_for(b"c"));

        let prior = cache.swap_last_requested(&entry);
        assert!(prior.is_none());
        assert_eq!(entry.ref_count(), 2);

        // The displaced pin is the entry itself; after the caller releases
        // it the net effect of repinning is zero.
        let prior = cache.swap_last_requested(&entry).unwrap();
        assert!(Arc::ptr_eq(&prior, &entry));
        assert_eq!(entry.ref_count(), 3);
        assert!(!prior.release());
        assert_eq!(entry.ref_count(), 2);
        assert_eq!(cache.last_requested_checksum(), Some(&checksum));
    }

    #[tokio::test]
    async fn remove_ignores_a_replaced_entry() {
        let mut cache = ChecksumCache::default();
        let stale = entry_for(b"d");
        let (current, _) = cache.get_or_create(stale.checksum(), || entry_for(b"d"));

        // `stale` was never installed; removing through it must leave the
        // stored entry alone.
        cache.remove_if_current(&stale);
        assert_eq!(cache.len(), 1);

        cache.remove_if_current(&current);
        assert_eq!(cache.len(), 0);
    }
}
