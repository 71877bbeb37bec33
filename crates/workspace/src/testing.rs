//! Test-only access to workspace internals.

use crate::error::Result;
use crate::provider::AssetProvider;
use crate::workspace::RemoteWorkspace;
use solhost_solution::{Checksum, SolutionSnapshot};
use std::future::Future;
use std::sync::Arc;

/// A window into a [`RemoteWorkspace`]'s bookkeeping, for assertions in
/// tests. Not part of the production contract.
pub struct TestAccessor<'a> {
    workspace: &'a RemoteWorkspace,
}

impl RemoteWorkspace {
    #[must_use]
    pub fn test_accessor(&self) -> TestAccessor<'_> {
        TestAccessor { workspace: self }
    }
}

impl TestAccessor<'_> {
    /// Drive the promotion gate directly, bypassing materialization.
    pub fn try_update_current_solution(
        &self,
        version: i64,
        snapshot: SolutionSnapshot,
    ) -> (SolutionSnapshot, bool) {
        self.workspace
            .shared
            .try_update_current_solution(version, snapshot)
    }

    /// The internal request surface with an explicit promotion version.
    pub async fn run_with_solution<T, F, Fut>(
        &self,
        assets: Arc<dyn AssetProvider>,
        checksum: Checksum,
        update_primary: Option<i64>,
        f: F,
    ) -> Result<(SolutionSnapshot, T)>
    where
        F: FnOnce(SolutionSnapshot) -> Fut,
        Fut: Future<Output = T>,
    {
        self.workspace
            .run_with_solution_inner(assets, checksum, update_primary, f)
            .await
    }

    pub fn current_version(&self) -> i64 {
        self.workspace.shared.state.lock().current_version
    }

    pub fn any_branch_len(&self) -> usize {
        self.workspace.shared.state.lock().any_branch.len()
    }

    pub fn primary_branch_len(&self) -> usize {
        self.workspace.shared.state.lock().primary_branch.len()
    }

    pub fn any_branch_last_requested(&self) -> Option<Checksum> {
        self.workspace
            .shared
            .state
            .lock()
            .any_branch
            .last_requested_checksum()
            .cloned()
    }

    pub fn primary_branch_last_requested(&self) -> Option<Checksum> {
        self.workspace
            .shared
            .state
            .lock()
            .primary_branch
            .last_requested_checksum()
            .cloned()
    }

    /// Reference count of the any-branch entry for `checksum`, if present.
    pub fn any_branch_ref_count(&self, checksum: &Checksum) -> Option<u32> {
        let state = self.workspace.shared.state.lock();
        let entry = state.any_branch.try_fast_get(checksum)?;
        // The probe took a reference of its own; undo it without disturbing
        // the entry's lifetime (the count cannot be 1 here).
        let count = entry.ref_count() - 1;
        assert!(!entry.release());
        drop(state);
        Some(count)
    }
}
