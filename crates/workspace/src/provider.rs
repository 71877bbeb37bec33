//! External collaborator interfaces consumed by the workspace.

use crate::Result;
use async_trait::async_trait;
use solhost_solution::{Checksum, SolutionInfo, SolutionSnapshot};
use tokio_util::sync::CancellationToken;

/// Fetches and validates solution assets from the remote source.
///
/// The token passed to each call belongs to the materialization, not to any
/// individual caller: it is raised once the last interested caller has gone
/// away, at which point the provider should stop work promptly.
#[async_trait]
pub trait AssetProvider: Send + Sync {
    /// Pull every asset referenced by `checksum` into the local asset store.
    async fn synchronize_solution_assets(
        &self,
        checksum: &Checksum,
        cancel: &CancellationToken,
    ) -> Result<()>;

    /// Fetch the transfer model describing the solution behind `checksum`.
    ///
    /// Called after [`synchronize_solution_assets`](Self::synchronize_solution_assets)
    /// succeeded, so the referenced assets are available locally.
    async fn create_solution_info(
        &self,
        checksum: &Checksum,
        cancel: &CancellationToken,
    ) -> Result<SolutionInfo>;
}

/// Incremental rebase support: turns the current primary snapshot into the
/// snapshot for a nearby checksum without a bulk sync.
#[async_trait]
pub trait SolutionUpdater: Send + Sync {
    /// Whether `checksum` is close enough to the current primary snapshot
    /// for an incremental rebase.
    async fn is_incremental_update(
        &self,
        checksum: &Checksum,
        cancel: &CancellationToken,
    ) -> Result<bool>;

    /// Produce the rebased snapshot for `checksum`.
    async fn create_solution(
        &self,
        checksum: &Checksum,
        cancel: &CancellationToken,
    ) -> Result<SolutionSnapshot>;
}

/// The embedding host observing primary-branch changes.
///
/// Callbacks are invoked while the workspace's internal lock is held, so
/// notifications arrive in promotion order. Implementations must return
/// quickly and must not call back into the workspace.
pub trait WorkspaceHost: Send + Sync {
    /// A snapshot of a different solution became primary.
    fn on_solution_added(&self, snapshot: &SolutionSnapshot);

    /// A newer snapshot of the same solution became primary.
    fn on_solution_changed(&self, snapshot: &SolutionSnapshot);

    /// The primary is about to switch to a different solution; any
    /// per-solution auxiliary state must be dropped.
    fn clear_solution_data(&self);
}
