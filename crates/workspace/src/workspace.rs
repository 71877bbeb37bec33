//! The remote workspace façade.
//!
//! Callers hand in a checksum and an asset source; the workspace materializes
//! the snapshot behind the checksum at most once no matter how many requests
//! race for it, runs the caller's operation against it, and releases the
//! caller's interest on every exit path. Requests flagged as primary also
//! promote the snapshot into the workspace's current solution, gated by a
//! monotonic version so an older push can never overwrite a newer one.

use crate::cache::ChecksumCache;
use crate::config::WorkspaceConfig;
use crate::error::Result;
use crate::lazy::{Branch, LazySolution};
use crate::provider::{AssetProvider, SolutionUpdater, WorkspaceHost};
use parking_lot::Mutex;
use solhost_solution::{Checksum, SolutionSnapshot};
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Version value before any promotion; legal versions are non-negative.
pub(crate) const INITIAL_VERSION: i64 = -1;

/// Checksum-addressed snapshot cache with a monotonically-versioned primary
/// branch.
///
/// Cheap to share: clones hand out the same underlying workspace.
#[derive(Clone)]
pub struct RemoteWorkspace {
    pub(crate) shared: Arc<WorkspaceShared>,
}

pub(crate) struct WorkspaceShared {
    /// The single serialization domain. Every refcount transition, cache map
    /// mutation, pin swap, and primary update happens under this mutex, and
    /// it is never held across an await: materialization, asset I/O, and the
    /// caller's operation all run outside it.
    pub(crate) state: Mutex<WorkspaceState>,
    pub(crate) updater: Arc<dyn SolutionUpdater>,
    pub(crate) host: Arc<dyn WorkspaceHost>,
    pub(crate) config: WorkspaceConfig,
}

pub(crate) struct WorkspaceState {
    pub(crate) current: Option<SolutionSnapshot>,
    pub(crate) current_version: i64,
    pub(crate) any_branch: ChecksumCache,
    pub(crate) primary_branch: ChecksumCache,
}

impl WorkspaceState {
    pub(crate) fn cache_mut(&mut self, branch: Branch) -> &mut ChecksumCache {
        match branch {
            Branch::Any => &mut self.any_branch,
            Branch::Primary => &mut self.primary_branch,
        }
    }
}

impl RemoteWorkspace {
    /// Create an empty workspace.
    #[must_use]
    pub fn new(
        config: WorkspaceConfig,
        updater: Arc<dyn SolutionUpdater>,
        host: Arc<dyn WorkspaceHost>,
    ) -> Self {
        Self {
            shared: Arc::new(WorkspaceShared {
                state: Mutex::new(WorkspaceState {
                    current: None,
                    current_version: INITIAL_VERSION,
                    any_branch: ChecksumCache::default(),
                    primary_branch: ChecksumCache::default(),
                }),
                updater,
                host,
                config,
            }),
        }
    }

    /// The current primary snapshot, if one has been promoted.
    #[must_use]
    pub fn current_solution(&self) -> Option<SolutionSnapshot> {
        self.shared.state.lock().current.clone()
    }

    /// Materialize (or reuse) the snapshot for `checksum` and run `f`
    /// against it. Does not move the primary branch.
    ///
    /// Dropping the returned future mid-await relinquishes only this
    /// caller's interest; the materialization is cancelled when the last
    /// interested party lets go.
    pub async fn run_with_solution<T, F, Fut>(
        &self,
        assets: Arc<dyn AssetProvider>,
        checksum: Checksum,
        f: F,
    ) -> Result<(SolutionSnapshot, T)>
    where
        F: FnOnce(SolutionSnapshot) -> Fut,
        Fut: Future<Output = T>,
    {
        self.run_with_solution_inner(assets, checksum, None, f).await
    }

    /// Like [`run_with_solution`](Self::run_with_solution), but additionally
    /// promotes the materialized snapshot to the primary branch when
    /// `version` is newer than the current one.
    pub async fn run_with_primary_solution<T, F, Fut>(
        &self,
        assets: Arc<dyn AssetProvider>,
        checksum: Checksum,
        version: i64,
        f: F,
    ) -> Result<(SolutionSnapshot, T)>
    where
        F: FnOnce(SolutionSnapshot) -> Fut,
        Fut: Future<Output = T>,
    {
        self.run_with_solution_inner(assets, checksum, Some(version), f)
            .await
    }

    /// Move the primary branch to `checksum` at `version`.
    ///
    /// Idempotent: when the current primary already has this checksum the
    /// call returns it without touching any cache state.
    pub async fn update_primary_branch(
        &self,
        assets: Arc<dyn AssetProvider>,
        checksum: Checksum,
        version: i64,
    ) -> Result<SolutionSnapshot> {
        let (snapshot, ()) = self
            .run_with_solution_inner(assets, checksum, Some(version), |_snapshot| async {})
            .await?;
        Ok(snapshot)
    }

    pub(crate) async fn run_with_solution_inner<T, F, Fut>(
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
        // A repeated push of the snapshot that is already primary touches no
        // cache state at all.
        if update_primary.is_some() {
            let current = self.shared.state.lock().current.clone();
            if let Some(snapshot) = current.filter(|current| current.checksum() == &checksum) {
                debug!(
                    checksum = %checksum.short(),
                    "primary branch already at requested checksum"
                );
                let value = f(snapshot.clone()).await;
                return Ok((snapshot, value));
            }
        }

        let entry = self.get_or_create_entry(&assets, &checksum);
        let _guard = EntryGuard::adopt(Arc::clone(&self.shared), Arc::clone(&entry));

        let snapshot = entry.solution().await?;

        let (snapshot, primary) = if let Some(version) = update_primary {
            let (primary_entry, primary_guard) =
                self.get_or_create_primary_entry(&checksum, &entry, version);
            let promoted = primary_entry.solution().await?;
            // The entry's producer promoted with the version captured at its
            // creation; re-applying this caller's version here means a
            // caller that collapsed onto an existing entry still gets its
            // own, possibly newer, version recorded.
            let (snapshot, _updated) = self
                .shared
                .try_update_current_solution(version, promoted);
            (snapshot, Some((primary_entry, primary_guard)))
        } else {
            (snapshot, None)
        };

        let value = f(snapshot.clone()).await;

        // Pin what was just served so a back-to-back request for the same
        // checksum skips reconstruction.
        self.set_last_requested(&entry);
        if let Some((primary_entry, _guard)) = &primary {
            self.set_last_requested(primary_entry);
        }

        Ok((snapshot, value))
    }

    /// Probe the primary cache, then the any-branch cache, then install a
    /// fresh materialization. The returned entry carries one reference owned
    /// by the caller.
    fn get_or_create_entry(
        &self,
        assets: &Arc<dyn AssetProvider>,
        checksum: &Checksum,
    ) -> Arc<LazySolution> {
        let mut state = self.shared.state.lock();

        if let Some(entry) = state.primary_branch.try_fast_get(checksum) {
            debug!(checksum = %checksum.short(), "reusing primary-branch snapshot");
            return entry;
        }
        if let Some(entry) = state.any_branch.try_fast_get(checksum) {
            debug!(checksum = %checksum.short(), "reusing in-flight snapshot");
            return entry;
        }

        let (entry, created) = state.any_branch.get_or_create(checksum, || {
            let shared = Arc::clone(&self.shared);
            let assets = Arc::clone(assets);
            let checksum = checksum.clone();
            LazySolution::spawn(checksum.clone(), Branch::Any, move |cancel| {
                compute_snapshot(shared, assets, checksum, cancel)
            })
        });
        if created {
            info!(checksum = %checksum.short(), "materializing solution snapshot");
        }
        entry
    }

    /// Find or install the primary-branch entry for `checksum`. A fresh
    /// entry's producer awaits the underlying materialization and promotes
    /// it at `version`; it also keeps `base` alive for as long as it runs,
    /// so a primary pin alone suffices to keep the materialization going.
    fn get_or_create_primary_entry(
        &self,
        checksum: &Checksum,
        base: &Arc<LazySolution>,
        version: i64,
    ) -> (Arc<LazySolution>, EntryGuard) {
        let mut state = self.shared.state.lock();

        let (entry, _created) = state.primary_branch.get_or_create(checksum, || {
            base.retain();
            let base_guard = EntryGuard::adopt(Arc::clone(&self.shared), Arc::clone(base));
            let base_task = base.solution();
            let shared = Arc::clone(&self.shared);
            LazySolution::spawn(checksum.clone(), Branch::Primary, move |_cancel| async move {
                let _base_guard = base_guard;
                let snapshot = base_task.await?;
                let (snapshot, _updated) = shared.try_update_current_solution(version, snapshot);
                Ok(snapshot)
            })
        });
        drop(state);

        let guard = EntryGuard::adopt(Arc::clone(&self.shared), Arc::clone(&entry));
        (entry, guard)
    }

    /// Pin `entry` as the most recently requested in its owning cache.
    fn set_last_requested(&self, entry: &Arc<LazySolution>) {
        let prior = {
            let mut state = self.shared.state.lock();
            state.cache_mut(entry.branch()).swap_last_requested(entry)
        };
        // Releasing the displaced pin can take that entry to zero and
        // cascade into cleanup, which re-acquires the lock; it must happen
        // only after the guard above is gone.
        if let Some(prior) = prior {
            self.shared.release_entry(&prior);
        }
    }
}

impl WorkspaceShared {
    /// Drop one reference to `entry`. On the zero transition the producer's
    /// cancellation token is raised and the mapping erased, all inside one
    /// critical section, so a concurrent lookup either sees a live entry or
    /// none at all.
    pub(crate) fn release_entry(&self, entry: &Arc<LazySolution>) {
        let mut state = self.state.lock();
        if entry.release() {
            debug!(
                checksum = %entry.checksum().short(),
                "last reference released, cancelling materialization"
            );
            state.cache_mut(entry.branch()).remove_if_current(entry);
        }
    }

    /// Install `snapshot` as the current primary, provided `version` is
    /// newer than the current one. Returns the effective snapshot and
    /// whether anything changed.
    pub(crate) fn try_update_current_solution(
        &self,
        version: i64,
        snapshot: SolutionSnapshot,
    ) -> (SolutionSnapshot, bool) {
        let mut state = self.state.lock();
        if version <= state.current_version {
            debug!(
                version,
                current_version = state.current_version,
                "rejected stale primary promotion"
            );
            return (snapshot, false);
        }
        state.current_version = version;

        let same_solution = state
            .current
            .as_ref()
            .is_some_and(|current| current.same_solution(&snapshot));
        if same_solution {
            state.current = Some(snapshot.clone());
            info!(
                version,
                checksum = %snapshot.checksum().short(),
                "primary solution changed"
            );
            self.host.on_solution_changed(&snapshot);
        } else {
            // Switching to a different solution: auxiliary state tied to
            // the old one must be gone before the new snapshot is visible.
            self.host.clear_solution_data();
            state.current = Some(snapshot.clone());
            info!(
                version,
                checksum = %snapshot.checksum().short(),
                "primary solution added"
            );
            self.host.on_solution_added(&snapshot);
        }
        (snapshot, true)
    }
}

/// Owns one reference to a cache entry and releases it on drop. This is what
/// makes every exit path - completion, failure, or the caller dropping its
/// future mid-await - release exactly once.
pub(crate) struct EntryGuard {
    shared: Arc<WorkspaceShared>,
    entry: Arc<LazySolution>,
}

impl EntryGuard {
    /// Take ownership of an already-counted reference to `entry`.
    pub(crate) fn adopt(shared: Arc<WorkspaceShared>, entry: Arc<LazySolution>) -> Self {
        Self { shared, entry }
    }
}

impl Drop for EntryGuard {
    fn drop(&mut self) {
        self.shared.release_entry(&self.entry);
    }
}

/// Produce the snapshot for `checksum`: an incremental rebase when the
/// updater supports one, otherwise a bulk asset sync followed by a full
/// reconstruction.
async fn compute_snapshot(
    shared: Arc<WorkspaceShared>,
    assets: Arc<dyn AssetProvider>,
    checksum: Checksum,
    cancel: CancellationToken,
) -> Result<SolutionSnapshot> {
    let result = materialize(&shared, assets.as_ref(), &checksum, &cancel).await;
    if let Err(err) = &result
        && !err.is_cancelled()
    {
        // The failure reaches every awaiter through the shared task; it is
        // reported here exactly once.
        error!(
            checksum = %checksum.short(),
            error = %err,
            "solution materialization failed"
        );
    }
    result
}

async fn materialize(
    shared: &WorkspaceShared,
    assets: &dyn AssetProvider,
    checksum: &Checksum,
    cancel: &CancellationToken,
) -> Result<SolutionSnapshot> {
    if shared.config.enable_incremental_update
        && shared.updater.is_incremental_update(checksum, cancel).await?
    {
        debug!(checksum = %checksum.short(), "rebasing current primary incrementally");
        return shared.updater.create_solution(checksum, cancel).await;
    }

    assets.synchronize_solution_assets(checksum, cancel).await?;
    let info = assets.create_solution_info(checksum, cancel).await?;

    let mut snapshot = SolutionSnapshot::new(checksum.clone(), info.id, info.file_path.clone());
    for project in info.projects {
        snapshot = snapshot.with_project(project);
    }
    Ok(snapshot)
}
