//! A single reference-counted, cancellable materialization attempt.
//!
//! Each entry starts its producer the moment it is constructed, publishes
//! the result through a shared future, and lives for as long as anyone holds
//! a reference. The count only moves while the workspace mutex is held, hits
//! zero at most once, and on that transition the producer's cancellation
//! token is raised and the owning cache erases the mapping in the same
//! critical section. Retaining or releasing past that point is a programming
//! error and fails fast.

use crate::error::{Error, Result};
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use solhost_solution::{Checksum, SolutionSnapshot};
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use tokio_util::sync::CancellationToken;

/// Which cache index owns an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Branch {
    /// Snapshots requested by feature operations, promoted or not.
    Any,
    /// Snapshots promoted (or being promoted) to the primary branch.
    Primary,
}

/// The producer task's output, awaitable any number of times.
pub(crate) type SharedSolution = Shared<BoxFuture<'static, Result<SolutionSnapshot>>>;

/// One eagerly-started materialization of a checksum.
pub(crate) struct LazySolution {
    checksum: Checksum,
    branch: Branch,
    cancel: CancellationToken,
    task: SharedSolution,
    /// Guarded by the workspace mutex; atomic only so the type is `Sync`.
    refs: AtomicU32,
}

impl LazySolution {
    /// Create the entry and start its producer on the runtime immediately,
    /// so waiters never contend on a start latch. The starting count of 1 is
    /// the creating caller's reference.
    ///
    /// The producer receives the entry's cancellation token; it is also
    /// raced against the token, so an entry abandoned mid-flight resolves to
    /// [`Error::Cancelled`] even if the producer never polls the token.
    pub(crate) fn spawn<F, Fut>(checksum: Checksum, branch: Branch, producer: F) -> Arc<Self>
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = Result<SolutionSnapshot>> + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let producing = producer(cancel.clone());
        let handle = tokio::spawn({
            let cancel = cancel.clone();
            async move {
                tokio::select! {
                    () = cancel.cancelled() => Err(Error::Cancelled),
                    result = producing => result,
                }
            }
        });

        let task = {
            let checksum = checksum.clone();
            async move {
                match handle.await {
                    Ok(result) => result,
                    // The handle is never aborted, so this is a panic inside
                    // the producer; surface it to every awaiter.
                    Err(join) => Err(Error::solution_build(
                        &checksum,
                        format!("materialization task failed: {join}"),
                    )),
                }
            }
        }
        .boxed()
        .shared();

        Arc::new(Self {
            checksum,
            branch,
            cancel,
            task,
            refs: AtomicU32::new(1),
        })
    }

    pub(crate) fn checksum(&self) -> &Checksum {
        &self.checksum
    }

    pub(crate) fn branch(&self) -> Branch {
        self.branch
    }

    /// The shared producer task; clone out and await with no lock held.
    pub(crate) fn solution(&self) -> SharedSolution {
        self.task.clone()
    }

    /// Add a reference. Caller must hold the workspace mutex.
    pub(crate) fn retain(&self) {
        let prev = self.refs.fetch_add(1, Ordering::Relaxed);
        assert!(prev > 0, "retained a solution entry after its last release");
    }

    /// Drop a reference, reporting whether this was the zero transition. On
    /// zero the cancellation token is raised; the caller must hold the
    /// workspace mutex and erase the entry from its owning cache within the
    /// same critical section.
    pub(crate) fn release(&self) -> bool {
        let prev = self.refs.fetch_sub(1, Ordering::Relaxed);
        assert!(prev > 0, "released a solution entry that had no references");
        if prev == 1 {
            self.cancel.cancel();
            true
        } else {
            false
        }
    }

    /// Current reference count; test-facing.
    pub(crate) fn ref_count(&self) -> u32 {
        self.refs.load(Ordering::Relaxed)
    }

    #[cfg(test)]
    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solhost_solution::SolutionId;

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
    async fn producer_result_is_shared() {
        let entry = entry_for(b"shared");
        let first = entry.solution().await.unwrap();
        let second = entry.solution().await.unwrap();
        assert!(SolutionSnapshot::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn release_on_zero_raises_cancellation() {
        let entry = entry_for(b"cancel");
        entry.retain();
        assert_eq!(entry.ref_count(), 2);

        assert!(!entry.release());
        assert!(!entry.is_cancelled());

        assert!(entry.release());
        assert!(entry.is_cancelled());
        assert_eq!(entry.ref_count(), 0);
    }

    #[tokio::test]
    async fn abandoned_producer_resolves_cancelled() {
        let checksum = Checksum::from_data(b"pending");
        let entry = LazySolution::spawn(checksum, Branch::Any, |_cancel| async {
            std::future::pending().await
        });

        assert!(entry.release());
        let result = entry.solution().await;
        assert!(matches!(result, Err(Error::Cancelled)));
    }

    #[tokio::test]
    async fn panicking_producer_fails_awaiters() {
        let checksum = Checksum::from_data(b"panic");
        let entry = LazySolution::spawn(checksum, Branch::Any, |_cancel| async {
            panic!("producer exploded");
        });

        let result = entry.solution().await;
        assert!(matches!(result, Err(Error::SolutionBuild { .. })));
    }

    #[tokio::test]
    #[should_panic(expected = "retained a solution entry")]
    async fn retain_after_zero_is_a_bug() {
        let entry = entry_for(b"revive");
        assert!(entry.release());
        entry.retain();
    }

    #[tokio::test]
    #[should_panic(expected = "released a solution entry")]
    async fn double_release_is_a_bug() {
        let entry = entry_for(b"double");
        assert!(entry.release());
        entry.release();
    }
}
