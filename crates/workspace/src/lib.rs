//! Checksum-addressed solution snapshot cache for remote feature hosts.
//!
//! A remote host receives feature requests that name the solution state they
//! should run against by an opaque content checksum. This crate materializes
//! the snapshot behind a checksum at most once no matter how many requests
//! race for it, keeps it alive exactly as long as someone is interested
//! (plus a one-deep most-recently-requested pin that absorbs back-to-back
//! repeats), cancels materializations the moment nobody wants them, and
//! maintains a monotonically-versioned primary branch that an older push can
//! never roll back.
//!
//! # Overview
//!
//! [`RemoteWorkspace`] is the entry point. Callers supply an
//! [`AssetProvider`] and a checksum:
//!
//! - [`RemoteWorkspace::run_with_solution`] materializes (or reuses) the
//!   snapshot and runs an operation against it.
//! - [`RemoteWorkspace::run_with_primary_solution`] does the same and
//!   promotes the result to the primary branch at a given version.
//! - [`RemoteWorkspace::update_primary_branch`] promotes without running an
//!   operation.
//!
//! Materialization goes through a [`SolutionUpdater`] when an incremental
//! rebase of the current primary is possible, and otherwise through a bulk
//! asset sync and full reconstruction. The embedding [`WorkspaceHost`]
//! observes primary-branch changes.
//!
//! All bookkeeping - cache maps, reference counts, the last-requested pins,
//! the primary snapshot and its version - serializes on one internal mutex
//! that is never held across an await; the expensive work runs outside it.

mod cache;
mod config;
mod error;
mod lazy;
mod provider;
mod testing;
mod workspace;

pub use config::WorkspaceConfig;
pub use error::{Error, Result};
pub use provider::{AssetProvider, SolutionUpdater, WorkspaceHost};
pub use testing::TestAccessor;
pub use workspace::RemoteWorkspace;

// Re-export the model crate so embedders need only one dependency.
pub use solhost_solution as solution;
