//! Workspace configuration.

/// Tunables for a [`RemoteWorkspace`](crate::RemoteWorkspace).
#[derive(Debug, Clone)]
pub struct WorkspaceConfig {
    /// Consult the [`SolutionUpdater`](crate::SolutionUpdater) for an
    /// incremental rebase of the current primary before falling back to a
    /// bulk asset sync.
    pub enable_incremental_update: bool,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            enable_incremental_update: true,
        }
    }
}
