//! Transfer model handed back by the asset layer.
//!
//! When a checksum cannot be reached by an incremental rebase, the asset
//! layer synchronizes the referenced assets and produces a [`SolutionInfo`]
//! from which the workspace reconstructs a fresh snapshot.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// Identifier of a logical solution, stable across snapshots of the same
/// solution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SolutionId(Uuid);

impl SolutionId {
    #[must_use]
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for SolutionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Identifier of a project within a solution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProjectId(Uuid);

impl ProjectId {
    #[must_use]
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for ProjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Everything needed to reconstruct a solution snapshot from scratch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolutionInfo {
    pub id: SolutionId,
    /// Path of the solution's primary file, when it has one.
    pub file_path: Option<PathBuf>,
    pub projects: Vec<ProjectInfo>,
}

/// One project inside a [`SolutionInfo`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectInfo {
    pub id: ProjectId,
    pub name: String,
    pub file_path: Option<PathBuf>,
}
