//! Immutable solution snapshots.

use crate::checksum::Checksum;
use crate::info::{ProjectInfo, SolutionId};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// An immutable view of project state at one checksum.
///
/// Cheap to clone and hold (the inner state is shared), expensive to build.
/// Concurrent requests for one checksum are guaranteed to observe the same
/// underlying object; [`ptr_eq`](Self::ptr_eq) tests for that identity.
#[derive(Debug, Clone)]
pub struct SolutionSnapshot {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    checksum: Checksum,
    solution_id: SolutionId,
    file_path: Option<PathBuf>,
    projects: Vec<ProjectInfo>,
}

impl SolutionSnapshot {
    /// Create a base snapshot with no projects.
    #[must_use]
    pub fn new(checksum: Checksum, solution_id: SolutionId, file_path: Option<PathBuf>) -> Self {
        Self {
            inner: Arc::new(Inner {
                checksum,
                solution_id,
                file_path,
                projects: Vec::new(),
            }),
        }
    }

    /// A new snapshot with `project` appended; `self` is untouched.
    #[must_use]
    pub fn with_project(&self, project: ProjectInfo) -> Self {
        let mut projects = self.inner.projects.clone();
        projects.push(project);
        Self {
            inner: Arc::new(Inner {
                checksum: self.inner.checksum.clone(),
                solution_id: self.inner.solution_id,
                file_path: self.inner.file_path.clone(),
                projects,
            }),
        }
    }

    #[must_use]
    pub fn checksum(&self) -> &Checksum {
        &self.inner.checksum
    }

    #[must_use]
    pub fn solution_id(&self) -> SolutionId {
        self.inner.solution_id
    }

    #[must_use]
    pub fn file_path(&self) -> Option<&Path> {
        self.inner.file_path.as_deref()
    }

    #[must_use]
    pub fn projects(&self) -> &[ProjectInfo] {
        &self.inner.projects
    }

    /// Whether two snapshots describe the same logical solution: same id and
    /// same primary file path. Distinguishes "the solution changed" from "a
    /// different solution arrived".
    #[must_use]
    pub fn same_solution(&self, other: &Self) -> bool {
        self.inner.solution_id == other.inner.solution_id
            && self.inner.file_path == other.inner.file_path
    }

    /// Object identity: both handles share one underlying snapshot.
    #[must_use]
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.inner, &b.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::info::ProjectId;

    fn snapshot() -> SolutionSnapshot {
        SolutionSnapshot::new(
            Checksum::from_data(b"snapshot"),
            SolutionId::new_random(),
            Some(PathBuf::from("/work/app.solution")),
        )
    }

    fn project(name: &str) -> ProjectInfo {
        ProjectInfo {
            id: ProjectId::new_random(),
            name: name.to_string(),
            file_path: None,
        }
    }

    #[test]
    fn with_project_leaves_original_untouched() {
        let base = snapshot();
        let extended = base.with_project(project("core"));

        assert!(base.projects().is_empty());
        assert_eq!(extended.projects().len(), 1);
        assert_eq!(extended.projects()[0].name, "core");
        assert_eq!(base.checksum(), extended.checksum());
    }

    #[test]
    fn clones_share_identity() {
        let a = snapshot();
        let b = a.clone();
        assert!(SolutionSnapshot::ptr_eq(&a, &b));

        let c = a.with_project(project("other"));
        assert!(!SolutionSnapshot::ptr_eq(&a, &c));
    }

    #[test]
    fn same_solution_requires_id_and_path() {
        let id = SolutionId::new_random();
        let path = Some(PathBuf::from("/work/app.solution"));
        let a = SolutionSnapshot::new(Checksum::from_data(b"a"), id, path.clone());
        let b = SolutionSnapshot::new(Checksum::from_data(b"b"), id, path);
        let c = SolutionSnapshot::new(Checksum::from_data(b"c"), id, None);
        let d = SolutionSnapshot::new(Checksum::from_data(b"d"), SolutionId::new_random(), None);

        assert!(a.same_solution(&b));
        assert!(!a.same_solution(&c));
        assert!(!c.same_solution(&d));
    }
}
