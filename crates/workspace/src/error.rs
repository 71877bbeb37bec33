//! Error types for the workspace crate.

use miette::Diagnostic;
use solhost_solution::Checksum;
use thiserror::Error;

/// Error type for snapshot materialization and cache operations.
///
/// `Clone` because a single failed materialization is observed by every
/// caller awaiting the shared producer task.
#[derive(Error, Debug, Clone, Diagnostic)]
pub enum Error {
    /// The materialization, or the wait on it, was cancelled.
    #[error("solution materialization was cancelled")]
    #[diagnostic(code(solhost::workspace::cancelled))]
    Cancelled,

    /// The asset layer failed to deliver the assets behind a checksum.
    #[error("asset synchronization failed for {}: {message}", checksum.short())]
    #[diagnostic(
        code(solhost::workspace::asset_fetch),
        help("The remote asset source may be unreachable or may no longer hold this checksum")
    )]
    AssetFetch {
        /// Checksum whose assets could not be fetched
        checksum: Checksum,
        /// Description of the underlying failure
        message: String,
    },

    /// Reconstructing the snapshot from fetched assets failed.
    #[error("solution reconstruction failed for {}: {message}", checksum.short())]
    #[diagnostic(code(solhost::workspace::solution_build))]
    SolutionBuild {
        /// Checksum of the snapshot that could not be built
        checksum: Checksum,
        /// Description of the underlying failure
        message: String,
    },
}

impl Error {
    /// Create an asset fetch error
    #[must_use]
    pub fn asset_fetch(checksum: &Checksum, message: impl Into<String>) -> Self {
        Self::AssetFetch {
            checksum: checksum.clone(),
            message: message.into(),
        }
    }

    /// Create a solution build error
    #[must_use]
    pub fn solution_build(checksum: &Checksum, message: impl Into<String>) -> Self {
        Self::SolutionBuild {
            checksum: checksum.clone(),
            message: message.into(),
        }
    }

    /// True for the cancellation path; every other failure surfaces through
    /// the fatal-error sink before being re-raised.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Result type for workspace operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_use_short_checksums() {
        let checksum = Checksum::from_data(b"error");
        let err = Error::asset_fetch(&checksum, "connection reset");
        let rendered = err.to_string();
        assert!(rendered.contains(checksum.short()));
        assert!(!rendered.contains(checksum.as_str()));
        assert!(rendered.contains("connection reset"));
    }

    #[test]
    fn only_cancellation_is_recoverable() {
        let checksum = Checksum::from_data(b"error");
        assert!(Error::Cancelled.is_cancelled());
        assert!(!Error::asset_fetch(&checksum, "x").is_cancelled());
        assert!(!Error::solution_build(&checksum, "x").is_cancelled());
    }
}
