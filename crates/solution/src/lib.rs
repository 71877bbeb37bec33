//! Solution snapshot model for the solhost remote workspace.
//!
//! A remote feature host identifies the state it should operate on by an
//! opaque content checksum. This crate provides the types that travel across
//! that boundary:
//!
//! - [`Checksum`] - the content-hash identity of a logical solution snapshot
//! - [`SolutionInfo`] / [`ProjectInfo`] - the transfer model the asset layer
//!   hands back when a snapshot has to be rebuilt from scratch
//! - [`SolutionSnapshot`] - the immutable, cheaply-shared view of project
//!   state that feature operations run against

pub mod checksum;
pub mod info;
pub mod snapshot;

pub use checksum::{Checksum, ChecksumError};
pub use info::{ProjectId, ProjectInfo, SolutionId, SolutionInfo};
pub use snapshot::SolutionSnapshot;
