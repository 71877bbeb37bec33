//! Content-hash identity for solution snapshots.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Error returned when a checksum fails validation at the API boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChecksumError {
    #[error("checksum must be 64 hex characters, got {0}")]
    Length(usize),

    #[error("checksum must contain only hex digits")]
    Digits,
}

/// An opaque content hash identifying a logical solution snapshot.
///
/// Carried as a validated 64-character hex string (SHA-256 width). Equality
/// and hashing are the only operations the cache relies on; how checksums
/// are computed and shipped over the wire is the asset layer's concern.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Checksum(String);

impl Checksum {
    /// Create a checksum from its hex representation.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not exactly 64 hex digits.
    pub fn from_hex(hex: impl Into<String>) -> Result<Self, ChecksumError> {
        let s = hex.into();
        if s.len() != 64 {
            return Err(ChecksumError::Length(s.len()));
        }
        if !s.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ChecksumError::Digits);
        }
        Ok(Self(s))
    }

    /// Compute a checksum over raw content.
    ///
    /// Convenience for embedding hosts and tests; production checksums
    /// normally arrive from the client already computed.
    #[must_use]
    pub fn from_data(data: &[u8]) -> Self {
        let hash = Sha256::digest(data);
        Self(hex::encode(hash))
    }

    /// The full hex representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 12 hex characters, for log fields.
    #[must_use]
    pub fn short(&self) -> &str {
        &self.0[..12]
    }
}

impl std::fmt::Display for Checksum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
