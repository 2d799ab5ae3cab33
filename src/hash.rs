// src/hash.rs

//! SHA-256 digests for source integrity
//!
//! Every recipe pins its source archive with a SHA-256 digest. This module
//! provides the validated digest type used in the recipe record, streaming
//! hashing of files and readers, and the verification used by the fetch phase.
//!
//! Digests are always stored as 64 lowercase hex characters. Parsing accepts
//! either case so that recipes copied from upstream release pages work as-is.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::str::FromStr;

/// Length of a SHA-256 digest as a hex string
pub const SHA256_HEX_LEN: usize = 64;

/// Digest parsing errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HashError {
    /// Hash string has wrong length
    InvalidLength { expected: usize, got: usize },
    /// Hash string contains invalid hex characters
    InvalidHex(String),
}

impl fmt::Display for HashError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidLength { expected, got } => {
                write!(f, "invalid sha256 length: expected {}, got {}", expected, got)
            }
            Self::InvalidHex(s) => write!(f, "invalid hex in sha256: {}", s),
        }
    }
}

impl std::error::Error for HashError {}

/// A validated SHA-256 digest
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Sha256Hash(String);

impl Sha256Hash {
    /// Validate and normalize a hex digest
    pub fn new(value: impl Into<String>) -> std::result::Result<Self, HashError> {
        let value = value.into();

        if value.len() != SHA256_HEX_LEN {
            return Err(HashError::InvalidLength {
                expected: SHA256_HEX_LEN,
                got: value.len(),
            });
        }

        if !value.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(HashError::InvalidHex(value));
        }

        Ok(Self(value.to_lowercase()))
    }

    /// Get the digest as a lowercase hex string
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Format as a prefixed string (e.g., "sha256:abc123...")
    pub fn to_prefixed_string(&self) -> String {
        format!("sha256:{}", self.0)
    }

    /// File name used for this digest in the source cache
    pub fn cache_key(&self) -> String {
        format!("sha256_{}", self.0)
    }
}

impl fmt::Display for Sha256Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Sha256Hash {
    type Err = HashError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Sha256Hash {
    type Error = HashError;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Sha256Hash> for String {
    fn from(hash: Sha256Hash) -> Self {
        hash.0
    }
}

/// Compute the SHA-256 digest of a byte slice
pub fn hash_bytes(data: &[u8]) -> Sha256Hash {
    let mut hasher = Sha256::new();
    hasher.update(data);
    Sha256Hash(format!("{:x}", hasher.finalize()))
}

/// Compute the SHA-256 digest of everything a reader yields
pub fn hash_reader<R: Read>(reader: &mut R) -> io::Result<Sha256Hash> {
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];

    loop {
        let n = reader.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(Sha256Hash(format!("{:x}", hasher.finalize())))
}

/// Compute the SHA-256 digest of a file without loading it into memory
pub fn hash_file(path: &Path) -> io::Result<Sha256Hash> {
    let mut file = File::open(path)?;
    hash_reader(&mut file)
}

/// Verify a file matches an expected digest
///
/// Returns [`Error::ChecksumMismatch`] carrying both digests when the file
/// content differs, and an I/O error when the file cannot be read.
pub fn verify_file(path: &Path, expected: &Sha256Hash) -> Result<()> {
    let actual = hash_file(path)
        .map_err(|e| Error::IoError(format!("Failed to hash {}: {}", path.display(), e)))?;

    if &actual == expected {
        Ok(())
    } else {
        Err(Error::ChecksumMismatch {
            expected: expected.to_string(),
            actual: actual.to_string(),
        })
    }
}
