//! Hashing operations and types.
//!
//! SHA-256 is the only digest used anywhere in reprovm: storage keys, task
//! fingerprints, and result hashes are all the same 64-character lowercase
//! hex encoding of a 32-byte digest. Keeping a single [`Hash`] type means a
//! fingerprint and a blob key are interchangeable wherever the design calls
//! for it (e.g. a fingerprint can be looked up directly as a record name).

use std::fmt;
use std::io::Read;
use std::path::Path;

use derive_more::Display;
use sha2::{Digest, Sha256};
use tracing::{instrument, trace};

use crate::error::CasError;

/// A SHA-256 digest, canonically rendered as 64 lowercase hex characters.
///
/// Invariant: the inner string is always exactly 64 characters from
/// `[0-9a-f]`. The only way to construct one outside of hashing bytes is
/// [`Hash::parse`], which enforces the invariant.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Display)]
#[display("{_0}")]
pub struct Hash(String);

impl Hash {
    /// Hash a single in-memory buffer.
    #[instrument(skip_all, name = "Hash::of_bytes")]
    pub fn of_bytes(data: impl AsRef<[u8]>) -> Self {
        let mut hasher = Hasher::new();
        hasher.update(data.as_ref());
        hasher.finalize()
    }

    /// Hash the contents of a file in streaming fashion, without loading the
    /// whole file into memory.
    #[instrument(name = "Hash::of_file")]
    pub fn of_file(path: impl AsRef<Path> + fmt::Debug) -> Result<Self, CasError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|source| CasError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut reader = std::io::BufReader::new(file);
        let mut hasher = Hasher::new();
        let mut buf = [0u8; 64 * 1024];
        loop {
            let read = reader.read(&mut buf).map_err(|source| CasError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            if read == 0 {
                break;
            }
            hasher.update(&buf[..read]);
        }
        Ok(hasher.finalize())
    }

    /// Parse a pre-existing 64-character lowercase hex string as a hash,
    /// e.g. when reading one back out of a record file.
    pub fn parse(s: impl Into<String>) -> Option<Self> {
        let s = s.into();
        let valid = s.len() == 64 && s.bytes().all(|b| b.is_ascii_hexdigit() && !b.is_ascii_uppercase());
        valid.then_some(Self(s))
    }

    /// View the hash as its canonical hex string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The first two hex characters, used as the CAS fan-out directory name.
    pub fn fanout_dir(&self) -> &str {
        &self.0[..2]
    }

    /// The remaining 62 hex characters, used as the object's file name.
    pub fn fanout_file(&self) -> &str {
        &self.0[2..]
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({})", self.0)
    }
}

impl AsRef<str> for Hash {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl AsRef<[u8]> for Hash {
    fn as_ref(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

/// Incremental SHA-256: `init -> update* -> finalize`.
///
/// This has no fallible operations; hashing bytes already in memory cannot
/// fail. Fallibility enters only once the caller asks for bytes from
/// somewhere that can fail to produce them, e.g. a file (see [`Hash::of_file`]).
pub struct Hasher(Sha256);

impl Hasher {
    pub fn new() -> Self {
        Self(Sha256::new())
    }

    pub fn update(&mut self, data: impl AsRef<[u8]>) {
        self.0.update(data.as_ref());
    }

    pub fn finalize(self) -> Hash {
        let digest = self.0.finalize();
        let hex = hex::encode(digest);
        trace!(hash = %hex, "finalize hasher");
        Hash(hex)
    }
}

impl Default for Hasher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq as pretty_assert_eq;

    #[test]
    fn of_bytes_is_stable_sha256() {
        let hash = Hash::of_bytes(b"hello\n");
        pretty_assert_eq!(
            hash.as_str(),
            "5891b5b522d5df086d0ff0b110fbd9d21bb4fc7163af34d08286a2e846f6be03"[..64].to_string()
        );
    }

    #[test]
    fn of_bytes_matches_incremental_update() {
        let mut hasher = Hasher::new();
        hasher.update(b"hel");
        hasher.update(b"lo\n");
        pretty_assert_eq!(hasher.finalize(), Hash::of_bytes(b"hello\n"));
    }

    #[test]
    fn parse_rejects_wrong_length_or_case() {
        assert!(Hash::parse("a".repeat(64)).is_some());
        assert!(Hash::parse("a".repeat(63)).is_none());
        assert!(Hash::parse("A".repeat(64)).is_none());
        assert!(Hash::parse("g".repeat(64)).is_none());
    }

    #[test]
    fn fanout_splits_at_two_characters() {
        let hash = Hash::of_bytes(b"fanout");
        assert_eq!(hash.fanout_dir().len(), 2);
        assert_eq!(hash.fanout_file().len(), 62);
        assert_eq!(format!("{}{}", hash.fanout_dir(), hash.fanout_file()), hash.as_str());
    }
}
