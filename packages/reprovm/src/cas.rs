//! Content-addressed blob store.
//!
//! Layout: `<base>/.reprovm/cas/objects/<XY>/<REST>`, where `XY` is the hash's
//! first two hex characters and `REST` is the remaining 62. See
//! `original_source/cas.c` (`make_object_path`) for the on-disk layout this
//! mirrors, and `darinkishore-hurry`'s `cache/fs.rs` for the
//! store-then-intern idiom this borrows.

use std::path::{Path, PathBuf};

use tracing::{instrument, trace};

use crate::error::CasError;
use crate::fs;
use crate::hash::Hash;

/// A content-addressed store rooted at `<base>/.reprovm/cas`.
#[derive(Clone, Debug)]
pub struct Cas {
    objects_dir: PathBuf,
}

impl Cas {
    /// Ensure the CAS root exists under `base_dir`, creating parents as
    /// needed, and return a handle to it.
    #[instrument]
    pub fn init(base_dir: &Path) -> Result<Self, CasError> {
        let objects_dir = base_dir.join(".reprovm").join("cas").join("objects");
        fs::create_dir_all(&objects_dir).map_err(|source| CasError::Io {
            path: objects_dir.clone(),
            source,
        })?;
        Ok(Self { objects_dir })
    }

    fn object_path(&self, hash: &Hash) -> PathBuf {
        self.objects_dir.join(hash.fanout_dir()).join(hash.fanout_file())
    }

    pub fn exists(&self, hash: &Hash) -> bool {
        fs::exists(&self.object_path(hash))
    }

    /// Hash `data` and store it if not already present. Returns the hash
    /// either way (spec invariant 5: idempotent under concurrent calls for
    /// the same content).
    #[instrument(skip(self, data))]
    pub fn store_from_bytes(&self, data: &[u8]) -> Result<Hash, CasError> {
        let hash = Hash::of_bytes(data);
        let dest = self.object_path(&hash);
        if fs::exists(&dest) {
            trace!(%hash, "blob already present");
            return Ok(hash);
        }
        fs::write_atomic(&dest, data).map_err(|source| CasError::Io { path: dest, source })?;
        Ok(hash)
    }

    /// Hash the file at `path` in streaming fashion and store its contents
    /// if not already present.
    #[instrument(skip(self))]
    pub fn store_from_file(&self, path: &Path) -> Result<Hash, CasError> {
        if !fs::exists(path) {
            return Err(CasError::InputMissing(path.to_path_buf()));
        }
        let hash = Hash::of_file(path)?;
        let dest = self.object_path(&hash);
        if fs::exists(&dest) {
            trace!(%hash, "blob already present");
            return Ok(hash);
        }
        fs::copy_atomic(path, &dest).map_err(|source| CasError::Io { path: dest, source })?;
        Ok(hash)
    }

    /// Restore the blob for `hash` to `dest`, overwriting whatever is there.
    #[instrument(skip(self))]
    pub fn fetch_to_file(&self, hash: &Hash, dest: &Path) -> Result<(), CasError> {
        let src = self.object_path(hash);
        if !fs::exists(&src) {
            return Err(CasError::BlobMissing(hash.as_str().to_string()));
        }
        fs::overwrite(&src, dest).map_err(|source| CasError::Io {
            path: dest.to_path_buf(),
            source,
        })
    }
}
