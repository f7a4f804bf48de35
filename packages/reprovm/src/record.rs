//! The per-fingerprint record store: `<cache_root>/<task_hash>.meta`.
//!
//! Format (spec §4.E):
//! ```text
//! task_hash: <H>
//! result_hash: <R>
//! output <path> <blob_hash>
//! ```
//! Grounded on `original_source/task.c`'s `try_load_task_record`/
//! `write_task_record`; the write order (blobs into the CAS, then the meta
//! file) is the invariant that keeps a crash from ever producing a record
//! that points at a missing blob.

use std::path::{Path, PathBuf};

use tracing::{debug, instrument};

use crate::cas::Cas;
use crate::error::CasError;
use crate::hash::Hash;

/// A loaded or about-to-be-written record.
#[derive(Clone, Debug)]
pub struct Record {
    pub task_hash: Hash,
    pub result_hash: Hash,
    pub outputs: Vec<(String, Hash)>,
}

#[derive(Clone)]
pub struct RecordStore {
    cache_root: PathBuf,
}

impl RecordStore {
    #[instrument]
    pub fn init(base_dir: &Path) -> Result<Self, CasError> {
        let cache_root = base_dir.join(".reprovm").join("cache");
        crate::fs::create_dir_all(&cache_root).map_err(|source| CasError::Io {
            path: cache_root.clone(),
            source,
        })?;
        Ok(Self { cache_root })
    }

    fn path_for(&self, task_hash: &Hash) -> PathBuf {
        self.cache_root.join(format!("{}.meta", task_hash.as_str()))
    }

    /// Try to load the record for `task_hash`. A missing or unparsable file
    /// is reported as a cache miss rather than an error (spec §7: "on read:
    /// treat as miss").
    #[instrument(skip(self))]
    pub fn try_load(&self, task_hash: &Hash) -> Option<Record> {
        let path = self.path_for(task_hash);
        let text = std::fs::read_to_string(&path).ok()?;
        parse_record(&text).or_else(|| {
            debug!(?path, "record present but unparsable, treating as miss");
            None
        })
    }

    /// Write the record for `record.task_hash` atomically. Callers must
    /// have already interned every output blob into `cas` before calling
    /// this (spec §4.E write-ordering invariant).
    #[instrument(skip(self, cas))]
    pub fn write(&self, record: &Record, cas: &Cas) -> Result<(), CasError> {
        for (_, hash) in &record.outputs {
            if !cas.exists(hash) {
                return Err(CasError::BlobMissing(hash.as_str().to_string()));
            }
        }
        let path = self.path_for(&record.task_hash);
        let text = render_record(record);
        crate::fs::write_atomic(&path, text.as_bytes()).map_err(|source| CasError::Io { path, source })
    }

    pub fn cache_root(&self) -> &Path {
        &self.cache_root
    }
}

fn render_record(record: &Record) -> String {
    let mut out = format!(
        "task_hash: {}\nresult_hash: {}\n",
        record.task_hash.as_str(),
        record.result_hash.as_str()
    );
    for (path, hash) in &record.outputs {
        out.push_str(&format!("output {path} {}\n", hash.as_str()));
    }
    out
}

fn parse_record(text: &str) -> Option<Record> {
    let mut task_hash = None;
    let mut result_hash = None;
    let mut outputs = Vec::new();

    for line in text.lines() {
        if let Some(rest) = line.strip_prefix("task_hash: ") {
            task_hash = Hash::parse(rest.trim());
        } else if let Some(rest) = line.strip_prefix("result_hash: ") {
            result_hash = Hash::parse(rest.trim());
        } else if let Some(rest) = line.strip_prefix("output ") {
            let (path, hash_str) = rest.rsplit_once(' ')?;
            let hash = Hash::parse(hash_str.trim())?;
            outputs.push((path.to_string(), hash));
        }
    }

    Some(Record {
        task_hash: task_hash?,
        result_hash: result_hash?,
        outputs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hash(byte: u8) -> Hash {
        Hash::of_bytes([byte])
    }

    #[test]
    fn write_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let cas = Cas::init(dir.path()).unwrap();
        let store = RecordStore::init(dir.path()).unwrap();

        let out_hash = cas.store_from_bytes(b"output bytes").unwrap();
        let record = Record {
            task_hash: hash(1),
            result_hash: hash(2),
            outputs: vec![("out.txt".to_string(), out_hash)],
        };
        store.write(&record, &cas).unwrap();

        let loaded = store.try_load(&record.task_hash).unwrap();
        assert_eq!(loaded.task_hash, record.task_hash);
        assert_eq!(loaded.result_hash, record.result_hash);
        assert_eq!(loaded.outputs, record.outputs);
    }

    #[test]
    fn missing_record_is_a_miss_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordStore::init(dir.path()).unwrap();
        assert!(store.try_load(&hash(9)).is_none());
    }

    #[test]
    fn write_refuses_to_reference_a_blob_not_yet_interned() {
        let dir = tempfile::tempdir().unwrap();
        let cas = Cas::init(dir.path()).unwrap();
        let store = RecordStore::init(dir.path()).unwrap();
        let record = Record {
            task_hash: hash(1),
            result_hash: hash(2),
            outputs: vec![("out.txt".to_string(), hash(3))],
        };
        assert!(store.write(&record, &cas).is_err());
    }
}
