//! Small filesystem helpers shared by the CAS and record store.
//!
//! Everything here is synchronous: the scheduler runs one blocking worker
//! thread per task (spec §5), so there is no executor to hand async I/O to
//! and no benefit in pretending otherwise.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use tracing::instrument;

/// Create `dir` and all of its parents if they don't already exist.
#[instrument]
pub fn create_dir_all(dir: &Path) -> io::Result<()> {
    std::fs::create_dir_all(dir)
}

/// Write `data` to `dest` atomically: write to a temp file in the same
/// directory as `dest`, then rename over it. A reader of `dest` always sees
/// either the previous contents or the complete new contents, never a
/// partial write.
#[instrument(skip(data))]
pub fn write_atomic(dest: &Path, data: &[u8]) -> io::Result<()> {
    let dir = dest.parent().unwrap_or_else(|| Path::new("."));
    create_dir_all(dir)?;
    let tmp = temp_path_in(dir);
    std::fs::write(&tmp, data)?;
    std::fs::rename(&tmp, dest)?;
    Ok(())
}

/// Copy `src` to `dest` atomically, via the same temp-then-rename dance as
/// [`write_atomic`]. Used when interning a file into the CAS without
/// reading its bytes into memory.
#[instrument]
pub fn copy_atomic(src: &Path, dest: &Path) -> io::Result<()> {
    let dir = dest.parent().unwrap_or_else(|| Path::new("."));
    create_dir_all(dir)?;
    let tmp = temp_path_in(dir);
    std::fs::copy(src, &tmp)?;
    std::fs::rename(&tmp, dest)?;
    Ok(())
}

/// Overwrite `dest` with the contents of `src`, creating parent directories
/// as needed. Used for [`crate::cas::Cas::fetch_to_file`], which restores a
/// cached blob to a task's declared output path and is allowed to clobber
/// whatever was there.
#[instrument]
pub fn overwrite(src: &Path, dest: &Path) -> io::Result<()> {
    if let Some(dir) = dest.parent() {
        create_dir_all(dir)?;
    }
    std::fs::copy(src, dest)?;
    Ok(())
}

pub fn exists(path: &Path) -> bool {
    path.exists()
}

pub fn open(path: &Path) -> io::Result<File> {
    File::open(path)
}

/// A sibling temp path in `dir`, named from a random suffix so concurrent
/// writers for different blobs never collide. Collisions between writers
/// for the *same* blob are harmless: both race to rename identical content
/// into the same final path (CAS idempotence, spec invariant 5).
fn temp_path_in(dir: &Path) -> PathBuf {
    use std::sync::atomic::{AtomicU64, Ordering};
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let pid = std::process::id();
    let tid = thread_tag();
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    dir.join(format!(".reprovm-tmp-{pid}-{tid}-{n}"))
}

fn thread_tag() -> u64 {
    // `ThreadId` has no stable numeric accessor; hash its Debug form instead.
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};
    let mut hasher = DefaultHasher::new();
    std::thread::current().id().hash(&mut hasher);
    hasher.finish()
}
