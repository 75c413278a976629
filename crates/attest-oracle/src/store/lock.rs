//! Advisory locking and atomic file replacement for commit.
//!
//! The lock lives in a sidecar `.lock` file next to the target, never the
//! target itself: the target's inode is swapped by the atomic rename, which
//! would leave a second committer holding a lock on a dead inode.

use std::ffi::OsString;
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Exclusive advisory lock on the sidecar lock file of `target`.
///
/// The lock releases when the returned guard is dropped.
pub struct CommitLock {
    _file: File,
    pub path: PathBuf,
}

pub fn acquire(target: &Path) -> io::Result<CommitLock> {
    let path = sibling(target, ".lock");
    let file = File::create(&path)?;
    lock_exclusive(&file)?;
    Ok(CommitLock { _file: file, path })
}

#[cfg(unix)]
fn lock_exclusive(file: &File) -> io::Result<()> {
    use std::os::unix::io::AsRawFd;
    let rc = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX) };
    if rc != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

#[cfg(not(unix))]
fn lock_exclusive(_file: &File) -> io::Result<()> {
    // Commit is documented as a serialized, operator-invoked step; without
    // flock the temp-then-rename write is still atomic.
    Ok(())
}

/// Replace `path` with `contents` via write-temp-then-rename.
///
/// A crash at any point leaves either the old file or the new file, never a
/// partial write.
pub fn write_atomic(path: &Path, contents: &str) -> io::Result<()> {
    let tmp = sibling(path, ".tmp");
    let mut file = File::create(&tmp)?;
    file.write_all(contents.as_bytes())?;
    file.sync_all()?;
    drop(file);
    std::fs::rename(&tmp, path)?;
    Ok(())
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("target"));
    name.push(suffix);
    path.with_file_name(name)
}
