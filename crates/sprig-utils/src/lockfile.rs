//! Exclusive lock files with staged contents.
//!
//! Owning a [`LockFile`] means the `<target>.lock` sibling exists: it is
//! created empty with `O_CREAT|O_EXCL` and stays empty for the lock's whole
//! lifetime. The replacement contents are staged in memory and reach the
//! filesystem only at commit time, when they are flushed through the
//! sibling, fsynced, and renamed over the target in one step. Until then
//! nothing on disk has changed, so releasing the lock (explicitly or by
//! drop) is always a plain unlink.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

const LOCK_SUFFIX: &str = ".lock";

/// Failures of the lock protocol.
#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("unable to create lock file '{path}': File exists")]
    Held { path: PathBuf },

    #[error("unable to create lock file '{path}': {source}")]
    Create {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("unable to commit lock file '{path}': {source}")]
    Commit {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// An exclusive claim on `<target>.lock`, plus the bytes that will replace
/// the target when the claim commits.
pub struct LockFile {
    target: PathBuf,
    lock_path: PathBuf,
    staged: Vec<u8>,
    /// The sibling exists on disk and is ours to remove.
    live: bool,
}

impl LockFile {
    /// Claim the lock for `target`, failing with [`LockError::Held`] when
    /// another holder's sibling is present.
    pub fn hold(target: impl AsRef<Path>) -> Result<Self, LockError> {
        let target = target.as_ref().to_path_buf();
        let mut lock_os = target.clone().into_os_string();
        lock_os.push(LOCK_SUFFIX);
        let lock_path = PathBuf::from(lock_os);

        // The sibling's existence is the whole claim; no handle stays open.
        match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&lock_path)
        {
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                return Err(LockError::Held { path: lock_path });
            }
            Err(e) => {
                return Err(LockError::Create {
                    path: lock_path,
                    source: e,
                });
            }
        }

        Ok(Self {
            target,
            lock_path,
            staged: Vec::new(),
            live: true,
        })
    }

    /// The file this lock protects.
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// The `.lock` sibling itself.
    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }

    /// Stage replacement contents, displacing anything staged earlier.
    /// Nothing touches the filesystem until [`commit`](Self::commit).
    pub fn stage(&mut self, data: &[u8]) {
        self.staged.clear();
        self.staged.extend_from_slice(data);
    }

    /// Flush the staged bytes through the sibling, fsync, and rename it over
    /// the target. Committing with nothing staged replaces the target with
    /// an empty file.
    pub fn commit(mut self) -> Result<(), LockError> {
        let flush = |lock_path: &Path, staged: &[u8]| -> io::Result<()> {
            let mut file = fs::OpenOptions::new()
                .write(true)
                .truncate(true)
                .open(lock_path)?;
            io::Write::write_all(&mut file, staged)?;
            file.sync_all()
        };
        flush(&self.lock_path, &self.staged).map_err(|e| LockError::Commit {
            path: self.lock_path.clone(),
            source: e,
        })?;

        fs::rename(&self.lock_path, &self.target).map_err(|e| LockError::Commit {
            path: self.lock_path.clone(),
            source: e,
        })?;

        self.live = false;
        Ok(())
    }

    /// Abandon the staged contents and release the claim.
    pub fn rollback(mut self) -> Result<(), LockError> {
        self.staged.clear();
        self.release()
    }

    fn release(&mut self) -> Result<(), LockError> {
        if !self.live {
            return Ok(());
        }
        self.live = false;
        match fs::remove_file(&self.lock_path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(LockError::Io(e)),
        }
    }
}

impl Drop for LockFile {
    fn drop(&mut self) {
        let _ = self.release();
    }
}
