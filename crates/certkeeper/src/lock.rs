//! Single-instance guard for renewal runs.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use nix::errno::Errno;
use nix::fcntl::{Flock, FlockArg};
use tracing::debug;

use crate::error::CertError;

/// Exclusive advisory lock held for the duration of a run.
///
/// Released when dropped, or by the kernel if the process dies.
pub struct RunLock {
    path: PathBuf,
    _flock: Flock<File>,
}

impl RunLock {
    /// Take the lock without waiting.
    ///
    /// Returns `Ok(None)` if another process holds it.
    pub fn try_acquire(path: &Path) -> Result<Option<Self>, CertError> {
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(path)?;

        match Flock::lock(file, FlockArg::LockExclusiveNonblock) {
            Ok(flock) => {
                debug!(path = %path.display(), "Acquired run lock");
                Ok(Some(Self {
                    path: path.to_path_buf(),
                    _flock: flock,
                }))
            }
            Err((_, Errno::EWOULDBLOCK)) => Ok(None),
            Err((_, errno)) => Err(errno.into()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl fmt::Debug for RunLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunLock").field("path", &self.path).finish()
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        debug!(path = %self.path.display(), "Released run lock");
    }
}
