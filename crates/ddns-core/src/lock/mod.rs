// # Run Lock
//
// Advisory, non-blocking exclusivity guard between overlapping invocations.
//
// ## Semantics
//
// - Acquire: create the lock file with create-new semantics. If it already
//   exists another run holds it, and the caller gets `None` immediately.
// - Hold: the file records the holder's pid and acquisition time so an
//   operator can identify a stale lock.
// - Release: dropping the guard removes the file. This covers normal
//   return, errors, deadline expiry and a cancelled run future.
//
// A process killed with SIGKILL cannot run `Drop`; the file then stays until
// removed by hand. The holder details logged on contention make that case
// easy to spot.

use std::io::Write;
use std::path::{Path, PathBuf};

use crate::Error;

/// Held run lock; removes its file on drop
#[derive(Debug)]
pub struct RunLock {
    path: PathBuf,
}

impl RunLock {
    /// Try to take the lock at `path` without blocking
    ///
    /// # Returns
    ///
    /// - `Ok(Some(RunLock))`: This process now holds the lock
    /// - `Ok(None)`: Another run holds it
    /// - `Err(Error::Lock)`: The lock file could not be created for another reason
    pub fn try_acquire(path: impl AsRef<Path>) -> Result<Option<Self>, Error> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    Error::lock(format!(
                        "Failed to create lock directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        let mut file = match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
        {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                let holder = std::fs::read_to_string(&path).unwrap_or_default();
                tracing::warn!(
                    lock = %path.display(),
                    holder = %holder.trim(),
                    "Another run is in progress"
                );
                return Ok(None);
            }
            Err(e) => {
                return Err(Error::lock(format!(
                    "Failed to create lock file {}: {}",
                    path.display(),
                    e
                )));
            }
        };

        // From here on the guard owns the file, so a failed write still removes it
        let lock = Self { path };

        writeln!(
            file,
            "pid={} acquired={}",
            std::process::id(),
            chrono::Utc::now().to_rfc3339()
        )
        .map_err(|e| {
            Error::lock(format!(
                "Failed to write lock file {}: {}",
                lock.path.display(),
                e
            ))
        })?;

        tracing::debug!(lock = %lock.path.display(), "Run lock acquired");
        Ok(Some(lock))
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(lock = %self.path.display(), "Run lock released"),
            Err(e) => tracing::error!(
                lock = %self.path.display(),
                "Failed to release run lock: {}",
                e
            ),
        }
    }
}
