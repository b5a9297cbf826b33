//! Directory-based writer lease.
//!
//! Mutual exclusion over the persisted cache file, built on the atomic
//! create-if-absent semantics of `mkdir`. A lease left behind by a crashed
//! holder is presumed abandoned once it exceeds the staleness window and is
//! force-released by the next acquirer. Readers never touch the lease.

use crate::error::CleanError;
use rand::Rng;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

/// Acquisition attempts before giving up with [`CleanError::LockUnavailable`].
const MAX_ATTEMPTS: u32 = 20;

/// A lease directory older than this is presumed abandoned.
const STALE_AFTER: Duration = Duration::from_secs(5 * 60);

/// Exclusive writer token. Released on [`Lease::release`] or drop.
#[derive(Debug)]
pub struct Lease {
    dir: PathBuf,
    held: bool,
}

impl Lease {
    /// Acquire the lease, retrying with a jittered backoff and
    /// force-breaking a stale holder.
    ///
    /// # Errors
    ///
    /// Returns [`CleanError::LockUnavailable`] when a live holder outlasts
    /// all attempts, or [`CleanError::Io`] for unexpected filesystem
    /// failures.
    pub async fn acquire(dir: &Path) -> Result<Self, CleanError> {
        if let Some(parent) = dir.parent() {
            fs::create_dir_all(parent)?;
        }

        for _ in 0..MAX_ATTEMPTS {
            match fs::create_dir(dir) {
                Ok(()) => {
                    return Ok(Self {
                        dir: dir.to_path_buf(),
                        held: true,
                    });
                }
                Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                    if is_stale(dir) {
                        warn!(lock = %dir.display(), "breaking stale cache lock");
                        let _ = fs::remove_dir(dir);
                        continue;
                    }
                    let jitter = rand::rng().random_range(50..150);
                    tokio::time::sleep(Duration::from_millis(jitter)).await;
                }
                Err(err) => return Err(err.into()),
            }
        }

        Err(CleanError::LockUnavailable)
    }

    /// Release the lease explicitly.
    pub fn release(mut self) {
        self.unlock();
    }

    fn unlock(&mut self) {
        if self.held {
            let _ = fs::remove_dir(&self.dir);
            self.held = false;
        }
    }
}

impl Drop for Lease {
    fn drop(&mut self) {
        self.unlock();
    }
}

fn is_stale(dir: &Path) -> bool {
    fs::metadata(dir)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|t| t.elapsed().ok())
        .is_some_and(|age| age >= STALE_AFTER)
}
