//! Gated execution of destructive and slow operations.
//!
//! Every delete goes through the policy gate before any filesystem access,
//! every external call carries a hard wall-clock timeout, and an elevated
//! deletion re-checks the target for a symbolic link immediately before
//! acting so a link swap cannot redirect a privileged delete onto a
//! protected target.

use crate::error::CleanError;
use crate::policy::{Decision, PolicyGate};
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Default wall-clock bound on a single external call.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Outcome of one executed operation.
///
/// `TimedOut` is distinct from `Failed` and from `AlreadyAbsent` so callers
/// can report the three separately; a timed-out item is never retried
/// automatically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome")]
pub enum ExecOutcome {
    /// The target was removed (or would have been, in dry-run mode).
    Removed {
        /// Bytes reclaimed, best-effort estimate.
        bytes: u64,
    },
    /// The target was already gone; deleting an absent path is a no-op
    /// success.
    AlreadyAbsent,
    /// The policy gate refused the operation; no filesystem access
    /// happened.
    Denied {
        /// Why the gate said no.
        reason: String,
    },
    /// The wall-clock timeout elapsed.
    TimedOut,
    /// The operation ran and failed.
    Failed {
        /// Underlying failure description.
        reason: String,
    },
}

impl ExecOutcome {
    /// True for the success outcomes (`Removed`, `AlreadyAbsent`).
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Removed { .. } | Self::AlreadyAbsent)
    }
}

/// Wraps destructive and potentially slow OS calls with policy checks,
/// symlink rejection, and timeouts.
#[derive(Debug, Clone)]
pub struct SafeExecutor {
    gate: Arc<PolicyGate>,
    timeout: Duration,
    dry_run: bool,
}

impl SafeExecutor {
    /// Create an executor with the default timeout, not in dry-run mode.
    pub fn new(gate: Arc<PolicyGate>) -> Self {
        Self {
            gate,
            timeout: DEFAULT_TIMEOUT,
            dry_run: false,
        }
    }

    /// Override the wall-clock timeout for external calls.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Enable or disable dry-run mode. A dry run performs every check and
    /// the size probe but skips the removal call, returning the same
    /// outcome shape as a real run.
    pub fn dry_run(mut self, enabled: bool) -> Self {
        self.dry_run = enabled;
        self
    }

    /// Delete one path.
    ///
    /// Order of checks: policy gate (short-circuits with no filesystem
    /// access), absence (no-op success), symlink refusal for elevated
    /// deletions, privilege availability, then the bounded removal itself.
    pub async fn delete(&self, path: &Path, identity: Option<&str>, elevated: bool) -> ExecOutcome {
        if let Decision::Deny(reason) = self.gate.decide(path, identity) {
            return ExecOutcome::Denied { reason };
        }

        let meta = match fs::symlink_metadata(path) {
            Ok(meta) => meta,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return ExecOutcome::AlreadyAbsent;
            }
            Err(err) => {
                return ExecOutcome::Failed {
                    reason: err.to_string(),
                };
            }
        };

        if elevated {
            // Re-checked here, at the last moment before acting: a symlink
            // swapped in after the scan must not receive a privileged
            // delete.
            if meta.file_type().is_symlink() {
                return ExecOutcome::Denied {
                    reason: "refusing elevated deletion of a symbolic link".to_string(),
                };
            }
            if effective_uid() != 0 {
                return ExecOutcome::Failed {
                    reason: "elevated deletion requested without privileges".to_string(),
                };
            }
        }

        let bytes = self.size_of(path).await.unwrap_or(0);

        if self.dry_run {
            debug!(path = %path.display(), bytes, "dry run, skipping removal");
            return ExecOutcome::Removed { bytes };
        }

        let target = path.to_path_buf();
        let is_dir = meta.is_dir() && !meta.file_type().is_symlink();
        let removal = tokio::task::spawn_blocking(move || {
            if is_dir {
                fs::remove_dir_all(&target)
            } else {
                fs::remove_file(&target)
            }
        });

        match tokio::time::timeout(self.timeout, removal).await {
            Err(_) => ExecOutcome::TimedOut,
            Ok(Err(join_err)) => ExecOutcome::Failed {
                reason: join_err.to_string(),
            },
            Ok(Ok(Err(err))) if err.kind() == io::ErrorKind::NotFound => {
                ExecOutcome::AlreadyAbsent
            }
            Ok(Ok(Err(err))) => ExecOutcome::Failed {
                reason: err.to_string(),
            },
            Ok(Ok(Ok(()))) => ExecOutcome::Removed { bytes },
        }
    }

    /// Bounded find-and-delete: remove every entry named `name` under
    /// `root`, descending at most `max_depth` levels. Each hit goes through
    /// the full [`delete`](Self::delete) pipeline.
    ///
    /// Returns `AlreadyAbsent` when nothing matched, `Removed` with the
    /// total reclaimed bytes when at least one hit succeeded, otherwise
    /// `Failed` with a summary.
    pub async fn delete_by_pattern(
        &self,
        root: &Path,
        name: &str,
        max_depth: usize,
    ) -> ExecOutcome {
        let mut hits: Vec<PathBuf> = Vec::new();
        for entry in WalkDir::new(root)
            .min_depth(1)
            .max_depth(max_depth)
            .into_iter()
            .filter_map(Result::ok)
        {
            if entry.file_name().to_str() == Some(name) {
                hits.push(entry.path().to_path_buf());
            }
        }
        if hits.is_empty() {
            return ExecOutcome::AlreadyAbsent;
        }

        let total = hits.len();
        let mut bytes = 0u64;
        let mut removed = 0usize;
        for hit in hits {
            match self.delete(&hit, None, false).await {
                ExecOutcome::Removed { bytes: b } => {
                    bytes += b;
                    removed += 1;
                }
                ExecOutcome::AlreadyAbsent => removed += 1,
                other => {
                    warn!(path = %hit.display(), ?other, "pattern delete item skipped");
                }
            }
        }

        if removed > 0 {
            ExecOutcome::Removed { bytes }
        } else {
            ExecOutcome::Failed {
                reason: format!("0 of {total} matches removed"),
            }
        }
    }

    /// Probe the on-disk size of a path, bounded by the executor timeout.
    /// Returns `None` on timeout or error; size figures are estimates, not
    /// guarantees.
    pub async fn size_of(&self, path: &Path) -> Option<u64> {
        let target = path.to_path_buf();
        let probe = tokio::task::spawn_blocking(move || {
            let meta = fs::symlink_metadata(&target).ok()?;
            if meta.is_dir() {
                fs_extra::dir::get_size(&target).ok()
            } else {
                Some(meta.len())
            }
        });
        match tokio::time::timeout(self.timeout, probe).await {
            Ok(Ok(size)) => size,
            _ => {
                debug!(path = %path.display(), "size probe timed out");
                None
            }
        }
    }

    /// Run an external maintenance command (the OS pass-throughs live
    /// behind this), bounded by the executor timeout. Honors dry-run.
    ///
    /// # Errors
    ///
    /// [`CleanError::InvalidInput`] when the program cannot be resolved,
    /// [`CleanError::Timeout`] when the bound elapses, or
    /// [`CleanError::Context`] when the command exits non-zero.
    pub async fn run_maintenance(&self, program: &str, args: &[&str]) -> Result<(), CleanError> {
        let resolved = which::which(program)
            .map_err(|_| CleanError::InvalidInput(format!("command not found: {program}")))?;

        if self.dry_run {
            debug!(program, "dry run, skipping maintenance command");
            return Ok(());
        }

        let run = tokio::process::Command::new(resolved).args(args).output();
        let output = tokio::time::timeout(self.timeout, run)
            .await
            .map_err(|_| CleanError::Timeout)??;

        if output.status.success() {
            Ok(())
        } else {
            Err(CleanError::context(
                "maintenance command failed",
                String::from_utf8_lossy(&output.stderr).trim(),
            ))
        }
    }
}

/// Effective uid of this process. The single direct libc call in the
/// crate, mirroring how privileged paths are detected elsewhere on macOS.
#[allow(unsafe_code)]
fn effective_uid() -> u32 {
    // SAFETY: geteuid(2) reads process credentials and cannot fail.
    unsafe { libc::geteuid() }
}
