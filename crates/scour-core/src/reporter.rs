//! Reporter trait for dependency injection
//!
//! This trait allows core logic to report progress and status without
//! being coupled to a specific terminal implementation.

use crate::report::CleanStats;
use std::path::Path;

/// Progress and status sink implemented by the presentation layer.
pub trait Reporter: Send + Sync {
    /// A scan worker started walking a root.
    fn scanning(&self, root: &Path);

    /// A candidate survived filtering.
    fn candidate(&self, path: &Path);

    /// Metadata probes started for `count` stale items.
    fn probing(&self, count: usize);

    /// An item is about to be removed.
    fn removing(&self, path: &Path);

    /// An item was removed, reclaiming `bytes`.
    fn removed(&self, path: &Path, bytes: u64);

    /// An item was skipped, with the reason.
    fn skipped(&self, path: &Path, reason: &str);

    /// An item's removal failed.
    fn failed(&self, path: &Path, reason: &str);

    /// Log an informational message.
    fn info(&self, msg: &str);

    /// Log a warning message.
    fn warning(&self, msg: &str);

    /// Display the final counters for a run.
    fn summary(&self, stats: &CleanStats);
}

impl<T: Reporter + ?Sized> Reporter for std::sync::Arc<T> {
    fn scanning(&self, root: &Path) {
        (**self).scanning(root);
    }
    fn candidate(&self, path: &Path) {
        (**self).candidate(path);
    }
    fn probing(&self, count: usize) {
        (**self).probing(count);
    }
    fn removing(&self, path: &Path) {
        (**self).removing(path);
    }
    fn removed(&self, path: &Path, bytes: u64) {
        (**self).removed(path, bytes);
    }
    fn skipped(&self, path: &Path, reason: &str) {
        (**self).skipped(path, reason);
    }
    fn failed(&self, path: &Path, reason: &str) {
        (**self).failed(path, reason);
    }
    fn info(&self, msg: &str) {
        (**self).info(msg);
    }
    fn warning(&self, msg: &str) {
        (**self).warning(msg);
    }
    fn summary(&self, stats: &CleanStats) {
        (**self).summary(stats);
    }
}

/// A no-op reporter for silent operations (e.g., background refresh,
/// testing).
#[derive(Debug, Clone, Copy)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn scanning(&self, _: &Path) {}
    fn candidate(&self, _: &Path) {}
    fn probing(&self, _: usize) {}
    fn removing(&self, _: &Path) {}
    fn removed(&self, _: &Path, _: u64) {}
    fn skipped(&self, _: &Path, _: &str) {}
    fn failed(&self, _: &Path, _: &str) {}
    fn info(&self, _: &str) {}
    fn warning(&self, _: &str) {}
    fn summary(&self, _: &CleanStats) {}
}
