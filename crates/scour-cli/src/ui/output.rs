//! Console output and the reporter wired into the core.

use scour_core::report::CleanStats;
use scour_core::reporter::Reporter;
use std::path::Path;
use tracing::debug;

use super::human_bytes;

/// Plain println-based message sink honoring `--quiet`.
#[derive(Debug, Clone, Copy)]
pub struct Output {
    quiet: bool,
}

impl Output {
    /// Create an output handle.
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }

    /// Informational message, suppressed by `--quiet`.
    pub fn info(&self, msg: &str) {
        if !self.quiet {
            println!("{msg}");
        }
    }

    /// Success message, suppressed by `--quiet`.
    pub fn success(&self, msg: &str) {
        if !self.quiet {
            println!("✓ {msg}");
        }
    }

    /// Warning, always printed to stderr.
    pub fn warning(&self, msg: &str) {
        eprintln!("warning: {msg}");
    }

    /// Error, always printed to stderr.
    pub fn error(&self, msg: &str) {
        eprintln!("error: {msg}");
    }
}

/// [`Reporter`] implementation for interactive runs.
#[derive(Debug, Clone, Copy)]
pub struct ConsoleReporter {
    out: Output,
}

impl ConsoleReporter {
    /// Create a reporter honoring `--quiet`.
    pub fn new(quiet: bool) -> Self {
        Self {
            out: Output::new(quiet),
        }
    }
}

impl Reporter for ConsoleReporter {
    fn scanning(&self, root: &Path) {
        self.out.info(&format!("Scanning {}...", root.display()));
    }

    fn candidate(&self, path: &Path) {
        debug!(path = %path.display(), "candidate");
    }

    fn probing(&self, count: usize) {
        if count > 0 {
            self.out
                .info(&format!("Probing metadata for {count} items..."));
        }
    }

    fn removing(&self, path: &Path) {
        debug!(path = %path.display(), "removing");
    }

    fn removed(&self, path: &Path, bytes: u64) {
        self.out
            .info(&format!("Removed {} ({})", path.display(), human_bytes(bytes)));
    }

    fn skipped(&self, path: &Path, reason: &str) {
        self.out
            .info(&format!("Skipped {}: {reason}", path.display()));
    }

    fn failed(&self, path: &Path, reason: &str) {
        self.out
            .error(&format!("Failed to remove {}: {reason}", path.display()));
    }

    fn info(&self, msg: &str) {
        self.out.info(msg);
    }

    fn warning(&self, msg: &str) {
        self.out.warning(msg);
    }

    fn summary(&self, stats: &CleanStats) {
        debug!(?stats, "run complete");
    }
}
