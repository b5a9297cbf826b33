//! Domain-specific errors for scan and cleanup operations

use thiserror::Error;

/// Error taxonomy for the scan-and-clean engine.
///
/// `PolicyDenied` and `InvalidInput` are terminal: they are never retried
/// and never escalate to elevated privilege. `Timeout` and `Io` on a single
/// item are recorded and skipped; the batch continues. `LockUnavailable`
/// on a cache commit degrades to skipping persistence for the run.
#[derive(Error, Debug)]
pub enum CleanError {
    /// The protection policy refused the operation.
    #[error("Protected: {0}")]
    PolicyDenied(String),

    /// The input was malformed before any filesystem access.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A wall-clock timeout elapsed before the operation finished.
    #[error("Operation timed out")]
    Timeout,

    /// Underlying filesystem failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The cache writer lease could not be acquired.
    #[error("Cache lock unavailable")]
    LockUnavailable,

    /// A batch finished early; some items completed, some did not.
    #[error("Completed {completed} of {total} items")]
    PartialResult {
        /// Items fully processed before the interruption.
        completed: usize,
        /// Items requested in total.
        total: usize,
    },

    /// An error with a static context label for better diagnostics.
    #[error("{context}: {message}")]
    Context {
        /// Static label naming the failing stage.
        context: &'static str,
        /// Human-readable detail.
        message: String,
    },

    /// Catch-all for errors bubbling up from the application layer.
    #[error("{0}")]
    Other(String),
}

impl CleanError {
    /// Create an error with context for better debugging.
    pub fn context(ctx: &'static str, msg: impl std::fmt::Display) -> Self {
        Self::Context {
            context: ctx,
            message: msg.to_string(),
        }
    }
}

impl From<anyhow::Error> for CleanError {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
