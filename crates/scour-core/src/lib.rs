//! scour - Safety-Gated Scan-and-Cache Engine
//!
//! Core library for identifying and removing disk artifacts (caches, logs,
//! orphaned application data, stale build outputs) without destroying data
//! the user needs.
//!
//! # Architecture
//!
//! - **PolicyGate**: a pure decision function gating every destructive
//!   operation; hard-coded critical rules can never be overridden.
//! - **SafeExecutor**: wraps deletes and slow OS calls with gate checks,
//!   symlink rejection, and wall-clock timeouts.
//! - **CandidateScanner**: bounded filesystem walk emitting deduplicated
//!   [`CandidateArtifact`] records.
//! - **MetadataCache**: persisted key→record store with TTL staleness,
//!   lock-free snapshot reads, and single-writer merge commits.
//! - **ScanOrchestrator**: bounded parallel fan-out over roots, cache-aware
//!   aggregation, and gated execution with explicit result accumulators.
//!
//! # Directory Layout
//!
//! ```text
//! ~/.scour/
//! ├── cache.json   # persisted metadata cache (atomic rename commits)
//! ├── cache.lock/  # directory-based writer lease
//! ├── tmp/         # scratch space for refresh workers
//! ├── logs/        # operation log (JSONL)
//! └── config.toml  # scan roots, target patterns, overrides (optional)
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod executor;
pub mod orchestrator;
pub mod paths;
pub mod policy;
pub mod report;
pub mod reporter;
pub mod scanner;

pub use cache::{CacheEntry, MetadataCache};
pub use config::{Config, load_whitelist};
pub use error::CleanError;
pub use executor::{ExecOutcome, SafeExecutor};
pub use orchestrator::{ScanOrchestrator, ScanPhase, SortKey};
pub use paths::*;
pub use policy::{Decision, PolicyGate};
pub use report::{CleanStats, OperationLog};
pub use reporter::{NullReporter, Reporter};
pub use scanner::{
    ArtifactKind, CandidateArtifact, CandidateScanner, ScanConfig, TargetPattern, default_targets,
};
