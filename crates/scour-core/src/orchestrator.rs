//! Scan/execute coordination.
//!
//! Fans scan workers out one per root, aggregates their results against the
//! metadata cache, hands the candidate list to the caller for selection,
//! and executes the confirmed subset with partial-failure semantics. All
//! counters are threaded through [`CleanStats`]; cancellation discards
//! scratch state and never leaves a partial cache commit behind.

use crate::cache::{CacheEntry, MetadataCache, probe_entry};
use crate::error::CleanError;
use crate::executor::{ExecOutcome, SafeExecutor};
use crate::policy::PolicyGate;
use crate::report::{CleanStats, OperationLog};
use crate::reporter::Reporter;
use crate::scanner::{CandidateArtifact, CandidateScanner, ScanConfig, TargetPattern};
use std::cmp::Reverse;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Synchronous probe budget for the first stale items of an interactive
/// scan; everything past it goes to the async refresh pool. Tuning values,
/// not correctness.
const INLINE_PROBE_ITEMS: usize = 8;
const INLINE_PROBE_WINDOW: Duration = Duration::from_secs(2);

/// Phases of a scan-and-clean run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanPhase {
    /// Nothing in flight.
    Idle,
    /// Scan workers walking roots.
    Scanning,
    /// Merging worker results and consulting the cache.
    Aggregating,
    /// Candidate list handed out; waiting for a confirmed selection.
    AwaitingSelection,
    /// Deleting the confirmed subset.
    Executing,
}

/// Sort order for the aggregated candidate list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    /// Largest first.
    #[default]
    Size,
    /// Oldest first.
    Age,
    /// Lexicographic by path.
    Path,
}

/// Coordinates scanners, cache, and executor for one run at a time.
pub struct ScanOrchestrator {
    gate: Arc<PolicyGate>,
    cache: Arc<MetadataCache>,
    reporter: Arc<dyn Reporter>,
    cancel: CancellationToken,
    scan_config: ScanConfig,
    phase: ScanPhase,
}

impl fmt::Debug for ScanOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScanOrchestrator")
            .field("phase", &self.phase)
            .finish_non_exhaustive()
    }
}

impl ScanOrchestrator {
    /// Create an orchestrator with default scan tuning.
    pub fn new(
        gate: Arc<PolicyGate>,
        cache: Arc<MetadataCache>,
        reporter: Arc<dyn Reporter>,
    ) -> Self {
        Self {
            gate,
            cache,
            reporter,
            cancel: CancellationToken::new(),
            scan_config: ScanConfig::default(),
            phase: ScanPhase::Idle,
        }
    }

    /// Override scan tuning.
    pub fn with_scan_config(mut self, config: ScanConfig) -> Self {
        self.scan_config = config;
        self
    }

    /// Token external callers cancel to interrupt a run.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Current phase.
    pub fn phase(&self) -> ScanPhase {
        self.phase
    }

    /// Scan all roots in parallel and return the aggregated, sorted
    /// candidate list. On return the orchestrator is in
    /// [`ScanPhase::AwaitingSelection`].
    ///
    /// # Errors
    ///
    /// [`CleanError::PartialResult`] when cancelled mid-run; scratch files
    /// are discarded and the persisted cache is left untouched.
    pub async fn scan(
        &mut self,
        roots: &[PathBuf],
        targets: &[TargetPattern],
        sort: SortKey,
    ) -> Result<Vec<CandidateArtifact>, CleanError> {
        self.phase = ScanPhase::Scanning;
        let total = roots.len();

        let mut workers: JoinSet<Result<Vec<CandidateArtifact>, CleanError>> = JoinSet::new();
        for root in roots {
            self.reporter.scanning(root);
            let scanner = CandidateScanner::with_config(Arc::clone(&self.gate), self.scan_config);
            let root = root.clone();
            let targets = targets.to_vec();
            workers.spawn(async move {
                tokio::task::spawn_blocking(move || scanner.scan(&root, &targets))
                    .await
                    .map_err(|e| CleanError::Other(e.to_string()))?
            });
        }

        let mut collected: Vec<CandidateArtifact> = Vec::new();
        let mut completed = 0usize;
        loop {
            tokio::select! {
                () = self.cancel.cancelled() => {
                    workers.abort_all();
                    return Err(self.interrupt(completed, total));
                }
                joined = workers.join_next() => match joined {
                    None => break,
                    Some(Ok(Ok(found))) => {
                        completed += 1;
                        for candidate in &found {
                            self.reporter.candidate(&candidate.path);
                        }
                        collected.extend(found);
                    }
                    Some(Ok(Err(err))) => {
                        completed += 1;
                        self.reporter.warning(&format!("scan worker: {err}"));
                    }
                    Some(Err(join_err)) => {
                        completed += 1;
                        warn!("scan worker panicked: {join_err}");
                    }
                },
            }
        }

        self.phase = ScanPhase::Aggregating;
        if self.cancel.is_cancelled() {
            return Err(self.interrupt(completed, total));
        }

        let mut candidates = dedup_candidates(collected);
        let stale = self.apply_cache(&mut candidates);
        self.reporter.probing(stale.len());
        let inline_entries = self.inline_probe(&mut candidates, &stale).await;
        self.schedule_refresh(stale, inline_entries);

        if self.cancel.is_cancelled() {
            return Err(self.interrupt(completed, total));
        }
        sort_candidates(&mut candidates, sort);

        self.phase = ScanPhase::AwaitingSelection;
        Ok(candidates)
    }

    /// Execute the confirmed subset. Individual failures and timeouts are
    /// recorded and skipped; the batch always runs to the end unless
    /// cancelled. Returns the merged counters for the run.
    pub async fn execute(
        &mut self,
        selection: &[CandidateArtifact],
        elevated: bool,
        dry_run: bool,
        log: &OperationLog,
    ) -> CleanStats {
        self.phase = ScanPhase::Executing;
        let executor = SafeExecutor::new(Arc::clone(&self.gate)).dry_run(dry_run);
        let mut stats = CleanStats::default();

        for item in selection {
            if self.cancel.is_cancelled() {
                break;
            }
            self.reporter.removing(&item.path);
            let outcome = executor
                .delete(&item.path, item.owner_identity.as_deref(), elevated)
                .await;
            match &outcome {
                ExecOutcome::Removed { bytes } => self.reporter.removed(&item.path, *bytes),
                ExecOutcome::AlreadyAbsent => self.reporter.removed(&item.path, 0),
                ExecOutcome::Denied { reason } => self.reporter.skipped(&item.path, reason),
                ExecOutcome::TimedOut => self.reporter.failed(&item.path, "timed out"),
                ExecOutcome::Failed { reason } => self.reporter.failed(&item.path, reason),
            }
            log.append(&item.path, &outcome);
            stats.record(&outcome);
        }

        self.reporter.summary(&stats);
        self.phase = ScanPhase::Idle;
        stats
    }

    /// Cancellation path: discard scratch, reset phase, report progress.
    fn interrupt(&mut self, completed: usize, total: usize) -> CleanError {
        self.cache.discard_scratch();
        self.phase = ScanPhase::Idle;
        debug!(completed, total, "scan interrupted");
        CleanError::PartialResult { completed, total }
    }

    /// Fill candidates from fresh cache entries; return the paths that
    /// still need a live probe.
    fn apply_cache(&self, candidates: &mut [CandidateArtifact]) -> Vec<PathBuf> {
        let mut stale = Vec::new();
        for candidate in candidates {
            match self.cache.lookup(&candidate.path) {
                Some(entry) => fill_from_entry(candidate, entry),
                None => stale.push(candidate.path.clone()),
            }
        }
        stale
    }

    /// Synchronously probe the first few stale items so an interactive run
    /// shows sizes immediately, within a small total time budget.
    async fn inline_probe(
        &self,
        candidates: &mut [CandidateArtifact],
        stale: &[PathBuf],
    ) -> Vec<CacheEntry> {
        let started = Instant::now();
        let mut entries = Vec::new();

        for path in stale.iter().take(INLINE_PROBE_ITEMS) {
            let Some(remaining) = INLINE_PROBE_WINDOW.checked_sub(started.elapsed()) else {
                break;
            };
            let target = path.clone();
            let probed = tokio::time::timeout(
                remaining,
                tokio::task::spawn_blocking(move || probe_entry(&target)),
            )
            .await;
            let Ok(Ok(Some(entry))) = probed else {
                continue;
            };
            if let Some(candidate) = candidates.iter_mut().find(|c| c.path == *path) {
                fill_from_entry(candidate, &entry);
            }
            entries.push(entry);
        }
        entries
    }

    /// Hand the remaining stale paths to the background refresh pool and
    /// commit together with the inline results. Never blocks the
    /// interactive result; a lost lease only skips persistence.
    fn schedule_refresh(&self, stale: Vec<PathBuf>, inline_entries: Vec<CacheEntry>) {
        let pending: Vec<PathBuf> = stale.into_iter().skip(inline_entries.len()).collect();
        if pending.is_empty() && inline_entries.is_empty() {
            return;
        }
        let cache = Arc::clone(&self.cache);
        let token = self.cancel.clone();
        tokio::spawn(async move {
            let mut entries = inline_entries;
            if !pending.is_empty() && !token.is_cancelled() {
                entries.extend(cache.refresh(&pending).await);
            }
            if token.is_cancelled() {
                cache.discard_scratch();
                return;
            }
            match cache.commit(entries).await {
                Ok(()) => {}
                Err(CleanError::LockUnavailable) => {
                    debug!("cache lease busy, skipping persistence this run");
                }
                Err(err) => warn!("cache commit failed: {err}"),
            }
        });
    }
}

fn fill_from_entry(candidate: &mut CandidateArtifact, entry: &CacheEntry) {
    candidate.size_bytes = Some(entry.size_kb.saturating_mul(1024));
    candidate.last_used_epoch = entry.last_used_epoch;
    if candidate.owner_identity.is_none() {
        candidate.owner_identity = entry.owner_identity.clone();
    }
}

/// Cross-root nesting dedup, same outermost-wins rule as within one root.
fn dedup_candidates(mut candidates: Vec<CandidateArtifact>) -> Vec<CandidateArtifact> {
    candidates.sort_by(|a, b| a.path.cmp(&b.path));
    let mut kept: Vec<CandidateArtifact> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        if kept
            .last()
            .is_some_and(|prev| candidate.path.starts_with(&prev.path))
        {
            continue;
        }
        kept.push(candidate);
    }
    kept
}

fn sort_candidates(candidates: &mut [CandidateArtifact], key: SortKey) {
    match key {
        SortKey::Size => {
            candidates.sort_by_key(|c| Reverse(c.size_bytes.unwrap_or(0)));
        }
        SortKey::Age => {
            candidates.sort_by_key(|c| Reverse(c.age_days.unwrap_or(0)));
        }
        SortKey::Path => candidates.sort_by(|a, b| a.path.cmp(&b.path)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::probe_entry;
    use crate::reporter::NullReporter;
    use crate::scanner::default_targets;
    use std::collections::HashMap;
    use std::fs;
    use std::path::Path;

    fn orchestrator(home: &Path) -> ScanOrchestrator {
        ScanOrchestrator::new(
            Arc::new(PolicyGate::new()),
            Arc::new(MetadataCache::open(home)),
            Arc::new(NullReporter),
        )
        .with_scan_config(ScanConfig {
            max_depth: 8,
            min_age_days: 0,
        })
    }

    fn make_project(parent: &Path, name: &str, artifact: &str, blob_bytes: usize) -> PathBuf {
        let proj = parent.join(name);
        let art = proj.join(artifact);
        fs::create_dir_all(&art).unwrap();
        fs::write(proj.join("package.json"), "{}").unwrap();
        fs::write(art.join("blob"), vec![0u8; blob_bytes]).unwrap();
        art
    }

    #[tokio::test]
    async fn scan_aggregates_and_sorts_by_size() {
        let home = tempfile::tempdir().unwrap();
        let work = tempfile::tempdir().unwrap();
        let small = make_project(work.path(), "small", "node_modules", 1024);
        let big = make_project(work.path(), "big", "node_modules", 64 * 1024);

        let mut orch = orchestrator(home.path());
        let found = orch
            .scan(
                &[work.path().to_path_buf()],
                &default_targets(),
                SortKey::Size,
            )
            .await
            .unwrap();

        assert_eq!(found.len(), 2);
        assert_eq!(found[0].path, big);
        assert_eq!(found[1].path, small);
        // Inline probes filled sizes for this small a batch.
        assert!(found[0].size_bytes.unwrap() > found[1].size_bytes.unwrap());
        assert_eq!(orch.phase(), ScanPhase::AwaitingSelection);
    }

    #[tokio::test]
    async fn scan_uses_cache_fast_path() {
        let home = tempfile::tempdir().unwrap();
        let work = tempfile::tempdir().unwrap();
        let art = make_project(work.path(), "proj", "node_modules", 2048);

        // Seed the snapshot with a probed entry so lookup hits.
        let entry = probe_entry(&art).unwrap();
        let size_kb = entry.size_kb;
        let map: HashMap<String, CacheEntry> =
            [(entry.key(), entry)].into_iter().collect();
        fs::write(
            home.path().join("cache.json"),
            serde_json::to_vec(&map).unwrap(),
        )
        .unwrap();

        let mut orch = orchestrator(home.path());
        let found = orch
            .scan(
                &[work.path().to_path_buf()],
                &default_targets(),
                SortKey::Path,
            )
            .await
            .unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].size_bytes, Some(size_kb * 1024));
    }

    #[tokio::test]
    async fn cancelled_scan_reports_partial_result() {
        let home = tempfile::tempdir().unwrap();
        let work = tempfile::tempdir().unwrap();
        make_project(work.path(), "proj", "node_modules", 16);

        let mut orch = orchestrator(home.path());
        orch.cancel_token().cancel();
        let result = orch
            .scan(
                &[work.path().to_path_buf()],
                &default_targets(),
                SortKey::Size,
            )
            .await;

        assert!(matches!(result, Err(CleanError::PartialResult { .. })));
        assert_eq!(orch.phase(), ScanPhase::Idle);
    }

    #[tokio::test]
    async fn execute_continues_past_denied_and_absent_items() {
        let home = tempfile::tempdir().unwrap();
        let work = tempfile::tempdir().unwrap();
        let junk = make_project(work.path(), "proj", "node_modules", 512);

        let mut orch = orchestrator(home.path());
        let mut selection = orch
            .scan(
                &[work.path().to_path_buf()],
                &default_targets(),
                SortKey::Size,
            )
            .await
            .unwrap();
        // A protected path and an already-absent path join the batch.
        let mut denied = selection[0].clone();
        denied.path = PathBuf::from("/etc");
        let mut absent = selection[0].clone();
        absent.path = work.path().join("proj/ghost");
        selection.push(denied);
        selection.push(absent);

        let log = OperationLog::open(home.path().join("logs/clean.jsonl"));
        let stats = orch.execute(&selection, false, false, &log).await;

        assert_eq!(stats.deleted, 2, "junk dir + absent no-op");
        assert_eq!(stats.skipped_protected, 1);
        assert_eq!(stats.failed, 0);
        assert!(!junk.exists());
        assert_eq!(orch.phase(), ScanPhase::Idle);

        let raw = fs::read_to_string(home.path().join("logs/clean.jsonl")).unwrap();
        assert_eq!(raw.lines().count(), 3);
    }

    #[tokio::test]
    async fn dry_run_execute_removes_nothing() {
        let home = tempfile::tempdir().unwrap();
        let work = tempfile::tempdir().unwrap();
        let junk = make_project(work.path(), "proj", "node_modules", 512);

        let mut orch = orchestrator(home.path());
        let selection = orch
            .scan(
                &[work.path().to_path_buf()],
                &default_targets(),
                SortKey::Size,
            )
            .await
            .unwrap();
        let log = OperationLog::open(home.path().join("logs/clean.jsonl"));
        let stats = orch.execute(&selection, false, true, &log).await;

        assert_eq!(stats.deleted, 1);
        assert!(junk.exists(), "dry run leaves the tree in place");
    }

    #[test]
    fn dedup_spans_roots() {
        let mk = |p: &str| CandidateArtifact {
            path: PathBuf::from(p),
            kind: crate::scanner::ArtifactKind::Directory,
            size_bytes: None,
            age_days: None,
            owner_identity: None,
            last_used_epoch: None,
            protection: crate::policy::Decision::Allow,
            selected_by_default: true,
        };
        let kept = dedup_candidates(vec![mk("/a/b"), mk("/a/b/c"), mk("/a/d")]);
        let paths: Vec<_> = kept.iter().map(|c| c.path.clone()).collect();
        assert_eq!(paths, vec![PathBuf::from("/a/b"), PathBuf::from("/a/d")]);
    }
}
