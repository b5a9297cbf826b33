//! Persisted per-item metadata cache.
//!
//! Avoids re-probing expensive metadata (directory size, last-used time,
//! owning identity) on every run. Readers operate on the snapshot loaded at
//! open and never block; the single writer serializes through [`Lease`] and
//! commits by merge-over-disk followed by an atomic temp-file rename, so a
//! reader sees either the old snapshot or the new one, never a torn file.

mod lock;

pub use lock::Lease;

use crate::error::CleanError;
use crate::scanner::owner_identity_for;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// Entries older than this are re-probed even when their mtime still
/// matches.
pub const DEFAULT_TTL_DAYS: i64 = 7;

/// Wall-clock bound on a single metadata probe.
const PROBE_TIMEOUT: Duration = Duration::from_secs(20);

/// One persisted metadata record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Absolute path the record describes.
    pub path: PathBuf,
    /// Modification time captured when the record was made; part of the
    /// identity key, so a changed file never reuses a stale record.
    pub mtime_epoch: i64,
    /// Size in kilobytes, du-style: at least one block for extant items.
    pub size_kb: u64,
    /// Last-used epoch seconds, when the filesystem exposes it.
    pub last_used_epoch: Option<i64>,
    /// When this record was written.
    pub updated_at_epoch: i64,
    /// Owning application identity, when visible.
    pub owner_identity: Option<String>,
    /// Human-readable name for display layers.
    pub display_name: Option<String>,
}

impl CacheEntry {
    /// The map key this entry lives under.
    pub fn key(&self) -> String {
        identity_key(&self.path, self.mtime_epoch)
    }
}

/// Composite identity key: path plus content-modification time.
pub fn identity_key(path: &Path, mtime_epoch: i64) -> String {
    format!("{}|{mtime_epoch}", path.display())
}

/// Current modification time of `path` as epoch seconds.
pub fn mtime_epoch_of(path: &Path) -> Option<i64> {
    fs::symlink_metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .map(to_epoch)
}

fn to_epoch(t: SystemTime) -> i64 {
    match t.duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_secs() as i64,
        Err(e) => -(e.duration().as_secs() as i64),
    }
}

fn now_epoch() -> i64 {
    chrono::Utc::now().timestamp()
}

/// The shared metadata store.
///
/// Opening never fails: a missing file starts empty, an unreadable or
/// corrupt file degrades the cache to "no cache" (every lookup misses,
/// every item is treated as stale) instead of aborting the scan.
#[derive(Debug)]
pub struct MetadataCache {
    file: PathBuf,
    lock_dir: PathBuf,
    scratch_dir: PathBuf,
    ttl_days: i64,
    snapshot: HashMap<String, CacheEntry>,
    degraded: bool,
}

impl MetadataCache {
    /// Open the cache rooted at the scour home directory.
    pub fn open(home: &Path) -> Self {
        let file = home.join("cache.json");
        let mut degraded = false;
        let snapshot = if file.exists() {
            match fs::read_to_string(&file)
                .map_err(anyhow::Error::from)
                .and_then(|raw| serde_json::from_str(&raw).map_err(anyhow::Error::from))
            {
                Ok(map) => map,
                Err(err) => {
                    warn!(cache = %file.display(), "unreadable cache, degrading: {err}");
                    degraded = true;
                    HashMap::new()
                }
            }
        } else {
            HashMap::new()
        };

        Self {
            file,
            lock_dir: home.join("cache.lock"),
            scratch_dir: home.join("tmp"),
            ttl_days: DEFAULT_TTL_DAYS,
            snapshot,
            degraded,
        }
    }

    /// Override the staleness window (tests, tuning).
    pub fn with_ttl_days(mut self, days: i64) -> Self {
        self.ttl_days = days;
        self
    }

    /// True when the cache file could not be read and every lookup misses.
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    /// Number of entries in the loaded snapshot.
    pub fn len(&self) -> usize {
        self.snapshot.len()
    }

    /// True when the loaded snapshot holds no entries.
    pub fn is_empty(&self) -> bool {
        self.snapshot.is_empty()
    }

    /// Look up a fresh entry for `path`. Lock-free; reads the snapshot
    /// loaded at open. Returns `None` when the entry is absent, the live
    /// mtime no longer matches, required fields are zero, or the TTL has
    /// lapsed.
    pub fn lookup(&self, path: &Path) -> Option<&CacheEntry> {
        if self.degraded {
            return None;
        }
        let mtime = mtime_epoch_of(path)?;
        let entry = self.snapshot.get(&identity_key(path, mtime))?;
        self.is_fresh(entry).then_some(entry)
    }

    /// Freshness: size and last-used present and non-zero, and the record
    /// younger than the TTL. The mtime match is already encoded in the key.
    pub fn is_fresh(&self, entry: &CacheEntry) -> bool {
        entry.size_kb > 0
            && entry.last_used_epoch.is_some_and(|e| e != 0)
            && now_epoch() - entry.updated_at_epoch < self.ttl_days * 86_400
    }

    /// Re-probe metadata for the given stale paths with a bounded worker
    /// pool. Each worker writes its partial result to a private scratch
    /// file before the join; scratch files are removed afterwards.
    pub async fn refresh(&self, stale: &[PathBuf]) -> Vec<CacheEntry> {
        if stale.is_empty() {
            return Vec::new();
        }
        if let Err(err) = fs::create_dir_all(&self.scratch_dir) {
            warn!("cannot create scratch dir: {err}");
        }

        let limit = std::sync::Arc::new(Semaphore::new(probe_pool_cap()));
        let mut workers: JoinSet<Option<(CacheEntry, PathBuf)>> = JoinSet::new();

        for (n, path) in stale.iter().cloned().enumerate() {
            let limit = std::sync::Arc::clone(&limit);
            let scratch = self.scratch_dir.join(format!("refresh-{n}.json"));
            workers.spawn(async move {
                let _permit = limit.acquire_owned().await.ok()?;
                let probed = tokio::time::timeout(
                    PROBE_TIMEOUT,
                    tokio::task::spawn_blocking(move || probe_entry(&path)),
                )
                .await
                .ok()?
                .ok()??;
                if let Ok(json) = serde_json::to_vec(&probed) {
                    let _ = fs::write(&scratch, json);
                }
                Some((probed, scratch))
            });
        }

        let mut refreshed = Vec::new();
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(Some((entry, scratch))) => {
                    let _ = fs::remove_file(scratch);
                    refreshed.push(entry);
                }
                Ok(None) => {}
                Err(err) => warn!("refresh worker failed: {err}"),
            }
        }
        debug!(count = refreshed.len(), "metadata refresh complete");
        refreshed
    }

    /// Merge `new_entries` over the on-disk snapshot and atomically replace
    /// the cache file, serialized through the writer lease. New entries win
    /// on key collision; unknown keys carry over unchanged.
    ///
    /// # Errors
    ///
    /// [`CleanError::LockUnavailable`] when a live writer holds the lease
    /// past all retries (the caller skips persistence for the run), or
    /// [`CleanError::Io`] for filesystem failures.
    pub async fn commit(&self, new_entries: Vec<CacheEntry>) -> Result<(), CleanError> {
        if new_entries.is_empty() {
            return Ok(());
        }
        if let Some(parent) = self.file.parent() {
            fs::create_dir_all(parent)?;
        }

        let lease = Lease::acquire(&self.lock_dir).await?;
        let result = self.commit_locked(new_entries);
        lease.release();
        result
    }

    fn commit_locked(&self, new_entries: Vec<CacheEntry>) -> Result<(), CleanError> {
        // Merge over what is on disk right now, not the snapshot this
        // process loaded: another writer may have committed since.
        let mut merged: HashMap<String, CacheEntry> = match fs::read_to_string(&self.file) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_default(),
            Err(_) => HashMap::new(),
        };
        for entry in new_entries {
            merged.insert(entry.key(), entry);
        }

        let dir = self.file.parent().unwrap_or_else(|| Path::new("."));
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        let json = serde_json::to_vec_pretty(&merged)
            .map_err(|e| CleanError::context("serialize cache", e))?;
        tmp.write_all(&json)?;
        tmp.persist(&self.file).map_err(|e| CleanError::Io(e.error))?;
        Ok(())
    }

    /// Remove leftover refresh scratch files (cancellation path).
    pub fn discard_scratch(&self) {
        if let Ok(entries) = fs::read_dir(&self.scratch_dir) {
            for entry in entries.flatten() {
                let _ = fs::remove_file(entry.path());
            }
        }
    }
}

/// Heavy-probe pool cap: a small constant bounded by the I/O concurrency
/// the metadata backends tolerate.
pub fn probe_pool_cap() -> usize {
    (num_cpus::get() / 2).clamp(1, 4)
}

/// Probe live metadata for one path. Returns `None` when the path has
/// vanished or its metadata is unreadable.
pub fn probe_entry(path: &Path) -> Option<CacheEntry> {
    let meta = fs::symlink_metadata(path).ok()?;
    let mtime_epoch = meta.modified().ok().map(to_epoch)?;
    let size_bytes = if meta.is_dir() {
        fs_extra::dir::get_size(path).ok()?
    } else {
        meta.len()
    };
    let last_used = meta.accessed().ok().map(to_epoch).or(Some(mtime_epoch));

    Some(CacheEntry {
        path: path.to_path_buf(),
        mtime_epoch,
        // du-style: an extant item occupies at least one block.
        size_kb: size_bytes.div_ceil(1024).max(1),
        last_used_epoch: last_used,
        updated_at_epoch: now_epoch(),
        owner_identity: owner_identity_for(path),
        display_name: path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_snapshot(home: &Path, entries: &[CacheEntry]) {
        let map: HashMap<String, CacheEntry> =
            entries.iter().map(|e| (e.key(), e.clone())).collect();
        fs::write(
            home.join("cache.json"),
            serde_json::to_vec_pretty(&map).unwrap(),
        )
        .unwrap();
    }

    #[test]
    fn lookup_hits_fresh_entry() {
        let home = tempfile::tempdir().unwrap();
        let item = home.path().join("item.log");
        fs::write(&item, b"x").unwrap();

        let entry = probe_entry(&item).unwrap();
        write_snapshot(home.path(), &[entry]);

        let cache = MetadataCache::open(home.path());
        let hit = cache.lookup(&item).expect("fresh entry should hit");
        assert_eq!(hit.size_kb, 1);
    }

    #[test]
    fn ttl_expired_entry_misses() {
        let home = tempfile::tempdir().unwrap();
        let item = home.path().join("item.log");
        fs::write(&item, b"x").unwrap();

        let mut entry = probe_entry(&item).unwrap();
        entry.updated_at_epoch = now_epoch() - (DEFAULT_TTL_DAYS * 86_400 + 1);
        write_snapshot(home.path(), &[entry.clone()]);

        let cache = MetadataCache::open(home.path());
        assert!(cache.lookup(&item).is_none());
        assert!(!cache.is_fresh(&entry));
    }

    #[test]
    fn zero_size_entry_is_stale() {
        let home = tempfile::tempdir().unwrap();
        let item = home.path().join("item.log");
        fs::write(&item, b"x").unwrap();

        let mut entry = probe_entry(&item).unwrap();
        entry.size_kb = 0;
        write_snapshot(home.path(), &[entry]);

        let cache = MetadataCache::open(home.path());
        assert!(cache.lookup(&item).is_none());
    }

    #[test]
    fn corrupt_cache_degrades_instead_of_aborting() {
        let home = tempfile::tempdir().unwrap();
        fs::write(home.path().join("cache.json"), b"not json {").unwrap();

        let cache = MetadataCache::open(home.path());
        assert!(cache.is_degraded());
        assert!(cache.lookup(Path::new("/anything")).is_none());
    }

    #[tokio::test]
    async fn commit_merges_over_disk() {
        let home = tempfile::tempdir().unwrap();
        let a = home.path().join("a");
        let b = home.path().join("b");
        fs::write(&a, b"a").unwrap();
        fs::write(&b, b"bb").unwrap();

        let cache = MetadataCache::open(home.path());
        cache.commit(vec![probe_entry(&a).unwrap()]).await.unwrap();
        cache.commit(vec![probe_entry(&b).unwrap()]).await.unwrap();

        let reopened = MetadataCache::open(home.path());
        assert_eq!(reopened.len(), 2);
        assert!(reopened.lookup(&a).is_some());
        assert!(reopened.lookup(&b).is_some());
    }

    #[tokio::test]
    async fn concurrent_commits_lose_no_keys() {
        let home = tempfile::tempdir().unwrap();
        let a = home.path().join("a");
        let b = home.path().join("b");
        fs::write(&a, b"a").unwrap();
        fs::write(&b, b"bb").unwrap();

        let cache = std::sync::Arc::new(MetadataCache::open(home.path()));
        let ca = std::sync::Arc::clone(&cache);
        let cb = std::sync::Arc::clone(&cache);
        let ea = probe_entry(&a).unwrap();
        let eb = probe_entry(&b).unwrap();

        let (ra, rb) = tokio::join!(ca.commit(vec![ea]), cb.commit(vec![eb]));
        ra.unwrap();
        rb.unwrap();

        // Union of both inputs survives, and the file parses cleanly.
        let raw = fs::read_to_string(home.path().join("cache.json")).unwrap();
        let map: HashMap<String, CacheEntry> = serde_json::from_str(&raw).unwrap();
        assert_eq!(map.len(), 2);
    }

    #[tokio::test]
    async fn refresh_probes_and_cleans_scratch() {
        let home = tempfile::tempdir().unwrap();
        let item = home.path().join("big");
        fs::create_dir(&item).unwrap();
        fs::write(item.join("blob"), vec![0u8; 4096]).unwrap();

        let cache = MetadataCache::open(home.path());
        let refreshed = cache.refresh(&[item.clone()]).await;
        assert_eq!(refreshed.len(), 1);
        assert!(refreshed[0].size_kb >= 4);

        let leftovers: Vec<_> = fs::read_dir(home.path().join("tmp"))
            .map(|it| it.flatten().collect())
            .unwrap_or_default();
        assert!(leftovers.is_empty(), "scratch files must be removed");
    }

    #[test]
    fn identity_key_tracks_mtime() {
        let p = Path::new("/x/y");
        assert_ne!(identity_key(p, 1), identity_key(p, 2));
        assert_eq!(identity_key(p, 7), identity_key(p, 7));
    }
}
