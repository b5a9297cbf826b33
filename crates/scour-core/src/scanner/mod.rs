//! Candidate discovery.
//!
//! One finite pass per root: a bounded-depth walk that matches target
//! names, prunes heavy or version-controlled subtrees, requires matches to
//! sit inside a recognized project boundary, keeps only the outermost of
//! nested matches, and stamps every surviving item with its protection
//! state.

mod patterns;

pub use patterns::{TargetPattern, default_targets, owner_identity_for};

use crate::error::CleanError;
use crate::policy::{Decision, PolicyGate};
use patterns::{PRUNE_DIRS, is_project_boundary};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// What kind of filesystem entry a candidate is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ArtifactKind {
    /// A regular file.
    File,
    /// A directory subtree.
    Directory,
    /// A macOS application bundle (a `.app` directory).
    Bundle,
}

/// A deletion candidate produced by one scan pass.
///
/// Records are ephemeral and never mutated after creation; a re-scan
/// produces fresh records.
#[derive(Debug, Clone, Serialize)]
pub struct CandidateArtifact {
    /// Absolute path of the entry.
    pub path: PathBuf,
    /// Entry kind.
    pub kind: ArtifactKind,
    /// Size in bytes, when known (filled from the cache or a probe).
    pub size_bytes: Option<u64>,
    /// Days since last modification, when known.
    pub age_days: Option<u64>,
    /// Owning application identity, when one is visible in the path.
    pub owner_identity: Option<String>,
    /// Last-used epoch seconds, when known.
    pub last_used_epoch: Option<i64>,
    /// Protection decision for this path.
    pub protection: Decision,
    /// Whether the external selection UI should pre-select this item.
    /// Allowed items younger than the minimum age stay visible but start
    /// unselected.
    pub selected_by_default: bool,
}

/// Scan tuning knobs.
#[derive(Debug, Clone, Copy)]
pub struct ScanConfig {
    /// Maximum directory depth below each root.
    pub max_depth: usize,
    /// Minimum age in days before an allowed item defaults to selected.
    pub min_age_days: u64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            max_depth: 8,
            min_age_days: 7,
        }
    }
}

/// Walks roots and emits deduplicated [`CandidateArtifact`] records.
#[derive(Debug, Clone)]
pub struct CandidateScanner {
    gate: Arc<PolicyGate>,
    config: ScanConfig,
}

impl CandidateScanner {
    /// Create a scanner with default tuning.
    pub fn new(gate: Arc<PolicyGate>) -> Self {
        Self::with_config(gate, ScanConfig::default())
    }

    /// Create a scanner with explicit tuning.
    pub fn with_config(gate: Arc<PolicyGate>, config: ScanConfig) -> Self {
        Self { gate, config }
    }

    /// Scan one root for candidates.
    ///
    /// A nonexistent root yields an empty list. A root at or above the
    /// unsafe boundaries (filesystem root, the user's home directory) is
    /// refused before any traversal begins.
    ///
    /// # Errors
    ///
    /// Returns [`CleanError::InvalidInput`] for unsafe or malformed roots.
    pub fn scan(
        &self,
        root: &Path,
        targets: &[TargetPattern],
    ) -> Result<Vec<CandidateArtifact>, CleanError> {
        if !root.is_absolute() {
            return Err(CleanError::InvalidInput(format!(
                "scan root must be absolute: {}",
                root.display()
            )));
        }
        if root == Path::new("/") || dirs::home_dir().is_some_and(|home| home.starts_with(root)) {
            return Err(CleanError::InvalidInput(format!(
                "refusing to scan at or above an unsafe boundary: {}",
                root.display()
            )));
        }
        if !root.exists() {
            debug!(root = %root.display(), "scan root does not exist, skipping");
            return Ok(Vec::new());
        }

        let matches = self.collect_matches(root, targets);
        let matches = dedup_nested(matches);

        Ok(matches
            .into_iter()
            .map(|path| self.describe(path))
            .collect())
    }

    /// Walk the tree and collect confirmed, contained matches.
    fn collect_matches(&self, root: &Path, targets: &[TargetPattern]) -> Vec<PathBuf> {
        let single_project = is_project_boundary(root);
        let mut matches = Vec::new();

        let mut walker = WalkDir::new(root)
            .min_depth(1)
            .max_depth(self.config.max_depth)
            .into_iter();

        while let Some(entry) = walker.next() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!(root = %root.display(), "walk error: {err}");
                    continue;
                }
            };
            let path = entry.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let is_dir = entry.file_type().is_dir();

            if entry.file_type().is_symlink() {
                continue;
            }

            let target = targets.iter().find(|t| t.name == name);

            if is_dir && PRUNE_DIRS.contains(&name) {
                walker.skip_current_dir();
                continue;
            }
            // Hidden entries are skipped unless they are themselves targets.
            if name.starts_with('.') && target.is_none() {
                if is_dir {
                    walker.skip_current_dir();
                }
                continue;
            }

            let Some(target) = target else {
                continue;
            };
            if !target.confirmed_at(path) {
                debug!(path = %path.display(), "no ecosystem marker, dropping match");
                continue;
            }
            if !contained_in_project(root, path, single_project) {
                debug!(path = %path.display(), "outside any project boundary, dropping");
                continue;
            }

            matches.push(path.to_path_buf());
            // Never descend into a matched subtree; inner matches would be
            // dropped by the nesting dedup anyway.
            if is_dir {
                walker.skip_current_dir();
            }
        }

        matches
    }

    /// Build the candidate record for a surviving match.
    fn describe(&self, path: PathBuf) -> CandidateArtifact {
        let meta = std::fs::symlink_metadata(&path).ok();
        let kind = match &meta {
            Some(m) if m.is_dir() => {
                if path.extension().is_some_and(|e| e == "app") {
                    ArtifactKind::Bundle
                } else {
                    ArtifactKind::Directory
                }
            }
            _ => ArtifactKind::File,
        };
        let age_days = meta
            .as_ref()
            .and_then(|m| m.modified().ok())
            .and_then(age_in_days);
        let size_bytes = meta.as_ref().filter(|m| m.is_file()).map(std::fs::Metadata::len);
        let owner_identity = owner_identity_for(&path);
        let protection = self.gate.decide(&path, owner_identity.as_deref());
        let selected_by_default =
            protection.is_allow() && age_days.is_some_and(|age| age >= self.config.min_age_days);

        CandidateArtifact {
            path,
            kind,
            size_bytes,
            age_days,
            owner_identity,
            last_used_epoch: None,
            protection,
            selected_by_default,
        }
    }
}

/// Whether `path` lies strictly inside a project boundary. The boundary may
/// be the scan root itself (single-project mode); otherwise some ancestor
/// between the root and the match must carry a project marker.
fn contained_in_project(root: &Path, path: &Path, single_project: bool) -> bool {
    let mut current = path.parent();
    while let Some(dir) = current {
        if dir == root {
            return single_project || is_project_boundary(dir);
        }
        if is_project_boundary(dir) {
            return true;
        }
        current = dir.parent();
    }
    false
}

/// Keep only the outermost of nested matches: sort lexicographically and
/// drop any path that is a descendant of an already-kept path.
fn dedup_nested(mut paths: Vec<PathBuf>) -> Vec<PathBuf> {
    paths.sort();
    let mut kept: Vec<PathBuf> = Vec::with_capacity(paths.len());
    for path in paths {
        if kept.last().is_some_and(|prev| path.starts_with(prev)) {
            continue;
        }
        kept.push(path);
    }
    kept
}

/// Whole days elapsed since `mtime`, or `None` for unreadable/future times.
fn age_in_days(mtime: SystemTime) -> Option<u64> {
    mtime.elapsed().ok().map(|d| d.as_secs() / 86_400)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn scanner() -> CandidateScanner {
        CandidateScanner::with_config(
            Arc::new(PolicyGate::new()),
            ScanConfig {
                max_depth: 8,
                min_age_days: 0,
            },
        )
    }

    #[test]
    fn nesting_dedup_keeps_outermost() {
        let input = vec![
            PathBuf::from("/a/b"),
            PathBuf::from("/a/b/c"),
            PathBuf::from("/a/d"),
        ];
        assert_eq!(
            dedup_nested(input),
            vec![PathBuf::from("/a/b"), PathBuf::from("/a/d")]
        );
    }

    #[test]
    fn dedup_is_component_wise() {
        let input = vec![PathBuf::from("/a/b"), PathBuf::from("/a/bc")];
        assert_eq!(
            dedup_nested(input),
            vec![PathBuf::from("/a/b"), PathBuf::from("/a/bc")]
        );
    }

    #[test]
    fn missing_root_yields_empty() {
        let found = scanner()
            .scan(Path::new("/nonexistent/scan/root"), &default_targets())
            .unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn unsafe_roots_refused() {
        let s = scanner();
        assert!(s.scan(Path::new("/"), &default_targets()).is_err());
        if let Some(home) = dirs::home_dir() {
            assert!(s.scan(&home, &default_targets()).is_err());
        }
    }

    #[test]
    fn finds_artifacts_and_excludes_vcs() {
        let dir = tempfile::tempdir().unwrap();
        let proj = dir.path().join("proj");
        fs::create_dir_all(proj.join("node_modules/left-pad")).unwrap();
        fs::create_dir_all(proj.join("target/debug")).unwrap();
        fs::create_dir_all(proj.join(".git/objects")).unwrap();
        fs::write(proj.join("Cargo.toml"), "[package]").unwrap();
        fs::write(proj.join("package.json"), "{}").unwrap();

        let found = scanner().scan(dir.path(), &default_targets()).unwrap();
        let paths: Vec<_> = found.iter().map(|c| c.path.clone()).collect();
        assert_eq!(paths.len(), 2, "found: {paths:?}");
        assert!(paths.contains(&proj.join("node_modules")));
        assert!(paths.contains(&proj.join("target")));
    }

    #[test]
    fn ambiguous_name_needs_marker() {
        let dir = tempfile::tempdir().unwrap();
        let gopher = dir.path().join("gopher");
        let misc = dir.path().join("misc");
        fs::create_dir_all(gopher.join("bin")).unwrap();
        fs::write(gopher.join("go.mod"), "module gopher").unwrap();
        fs::create_dir_all(misc.join("bin")).unwrap();
        fs::write(misc.join("Makefile"), "all:").unwrap();

        let found = scanner().scan(dir.path(), &default_targets()).unwrap();
        let paths: Vec<_> = found.iter().map(|c| c.path.clone()).collect();
        assert!(paths.contains(&gopher.join("bin")));
        assert!(!paths.contains(&misc.join("bin")));
    }

    #[test]
    fn match_outside_project_boundary_dropped() {
        let dir = tempfile::tempdir().unwrap();
        // No project markers anywhere above it.
        fs::create_dir_all(dir.path().join("loose/node_modules")).unwrap();

        let found = scanner().scan(dir.path(), &default_targets()).unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn single_project_mode_allows_direct_children() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("package.json"), "{}").unwrap();
        fs::create_dir_all(dir.path().join("node_modules")).unwrap();

        let found = scanner().scan(dir.path(), &default_targets()).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].path, dir.path().join("node_modules"));
    }

    #[test]
    fn protected_identity_reported_denied_and_unselected() {
        let dir = tempfile::tempdir().unwrap();
        let app = dir.path().join("com.tailscale.ipn");
        fs::create_dir_all(app.join("node_modules")).unwrap();
        fs::write(app.join("package.json"), "{}").unwrap();

        let found = scanner().scan(dir.path(), &default_targets()).unwrap();
        assert_eq!(found.len(), 1);
        let candidate = &found[0];
        assert!(!candidate.protection.is_allow());
        assert!(!candidate.selected_by_default);
        assert_eq!(candidate.owner_identity.as_deref(), Some("com.tailscale.ipn"));
    }

    #[test]
    fn fresh_items_visible_but_unselected() {
        let dir = tempfile::tempdir().unwrap();
        let proj = dir.path().join("proj");
        fs::create_dir_all(proj.join("node_modules")).unwrap();
        fs::write(proj.join("package.json"), "{}").unwrap();

        let gated = CandidateScanner::with_config(
            Arc::new(PolicyGate::new()),
            ScanConfig {
                max_depth: 8,
                min_age_days: 7,
            },
        );
        let found = gated.scan(dir.path(), &default_targets()).unwrap();
        assert_eq!(found.len(), 1);
        assert!(found[0].protection.is_allow());
        assert!(!found[0].selected_by_default, "created just now, under the age gate");
    }
}
