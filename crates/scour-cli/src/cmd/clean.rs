//! Clean command

use crate::ui::{Output, human_bytes, render_candidates};
use anyhow::Result;
use scour_core::{CandidateArtifact, OperationLog, SortKey};
use std::path::PathBuf;

/// Scan, take the confirmed selection, and delete it.
///
/// The core performs no deletion without explicit confirmation: either
/// `--yes` (take every default-selected candidate) or one `--path` per
/// chosen item. Anything else aborts after printing the candidates.
pub async fn clean(
    roots: &[PathBuf],
    yes: bool,
    paths: &[PathBuf],
    min_age_days: Option<u64>,
    dry_run: bool,
    quiet: bool,
) -> Result<()> {
    let output = Output::new(quiet);
    let mut session = super::session(roots, min_age_days, quiet)?;

    if session.roots.is_empty() {
        output.warning("No scan roots configured and none auto-discovered.");
        return Ok(());
    }

    let candidates = session
        .orchestrator
        .scan(&session.roots, &session.targets, SortKey::Size)
        .await?;

    if candidates.is_empty() {
        output.success("Nothing to clean up.");
        return Ok(());
    }

    let selection = select(&candidates, yes, paths, &output);
    if selection.is_empty() {
        println!("{}", render_candidates(&candidates));
        output.info("Aborting: nothing confirmed. Re-run with --yes or --path <PATH>.");
        return Ok(());
    }

    if dry_run {
        output.info(&format!(
            "Dry run: {} items would be removed.",
            selection.len()
        ));
    }

    let log = OperationLog::open(scour_core::paths::clean_log_path());
    let stats = session
        .orchestrator
        .execute(&selection, false, dry_run, &log)
        .await;

    output.success(&format!(
        "{} deleted, {} protected, {} failed, {} timed out ({} reclaimed)",
        stats.deleted,
        stats.skipped_protected,
        stats.failed,
        stats.timed_out,
        human_bytes(stats.bytes_freed),
    ));
    Ok(())
}

/// Resolve the confirmed subset. Explicit `--path` selections win; each
/// must name a scanned candidate, and unselectable (protected) candidates
/// are refused here rather than burning a gate check later.
fn select(
    candidates: &[CandidateArtifact],
    yes: bool,
    paths: &[PathBuf],
    output: &Output,
) -> Vec<CandidateArtifact> {
    if !paths.is_empty() {
        let mut picked = Vec::new();
        for path in paths {
            match candidates.iter().find(|c| &c.path == path) {
                Some(c) if c.protection.is_allow() => picked.push(c.clone()),
                Some(c) => output.warning(&format!(
                    "{} is protected and cannot be selected",
                    c.path.display()
                )),
                None => output.warning(&format!("{} is not a scanned candidate", path.display())),
            }
        }
        return picked;
    }
    if yes {
        return candidates
            .iter()
            .filter(|c| c.selected_by_default)
            .cloned()
            .collect();
    }
    Vec::new()
}
