//! Scan command

use crate::SortArg;
use crate::ui::{Output, render_candidates};
use anyhow::Result;
use std::path::PathBuf;

/// Scan roots and print the candidate list.
pub async fn scan(
    roots: &[PathBuf],
    min_age_days: Option<u64>,
    sort: SortArg,
    json: bool,
    quiet: bool,
) -> Result<()> {
    let output = Output::new(quiet);
    let mut session = super::session(roots, min_age_days, quiet)?;

    if session.roots.is_empty() {
        output.warning("No scan roots configured and none auto-discovered.");
        output.info("Pass roots explicitly or add them to ~/.scour/config.toml.");
        return Ok(());
    }

    let candidates = session
        .orchestrator
        .scan(&session.roots, &session.targets, sort.into())
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&candidates)?);
        return Ok(());
    }

    if candidates.is_empty() {
        output.success("Nothing to clean up.");
        return Ok(());
    }

    println!("{}", render_candidates(&candidates));
    let selected = candidates.iter().filter(|c| c.selected_by_default).count();
    output.info(&format!(
        "{} candidates ({selected} selected by default). Run `scour clean --yes` to remove them.",
        candidates.len()
    ));
    Ok(())
}
