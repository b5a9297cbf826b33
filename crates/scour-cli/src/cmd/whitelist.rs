//! Whitelist command

use crate::ui::Output;
use anyhow::{Context, Result, bail};
use scour_core::load_whitelist;
use scour_core::paths::whitelist_path;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

/// Protect an exact path from deletion. Additive-only: entries can forbid
/// deletion of otherwise-deletable paths, never permit a denied one.
pub fn add(path: &Path, quiet: bool) -> Result<()> {
    let output = Output::new(quiet);
    if !path.is_absolute() {
        bail!("whitelist entries must be absolute paths: {}", path.display());
    }

    let file = whitelist_path();
    let existing = load_whitelist(&file);
    if existing.iter().any(|p| p == path) {
        output.info(&format!("{} is already protected", path.display()));
        return Ok(());
    }

    if let Some(parent) = file.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut f = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&file)
        .with_context(|| format!("Failed to open {}", file.display()))?;
    writeln!(f, "{}", path.display())?;

    output.success(&format!("Protected {}", path.display()));
    Ok(())
}

/// Print every protected path, one per line.
pub fn list() -> Result<()> {
    for path in load_whitelist(&whitelist_path()) {
        println!("{}", path.display());
    }
    Ok(())
}
