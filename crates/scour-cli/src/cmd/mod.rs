//! Command implementations and shared setup helpers.

pub mod clean;
pub mod completions;
pub mod scan;
pub mod whitelist;

use crate::ui::ConsoleReporter;
use anyhow::{Context, Result};
use scour_core::scanner::{ScanConfig, TargetPattern, default_targets};
use scour_core::{Config, MetadataCache, PolicyGate, ScanOrchestrator, load_whitelist};
use std::path::PathBuf;
use std::sync::Arc;

/// Everything a scan-bearing command needs, built from config + flags.
pub(crate) struct Session {
    pub(crate) orchestrator: ScanOrchestrator,
    pub(crate) roots: Vec<PathBuf>,
    pub(crate) targets: Vec<TargetPattern>,
}

/// Load config, merge the override set, and wire up an orchestrator with a
/// Ctrl-C hook on its cancel token.
pub(crate) fn session(
    cli_roots: &[PathBuf],
    min_age_days: Option<u64>,
    quiet: bool,
) -> Result<Session> {
    let home = scour_core::paths::scour_home();
    std::fs::create_dir_all(&home)
        .with_context(|| format!("Failed to create {}", home.display()))?;

    let config = Config::load(&scour_core::paths::config_path())?;

    let mut protected = load_whitelist(&scour_core::paths::whitelist_path());
    protected.extend(config.protect.paths.iter().cloned());
    let gate = Arc::new(PolicyGate::with_overrides(protected));

    let mut targets = default_targets();
    targets.extend(
        config
            .targets
            .extra
            .iter()
            .map(|name| TargetPattern::unambiguous(name)),
    );

    let roots = if cli_roots.is_empty() {
        if config.scan.roots.is_empty() {
            scour_core::paths::default_scan_roots()
        } else {
            config.scan.roots.clone()
        }
    } else {
        cli_roots.to_vec()
    };

    let scan_config = ScanConfig {
        min_age_days: min_age_days
            .or(config.scan.min_age_days)
            .unwrap_or(ScanConfig::default().min_age_days),
        ..ScanConfig::default()
    };

    let cache = Arc::new(MetadataCache::open(&home));
    let reporter = Arc::new(ConsoleReporter::new(quiet));
    let orchestrator = ScanOrchestrator::new(gate, cache, reporter).with_scan_config(scan_config);

    // Propagate a user interrupt to every in-flight worker.
    let token = orchestrator.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            token.cancel();
        }
    });

    Ok(Session {
        orchestrator,
        roots,
        targets,
    })
}
