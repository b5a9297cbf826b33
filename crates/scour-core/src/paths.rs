//! Well-known filesystem locations for scour state.

use dirs::home_dir;
use std::path::PathBuf;

/// Returns the primary state directory, or None if the user's home cannot be resolved.
pub fn try_scour_home() -> Option<PathBuf> {
    if let Ok(val) = std::env::var("SCOUR_HOME") {
        return Some(PathBuf::from(val));
    }
    home_dir().map(|h| h.join(".scour"))
}

/// Returns the canonical scour home directory (`~/.scour`).
///
/// # Panics
///
/// Panics if neither `SCOUR_HOME` is set nor the user's home directory can
/// be resolved. On macOS this should never happen in normal use.
pub fn scour_home() -> PathBuf {
    try_scour_home().expect("Could not determine home directory. Set SCOUR_HOME to override.")
}

/// Persisted metadata cache snapshot: ~/.scour/cache.json
pub fn cache_file_path() -> PathBuf {
    scour_home().join("cache.json")
}

/// Writer lease for the cache snapshot: ~/.scour/cache.lock
pub fn cache_lock_path() -> PathBuf {
    scour_home().join("cache.lock")
}

/// Scratch space for refresh workers: ~/.scour/tmp (same volume as the cache)
pub fn tmp_path() -> PathBuf {
    scour_home().join("tmp")
}

/// Logs directory: ~/.scour/logs
pub fn log_dir() -> PathBuf {
    scour_home().join("logs")
}

/// Operation log for a cleanup run, one file per day.
pub fn clean_log_path() -> PathBuf {
    let stamp = chrono::Local::now().format("%Y%m%d");
    log_dir().join(format!("clean-{stamp}.jsonl"))
}

/// Optional configuration file: ~/.scour/config.toml
pub fn config_path() -> PathBuf {
    scour_home().join("config.toml")
}

/// User override whitelist, one exact path per line: ~/.scour/whitelist
pub fn whitelist_path() -> PathBuf {
    scour_home().join("whitelist")
}

/// Directories commonly holding development projects, used when no scan
/// roots are configured. Only existing directories are returned.
pub fn default_scan_roots() -> Vec<PathBuf> {
    let Some(home) = home_dir() else {
        return Vec::new();
    };
    ["Developer", "Projects", "projects", "code", "src", "work"]
        .iter()
        .map(|name| home.join(name))
        .filter(|p| p.is_dir())
        .collect()
}
