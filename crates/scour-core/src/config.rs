//! Configuration file loading.
//!
//! `~/.scour/config.toml` supplies scan roots, extra target patterns, and
//! additional protected paths. Everything is optional; CLI flags win over
//! file values.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Top-level configuration, deserialized from `config.toml`.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Scan behavior.
    pub scan: ScanSection,
    /// Target pattern additions.
    pub targets: TargetsSection,
    /// User-protected paths (additive to the whitelist file).
    pub protect: ProtectSection,
}

/// `[scan]` section.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct ScanSection {
    /// Root directories to scan. Empty means auto-discovery.
    pub roots: Vec<PathBuf>,
    /// Minimum age in days before an artifact defaults to selected.
    pub min_age_days: Option<u64>,
}

/// `[targets]` section.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct TargetsSection {
    /// Extra directory/file names treated as unambiguous targets.
    pub extra: Vec<String>,
}

/// `[protect]` section.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct ProtectSection {
    /// Exact paths that must never be deleted.
    pub paths: Vec<PathBuf>,
}

impl Config {
    /// Load configuration from `path`. A missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config at {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("Failed to parse {}", path.display()))
    }
}

/// Load the user override whitelist: one exact absolute path per line.
/// Blank lines and `#` comments are ignored. A missing or unreadable file
/// yields an empty set; overrides can only add protection, so the safe
/// fallback is no overrides.
pub fn load_whitelist(path: &Path) -> Vec<PathBuf> {
    let Ok(raw) = fs::read_to_string(path) else {
        return Vec::new();
    };
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(PathBuf::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_config_yields_defaults() {
        let config = Config::load(Path::new("/nonexistent/config.toml")).unwrap();
        assert!(config.scan.roots.is_empty());
        assert!(config.scan.min_age_days.is_none());
    }

    #[test]
    fn parses_all_sections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
[scan]
roots = ["/Users/me/code"]
min_age_days = 14

[targets]
extra = ["out"]

[protect]
paths = ["/Users/me/code/keep"]
"#,
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.scan.roots, vec![PathBuf::from("/Users/me/code")]);
        assert_eq!(config.scan.min_age_days, Some(14));
        assert_eq!(config.targets.extra, vec!["out"]);
        assert_eq!(config.protect.paths.len(), 1);
    }

    #[test]
    fn whitelist_skips_comments_and_blanks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("whitelist");
        let mut f = fs::File::create(&path).unwrap();
        writeln!(f, "# keep my stuff").unwrap();
        writeln!(f).unwrap();
        writeln!(f, "/Users/me/important").unwrap();
        drop(f);

        let list = load_whitelist(&path);
        assert_eq!(list, vec![PathBuf::from("/Users/me/important")]);
    }
}
