//! Target patterns and classification helpers.
//!
//! Classification is explicit name matching on path components, never shell
//! glob expansion. Ambiguous names (a generic `bin` or `vendor`) carry
//! ecosystem markers that must be confirmed among siblings before the match
//! counts.

use std::path::Path;

/// A directory or file name recognized as a deletion candidate.
#[derive(Debug, Clone)]
pub struct TargetPattern {
    /// Exact entry name to match.
    pub name: String,
    /// Files that must exist next to the match to confirm its ecosystem.
    /// Empty means the name is unambiguous on its own.
    pub markers: Vec<String>,
}

impl TargetPattern {
    /// A name that is safe to classify without further context.
    pub fn unambiguous(name: &str) -> Self {
        Self {
            name: name.to_string(),
            markers: Vec::new(),
        }
    }

    /// A generic name that needs a sibling marker file before it counts.
    pub fn with_markers(name: &str, markers: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            markers: markers.iter().map(ToString::to_string).collect(),
        }
    }

    /// Check the match's parent directory for a confirming marker.
    pub fn confirmed_at(&self, candidate: &Path) -> bool {
        if self.markers.is_empty() {
            return true;
        }
        let Some(parent) = candidate.parent() else {
            return false;
        };
        self.markers.iter().any(|m| parent.join(m).exists())
    }
}

/// The default target set: build outputs and tool caches that are safe to
/// recreate.
pub fn default_targets() -> Vec<TargetPattern> {
    vec![
        // Unambiguous names
        TargetPattern::unambiguous("node_modules"),
        TargetPattern::unambiguous("__pycache__"),
        TargetPattern::unambiguous(".pytest_cache"),
        TargetPattern::unambiguous(".mypy_cache"),
        TargetPattern::unambiguous(".ruff_cache"),
        TargetPattern::unambiguous(".tox"),
        TargetPattern::unambiguous(".venv"),
        TargetPattern::unambiguous("DerivedData"),
        TargetPattern::unambiguous(".parcel-cache"),
        TargetPattern::unambiguous(".turbo"),
        TargetPattern::unambiguous("bower_components"),
        TargetPattern::unambiguous(".sass-cache"),
        TargetPattern::unambiguous(".DS_Store"),
        // Names needing ecosystem confirmation
        TargetPattern::with_markers("target", &["Cargo.toml"]),
        TargetPattern::with_markers("build", &["gradlew", "build.gradle", "CMakeLists.txt", "setup.py"]),
        TargetPattern::with_markers("dist", &["package.json", "setup.py", "pyproject.toml"]),
        TargetPattern::with_markers("venv", &["requirements.txt", "pyproject.toml", "setup.py"]),
        TargetPattern::with_markers("Pods", &["Podfile"]),
        TargetPattern::with_markers(".gradle", &["build.gradle", "settings.gradle", "gradlew"]),
        TargetPattern::with_markers("bin", &["go.mod"]),
        TargetPattern::with_markers("vendor", &["go.mod", "composer.json"]),
        TargetPattern::with_markers(".next", &["package.json"]),
        TargetPattern::with_markers(".nuxt", &["package.json"]),
        TargetPattern::with_markers(".dart_tool", &["pubspec.yaml"]),
        TargetPattern::with_markers(".stack-work", &["stack.yaml"]),
        TargetPattern::with_markers("_build", &["mix.exs", "dune-project"]),
        TargetPattern::with_markers("deps", &["mix.exs"]),
        TargetPattern::with_markers("zig-cache", &["build.zig"]),
        TargetPattern::with_markers("zig-out", &["build.zig"]),
        TargetPattern::with_markers(".terraform", &[".terraform.lock.hcl"]),
        TargetPattern::with_markers("cmake-build-debug", &["CMakeLists.txt"]),
        TargetPattern::with_markers("cmake-build-release", &["CMakeLists.txt"]),
    ]
}

/// Files or directories whose presence marks a project/container boundary.
pub(crate) const PROJECT_MARKERS: &[&str] = &[
    ".git",
    ".hg",
    ".svn",
    ".jj",
    "Cargo.toml",
    "package.json",
    "go.mod",
    "pyproject.toml",
    "setup.py",
    "requirements.txt",
    "Makefile",
    "CMakeLists.txt",
    "mix.exs",
    "build.gradle",
    "settings.gradle",
    "pubspec.yaml",
    "composer.json",
    "Gemfile",
    "Podfile",
    "stack.yaml",
    "build.zig",
    "dune-project",
];

/// Subtrees never descended into: version-control internals, trash, and
/// heavyweight system/media libraries.
pub(crate) const PRUNE_DIRS: &[&str] = &[
    ".git",
    ".hg",
    ".svn",
    ".jj",
    ".Trash",
    ".Trashes",
    "Library",
    "Photos Library.photoslibrary",
    "Backups.backupdb",
];

/// True if `dir` looks like a project or container boundary.
pub(crate) fn is_project_boundary(dir: &Path) -> bool {
    PROJECT_MARKERS.iter().any(|m| dir.join(m).exists())
}

/// Extract an owning application identity from a path, if one is visible.
///
/// Recognizes reverse-DNS path components (`com.example.app`) and `.app`
/// bundle ancestors. Returns the most specific identity found.
pub fn owner_identity_for(path: &Path) -> Option<String> {
    for component in path.components().rev() {
        let name = component.as_os_str().to_string_lossy();
        if let Some(stem) = name.strip_suffix(".app") {
            return Some(stem.to_string());
        }
        if looks_reverse_dns(&name) {
            return Some(name.into_owned());
        }
    }
    None
}

/// A name like `com.example.app`: at least three dot-separated segments,
/// all non-empty, no whitespace.
fn looks_reverse_dns(name: &str) -> bool {
    let segments: Vec<&str> = name.split('.').collect();
    segments.len() >= 3
        && segments
            .iter()
            .all(|s| !s.is_empty() && !s.contains(char::is_whitespace))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn marker_confirmation() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("target");
        fs::create_dir(&target).unwrap();

        let pattern = TargetPattern::with_markers("target", &["Cargo.toml"]);
        assert!(!pattern.confirmed_at(&target));

        fs::write(dir.path().join("Cargo.toml"), "[package]").unwrap();
        assert!(pattern.confirmed_at(&target));
    }

    #[test]
    fn reverse_dns_identity_extraction() {
        assert_eq!(
            owner_identity_for(Path::new("/Users/me/Library/Caches/com.example.app")),
            Some("com.example.app".to_string())
        );
        assert_eq!(
            owner_identity_for(Path::new("/Applications/Thing.app/Contents/Resources")),
            Some("Thing".to_string())
        );
        assert_eq!(owner_identity_for(Path::new("/Users/me/code/proj")), None);
    }
}
