//! Path and identity protection policy.
//!
//! [`PolicyGate::decide`] is a pure function over the static rule tables
//! and the user override set: no filesystem access, no ambient state. Every
//! destructive operation in the engine consults it first.

mod rules;

use rules::{
    CRITICAL_EXCEPTIONS, CRITICAL_ROOTS, MIN_IDENTITY_LEN, PROTECTED_IDENTITIES, PROTECTED_NAMES,
    SYSTEM_IDENTITY_PREFIXES,
};
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};

/// Outcome of a policy check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "reason")]
pub enum Decision {
    /// The operation may proceed.
    Allow,
    /// The operation is refused, with a human-readable reason.
    Deny(String),
}

impl Decision {
    /// Returns `true` if this decision permits the operation.
    pub fn is_allow(&self) -> bool {
        matches!(self, Self::Allow)
    }
}

/// Gate for every destructive operation.
///
/// Holds the user override set on top of the hard-coded rule tables. The
/// override set is additive-only: it can forbid deletion of a path the
/// rules would allow, but can never permit a path the rules deny.
#[derive(Debug, Default, Clone)]
pub struct PolicyGate {
    overrides: BTreeSet<PathBuf>,
}

impl PolicyGate {
    /// Create a gate with no user overrides.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a gate protecting the given exact paths in addition to the
    /// built-in rules.
    pub fn with_overrides(overrides: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            overrides: overrides.into_iter().collect(),
        }
    }

    /// Decide whether `path` (and, if known, the owning application
    /// identity) may be deleted.
    pub fn decide(&self, path: &Path, identity: Option<&str>) -> Decision {
        if let Some(reason) = validate(path) {
            return Decision::Deny(format!("invalid input: {reason}"));
        }

        if let Some(reason) = self.check_critical(path) {
            return Decision::Deny(reason);
        }

        if self.overrides.contains(path) {
            return Decision::Deny("user-protected path".to_string());
        }

        if let Some(id) = identity {
            if let Some(reason) = check_identity(id) {
                return Decision::Deny(reason);
            }
        }

        Decision::Allow
    }

    /// Decide whether an application identity (bundle identifier or
    /// launch-item label) belongs to a protected product.
    pub fn decide_identity(&self, identity: &str) -> Decision {
        match check_identity(identity) {
            Some(reason) => Decision::Deny(reason),
            None => Decision::Allow,
        }
    }

    /// Critical-root check with nested exception carve-outs. The deepest
    /// matching rule wins: an exception only applies when it is at least as
    /// specific as the deny it is nested inside.
    fn check_critical(&self, path: &Path) -> Option<String> {
        // The filesystem root is exact-match only; everything lives under it.
        if path == Path::new("/") {
            return Some("critical system path".to_string());
        }

        let deny_depth = CRITICAL_ROOTS
            .iter()
            .filter(|root| **root != "/" && path.starts_with(root))
            .map(|root| Path::new(root).components().count())
            .max()?;

        let exception_depth = CRITICAL_EXCEPTIONS
            .iter()
            .filter(|exc| path.starts_with(exc))
            .map(|exc| Path::new(exc).components().count())
            .max()
            .unwrap_or(0);

        if exception_depth >= deny_depth {
            return None;
        }
        Some("critical system path".to_string())
    }
}

/// Structural validation, before any rule lookup. Returns the rejection
/// reason, or `None` if the path is well-formed.
fn validate(path: &Path) -> Option<&'static str> {
    if path.as_os_str().is_empty() {
        return Some("empty path");
    }
    if !path.is_absolute() {
        return Some("path must be absolute");
    }
    if path
        .components()
        .any(|c| matches!(c, Component::ParentDir))
    {
        return Some("parent-directory traversal");
    }
    if path.to_string_lossy().chars().any(char::is_control) {
        return Some("control character in path");
    }
    None
}

/// Identity rules: system-owned reverse-DNS prefixes, the curated protected
/// product list, and a minimum length. Matching is exact or
/// component-prefix, never fuzzy, so a short label cannot collide with a
/// longer real product name.
fn check_identity(identity: &str) -> Option<String> {
    if identity.len() < MIN_IDENTITY_LEN {
        return Some(format!("identity too short to match safely: {identity:?}"));
    }

    for prefix in SYSTEM_IDENTITY_PREFIXES {
        if identity.starts_with(prefix) {
            return Some(format!("system-owned identity: {identity}"));
        }
    }

    for protected in PROTECTED_IDENTITIES {
        if identity == *protected
            || identity
                .strip_prefix(protected)
                .is_some_and(|rest| rest.starts_with('.'))
        {
            return Some(format!("protected application: {identity}"));
        }
    }

    for name in PROTECTED_NAMES {
        if identity.eq_ignore_ascii_case(name) {
            return Some(format!("protected application: {identity}"));
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn critical_roots_denied_regardless_of_overrides() {
        let gate = PolicyGate::with_overrides(vec![PathBuf::from("/usr/bin/ls")]);
        for path in ["/", "/bin", "/usr/bin/ls", "/System/Library/CoreServices"] {
            assert!(
                !gate.decide(Path::new(path), None).is_allow(),
                "{path} must be denied"
            );
        }
    }

    #[test]
    fn exception_inside_denied_tree_allows() {
        let gate = PolicyGate::new();
        assert!(
            gate.decide(Path::new("/Library/Caches/com.example.app"), None)
                .is_allow()
        );
        assert!(gate.decide(Path::new("/Library/Logs/MyApp"), None).is_allow());
        // Sibling of the exception stays denied.
        assert!(
            !gate
                .decide(Path::new("/Library/Preferences/com.example.app"), None)
                .is_allow()
        );
    }

    #[test]
    fn malformed_paths_denied() {
        let gate = PolicyGate::new();
        assert!(!gate.decide(Path::new(""), None).is_allow());
        assert!(!gate.decide(Path::new("relative/path"), None).is_allow());
        assert!(!gate.decide(Path::new("/tmp/../etc/passwd"), None).is_allow());
        assert!(!gate.decide(Path::new("/tmp/bad\u{7}name"), None).is_allow());
    }

    #[test]
    fn override_forbids_but_never_permits() {
        let gate = PolicyGate::with_overrides(vec![
            PathBuf::from("/Users/me/code/keep/node_modules"),
            PathBuf::from("/etc"),
        ]);
        // Override protects an otherwise-deletable path.
        assert!(
            !gate
                .decide(Path::new("/Users/me/code/keep/node_modules"), None)
                .is_allow()
        );
        // A hard deny stays a hard deny; overrides add nothing either way.
        assert!(!gate.decide(Path::new("/etc"), None).is_allow());
        // Overrides are exact-match: siblings are unaffected.
        assert!(
            gate.decide(Path::new("/Users/me/code/other/node_modules"), None)
                .is_allow()
        );
    }

    #[test]
    fn system_and_protected_identities_denied() {
        let gate = PolicyGate::new();
        assert!(!gate.decide_identity("com.apple.Safari").is_allow());
        assert!(!gate.decide_identity("com.tailscale.ipn").is_allow());
        // Prefix match applies at component boundaries only.
        assert!(!gate.decide_identity("com.tailscale.ipn.helper").is_allow());
        assert!(gate.decide_identity("com.tailscale-fan.notes").is_allow());
        assert!(!gate.decide_identity("Tailscale").is_allow());
        assert!(gate.decide_identity("com.example.goodapp").is_allow());
    }

    #[test]
    fn short_identities_never_match() {
        let gate = PolicyGate::new();
        assert!(!gate.decide_identity("ab").is_allow());
        assert!(!gate.decide_identity("").is_allow());
    }

    #[test]
    fn identity_denial_applies_to_path_decision() {
        let gate = PolicyGate::new();
        let path = Path::new("/Users/me/Library/Caches/com.tailscale.ipn");
        assert!(!gate.decide(path, Some("com.tailscale.ipn")).is_allow());
        assert!(gate.decide(path, None).is_allow());
    }
}
