//! Static protection rule tables.
//!
//! Two tiers: a hard-coded critical set that no configuration or override
//! can weaken, and a data-driven protected set for applications that break
//! badly when their support files disappear (VPN clients, security agents,
//! AI assistants, Apple-owned launch items).

/// Filesystem roots that may never be deleted or deleted under, regardless
/// of elevation or user configuration.
pub(crate) const CRITICAL_ROOTS: &[&str] = &[
    "/",
    "/bin",
    "/sbin",
    "/usr",
    "/etc",
    "/private/etc",
    "/var/db",
    "/private/var/db",
    "/System",
    "/Library",
    "/Library/Extensions",
    "/System/Library/Extensions",
    "/Applications/Utilities",
];

/// Known-safe subtrees carved out of otherwise-denied critical roots.
/// Evaluated most-specific-match-wins against `CRITICAL_ROOTS`.
pub(crate) const CRITICAL_EXCEPTIONS: &[&str] = &[
    "/Library/Caches",
    "/Library/Logs",
    "/private/var/db/diagnostics/Persist",
];

/// Reverse-DNS prefixes owned by the OS vendor. Identity checks deny these
/// outright; removing their data is the OS's job, not ours.
pub(crate) const SYSTEM_IDENTITY_PREFIXES: &[&str] = &[
    "com.apple.",
    "com.openssh.",
    "org.cups.",
];

/// Bundle identifiers of products whose support data must never be offered
/// for cleanup. Matching is exact or prefix, never fuzzy.
pub(crate) const PROTECTED_IDENTITIES: &[&str] = &[
    // VPN / network security
    "com.tailscale.ipn",
    "com.wireguard.macos",
    "com.nordvpn.macos",
    "com.expressvpn.ExpressVPN",
    "com.cisco.anyconnect",
    "net.openvpn.connect",
    // Security tooling
    "com.1password.1password",
    "com.agilebits.onepassword7",
    "com.objective-see.lulu",
    "at.obdev.littlesnitch",
    "com.malwarebytes.mbam",
    "com.crowdstrike.falcon",
    // AI assistants
    "com.openai.chat",
    "com.anthropic.claudefordesktop",
    "com.github.copilot",
];

/// Display names of protected products, matched against launch-item labels.
pub(crate) const PROTECTED_NAMES: &[&str] = &[
    "Tailscale",
    "WireGuard",
    "NordVPN",
    "ExpressVPN",
    "AnyConnect",
    "OpenVPN",
    "1Password",
    "Little Snitch",
    "LuLu",
    "Malwarebytes",
    "CrowdStrike",
    "ChatGPT",
    "Claude",
    "Copilot",
];

/// Identities shorter than this are rejected outright: a 2-letter label
/// matched by prefix would collide with unrelated real products.
pub(crate) const MIN_IDENTITY_LEN: usize = 3;
