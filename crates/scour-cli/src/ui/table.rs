//! Candidate table rendering.

use comfy_table::{Cell, ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use scour_core::scanner::{ArtifactKind, CandidateArtifact};
use scour_core::Decision;

/// Render the candidate list as a table string.
pub fn render_candidates(candidates: &[CandidateArtifact]) -> String {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(["PATH", "KIND", "SIZE", "AGE", "STATE", "PICK"]);

    for c in candidates {
        let kind = match c.kind {
            ArtifactKind::File => "file",
            ArtifactKind::Directory => "dir",
            ArtifactKind::Bundle => "bundle",
        };
        let size = c.size_bytes.map_or_else(|| "?".to_string(), human_bytes);
        let age = c
            .age_days
            .map_or_else(|| "?".to_string(), |d| format!("{d}d"));
        let state = match &c.protection {
            Decision::Allow => "ok".to_string(),
            Decision::Deny(reason) => format!("protected: {reason}"),
        };
        let pick = if c.selected_by_default { "*" } else { "" };

        table.add_row([
            Cell::new(c.path.display()),
            Cell::new(kind),
            Cell::new(size),
            Cell::new(age),
            Cell::new(state),
            Cell::new(pick),
        ]);
    }

    table.to_string()
}

/// Human-readable byte count.
pub fn human_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn human_bytes_scales() {
        assert_eq!(human_bytes(0), "0 B");
        assert_eq!(human_bytes(512), "512 B");
        assert_eq!(human_bytes(2048), "2.0 KB");
        assert_eq!(human_bytes(5 * 1024 * 1024), "5.0 MB");
    }
}
