//! Output formatting for CLI display
//!
//! Results go to stdout through these helpers; diagnostics go through
//! `tracing`. Quiet mode strips decoration so output can be piped.

use std::collections::BTreeMap;
use std::path::Path;

use colored::Colorize;

use crate::commands::{CleanupSummary, RenameSummary, RunSummary, TagInventory};

/// Format a tag with usage count
#[must_use]
pub fn tag_with_count(tag: &str, count: usize, quiet: bool) -> String {
    if quiet {
        tag.to_string()
    } else {
        format!("  {} ({count})", tag.cyan())
    }
}

/// Format a section heading
#[must_use]
pub fn heading(title: &str) -> String {
    title.bold().to_string()
}

/// Color a path based on existence (green if it resolves, red if dangling)
#[must_use]
pub fn colorize_path(path: &Path) -> String {
    let formatted = path.display().to_string();
    if path.exists() {
        formatted.green().to_string()
    } else {
        formatted.red().to_string()
    }
}

fn tag_block(title: &str, tags: &BTreeMap<String, usize>, quiet: bool) -> Vec<String> {
    let mut lines = Vec::with_capacity(tags.len() + 1);
    if !quiet {
        lines.push(heading(title));
        if tags.is_empty() {
            lines.push("  (none)".dimmed().to_string());
        }
    }
    lines.extend(tags.iter().map(|(tag, count)| tag_with_count(tag, *count, quiet)));
    lines
}

/// Lines printed by `info`
#[must_use]
pub fn inventory(inventory: &TagInventory, quiet: bool) -> Vec<String> {
    let mut lines = tag_block("Folder tags:", &inventory.folders, quiet);
    if !quiet {
        lines.push(String::new());
    }
    lines.extend(tag_block("File tags:", &inventory.files, quiet));
    lines
}

/// One-line summary of a run
#[must_use]
pub fn run_summary(summary: &RunSummary, dry_run: bool) -> String {
    let verb = if dry_run { "would create" } else { "created" };
    format!(
        "{} tagged entries: {} {verb}, {} replaced, {} unchanged, {} kept, {} filtered",
        summary.entries,
        summary.created.to_string().green(),
        summary.replaced.to_string().yellow(),
        summary.unchanged,
        summary.kept,
        summary.filtered,
    )
}

/// Lines printed by `cleanup`
#[must_use]
pub fn cleanup_summary(summary: &CleanupSummary, dry_run: bool, quiet: bool) -> Vec<String> {
    if quiet {
        return summary
            .dead_links
            .iter()
            .map(|p| p.display().to_string())
            .collect();
    }
    let mut lines: Vec<String> = summary
        .dead_links
        .iter()
        .map(|p| format!("  - {}", colorize_path(p)))
        .collect();
    let verb = if dry_run { "Would remove" } else { "Removed" };
    lines.push(format!(
        "{verb} {} dead link(s) and {} empty folder(s)",
        summary.dead_links.len(),
        summary.empty_dirs.len()
    ));
    lines
}

/// Lines printed by `rename`
#[must_use]
pub fn rename_summary(summary: &RenameSummary, dry_run: bool, quiet: bool) -> Vec<String> {
    let mut lines: Vec<String> = summary
        .renamed
        .iter()
        .map(|(from, to)| {
            if quiet {
                to.display().to_string()
            } else {
                format!("  {} -> {}", from.display(), to.display().to_string().green())
            }
        })
        .collect();
    if !quiet {
        let verb = if dry_run { "Would rename" } else { "Renamed" };
        lines.push(format!("{verb} {} path(s)", summary.renamed.len()));
        if !summary.blocked.is_empty() {
            lines.push(
                format!("Skipped {} path(s) whose new name already exists", summary.blocked.len())
                    .yellow()
                    .to_string(),
            );
        }
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quiet_inventory_is_bare_names() {
        let mut inv = TagInventory::default();
        inv.folders.insert("trip".into(), 2);
        inv.files.insert("sun".into(), 1);
        assert_eq!(inventory(&inv, true), ["trip", "sun"]);
    }

    #[test]
    fn test_inventory_mentions_counts() {
        colored::control::set_override(false);
        let mut inv = TagInventory::default();
        inv.files.insert("sun".into(), 3);
        let lines = inventory(&inv, false);
        assert!(lines.contains(&"  sun (3)".to_string()));
        assert!(lines.contains(&"  (none)".to_string()));
    }
}
