//! Cleanup command - remove dead links and empty folders from a link tree

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use walkdir::WalkDir;

use crate::TaggoError;
use crate::walk::WalkError;

type Result<T> = std::result::Result<T, TaggoError>;

/// What a cleanup removed (or would remove in dry-run mode)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupSummary {
    pub dead_links: Vec<PathBuf>,
    pub empty_dirs: Vec<PathBuf>,
}

/// Execute the cleanup command
///
/// Every symlink below `dst` whose target, resolved relative to the link's
/// own folder, no longer exists is removed. Folders left empty are pruned
/// afterwards; `dst` itself and symlinks to folders are never pruned. A dry
/// run only reports dead links.
///
/// # Errors
/// Returns an error if `dst` is missing or not a directory, or if a removal fails.
pub fn execute(dst: &Path, dry_run: bool) -> Result<CleanupSummary> {
    let meta = fs::metadata(dst).map_err(|_| TaggoError::PathNotFound(dst.to_path_buf()))?;
    if !meta.is_dir() {
        return Err(TaggoError::DestinationNotDirectory(dst.to_path_buf()));
    }

    let mut summary = CleanupSummary {
        dead_links: dead_links(dst)?,
        empty_dirs: Vec::new(),
    };

    for link in &summary.dead_links {
        if dry_run {
            info!(link = %link.display(), "would remove dead link");
        } else {
            fs::remove_file(link)?;
            info!(link = %link.display(), "removed dead link");
        }
    }

    if !dry_run {
        summary.empty_dirs = prune_empty_dirs(dst)?;
    }
    Ok(summary)
}

fn dead_links(root: &Path) -> Result<Vec<PathBuf>> {
    let mut dead = Vec::new();
    for entry in WalkDir::new(root).min_depth(1).follow_links(false).sort_by_file_name() {
        let entry = entry.map_err(WalkError::from)?;
        if !entry.path_is_symlink() {
            continue;
        }
        let target = fs::read_link(entry.path())?;
        let base = entry.path().parent().unwrap_or(root);
        let resolved = base.join(&target);
        // `exists` follows the whole chain, a link to a dead link is dead too
        let alive = resolved.exists();
        debug!(
            link = %entry.path().display(),
            target = %target.display(),
            alive,
            "checked link"
        );
        if !alive {
            dead.push(entry.into_path());
        }
    }
    Ok(dead)
}

/// Remove every empty folder below `root`, deepest first
fn prune_empty_dirs(root: &Path) -> Result<Vec<PathBuf>> {
    let mut removed = Vec::new();
    for entry in WalkDir::new(root)
        .min_depth(1)
        .follow_links(false)
        .contents_first(true)
        .sort_by_file_name()
    {
        let entry = entry.map_err(WalkError::from)?;
        // Symlinked folders report a symlink file type and are left alone
        if !entry.file_type().is_dir() {
            continue;
        }
        if fs::read_dir(entry.path())?.next().is_none() {
            fs::remove_dir(entry.path())?;
            info!(dir = %entry.path().display(), "removed empty folder");
            removed.push(entry.into_path());
        }
    }
    Ok(removed)
}
