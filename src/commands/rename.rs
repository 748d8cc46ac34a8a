//! Rename command - rename a tag in file and folder names

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::TaggoError;
use crate::tags::{TagError, TagSyntax};
use crate::walk::WalkError;

type Result<T> = std::result::Result<T, TaggoError>;

/// Paths renamed (or planned) and paths left alone because the new name was taken
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenameSummary {
    pub renamed: Vec<(PathBuf, PathBuf)>,
    pub blocked: Vec<PathBuf>,
}

/// Execute the rename command
///
/// Both names are validated before anything is touched. Matching paths are
/// renamed longest first, so children move before the folders holding them.
///
/// # Errors
/// Returns an error for invalid or equal tag names, a missing `src`, or a
/// failed rename.
pub fn execute(
    src: &Path,
    original: &str,
    new: &str,
    syntax: &TagSyntax,
    dry_run: bool,
) -> Result<RenameSummary> {
    let old_tag = syntax.validate_name(original)?;
    let new_tag = syntax.validate_name(new)?;
    if old_tag == new_tag {
        return Err(TagError::SameTag(old_tag).into());
    }
    if fs::symlink_metadata(src).is_err() {
        return Err(TaggoError::PathNotFound(src.to_path_buf()));
    }
    debug!(src = %src.display(), from = %old_tag, to = %new_tag, "renaming tag");

    let mut summary = RenameSummary::default();
    for path in collect(src, original, syntax)? {
        let Some(name) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            continue;
        };
        let target = path.with_file_name(syntax.replace_tag(&name, original, new));

        if fs::symlink_metadata(&target).is_ok() {
            warn!(from = %path.display(), to = %target.display(), "target exists, not renaming");
            summary.blocked.push(path);
            continue;
        }
        if dry_run {
            info!(from = %path.display(), to = %target.display(), "would rename");
        } else {
            fs::rename(&path, &target)?;
            info!(from = %path.display(), to = %target.display(), "renamed");
        }
        summary.renamed.push((path, target));
    }
    Ok(summary)
}

/// Every path below `src` whose own name carries `tag`, longest path first
fn collect(src: &Path, tag: &str, syntax: &TagSyntax) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    for entry in WalkDir::new(src).min_depth(1).follow_links(false) {
        let entry = entry.map_err(WalkError::from)?;
        let carries_tag = {
            let name = entry.file_name().to_string_lossy();
            syntax.may_contain_tags(&name) && syntax.hashtags_in(&name).iter().any(|t| t == tag)
        };
        if carries_tag {
            found.push(entry.into_path());
        }
    }
    found.sort_by(|a, b| {
        let (a_len, b_len) = (a.as_os_str().len(), b.as_os_str().len());
        b_len.cmp(&a_len).then_with(|| a.cmp(b))
    });
    Ok(found)
}
