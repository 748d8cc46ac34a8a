//! Collision resolver and link placement
//!
//! Decides what happens when a computed link path is already taken, then
//! places the link. Every decision is made the same way in dry-run mode; only
//! the filesystem calls are suppressed.

use std::fs;
use std::io;
use std::os::unix::fs::symlink;
use std::path::{Component, Path, PathBuf};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{Result, TaggoError};

/// Rule for replacing an entry that already occupies a link path
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CollisionPolicy {
    /// Replace symlinks that live inside the link tree
    #[default]
    Smart,
    /// Never replace anything
    NoOverwrite,
    /// Replace any symlink, wherever it points
    OverwriteIfSymlink,
    /// Replace anything inside the link tree
    OverwriteIfDstSame,
    /// Abort the run on the first conflicting entry
    BailIfDifferent,
}

/// What to do with one computed link
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Nothing is there yet
    Create,
    /// Remove the existing entry, then create
    Replace,
    /// The existing link already points at the wanted target
    Unchanged,
    /// Leave the existing entry alone
    Skip(String),
}

/// Outcome of placing one link, used for run summaries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Created,
    Replaced,
    Unchanged,
    Skipped,
}

/// Decide what to do with `link`, which should point at `wanted`.
///
/// `wanted` is the link text (relative to the link's parent directory).
///
/// # Errors
/// Returns `TaggoError::CollisionAbort` under `BailIfDifferent` when the entry
/// at `link` is not already the wanted link, and I/O errors from inspecting it.
pub fn resolve(
    policy: CollisionPolicy,
    link: &Path,
    link_root: &Path,
    wanted: &Path,
) -> Result<Resolution> {
    let meta = match fs::symlink_metadata(link) {
        Ok(meta) => meta,
        // A parent that is not a directory is reported when the link is placed
        Err(e) if matches!(e.kind(), io::ErrorKind::NotFound | io::ErrorKind::NotADirectory) => {
            return Ok(Resolution::Create);
        }
        Err(e) => return Err(e.into()),
    };

    let is_symlink = meta.file_type().is_symlink();
    let existing = if is_symlink {
        let raw = fs::read_link(link)?;
        if same_target(link, &raw, wanted) {
            return Ok(Resolution::Unchanged);
        }
        raw
    } else {
        link.to_path_buf()
    };

    warn!(
        link = %link.display(),
        existing = %existing.display(),
        wanted = %wanted.display(),
        ?policy,
        "link path already taken"
    );

    let in_tree = normalize(link).starts_with(normalize(link_root));
    let replace = match policy {
        CollisionPolicy::Smart => is_symlink && in_tree,
        CollisionPolicy::NoOverwrite => false,
        CollisionPolicy::OverwriteIfSymlink => is_symlink,
        CollisionPolicy::OverwriteIfDstSame => in_tree,
        CollisionPolicy::BailIfDifferent => {
            return Err(TaggoError::CollisionAbort {
                link: link.to_path_buf(),
                existing,
                wanted: wanted.to_path_buf(),
            });
        }
    };

    if !replace {
        return Ok(Resolution::Skip(format!("{policy:?} keeps existing entry")));
    }
    if meta.is_dir() {
        return Ok(Resolution::Skip("existing entry is a real directory".to_string()));
    }
    Ok(Resolution::Replace)
}

fn same_target(link: &Path, existing: &Path, wanted: &Path) -> bool {
    if existing == wanted {
        return true;
    }
    let base = link.parent().unwrap_or_else(|| Path::new(""));
    normalize(&base.join(existing)) == normalize(&base.join(wanted))
}

/// Carry out `resolution` for `link -> target`.
///
/// # Errors
/// Returns `TaggoError::LinkParentNotDirectory` when the parent path is taken
/// by something that is not a directory, and other I/O errors.
pub fn place_link(link: &Path, target: &Path, resolution: &Resolution, dry_run: bool) -> Result<Placement> {
    let placement = match resolution {
        Resolution::Unchanged => {
            debug!(link = %link.display(), "link already up to date");
            return Ok(Placement::Unchanged);
        }
        Resolution::Skip(reason) => {
            debug!(link = %link.display(), reason = %reason, "leaving existing entry");
            return Ok(Placement::Skipped);
        }
        Resolution::Create => Placement::Created,
        Resolution::Replace => Placement::Replaced,
    };

    ensure_parent(link, dry_run)?;

    if dry_run {
        info!(link = %link.display(), target = %target.display(), "would link");
        return Ok(placement);
    }

    if placement == Placement::Replaced {
        match fs::remove_file(link) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
    }

    match symlink(target, link) {
        Ok(()) => info!(link = %link.display(), target = %target.display(), "linked"),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            debug!(link = %link.display(), "link appeared concurrently, leaving it");
        }
        Err(e) => return Err(e.into()),
    }
    Ok(placement)
}

/// Create the parent directory of `link` unless it exists.
///
/// # Errors
/// Returns `TaggoError::LinkParentNotDirectory` naming the first ancestor that
/// exists but is not a directory.
pub fn ensure_parent(link: &Path, dry_run: bool) -> Result<()> {
    let Some(parent) = link.parent() else {
        return Ok(());
    };

    if let Some(blocker) = parent
        .ancestors()
        .find(|p| !p.as_os_str().is_empty() && p.exists())
        && !blocker.is_dir()
    {
        return Err(TaggoError::LinkParentNotDirectory(blocker.to_path_buf()));
    }

    if dry_run || parent.is_dir() {
        return Ok(());
    }
    debug!(dir = %parent.display(), "creating link directory");
    fs::create_dir_all(parent)?;
    Ok(())
}

/// Lexically normalize a path: drop `.` and resolve `..` without touching
/// the filesystem.
#[must_use]
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if out.file_name().is_some() {
                    out.pop();
                } else if !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Path of `target` as seen from directory `base`.
///
/// Both paths should be absolute and normalized.
#[must_use]
pub fn relative_path(target: &Path, base: &Path) -> PathBuf {
    let target: Vec<_> = target.components().collect();
    let base: Vec<_> = base.components().collect();
    let common = target
        .iter()
        .zip(&base)
        .take_while(|(a, b)| a == b)
        .count();

    let mut out = PathBuf::new();
    for _ in common..base.len() {
        out.push("..");
    }
    for component in &target[common..] {
        out.push(component.as_os_str());
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{TestTree, is_symlink};

    #[test]
    fn test_relative_path() {
        assert_eq!(
            relative_path(Path::new("/src/a/photo.jpg"), Path::new("/links/trip")),
            PathBuf::from("../../src/a/photo.jpg")
        );
        assert_eq!(
            relative_path(Path::new("/data/src/x"), Path::new("/data/links")),
            PathBuf::from("../src/x")
        );
        assert_eq!(relative_path(Path::new("/a"), Path::new("/a")), PathBuf::from("."));
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(Path::new("/a/./b/../c")), PathBuf::from("/a/c"));
        assert_eq!(normalize(Path::new("a/../../b")), PathBuf::from("../b"));
    }

    #[test]
    fn test_missing_entry_is_created() {
        let tree = TestTree::new();
        let link = tree.join("links/trip/a");
        let res = resolve(CollisionPolicy::Smart, &link, &tree.join("links"), Path::new("x")).unwrap();
        assert_eq!(res, Resolution::Create);
    }

    #[test]
    fn test_identical_link_is_unchanged_under_every_policy() {
        let tree = TestTree::new();
        let link = tree.symlink("links/trip/a", "../../src/a");
        for policy in CollisionPolicy::value_variants() {
            let res = resolve(*policy, &link, &tree.join("links"), Path::new("../../src/./a")).unwrap();
            assert_eq!(res, Resolution::Unchanged, "{policy:?}");
        }
    }

    #[test]
    fn test_policies_on_different_symlink() {
        let tree = TestTree::new();
        let root = tree.join("links");
        let link = tree.symlink("links/trip/a", "../../src/old");
        let wanted = Path::new("../../src/new");

        let res = |p| resolve(p, &link, &root, wanted);
        assert_eq!(res(CollisionPolicy::Smart).unwrap(), Resolution::Replace);
        assert!(matches!(res(CollisionPolicy::NoOverwrite).unwrap(), Resolution::Skip(_)));
        assert_eq!(res(CollisionPolicy::OverwriteIfSymlink).unwrap(), Resolution::Replace);
        assert_eq!(res(CollisionPolicy::OverwriteIfDstSame).unwrap(), Resolution::Replace);
        assert!(matches!(
            res(CollisionPolicy::BailIfDifferent),
            Err(TaggoError::CollisionAbort { .. })
        ));
    }

    #[test]
    fn test_smart_protects_regular_files_and_outside_links() {
        let tree = TestTree::new();
        let root = tree.join("links");
        let file = tree.file("links/trip/a");
        assert!(matches!(
            resolve(CollisionPolicy::Smart, &file, &root, Path::new("x")).unwrap(),
            Resolution::Skip(_)
        ));
        assert_eq!(
            resolve(CollisionPolicy::OverwriteIfDstSame, &file, &root, Path::new("x")).unwrap(),
            Resolution::Replace
        );

        let outside = tree.symlink("elsewhere/a", "somewhere");
        assert!(matches!(
            resolve(CollisionPolicy::Smart, &outside, &root, Path::new("x")).unwrap(),
            Resolution::Skip(_)
        ));
        assert_eq!(
            resolve(CollisionPolicy::OverwriteIfSymlink, &outside, &root, Path::new("x")).unwrap(),
            Resolution::Replace
        );
    }

    #[test]
    fn test_real_directory_is_never_replaced() {
        let tree = TestTree::new();
        let dir = tree.dir("links/trip/a");
        let res = resolve(CollisionPolicy::OverwriteIfDstSame, &dir, &tree.join("links"), Path::new("x"));
        assert!(matches!(res.unwrap(), Resolution::Skip(_)));
    }

    #[test]
    fn test_place_link_creates_parents_and_replaces() {
        let tree = TestTree::new();
        let target = tree.file("src/a");
        let link = tree.join("links/trip/deep/a");
        let placed = place_link(&link, &target, &Resolution::Create, false).unwrap();
        assert_eq!(placed, Placement::Created);
        assert!(is_symlink(&link));
        assert_eq!(fs::read_link(&link).unwrap(), target);

        let other = tree.file("src/b");
        place_link(&link, &other, &Resolution::Replace, false).unwrap();
        assert_eq!(fs::read_link(&link).unwrap(), other);
    }

    #[test]
    fn test_dry_run_touches_nothing() {
        let tree = TestTree::new();
        let link = tree.join("links/trip/a");
        let placed = place_link(&link, Path::new("../x"), &Resolution::Create, true).unwrap();
        assert_eq!(placed, Placement::Created);
        assert!(!tree.join("links").exists());
    }

    #[test]
    fn test_parent_that_is_a_file_is_fatal() {
        let tree = TestTree::new();
        let blocker = tree.file("links/trip");
        let err = place_link(&tree.join("links/trip/a"), Path::new("x"), &Resolution::Create, false);
        assert!(matches!(err, Err(TaggoError::LinkParentNotDirectory(p)) if p == blocker));
    }
}
