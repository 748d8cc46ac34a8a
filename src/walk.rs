//! Deterministic pre-order walk over a source tree
//!
//! `TreeWalk` yields one `DirVisit` per directory, parents before children and
//! siblings sorted by name. Hidden entries and the link root are excluded by a
//! pure predicate over the walk instead of pruning lists in place.

use std::path::{Path, PathBuf};

use thiserror::Error;
use walkdir::{DirEntry, WalkDir};

/// Errors produced while walking a tree
#[derive(Debug, Error)]
pub enum WalkError {
    /// A directory could not be read
    #[error("Failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        depth: usize,
        #[source]
        source: walkdir::Error,
    },
}

impl From<walkdir::Error> for WalkError {
    fn from(source: walkdir::Error) -> Self {
        Self::Read {
            path: source.path().map(Path::to_path_buf).unwrap_or_default(),
            depth: source.depth(),
            source,
        }
    }
}

impl WalkError {
    /// True if the failure concerns the walk root itself
    #[must_use]
    pub const fn is_root(&self) -> bool {
        match self {
            Self::Read { depth, .. } => *depth == 0,
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::Read { path, .. } => path,
        }
    }
}

/// Which parts of the tree a walk leaves out
#[derive(Debug, Clone, Default)]
pub struct WalkPolicy {
    /// Skip dot-files and dot-directories with their subtrees
    pub skip_hidden: bool,
    /// Subtree never entered, typically the link root
    pub exclude: Option<PathBuf>,
}

impl WalkPolicy {
    /// True if `entry` should be part of the walk
    #[must_use]
    pub fn admits(&self, entry: &DirEntry) -> bool {
        if entry.depth() == 0 {
            return true;
        }
        if self.skip_hidden && is_hidden(entry) {
            return false;
        }
        self.exclude.as_deref() != Some(entry.path())
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.file_name().to_str().is_some_and(|name| name.starts_with('.'))
}

/// One directory of the walk with the files directly inside it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirVisit {
    pub dir: PathBuf,
    /// Distance from the walk root, 0 for the root itself
    pub depth: usize,
    /// Regular files and symlinks to files, sorted by name
    pub files: Vec<PathBuf>,
}

type EntryFilter = Box<dyn FnMut(&DirEntry) -> bool>;

/// Iterator over the directories of a tree in pre-order
pub struct TreeWalk {
    policy: WalkPolicy,
    dirs: walkdir::FilterEntry<walkdir::IntoIter, EntryFilter>,
}

impl TreeWalk {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, policy: WalkPolicy) -> Self {
        let dir_policy = policy.clone();
        let filter: EntryFilter =
            Box::new(move |entry: &DirEntry| entry.file_type().is_dir() && dir_policy.admits(entry));
        let dirs = WalkDir::new(root.into())
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(filter);
        Self { policy, dirs }
    }

    fn files_in(&self, dir: &Path) -> Result<Vec<PathBuf>, WalkError> {
        let mut files = Vec::new();
        for entry in WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .follow_links(false)
            .sort_by_file_name()
        {
            let entry = entry.map_err(WalkError::from)?;
            if !self.policy.admits(&entry) {
                continue;
            }
            let file_type = entry.file_type();
            // Symlinks count as files only when they resolve to one
            if file_type.is_file() || (file_type.is_symlink() && entry.path().is_file()) {
                files.push(entry.into_path());
            }
        }
        Ok(files)
    }
}

impl Iterator for TreeWalk {
    type Item = Result<DirVisit, WalkError>;

    fn next(&mut self) -> Option<Self::Item> {
        let entry = match self.dirs.next()? {
            Ok(entry) => entry,
            Err(e) => return Some(Err(e.into())),
        };
        let depth = entry.depth();
        let dir = entry.into_path();
        Some(self.files_in(&dir).map(|files| DirVisit { dir, depth, files }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestTree;

    fn layout() -> TestTree {
        let tree = TestTree::new();
        tree.file("src/b #x.jpg");
        tree.file("src/a.txt");
        tree.file("src/2012 #trip/photo #sun.jpg");
        tree.file("src/.hidden #h/inside #y.jpg");
        tree.file("src/.dot #z");
        tree.file("src/links/trip/old");
        tree
    }

    fn names(visit: &DirVisit) -> Vec<String> {
        visit
            .files
            .iter()
            .filter_map(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_pre_order_sorted() {
        let tree = layout();
        let visits: Vec<_> = TreeWalk::new(tree.join("src"), WalkPolicy::default())
            .collect::<Result<_, _>>()
            .unwrap();
        let dirs: Vec<_> = visits.iter().map(|v| v.dir.clone()).collect();
        assert_eq!(
            dirs,
            vec![
                tree.join("src"),
                tree.join("src/.hidden #h"),
                tree.join("src/2012 #trip"),
                tree.join("src/links"),
                tree.join("src/links/trip"),
            ]
        );
        assert_eq!(names(&visits[0]), [".dot #z", "a.txt", "b #x.jpg"]);
        assert_eq!(visits[0].depth, 0);
        assert_eq!(visits[2].depth, 1);
    }

    #[test]
    fn test_policy_excludes_hidden_and_link_root() {
        let tree = layout();
        let policy = WalkPolicy {
            skip_hidden: true,
            exclude: Some(tree.join("src/links")),
        };
        let visits: Vec<_> = TreeWalk::new(tree.join("src"), policy)
            .collect::<Result<_, _>>()
            .unwrap();
        let dirs: Vec<_> = visits.iter().map(|v| v.dir.clone()).collect();
        assert_eq!(dirs, vec![tree.join("src"), tree.join("src/2012 #trip")]);
        assert_eq!(names(&visits[0]), ["a.txt", "b #x.jpg"]);
    }

    #[test]
    fn test_symlinks_to_dirs_are_not_descended() {
        let tree = layout();
        tree.symlink("src/alias #loop", "2012 #trip");
        tree.symlink("src/pointer #p.jpg", "b #x.jpg");
        let visits: Vec<_> = TreeWalk::new(tree.join("src"), WalkPolicy::default())
            .collect::<Result<_, _>>()
            .unwrap();
        assert!(visits.iter().all(|v| !v.dir.ends_with("alias #loop")));
        assert!(names(&visits[0]).contains(&"pointer #p.jpg".to_string()));
        assert!(!names(&visits[0]).contains(&"alias #loop".to_string()));
    }

    #[test]
    fn test_missing_root_is_a_root_error() {
        let tree = TestTree::new();
        let err = TreeWalk::new(tree.join("nope"), WalkPolicy::default())
            .next()
            .unwrap()
            .unwrap_err();
        assert!(err.is_root());
        assert_eq!(err.path(), tree.join("nope"));
    }
}
