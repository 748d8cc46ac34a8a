//! Info command - inventory of the tags used below a source

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Serialize;
use tracing::warn;

use crate::TaggoError;
use crate::tags::TagSyntax;
use crate::walk::{TreeWalk, WalkPolicy};

type Result<T> = std::result::Result<T, TaggoError>;

/// Distinct tags with the number of entries carrying each, split by kind
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TagInventory {
    pub folders: BTreeMap<String, usize>,
    pub files: BTreeMap<String, usize>,
}

impl TagInventory {
    fn count(map: &mut BTreeMap<String, usize>, syntax: &TagSyntax, path: &Path) {
        let Some(name) = path.file_name().map(|n| n.to_string_lossy()) else {
            return;
        };
        if !syntax.may_contain_tags(&name) {
            return;
        }
        for tag in syntax.tags_in(&name) {
            *map.entry(tag.name).or_default() += 1;
        }
    }
}

/// Execute the info command
///
/// # Errors
/// Returns an error if `src` is missing or cannot be read.
pub fn execute(src: &Path, syntax: &TagSyntax, policy: WalkPolicy) -> Result<TagInventory> {
    let meta = fs::metadata(src).map_err(|_| TaggoError::PathNotFound(src.to_path_buf()))?;
    let mut inventory = TagInventory::default();

    if meta.is_file() {
        TagInventory::count(&mut inventory.files, syntax, src);
        return Ok(inventory);
    }

    for visit in TreeWalk::new(src, policy) {
        let visit = match visit {
            Ok(visit) => visit,
            Err(e) if !e.is_root() => {
                warn!(path = %e.path().display(), error = %e, "skipping unreadable directory");
                continue;
            }
            Err(e) => return Err(e.into()),
        };
        // only folders below the scan root count
        if visit.depth > 0 {
            TagInventory::count(&mut inventory.folders, syntax, &visit.dir);
        }
        for file in &visit.files {
            TagInventory::count(&mut inventory.files, syntax, file);
        }
    }
    Ok(inventory)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestTree;

    #[test]
    fn test_folder_and_file_tags_are_separate() {
        let tree = TestTree::new();
        tree.file("src/2012 #trip/a #sun #trip.jpg");
        tree.file("src/2012 #trip/b #sun.jpg");
        tree.dir("src/empty #archive");

        let inv = execute(&tree.join("src"), &TagSyntax::default(), WalkPolicy::default()).unwrap();
        assert_eq!(
            inv.folders.into_iter().collect::<Vec<_>>(),
            vec![("archive".to_string(), 1), ("trip".to_string(), 1)]
        );
        assert_eq!(
            inv.files.into_iter().collect::<Vec<_>>(),
            vec![("sun".to_string(), 2), ("trip".to_string(), 1)]
        );
    }

    #[test]
    fn test_scan_root_name_is_not_counted() {
        let tree = TestTree::new();
        tree.file("photos #root/2012 #trip/a #sun.jpg");
        let inv = execute(&tree.join("photos #root"), &TagSyntax::default(), WalkPolicy::default()).unwrap();
        assert!(!inv.folders.contains_key("root"));
        assert!(inv.folders.contains_key("trip"));
    }

    #[test]
    fn test_single_file() {
        let tree = TestTree::new();
        let file = tree.file("src/#x folder/a #y.txt");
        let inv = execute(&file, &TagSyntax::default(), WalkPolicy::default()).unwrap();
        assert!(inv.folders.is_empty());
        assert_eq!(inv.files.len(), 1);
    }
}
