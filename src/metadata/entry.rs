//! Path-scope and tag-scope population for one entry

use std::path::{Component, Path};

use serde_json::{Map, Value, json};

use crate::tags::Tag;

/// Hierarchy string used when an entry has no ancestors below the scan root
pub const ROOT_TOKEN: &str = "root";

/// Build the path scope for `path`, found while scanning `root`.
///
/// Keys:
/// - `hierarchy`: ancestor directory names below `root`, nearest last
/// - `parents`: the same names nearest first, so `parents[0]` is the direct parent
/// - `hierarchy-string`: `hierarchy` joined by `separator`, or `root` when empty
/// - `basename`, `ext` (lowercased, empty for folders), `source`, `kind`
#[must_use]
pub fn describe_path(root: &Path, path: &Path, is_dir: bool, separator: &str) -> Map<String, Value> {
    let hierarchy: Vec<String> = path
        .parent()
        .and_then(|parent| parent.strip_prefix(root).ok())
        .map(|relative| {
            relative
                .components()
                .filter_map(|c| match c {
                    Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default();

    let hierarchy_string = if hierarchy.is_empty() {
        ROOT_TOKEN.to_string()
    } else {
        hierarchy.join(separator)
    };

    let basename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let ext = if is_dir {
        String::new()
    } else {
        basename
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_lowercase())
            .unwrap_or_default()
    };

    let parents: Vec<String> = hierarchy.iter().rev().cloned().collect();

    let mut map = Map::new();
    map.insert("hierarchy".into(), json!(hierarchy));
    map.insert("parents".into(), json!(parents));
    map.insert("hierarchy-string".into(), Value::String(hierarchy_string));
    map.insert("basename".into(), Value::String(basename));
    map.insert("ext".into(), Value::String(ext));
    map.insert("source".into(), Value::String(path.to_string_lossy().into_owned()));
    map.insert(
        "kind".into(),
        Value::String(if is_dir { "folder" } else { "file" }.into()),
    );
    map
}

/// Build the tag scope for one tag: `name`, `param`, `params`, `as-folders`
#[must_use]
pub fn describe_tag(tag: &Tag, subtag_separator: char) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert("name".into(), Value::String(tag.name.clone()));
    map.insert(
        "param".into(),
        Value::String(tag.params.clone().unwrap_or_default()),
    );
    map.insert("params".into(), json!(tag.param_list()));
    map.insert(
        "as-folders".into(),
        Value::String(tag.as_folders(subtag_separator)),
    );
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_nested_file() {
        let root = PathBuf::from("/src");
        let map = describe_path(&root, &root.join("2012 #trip/day 1/photo #sun.JPG"), false, "_");
        assert_eq!(map["hierarchy"], json!(["2012 #trip", "day 1"]));
        assert_eq!(map["parents"], json!(["day 1", "2012 #trip"]));
        assert_eq!(map["hierarchy-string"], json!("2012 #trip_day 1"));
        assert_eq!(map["basename"], json!("photo #sun.JPG"));
        assert_eq!(map["ext"], json!("jpg"));
        assert_eq!(map["kind"], json!("file"));
    }

    #[test]
    fn test_folder_directly_under_root() {
        let root = PathBuf::from("/src");
        let map = describe_path(&root, &root.join("2012 #trip"), true, "_");
        assert_eq!(map["hierarchy"], json!([]));
        assert_eq!(map["hierarchy-string"], json!(ROOT_TOKEN));
        assert_eq!(map["ext"], json!(""));
        assert_eq!(map["kind"], json!("folder"));
    }

    #[test]
    fn test_no_extension() {
        let root = PathBuf::from("/src");
        let map = describe_path(&root, &root.join("notes #todo"), false, "_");
        assert_eq!(map["ext"], json!(""));
    }

    #[test]
    fn test_tag_scope() {
        let map = describe_tag(&Tag::new("a-b", Some("1,2".into())), '-');
        assert_eq!(map["name"], json!("a-b"));
        assert_eq!(map["param"], json!("1,2"));
        assert_eq!(map["params"], json!(["1", "2"]));
        assert_eq!(map["as-folders"], json!(format!("a{}b", std::path::MAIN_SEPARATOR)));
    }
}
