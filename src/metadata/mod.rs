//! Metadata store - layered key/value context for one entry
//!
//! Three fixed scopes make up the context that templates and filters see:
//!
//! - **global**: constant for the whole run
//! - **path**: rebuilt for every file or folder visited
//! - **tag**: rebuilt for every tag on the current entry
//!
//! Scopes are plain nested JSON maps so the same `KeyPath` resolver serves both
//! the name template renderer and the filter evaluator.

pub mod entry;
pub mod keypath;
pub mod plugins;

pub use entry::{describe_path, describe_tag};
pub use keypath::{KeyPath, KeyPathError, Segment};
pub use plugins::{MetadataPlugin, PLUGIN_NAMES, plugin_by_name};

use serde_json::{Map, Value};
use std::fmt;

/// Top-level scope of the metadata store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    Global,
    Path,
    Tag,
}

impl Scope {
    /// Lookup priority used by `MetadataStore::find`
    pub const ALL: [Self; 3] = [Self::Global, Self::Path, Self::Tag];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Global => "global",
            Self::Path => "path",
            Self::Tag => "tag",
        }
    }

    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|scope| scope.as_str() == key)
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Layered metadata for the entry currently being processed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataStore {
    global: Map<String, Value>,
    path: Map<String, Value>,
    tag: Map<String, Value>,
}

impl MetadataStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a single key in a scope
    pub fn add(&mut self, scope: Scope, key: impl Into<String>, value: impl Into<Value>) {
        self.scope_mut(scope).insert(key.into(), value.into());
    }

    /// Merge a whole mapping into a scope, later keys overwrite earlier ones
    pub fn add_multiple(&mut self, scope: Scope, mapping: Map<String, Value>) {
        self.scope_mut(scope).extend(mapping);
    }

    /// Drop every key of a scope
    pub fn clear(&mut self, scope: Scope) {
        self.scope_mut(scope).clear();
    }

    /// Look up a top-level key in global, then path, then tag scope
    #[must_use]
    pub fn find(&self, key: &str) -> Option<&Value> {
        Scope::ALL
            .into_iter()
            .find_map(|scope| self.scope(scope).get(key))
    }

    /// Read access to a whole scope
    #[must_use]
    pub fn scope(&self, scope: Scope) -> &Map<String, Value> {
        match scope {
            Scope::Global => &self.global,
            Scope::Path => &self.path,
            Scope::Tag => &self.tag,
        }
    }

    fn scope_mut(&mut self, scope: Scope) -> &mut Map<String, Value> {
        match scope {
            Scope::Global => &mut self.global,
            Scope::Path => &mut self.path,
            Scope::Tag => &mut self.tag,
        }
    }

    /// Resolve a key path against the store.
    ///
    /// A path starting with a scope name (`tag.name`) is looked up in that
    /// scope; any other path (`basename`) starts from `find`.
    #[must_use]
    pub fn resolve(&self, path: &KeyPath) -> Option<&Value> {
        let (first, rest) = path.segments().split_first()?;
        let Segment::Key(head) = first else {
            return None;
        };

        if let Some(scope) = Scope::from_key(head) {
            let Some((second, rest)) = rest.split_first() else {
                return None;
            };
            let start = match second {
                Segment::Key(key) => self.scope(scope).get(key)?,
                Segment::Index(index) => self.scope(scope).get(&index.to_string())?,
            };
            return KeyPath::walk(rest, start);
        }

        KeyPath::walk(rest, self.find(head)?)
    }

    /// Create `value` at `path` unless something already resolves there.
    ///
    /// Paths without a scope prefix land in path scope, so they are dropped
    /// with the entry. Returns whether a value was inserted.
    ///
    /// # Errors
    /// Returns `KeyPathError::NotInsertable` for index segments or when an
    /// intermediate value is not an object.
    pub fn insert_default(&mut self, path: &KeyPath, value: Value) -> Result<bool, KeyPathError> {
        if self.resolve(path).is_some() {
            return Ok(false);
        }

        let mut keys = Vec::with_capacity(path.segments().len());
        for segment in path.segments() {
            match segment {
                Segment::Key(key) => keys.push(key.as_str()),
                Segment::Index(_) => {
                    return Err(KeyPathError::NotInsertable(path.to_string()));
                }
            }
        }

        let (scope, keys) = match keys.split_first() {
            Some((head, rest)) if !rest.is_empty() => match Scope::from_key(head) {
                Some(scope) => (scope, rest),
                None => (Scope::Path, keys.as_slice()),
            },
            _ => (Scope::Path, keys.as_slice()),
        };

        let Some((last, parents)) = keys.split_last() else {
            return Err(KeyPathError::NotInsertable(path.to_string()));
        };
        let mut map = self.scope_mut(scope);
        for key in parents {
            map = map
                .entry((*key).to_string())
                .or_insert_with(|| Value::Object(Map::new()))
                .as_object_mut()
                .ok_or_else(|| KeyPathError::NotInsertable(path.to_string()))?;
        }
        map.insert((*last).to_string(), value);
        Ok(true)
    }

    /// Every leaf key currently available, as dotted paths
    #[must_use]
    pub fn available_keys(&self) -> Vec<String> {
        let mut out = Vec::new();
        for scope in Scope::ALL {
            flatten_keys(scope.as_str(), self.scope(scope), &mut out);
        }
        out
    }

    /// The whole store as one nested object keyed by scope name
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut root = Map::new();
        for scope in Scope::ALL {
            root.insert(scope.as_str().to_string(), Value::Object(self.scope(scope).clone()));
        }
        Value::Object(root)
    }
}

fn flatten_keys(prefix: &str, map: &Map<String, Value>, out: &mut Vec<String>) {
    for (key, value) in map {
        let path = format!("{prefix}.{key}");
        match value {
            Value::Object(inner) if !inner.is_empty() => flatten_keys(&path, inner, out),
            _ => out.push(path),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn kp(s: &str) -> KeyPath {
        KeyPath::parse(s).unwrap()
    }

    #[test]
    fn test_find_priority_global_path_tag() {
        let mut store = MetadataStore::new();
        store.add(Scope::Tag, "name", "from-tag");
        assert_eq!(store.find("name"), Some(&json!("from-tag")));
        store.add(Scope::Path, "name", "from-path");
        assert_eq!(store.find("name"), Some(&json!("from-path")));
        store.add(Scope::Global, "name", "from-global");
        assert_eq!(store.find("name"), Some(&json!("from-global")));
        assert_eq!(store.find("missing"), None);
    }

    #[test]
    fn test_clear_resets_only_one_scope() {
        let mut store = MetadataStore::new();
        store.add(Scope::Path, "basename", "a.jpg");
        store.add(Scope::Tag, "name", "trip");
        store.clear(Scope::Tag);
        assert!(store.scope(Scope::Tag).is_empty());
        assert_eq!(store.scope(Scope::Path).len(), 1);
    }

    #[test]
    fn test_add_multiple_overwrites() {
        let mut store = MetadataStore::new();
        store.add(Scope::Path, "ext", "png");
        let mut mapping = Map::new();
        mapping.insert("ext".into(), json!("jpg"));
        mapping.insert("basename".into(), json!("x.jpg"));
        store.add_multiple(Scope::Path, mapping);
        assert_eq!(store.find("ext"), Some(&json!("jpg")));
        assert_eq!(store.scope(Scope::Path).len(), 2);
    }

    #[test]
    fn test_resolve_scoped_and_unscoped() {
        let mut store = MetadataStore::new();
        store.add(Scope::Tag, "as-folders", "a/b");
        store.add(Scope::Path, "hierarchy", json!(["2012", "trip"]));
        assert_eq!(store.resolve(&kp("tag.as-folders")), Some(&json!("a/b")));
        assert_eq!(store.resolve(&kp("tag[as-folders]")), Some(&json!("a/b")));
        assert_eq!(store.resolve(&kp("hierarchy[1]")), Some(&json!("trip")));
        assert_eq!(store.resolve(&kp("path.nonexistent")), None);
        assert_eq!(store.resolve(&kp("tag")), None);
    }

    #[test]
    fn test_insert_default_only_when_missing() {
        let mut store = MetadataStore::new();
        store.add(Scope::Path, "basename", "x");
        assert!(!store.insert_default(&kp("path.basename"), json!("y")).unwrap());
        assert!(store.insert_default(&kp("path.exif.model"), json!("unknown")).unwrap());
        assert_eq!(store.resolve(&kp("path.exif.model")), Some(&json!("unknown")));
        assert!(store.insert_default(&kp("camera"), json!("none")).unwrap());
        assert_eq!(store.scope(Scope::Path).get("camera"), Some(&json!("none")));
        store.clear(Scope::Path);
        assert_eq!(store.resolve(&kp("camera")), None);
        assert!(matches!(
            store.insert_default(&kp("path.list[0]"), json!(1)),
            Err(KeyPathError::NotInsertable(_))
        ));
    }

    #[test]
    fn test_available_keys_are_flattened() {
        let mut store = MetadataStore::new();
        store.add(Scope::Global, "dst", "/links");
        store.add(Scope::Path, "stat", json!({"size": 3}));
        let keys = store.available_keys();
        assert_eq!(keys, vec!["global.dst".to_string(), "path.stat.size".to_string()]);
    }
}
