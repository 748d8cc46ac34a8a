//! Name template renderer
//!
//! A template such as `{tag.as-folders}/{path.hierarchy-string} - {path.basename}`
//! is parsed once into literal text and key-path placeholders, then rendered
//! against the metadata store for every tag of every entry. `{{` and `}}`
//! produce literal braces and an empty `{}` renders as nothing.

use std::fmt;
use std::path::MAIN_SEPARATOR;

use serde_json::Value;
use thiserror::Error;

use crate::metadata::{KeyPath, KeyPathError, MetadataStore};

/// Errors produced while parsing or rendering a name template
#[derive(Debug, Error)]
pub enum TemplateError {
    /// `{` without a matching `}`
    #[error("Unclosed placeholder in template '{template}'")]
    Unclosed { template: String },

    /// `}` that neither closes a placeholder nor is doubled
    #[error("Unmatched '}}' in template '{template}'")]
    UnmatchedBrace { template: String },

    /// Placeholder is not a valid key path
    #[error("Invalid placeholder in template '{template}': {source}")]
    InvalidKey {
        template: String,
        #[source]
        source: KeyPathError,
    },

    /// Placeholder references a key the metadata store does not have
    #[error("Invalid key '{key}' in template '{template}'. Valid keys are: {}", .available.join(", "))]
    MissingKey {
        key: String,
        template: String,
        available: Vec<String>,
    },

    /// Placeholder resolves to a nested mapping
    #[error("Key '{key}' in template '{template}' is a mapping, pick one of its fields")]
    NotRenderable { key: String, template: String },

    /// Rendering produced nothing usable as a path
    #[error("Template '{template}' rendered to an empty name")]
    Empty { template: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Part {
    Literal(String),
    Key(KeyPath),
}

/// A parsed name template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameTemplate {
    source: String,
    parts: Vec<Part>,
}

impl NameTemplate {
    /// Parse a template string
    ///
    /// # Errors
    /// Returns `TemplateError` for unbalanced braces and invalid key paths.
    pub fn parse(template: &str) -> Result<Self, TemplateError> {
        let mut parts = Vec::new();
        let mut literal = String::new();
        let mut chars = template.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    literal.push('{');
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    literal.push('}');
                }
                '}' => {
                    return Err(TemplateError::UnmatchedBrace {
                        template: template.to_string(),
                    });
                }
                '{' => {
                    let mut key = String::new();
                    let mut closed = false;
                    for c in chars.by_ref() {
                        if c == '}' {
                            closed = true;
                            break;
                        }
                        key.push(c);
                    }
                    if !closed {
                        return Err(TemplateError::Unclosed {
                            template: template.to_string(),
                        });
                    }
                    // `{}` is dropped, it has nothing to expand to
                    if key.trim().is_empty() {
                        continue;
                    }
                    let key = KeyPath::parse(&key).map_err(|source| TemplateError::InvalidKey {
                        template: template.to_string(),
                        source,
                    })?;
                    if !literal.is_empty() {
                        parts.push(Part::Literal(std::mem::take(&mut literal)));
                    }
                    parts.push(Part::Key(key));
                }
                _ => literal.push(c),
            }
        }
        if !literal.is_empty() {
            parts.push(Part::Literal(literal));
        }

        Ok(Self {
            source: template.to_string(),
            parts,
        })
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Key paths referenced by the template, in order of appearance
    pub fn keys(&self) -> impl Iterator<Item = &KeyPath> {
        self.parts.iter().filter_map(|part| match part {
            Part::Key(key) => Some(key),
            Part::Literal(_) => None,
        })
    }

    /// Render against `store` into a path relative to the link root.
    ///
    /// Arrays are joined with `list_separator`. Leading path separators are
    /// stripped from the result.
    ///
    /// # Errors
    /// Returns `TemplateError::MissingKey` when a placeholder does not resolve,
    /// `NotRenderable` for mappings and `Empty` when nothing is left.
    pub fn render(&self, store: &MetadataStore, list_separator: &str) -> Result<String, TemplateError> {
        let mut out = String::new();
        for part in &self.parts {
            match part {
                Part::Literal(text) => out.push_str(text),
                Part::Key(key) => {
                    let value = store.resolve(key).ok_or_else(|| TemplateError::MissingKey {
                        key: key.to_string(),
                        template: self.source.clone(),
                        available: store.available_keys(),
                    })?;
                    let text = render_value(value, list_separator).ok_or_else(|| {
                        TemplateError::NotRenderable {
                            key: key.to_string(),
                            template: self.source.clone(),
                        }
                    })?;
                    out.push_str(&text);
                }
            }
        }

        let trimmed = out.trim_start_matches(['/', MAIN_SEPARATOR]);
        if trimmed.trim().is_empty() {
            return Err(TemplateError::Empty {
                template: self.source.clone(),
            });
        }
        Ok(trimmed.to_string())
    }
}

impl fmt::Display for NameTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn render_value(value: &Value, list_separator: &str) -> Option<String> {
    match value {
        Value::Null => Some(String::new()),
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(items) => items
            .iter()
            .map(|item| render_value(item, list_separator))
            .collect::<Option<Vec<_>>>()
            .map(|items| items.join(list_separator)),
        Value::Object(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::Scope;
    use serde_json::json;

    fn store() -> MetadataStore {
        let mut store = MetadataStore::new();
        store.add(Scope::Global, "dst", "/links");
        store.add(Scope::Path, "basename", "photo #trip.jpg");
        store.add(Scope::Path, "hierarchy", json!(["2012", "summer"]));
        store.add(Scope::Path, "stat", json!({"size": 12}));
        store.add(Scope::Tag, "as-folders", "a/b");
        store
    }

    fn render(template: &str) -> Result<String, TemplateError> {
        NameTemplate::parse(template)?.render(&store(), "_")
    }

    #[test]
    fn test_renders_scoped_and_bracketed_keys() {
        assert_eq!(
            render("{tag.as-folders}/{path.basename}").unwrap(),
            "a/b/photo #trip.jpg"
        );
        assert_eq!(render("{tag[as-folders]}").unwrap(), "a/b");
        assert_eq!(render("{basename}").unwrap(), "photo #trip.jpg");
    }

    #[test]
    fn test_value_rendering() {
        assert_eq!(render("{path.hierarchy}").unwrap(), "2012_summer");
        assert_eq!(render("{path.hierarchy[1]}").unwrap(), "summer");
        assert_eq!(render("{path.stat.size}b").unwrap(), "12b");
        assert!(matches!(
            render("{path.stat}"),
            Err(TemplateError::NotRenderable { .. })
        ));
    }

    #[test]
    fn test_escapes_and_empty_placeholders() {
        assert_eq!(render("{{x}} {}{path.basename}").unwrap(), "{x} photo #trip.jpg");
    }

    #[test]
    fn test_leading_separators_are_stripped() {
        assert_eq!(render("//{tag.as-folders}").unwrap(), "a/b");
    }

    #[test]
    fn test_missing_key_lists_available_keys() {
        let err = render("{path.nonexistent}").unwrap_err();
        match err {
            TemplateError::MissingKey { key, available, .. } => {
                assert_eq!(key, "path.nonexistent");
                assert!(available.contains(&"path.basename".to_string()));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            NameTemplate::parse("{tag.name"),
            Err(TemplateError::Unclosed { .. })
        ));
        assert!(matches!(
            NameTemplate::parse("tag}"),
            Err(TemplateError::UnmatchedBrace { .. })
        ));
        assert!(matches!(
            NameTemplate::parse("{a..b}"),
            Err(TemplateError::InvalidKey { .. })
        ));
    }

    #[test]
    fn test_empty_result_is_an_error() {
        assert!(matches!(render("/{}"), Err(TemplateError::Empty { .. })));
    }

    #[test]
    fn test_keys() {
        let template = NameTemplate::parse("{tag.name}/{path.basename}").unwrap();
        let keys: Vec<_> = template.keys().map(KeyPath::as_str).collect();
        assert_eq!(keys, ["tag.name", "path.basename"]);
    }
}
