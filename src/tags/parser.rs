use std::collections::BTreeMap;
use std::path::MAIN_SEPARATOR_STR;

use regex::Regex;
use tracing::debug;

use super::error::TagError;

/// Marker character used when none is configured
pub const DEFAULT_TAG_CHAR: char = '#';

/// A tag found in a file or folder name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    /// Tag name without the marker character
    pub name: String,
    /// Raw text inside the optional `(...)` suffix
    pub params: Option<String>,
}

impl Tag {
    #[must_use]
    pub fn new(name: impl Into<String>, params: Option<String>) -> Self {
        Self {
            name: name.into(),
            params,
        }
    }

    /// Parameter string split on commas, empty when the tag has none
    #[must_use]
    pub fn param_list(&self) -> Vec<String> {
        self.params
            .as_deref()
            .map(|p| p.split(',').map(str::to_string).collect())
            .unwrap_or_default()
    }

    /// Tag name with every sub-path separator turned into a path separator.
    ///
    /// `a-b` with separator `-` becomes `a/b`.
    #[must_use]
    pub fn as_folders(&self, separator: char) -> String {
        self.name.replace(separator, MAIN_SEPARATOR_STR)
    }
}

/// Compiled tag grammar for one marker character
#[derive(Debug, Clone)]
pub struct TagSyntax {
    tag_char: char,
    find: Regex,
    full: Regex,
}

impl Default for TagSyntax {
    fn default() -> Self {
        // The default marker always yields a valid grammar
        Self::compile(DEFAULT_TAG_CHAR).unwrap_or_else(|_| unreachable!())
    }
}

impl TagSyntax {
    /// Build the grammar for a marker character.
    ///
    /// # Errors
    /// Returns `TagError::InvalidTagChar` for word characters, whitespace and the
    /// characters that terminate a tag name.
    pub fn new(tag_char: char) -> Result<Self, TagError> {
        if tag_char.is_alphanumeric()
            || tag_char == '_'
            || tag_char.is_whitespace()
            || matches!(tag_char, '.' | ',' | '(' | ')')
        {
            return Err(TagError::InvalidTagChar(tag_char));
        }
        Self::compile(tag_char)
    }

    fn compile(tag_char: char) -> Result<Self, TagError> {
        let body = format!(
            r"\B{}([^\s.,()]+)(?:\((.+?)\))?",
            regex::escape(&tag_char.to_string())
        );
        let find = Regex::new(&body).map_err(|e| TagError::Grammar {
            pattern: body.clone(),
            reason: e.to_string(),
        })?;
        let anchored = format!("^(?:{body})$");
        let full = Regex::new(&anchored).map_err(|e| TagError::Grammar {
            pattern: anchored.clone(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            tag_char,
            find,
            full,
        })
    }

    #[must_use]
    pub const fn tag_char(&self) -> char {
        self.tag_char
    }

    /// Cheap pre-check before running the grammar
    #[must_use]
    pub fn may_contain_tags(&self, name: &str) -> bool {
        name.contains(self.tag_char)
    }

    /// Distinct tags in `name`, ordered by tag name.
    ///
    /// Tags are keyed by name: when the same name shows up twice with different
    /// parameters, the last occurrence wins.
    #[must_use]
    pub fn tags_in(&self, name: &str) -> Vec<Tag> {
        let mut found: BTreeMap<String, Option<String>> = BTreeMap::new();
        for caps in self.find.captures_iter(name) {
            let tag_name = caps[1].to_string();
            let params = caps.get(2).map(|m| m.as_str().to_string());
            if let Some(previous) = found.insert(tag_name.clone(), params.clone())
                && previous != params
            {
                debug!(tag = %tag_name, dropped = ?previous, kept = ?params, "duplicate tag with different parameters");
            }
        }
        found
            .into_iter()
            .map(|(name, params)| Tag::new(name, params))
            .collect()
    }

    /// Tag names in `name`, in order of appearance, duplicates included
    #[must_use]
    pub fn hashtags_in(&self, name: &str) -> Vec<String> {
        self.find
            .captures_iter(name)
            .map(|caps| caps[1].to_string())
            .collect()
    }

    /// True if `name` carries at least one tag
    #[must_use]
    pub fn has_tags(&self, name: &str) -> bool {
        self.may_contain_tags(name) && self.find.is_match(name)
    }

    /// True if the whole of `candidate` is exactly one tag, marker included
    #[must_use]
    pub fn is_full_tag(&self, candidate: &str) -> bool {
        self.full.is_match(candidate)
    }

    /// Validate a bare tag name and return it with the marker prefixed.
    ///
    /// # Errors
    /// Returns `TagError::InvalidTag` if the marked name is not exactly one tag.
    pub fn validate_name(&self, name: &str) -> Result<String, TagError> {
        let marked = format!("{}{name}", self.tag_char);
        if self.is_full_tag(&marked) {
            Ok(marked)
        } else {
            Err(TagError::InvalidTag(marked))
        }
    }

    /// Replace every complete `old` tag token in `name` with `new`.
    ///
    /// Only tokens whose whole name equals `old` change; `#tripod` is left alone
    /// when renaming `trip`, and a trailing parameter suffix is kept.
    #[must_use]
    pub fn replace_tag(&self, name: &str, old: &str, new: &str) -> String {
        let mut out = String::with_capacity(name.len());
        let mut last = 0;
        for caps in self.find.captures_iter(name) {
            let Some(tag) = caps.get(1) else { continue };
            if tag.as_str() != old {
                continue;
            }
            out.push_str(&name[last..tag.start()]);
            out.push_str(new);
            last = tag.end();
        }
        out.push_str(&name[last..]);
        out
    }
}
