use std::fmt;
use std::str::FromStr;

use serde_json::Value;
use thiserror::Error;

/// Errors produced while parsing a key path
#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyPathError {
    /// Nothing to parse
    #[error("Empty key path")]
    Empty,
    /// `a..b`, trailing `.`, or `[]`
    #[error("Empty segment in key path '{0}'")]
    EmptySegment(String),
    /// `a[0` without the closing bracket
    #[error("Unclosed bracket in key path '{0}'")]
    UnclosedBracket(String),
    /// Only object keys can be created
    #[error("Cannot create a value at '{0}'")]
    NotInsertable(String),
}

/// One step into nested metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Key(String),
    Index(usize),
}

/// Dotted/bracketed path into nested metadata, e.g. `tag.as-folders`,
/// `tag[as-folders]` or `path.hierarchy[0]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPath {
    original: String,
    segments: Vec<Segment>,
}

impl KeyPath {
    /// Parse a key path.
    ///
    /// # Errors
    /// Returns `KeyPathError` for empty input, empty segments and unclosed brackets.
    pub fn parse(input: &str) -> Result<Self, KeyPathError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(KeyPathError::Empty);
        }

        let mut segments = Vec::new();
        let mut current = String::new();
        let mut chars = input.chars();
        // Set after `]` so that `a[0].b` does not see an empty segment before `.`
        let mut after_bracket = false;

        while let Some(c) = chars.next() {
            match c {
                '.' => {
                    if current.is_empty() && !after_bracket {
                        return Err(KeyPathError::EmptySegment(input.to_string()));
                    }
                    if !current.is_empty() {
                        segments.push(Segment::Key(std::mem::take(&mut current)));
                    }
                    after_bracket = false;
                }
                '[' => {
                    if !current.is_empty() {
                        segments.push(Segment::Key(std::mem::take(&mut current)));
                    }
                    let mut inner = String::new();
                    let mut closed = false;
                    for c in chars.by_ref() {
                        if c == ']' {
                            closed = true;
                            break;
                        }
                        inner.push(c);
                    }
                    if !closed {
                        return Err(KeyPathError::UnclosedBracket(input.to_string()));
                    }
                    let inner = inner.trim().trim_matches(|c| c == '"' || c == '\'');
                    if inner.is_empty() {
                        return Err(KeyPathError::EmptySegment(input.to_string()));
                    }
                    segments.push(match inner.parse::<usize>() {
                        Ok(index) => Segment::Index(index),
                        Err(_) => Segment::Key(inner.to_string()),
                    });
                    after_bracket = true;
                }
                _ => {
                    current.push(c);
                    after_bracket = false;
                }
            }
        }

        if !current.is_empty() {
            segments.push(Segment::Key(current));
        } else if !after_bracket {
            return Err(KeyPathError::EmptySegment(input.to_string()));
        }

        Ok(Self {
            original: input.to_string(),
            segments,
        })
    }

    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.original
    }

    /// First segment when it is a plain key
    #[must_use]
    pub fn head(&self) -> Option<&str> {
        match self.segments.first() {
            Some(Segment::Key(k)) => Some(k.as_str()),
            _ => None,
        }
    }

    /// Walk `segments` starting at `value`
    #[must_use]
    pub fn walk<'a>(segments: &[Segment], value: &'a Value) -> Option<&'a Value> {
        segments.iter().try_fold(value, |current, segment| step(current, segment))
    }
}

fn step<'a>(value: &'a Value, segment: &Segment) -> Option<&'a Value> {
    match (value, segment) {
        (Value::Object(map), Segment::Key(key)) => map.get(key),
        (Value::Object(map), Segment::Index(index)) => map.get(&index.to_string()),
        (Value::Array(items), Segment::Index(index)) => items.get(*index),
        (Value::Array(items), Segment::Key(key)) => {
            key.parse::<usize>().ok().and_then(|i| items.get(i))
        }
        _ => None,
    }
}

impl FromStr for KeyPath {
    type Err = KeyPathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.original)
    }
}
