//! Filter data structures and parsing
//!
//! - `Checkpoint`: when during processing a filter is evaluated
//! - `FilterOp`: comparison operator with its parsed operand
//! - `Filter`: key path + operator + checkpoint
//! - `FilterMode`: how several filters combine

use std::fmt;

use clap::ValueEnum;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::FilterError;
use crate::metadata::{KeyPath, Segment};

/// Point in entry processing at which a filter is evaluated
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Checkpoint {
    /// Before any plugin runs
    Early,
    /// Right after the named plugin ran
    Plugin(String),
    /// Per tag, before the link path is rendered
    Late,
}

impl fmt::Display for Checkpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Early => f.write_str("early"),
            Self::Plugin(name) => f.write_str(name),
            Self::Late => f.write_str("late"),
        }
    }
}

/// How multiple filters combine
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FilterMode {
    /// Every applicable filter must match (AND)
    #[default]
    Include,
    /// Skip the entry when any applicable filter matches (OR)
    Exclude,
}

/// Comparison operator and its operand
#[derive(Debug, Clone)]
pub enum FilterOp {
    Exact(String),
    Neq(String),
    Contains(String),
    IContains(String),
    In(Vec<String>),
    IIn(Vec<String>),
    StartsWith(String),
    IStartsWith(String),
    EndsWith(String),
    IEndsWith(String),
    Gt(f64),
    Gte(f64),
    Lt(f64),
    Lte(f64),
    Regex(Regex),
    Glob(glob::Pattern),
}

impl FilterOp {
    /// Parse an operator name and its raw operand
    ///
    /// # Errors
    /// Returns `FilterError` for unknown operators, non-numeric operands of
    /// numeric operators, and patterns that fail to compile.
    pub fn parse(op: &str, value: &str) -> Result<Self, FilterError> {
        let number = || {
            value.trim().parse::<f64>().map_err(|_| FilterError::InvalidValue {
                op: op.to_string(),
                value: value.to_string(),
            })
        };
        let list = |lower: bool| {
            value
                .split(',')
                .map(|item| if lower { item.to_lowercase() } else { item.to_string() })
                .collect::<Vec<_>>()
        };

        Ok(match op {
            "exact" => Self::Exact(value.to_string()),
            "neq" => Self::Neq(value.to_string()),
            "contains" => Self::Contains(value.to_string()),
            "icontains" => Self::IContains(value.to_lowercase()),
            "in" => Self::In(list(false)),
            "iin" => Self::IIn(list(true)),
            "startswith" => Self::StartsWith(value.to_string()),
            "istartswith" => Self::IStartsWith(value.to_lowercase()),
            "endswith" => Self::EndsWith(value.to_string()),
            "iendswith" => Self::IEndsWith(value.to_lowercase()),
            "gt" => Self::Gt(number()?),
            "gte" => Self::Gte(number()?),
            "lt" => Self::Lt(number()?),
            "lte" => Self::Lte(number()?),
            // anchored at the start, the rest of the value may follow freely
            "regex" => Self::Regex(Regex::new(&format!("^(?:{value})")).map_err(|e| FilterError::InvalidPattern {
                pattern: value.to_string(),
                reason: e.to_string(),
            })?),
            "glob" => Self::Glob(glob::Pattern::new(value).map_err(|e| {
                FilterError::InvalidPattern {
                    pattern: value.to_string(),
                    reason: e.to_string(),
                }
            })?),
            _ => return Err(FilterError::UnknownOperator(op.to_string())),
        })
    }

    /// Apply the operator to a metadata value.
    ///
    /// Arrays match when any element matches; null and objects never match.
    #[must_use]
    pub fn matches(&self, value: &Value) -> bool {
        let text = match value {
            Value::Array(items) => return items.iter().any(|item| self.matches(item)),
            Value::Null | Value::Object(_) => return false,
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
        };
        let numeric = || match value {
            Value::Number(n) => n.as_f64(),
            _ => text.trim().parse::<f64>().ok(),
        };

        match self {
            Self::Exact(v) => text == *v,
            Self::Neq(v) => text != *v,
            Self::Contains(v) => text.contains(v.as_str()),
            Self::IContains(v) => text.to_lowercase().contains(v.as_str()),
            Self::In(items) => items.contains(&text),
            Self::IIn(items) => items.contains(&text.to_lowercase()),
            Self::StartsWith(v) => text.starts_with(v.as_str()),
            Self::IStartsWith(v) => text.to_lowercase().starts_with(v.as_str()),
            Self::EndsWith(v) => text.ends_with(v.as_str()),
            Self::IEndsWith(v) => text.to_lowercase().ends_with(v.as_str()),
            Self::Gt(n) => numeric().is_some_and(|x| x > *n),
            Self::Gte(n) => numeric().is_some_and(|x| x >= *n),
            Self::Lt(n) => numeric().is_some_and(|x| x < *n),
            Self::Lte(n) => numeric().is_some_and(|x| x <= *n),
            Self::Regex(re) => re.is_match(&text),
            Self::Glob(pattern) => pattern.matches(&text),
        }
    }
}

/// A single predicate over the metadata store
#[derive(Debug, Clone)]
pub struct Filter {
    original: String,
    pub checkpoint: Checkpoint,
    pub key: KeyPath,
    pub op: FilterOp,
}

impl Filter {
    /// Parse `[checkpoint:]key.path[__op]=value`.
    ///
    /// `plugins` are the names of the plugins enabled for this run; they are
    /// valid explicit checkpoints and drive checkpoint inference:
    /// a key under a plugin name runs after that plugin, a `tag.` key runs
    /// late, everything else runs early.
    ///
    /// # Errors
    /// Returns `FilterError` for malformed definitions, unknown operators or
    /// checkpoints, and filters on plugins that are not enabled.
    pub fn parse(input: &str, plugins: &[&str]) -> Result<Self, FilterError> {
        let (lhs, value) = input
            .split_once('=')
            .ok_or_else(|| FilterError::InvalidFormat(input.to_string()))?;

        let (explicit, lhs) = match lhs.split_once(':') {
            Some((checkpoint, rest)) => (Some(checkpoint.trim()), rest),
            None => (None, lhs),
        };

        let (key, op) = match lhs.rsplit_once("__") {
            Some((key, op)) => (key, FilterOp::parse(op.trim(), value)?),
            None => (lhs, FilterOp::Exact(value.to_string())),
        };
        if key.trim().is_empty() {
            return Err(FilterError::InvalidFormat(input.to_string()));
        }
        let key = KeyPath::parse(key)?;

        let checkpoint = match explicit {
            Some("early") => Checkpoint::Early,
            Some("late") => Checkpoint::Late,
            Some(name) if plugins.contains(&name) => Checkpoint::Plugin(name.to_string()),
            Some(name) => return Err(FilterError::UnknownCheckpoint(name.to_string())),
            None => infer_checkpoint(&key, input, plugins)?,
        };

        Ok(Self {
            original: input.to_string(),
            checkpoint,
            key,
            op,
        })
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.original
    }
}

fn infer_checkpoint(key: &KeyPath, input: &str, plugins: &[&str]) -> Result<Checkpoint, FilterError> {
    let plugin_key = match key.segments() {
        [Segment::Key(scope), Segment::Key(name), ..] if scope == "path" => Some(name.as_str()),
        [Segment::Key(name), ..] => Some(name.as_str()),
        _ => None,
    };

    if let Some(name) = plugin_key
        && crate::metadata::PLUGIN_NAMES.contains(&name)
    {
        if plugins.contains(&name) {
            return Ok(Checkpoint::Plugin(name.to_string()));
        }
        return Err(FilterError::PluginNotEnabled {
            filter: input.to_string(),
            plugin: name.to_string(),
        });
    }

    if key.head() == Some("tag") {
        Ok(Checkpoint::Late)
    } else {
        Ok(Checkpoint::Early)
    }
}
