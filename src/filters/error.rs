//! Error types for filter definitions

use thiserror::Error;

use crate::metadata::KeyPathError;

/// Errors that can occur while parsing filter definitions
#[derive(Debug, Error)]
pub enum FilterError {
    /// Missing `=` or key
    #[error("Invalid filter format '{0}', expected [checkpoint:]key[__op]=value")]
    InvalidFormat(String),

    /// Operator suffix not recognised
    #[error("Unknown filter operator '{0}'")]
    UnknownOperator(String),

    /// Operand does not fit the operator (e.g. `gt` with a non-number)
    #[error("Invalid value '{value}' for operator '{op}'")]
    InvalidValue { op: String, value: String },

    /// Regex or glob operand failed to compile
    #[error("Invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// Explicit checkpoint that is neither early, late, nor an enabled plugin
    #[error("Unknown filter checkpoint '{0}'")]
    UnknownCheckpoint(String),

    /// Filter needs data from a plugin that is not enabled for this run
    #[error("Filter '{filter}' needs metadata plugin '{plugin}', enable it with --metadata-addon {plugin}")]
    PluginNotEnabled { filter: String, plugin: String },

    /// JMESPath query failed to compile
    #[error("Invalid filter query '{query}': {reason}")]
    InvalidQuery { query: String, reason: String },

    /// Key path could not be parsed
    #[error(transparent)]
    KeyPath(#[from] KeyPathError),
}
