//! Taggo - symlink trees from hashtags in file names
//!
//! This library scans a source tree for files and folders whose names carry
//! `#tags`, and materializes a mirror tree of relative symbolic links grouped
//! by tag. It also renames tags in place and sweeps dead links.

use std::path::PathBuf;
use thiserror::Error;

pub mod cli;
pub mod collision;
pub mod commands;
pub mod config;
pub mod filters;
pub mod metadata;
pub mod output;
pub mod tags;
pub mod template;
pub mod walk;

#[cfg(test)]
pub mod testing;

/// Exit status for generic domain and configuration errors
pub const EXIT_ERROR: i32 = 2;
/// Exit status when a name template references a key that does not exist
pub const EXIT_TEMPLATE: i32 = 3;
/// Exit status when the destination or a link parent is not a directory
pub const EXIT_NOT_DIRECTORY: i32 = 4;
/// Exit status when `bail-if-different` hits a conflicting link
pub const EXIT_COLLISION: i32 = 20;

/// Error enum, contains all failure states of the program
#[derive(Debug, Error)]
pub enum TaggoError {
    /// Invalid tag syntax
    #[error("Tag error: {0}")]
    TagError(#[from] tags::TagError),
    /// Invalid key path
    #[error("Key path error: {0}")]
    KeyPathError(#[from] metadata::KeyPathError),
    /// Name template could not be rendered
    #[error("Template error: {0}")]
    TemplateError(#[from] template::TemplateError),
    /// Invalid filter definition
    #[error("Filter error: {0}")]
    FilterError(#[from] filters::FilterError),
    /// Directory walk failed
    #[error("Walk error: {0}")]
    WalkError(#[from] walk::WalkError),
    /// Represents a configuration error
    #[error("Configuration error: {0}")]
    ConfigError(#[from] ::config::ConfigError),
    /// Represents an I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
    /// Source or link root is missing
    #[error("Didn't find path: {}", .0.display())]
    PathNotFound(PathBuf),
    /// Destination exists but is not a directory
    #[error("Destination exists but is not a directory: {}", .0.display())]
    DestinationNotDirectory(PathBuf),
    /// The parent of a computed link path exists but is not a directory
    #[error("Link parent exists but is not a directory: {}", .0.display())]
    LinkParentNotDirectory(PathBuf),
    /// An existing link points elsewhere and the policy says bail
    #[error("Link {} points to {}, wanted {}", .link.display(), .existing.display(), .wanted.display())]
    CollisionAbort {
        link: PathBuf,
        existing: PathBuf,
        wanted: PathBuf,
    },
    /// Invalid input error
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl TaggoError {
    /// Process exit status reserved for this error
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::TemplateError(_) => EXIT_TEMPLATE,
            Self::DestinationNotDirectory(_) | Self::LinkParentNotDirectory(_) => {
                EXIT_NOT_DIRECTORY
            }
            Self::CollisionAbort { .. } => EXIT_COLLISION,
            _ => EXIT_ERROR,
        }
    }
}

pub type Result<T> = std::result::Result<T, TaggoError>;
