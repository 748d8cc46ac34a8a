//! Command-line interface definitions and parsing
//!
//! This module defines the complete CLI structure for taggo using the `clap` crate.
//!
//! # Commands
//!
//! - **run**: materialize the symlink tree for a source tree
//! - **cleanup**: remove dead links and empty folders from a link tree
//! - **rename**: rename a tag in every file and folder name below a source
//! - **info**: list the distinct tags found on folders and files
//! - **config**: write or show the persistent configuration
//!
//! Options left out on the command line fall back to the configuration file,
//! see `config::TaggoConfig`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::collision::CollisionPolicy;
use crate::filters::FilterMode;

#[derive(Parser, Debug)]
#[command(name = "taggo")]
#[command(about = "Builds a mirror tree of symlinks from hashtags in file names", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbose logging (same as RUST_LOG=debug)
    #[arg(short = 'd', long = "debug", global = true, conflicts_with = "quiet")]
    pub debug: bool,

    /// Only log errors and print bare results
    #[arg(short = 'q', long = "quiet", global = true)]
    pub quiet: bool,

    /// Log as JSON lines
    #[arg(long = "json", global = true)]
    pub json: bool,
}

impl Cli {
    /// Parse command line arguments
    #[must_use]
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Create or refresh the symlink tree for a source tree
    #[command(visible_alias = "r")]
    Run(RunArgs),

    /// Remove dead links and the folders they leave empty
    #[command(visible_alias = "c")]
    Cleanup {
        /// Root of the link tree
        #[arg(value_name = "DST")]
        dst: PathBuf,

        /// Only log what would be removed
        #[arg(long = "dry")]
        dry: bool,
    },

    /// Rename a tag in every file and folder name below SRC
    #[command(visible_alias = "mv")]
    Rename {
        /// Source tree to rename in
        #[arg(value_name = "SRC")]
        src: PathBuf,

        /// Tag to rename, without the tag character
        #[arg(value_name = "ORIGINAL")]
        original: String,

        /// New tag name, without the tag character
        #[arg(value_name = "NEW")]
        new: String,

        /// Only log what would be renamed
        #[arg(long = "dry")]
        dry: bool,
    },

    /// List the tags found on folders and files
    #[command(visible_alias = "i")]
    Info {
        /// Source tree or single file
        #[arg(value_name = "SRC")]
        src: PathBuf,
    },

    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

/// Config subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum ConfigCommands {
    /// Write the default configuration file
    Init {
        /// Overwrite an existing configuration file
        #[arg(short = 'f', long = "force")]
        force: bool,
    },
    /// Print the effective configuration
    Show,
}

/// Arguments of the `run` command
#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Source tree, or a single tagged file
    #[arg(value_name = "SRC")]
    pub src: PathBuf,

    /// Root of the link tree
    #[arg(value_name = "DST")]
    pub dst: PathBuf,

    /// Compute and log every link without touching the filesystem
    #[arg(long = "dry")]
    pub dry: bool,

    /// Link name template, e.g. "{tag.as-folders}/{path.basename}"
    #[arg(long = "symlink-name", value_name = "TEMPLATE")]
    pub symlink_name: Option<String>,

    /// Link name template for files
    #[arg(long = "symlink-name-file", value_name = "TEMPLATE")]
    pub symlink_name_file: Option<String>,

    /// Link name template for folders
    #[arg(long = "symlink-name-folder", value_name = "TEMPLATE")]
    pub symlink_name_folder: Option<String>,

    /// Filter as [checkpoint:]key.path[__op]=value (repeatable)
    #[arg(short = 'f', long = "filter", value_name = "FILTER")]
    pub filters: Vec<String>,

    /// How multiple filters combine
    #[arg(long = "filter-mode", value_enum, default_value_t = FilterMode::Include)]
    pub filter_mode: FilterMode,

    /// JMESPath expression over the metadata, tags where it is falsy are skipped
    #[arg(long = "filter-query", value_name = "QUERY")]
    pub filter_query: Option<String>,

    /// Enable a metadata plugin: stat, filetype, image, exif, checksum (repeatable)
    #[arg(short = 'm', long = "metadata-addon", value_name = "NAME")]
    pub metadata_addons: Vec<String>,

    /// Value for a key path when it is missing, as key.path=value (repeatable)
    #[arg(long = "metadata-default", value_name = "KEY=VALUE")]
    pub metadata_defaults: Vec<String>,

    /// Run cleanup on DST after the run
    #[arg(long = "auto-cleanup")]
    pub auto_cleanup: bool,

    /// What to do when a link path is already taken
    #[arg(long = "collision-handler", value_enum)]
    pub collision_handler: Option<CollisionPolicy>,

    /// Ignore dot-files and dot-directories
    #[arg(long = "skip-hidden")]
    pub skip_hidden: bool,
}
