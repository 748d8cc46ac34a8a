//! Configuration module for taggo
//!
//! Persistent defaults for the command line: tag syntax, link name templates,
//! collision policy and metadata plugins. Configuration is stored in the user's
//! config directory and can be overridden with `TAGGO_*` environment variables.

use std::fs;
use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

use crate::collision::CollisionPolicy;
use crate::tags::DEFAULT_TAG_CHAR;

/// Template used when neither the command line nor the config names one
pub const DEFAULT_SYMLINK_NAME: &str = "{tag.as-folders}/{path.hierarchy-string} - {path.basename}";

/// Application configuration structure
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct TaggoConfig {
    /// Character that starts a tag
    pub tag_char: char,

    /// Character inside a tag name that becomes a folder boundary in `as-folders`
    pub subtag_separator: char,

    /// Joins the ancestor folders of an entry in `path.hierarchy-string`
    pub hierarchy_separator: String,

    /// Link name template for files and folders
    pub symlink_name: String,

    /// Link name template for files, overrides `symlink_name`
    pub symlink_name_file: Option<String>,

    /// Link name template for folders, overrides `symlink_name`
    pub symlink_name_folder: Option<String>,

    /// What to do when a link path is already taken
    pub collision_handler: CollisionPolicy,

    /// Metadata plugins enabled for every run
    pub metadata_plugins: Vec<String>,

    /// Ignore dot-files and dot-directories in the source tree
    pub skip_hidden: bool,
}

impl Default for TaggoConfig {
    fn default() -> Self {
        Self {
            tag_char: DEFAULT_TAG_CHAR,
            subtag_separator: '-',
            hierarchy_separator: "_".to_string(),
            symlink_name: DEFAULT_SYMLINK_NAME.to_string(),
            symlink_name_file: None,
            symlink_name_folder: None,
            collision_handler: CollisionPolicy::default(),
            metadata_plugins: Vec::new(),
            skip_hidden: false,
        }
    }
}

impl TaggoConfig {
    /// Get the path to the config file
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the system config directory cannot be determined.
    pub fn config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| ConfigError::Message("Could not determine config directory".to_string()))?;
        Ok(config_dir.join("taggo").join("config.toml"))
    }

    /// Load configuration from the default location.
    ///
    /// A missing file yields the defaults; nothing is written.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the config file cannot be read or parsed.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from `path` layered with `TAGGO_*` environment variables
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file exists but cannot be parsed, or a value
    /// has the wrong type.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path).format(FileFormat::Toml).required(false))
            .add_source(
                Environment::with_prefix("TAGGO")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("metadata_plugins"),
            )
            .build()?;

        settings.try_deserialize()
    }

    /// Save configuration to `path`, creating parent directories
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the config directory cannot be created, the configuration
    /// cannot be serialized to TOML, or the file cannot be written.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| ConfigError::Message(format!("Failed to create config directory: {e}")))?;
        }

        fs::write(path, self.to_toml()?)
            .map_err(|e| ConfigError::Message(format!("Failed to write config file: {e}")))?;

        Ok(())
    }

    /// Render the configuration as TOML
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if serialization fails.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self)
            .map_err(|e| ConfigError::Message(format!("Failed to serialize config: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestTree;

    #[test]
    fn test_missing_file_gives_defaults() {
        let tree = TestTree::new();
        let config = TaggoConfig::load_from(&tree.join("absent.toml")).unwrap();
        assert_eq!(config, TaggoConfig::default());
        assert_eq!(config.symlink_name, DEFAULT_SYMLINK_NAME);
    }

    #[test]
    fn test_save_then_load() {
        let tree = TestTree::new();
        let path = tree.join("taggo/config.toml");
        let config = TaggoConfig {
            tag_char: '@',
            collision_handler: CollisionPolicy::BailIfDifferent,
            metadata_plugins: vec!["stat".into()],
            symlink_name_folder: Some("{tag.name}/{path.basename}".into()),
            ..TaggoConfig::default()
        };
        config.save_to(&path).unwrap();
        assert_eq!(TaggoConfig::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let tree = TestTree::new();
        let path = tree.file_with("config.toml", b"skip_hidden = true\ncollision_handler = \"no-overwrite\"\n");
        let config = TaggoConfig::load_from(&path).unwrap();
        assert!(config.skip_hidden);
        assert_eq!(config.collision_handler, CollisionPolicy::NoOverwrite);
        assert_eq!(config.tag_char, '#');
    }

    #[test]
    fn test_invalid_value_is_an_error() {
        let tree = TestTree::new();
        let path = tree.file_with("config.toml", b"collision_handler = \"sometimes\"\n");
        assert!(TaggoConfig::load_from(&path).is_err());
    }
}
