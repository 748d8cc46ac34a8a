use thiserror::Error;

/// Errors produced while configuring the tag grammar or validating tag names
#[derive(Debug, Error)]
pub enum TagError {
    /// The string is not exactly one tag
    #[error("Invalid hashtag: '{0}'")]
    InvalidTag(String),
    /// Renaming a tag onto itself
    #[error("There is no need to rename '{0}' to itself")]
    SameTag(String),
    /// The marker character cannot start a tag
    #[error("Invalid tag character '{0}': must be a visible, non-word character other than . , ( )")]
    InvalidTagChar(char),
    /// Grammar failed to compile
    #[error("Invalid tag grammar '{pattern}': {reason}")]
    Grammar { pattern: String, reason: String },
}
