//! Hashtag parsing - typed representation of tags embedded in names.
//!
//! A tag starts with the tag character (default `#`) at a position not
//! preceded by a word character, runs until whitespace, `.`, `,` or a
//! parenthesis, and may carry a parenthesized parameter string:
//!
//! ```
//! use taggo::tags::TagSyntax;
//!
//! let syntax = TagSyntax::default();
//! let tags = syntax.tags_in("photo #trip #size(10,20) no#tag.jpg");
//! let names: Vec<_> = tags.iter().map(|t| t.name.as_str()).collect();
//! assert_eq!(names, ["size", "trip"]);
//! ```

pub mod error;
pub mod parser;

pub use error::TagError;
pub use parser::{DEFAULT_TAG_CHAR, Tag, TagSyntax};
