//! Testing utilities for taggo
//!
//! Provides `TestTree`, a temporary directory with helpers for laying out
//! source trees and link trees. Only available when compiled with `cfg(test)`.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// Temporary directory tree that is removed on drop
pub struct TestTree {
    dir: TempDir,
}

impl Default for TestTree {
    fn default() -> Self {
        Self::new()
    }
}

impl TestTree {
    /// Create an empty tree
    ///
    /// # Panics
    /// Panics if the temporary directory cannot be created.
    #[must_use]
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    /// Root of the tree
    #[must_use]
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Absolute path of `rel` inside the tree, nothing is created
    #[must_use]
    pub fn join(&self, rel: impl AsRef<Path>) -> PathBuf {
        self.dir.path().join(rel)
    }

    /// Create a file with default content, parents included
    pub fn file(&self, rel: impl AsRef<Path>) -> PathBuf {
        self.file_with(rel, b"test content")
    }

    /// Create a file with the given content, parents included
    ///
    /// # Panics
    /// Panics if the file cannot be written.
    pub fn file_with(&self, rel: impl AsRef<Path>, content: &[u8]) -> PathBuf {
        let path = self.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent dirs");
        }
        fs::write(&path, content).expect("Failed to write test file");
        path
    }

    /// Create a directory, parents included
    ///
    /// # Panics
    /// Panics if the directory cannot be created.
    pub fn dir(&self, rel: impl AsRef<Path>) -> PathBuf {
        let path = self.join(rel);
        fs::create_dir_all(&path).expect("Failed to create test dir");
        path
    }

    /// Create a symlink at `rel` pointing to `target` verbatim
    ///
    /// # Panics
    /// Panics if the link cannot be created.
    pub fn symlink(&self, rel: impl AsRef<Path>, target: impl AsRef<Path>) -> PathBuf {
        let path = self.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent dirs");
        }
        std::os::unix::fs::symlink(target, &path).expect("Failed to create symlink");
        path
    }
}

/// True if `path` itself is a symlink (not followed)
#[must_use]
pub fn is_symlink(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok_and(|m| m.file_type().is_symlink())
}

/// A valid 1x1 transparent PNG
pub const PNG_1X1: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
    0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F,
    0x15, 0xC4, 0x89, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0x00,
    0x01, 0x00, 0x00, 0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00, 0x00, 0x00, 0x00, 0x49,
    0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82,
];

/// Little-endian TIFF whose first IFD holds Make "Canon", Model "EOS" and
/// Orientation 6
#[must_use]
pub fn tiff_with_exif() -> Vec<u8> {
    fn entry(out: &mut Vec<u8>, tag: u16, kind: u16, count: u32, value: [u8; 4]) {
        out.extend_from_slice(&tag.to_le_bytes());
        out.extend_from_slice(&kind.to_le_bytes());
        out.extend_from_slice(&count.to_le_bytes());
        out.extend_from_slice(&value);
    }

    let mut out = b"II\x2a\x00".to_vec();
    out.extend_from_slice(&8u32.to_le_bytes());
    out.extend_from_slice(&3u16.to_le_bytes());
    // header (8) + count (2) + 3 entries (36) + next IFD offset (4)
    entry(&mut out, 0x010F, 2, 6, 50u32.to_le_bytes());
    entry(&mut out, 0x0110, 2, 4, *b"EOS\0");
    entry(&mut out, 0x0112, 3, 1, [6, 0, 0, 0]);
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(b"Canon\0");
    out
}
