//! Filesystem abstraction layer for testability
//!
//! The pipeline reads the access log and writes its report artifacts
//! through this trait, so write failures and unreadable logs can be
//! simulated with mockall instead of chmod tricks.

use std::fs::OpenOptions;
use std::io;
use std::path::Path;

#[cfg(test)]
use mockall::automock;

/// Trait abstracting filesystem operations for dependency injection.
///
/// # Example (testing)
/// ```ignore
/// use ndefence::fs_abstraction::MockFileSystem;
///
/// let mut mock_fs = MockFileSystem::new();
/// mock_fs.expect_read_to_string()
///     .returning(|_| Ok("10.0.0.1 - - [18/Oct/2026:10:00:00 +0000] ...".to_string()));
/// ```
#[cfg_attr(test, automock)]
pub trait FileSystem: Send + Sync {
    /// Read file contents as a string.
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Write bytes to a file, replacing any previous contents.
    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()>;

    /// Check if a path exists.
    fn exists(&self, path: &Path) -> bool;

    /// Check if a path exists and is a directory.
    fn is_dir(&self, path: &Path) -> bool;

    /// Create an empty file if nothing exists at the path yet.
    ///
    /// Existing files are left untouched.
    fn create_if_absent(&self, path: &Path) -> io::Result<()>;
}

/// Real filesystem implementation using std::fs.
#[derive(Default, Clone, Copy)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        std::fs::write(path, contents)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn create_if_absent(&self, path: &Path) -> io::Result<()> {
        OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map(|_| ())
    }
}

/// Global filesystem instance for production use.
static REAL_FS: RealFileSystem = RealFileSystem;

/// Get a reference to the global real filesystem instance.
///
/// For testing, create a `MockFileSystem` instead.
pub fn real_fs() -> &'static RealFileSystem {
    &REAL_FS
}
