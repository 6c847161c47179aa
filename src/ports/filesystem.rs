//! Filesystem port for file I/O operations.

use std::path::Path;

use super::PortError;

/// A single directory listing entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// File or directory name (no path components).
    pub name: String,
    /// Whether the entry is a directory.
    pub is_dir: bool,
}

/// Provides filesystem access for scanning, moving and rewriting files.
///
/// All reorganization work goes through this trait; nothing in the pipeline
/// calls `std::fs` directly.
pub trait FileSystem: Send + Sync {
    /// Reads the entire contents of a file as a UTF-8 string.
    ///
    /// # Errors
    ///
    /// Returns an error if the file does not exist or is not valid UTF-8.
    fn read_to_string(&self, path: &Path) -> Result<String, PortError>;

    /// Writes the given contents to a file, creating parents and overwriting.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails (permissions, disk full, etc.).
    fn write(&self, path: &Path, contents: &str) -> Result<(), PortError>;

    /// Returns `true` if the path exists on the filesystem.
    fn exists(&self, path: &Path) -> bool;

    /// Returns `true` if the path exists and is a directory.
    fn is_dir(&self, path: &Path) -> bool;

    /// Lists the entries in a directory, sorted by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the path is not a directory or cannot be read.
    fn list_dir(&self, path: &Path) -> Result<Vec<DirEntry>, PortError>;

    /// Size of a file in bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the metadata cannot be read.
    fn file_size(&self, path: &Path) -> Result<u64, PortError>;

    /// Creates a directory and all missing parents.
    ///
    /// # Errors
    ///
    /// Returns an error if any component cannot be created.
    fn create_dir_all(&self, path: &Path) -> Result<(), PortError>;

    /// Moves a file, replacing nothing: the caller checks for collisions.
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot be moved.
    fn rename(&self, from: &Path, to: &Path) -> Result<(), PortError>;

    /// Copies a single file, creating the destination's parents.
    ///
    /// # Errors
    ///
    /// Returns an error if the copy fails.
    fn copy_file(&self, from: &Path, to: &Path) -> Result<(), PortError>;

    /// Removes a single file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be removed.
    fn remove_file(&self, path: &Path) -> Result<(), PortError>;

    /// Removes an empty directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory is not empty or cannot be removed.
    fn remove_dir(&self, path: &Path) -> Result<(), PortError>;

    /// Removes a directory and everything below it.
    ///
    /// # Errors
    ///
    /// Returns an error if any part of the tree cannot be removed.
    fn remove_dir_all(&self, path: &Path) -> Result<(), PortError>;
}
