//! Live filesystem adapter using `std::fs`.

use std::fs;
use std::path::Path;

use crate::ports::filesystem::{DirEntry, FileSystem};
use crate::ports::PortError;

/// Live filesystem adapter backed by real disk I/O.
pub struct LiveFileSystem;

impl FileSystem for LiveFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String, PortError> {
        Ok(fs::read_to_string(path)?)
    }

    fn write(&self, path: &Path, contents: &str) -> Result<(), PortError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(fs::write(path, contents)?)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn list_dir(&self, path: &Path) -> Result<Vec<DirEntry>, PortError> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(path)? {
            let entry = entry?;
            let Some(name) = entry.file_name().to_str().map(String::from) else {
                continue;
            };
            entries.push(DirEntry { name, is_dir: entry.file_type()?.is_dir() });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    fn file_size(&self, path: &Path) -> Result<u64, PortError> {
        Ok(fs::metadata(path)?.len())
    }

    fn create_dir_all(&self, path: &Path) -> Result<(), PortError> {
        Ok(fs::create_dir_all(path)?)
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<(), PortError> {
        if let Some(parent) = to.parent() {
            fs::create_dir_all(parent)?;
        }
        if fs::rename(from, to).is_ok() {
            return Ok(());
        }
        // Renames fail across devices; fall back to copy then delete.
        fs::copy(from, to)?;
        fs::remove_file(from)?;
        Ok(())
    }

    fn copy_file(&self, from: &Path, to: &Path) -> Result<(), PortError> {
        if let Some(parent) = to.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(from, to)?;
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> Result<(), PortError> {
        Ok(fs::remove_file(path)?)
    }

    fn remove_dir(&self, path: &Path) -> Result<(), PortError> {
        Ok(fs::remove_dir(path)?)
    }

    fn remove_dir_all(&self, path: &Path) -> Result<(), PortError> {
        Ok(fs::remove_dir_all(path)?)
    }
}
