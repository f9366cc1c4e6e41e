//! Persistence of generated files.
//!
//! The generator only ever does whole-file reads and whole-file writes through
//! [`ArtifactStore`]. Writes for the same file are serialized by
//! [`FileLocks`] so the read-merge-write sequence never interleaves.

use hktgen_types::qualify;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::NamedTempFile;

/// Identity of one generated class: its package and simple class name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OutputFileKey {
    pub package: String,
    pub class_name: String,
}

impl OutputFileKey {
    pub fn new(package: impl Into<String>, class_name: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            class_name: class_name.into(),
        }
    }

    pub fn qualified_name(&self) -> String {
        qualify(&self.package, &self.class_name)
    }

    /// Source path relative to an output root, e.g. `com/example/Hkt.java`.
    pub fn relative_path(&self) -> PathBuf {
        let mut path = PathBuf::new();
        for segment in self.package.split('.').filter(|s| !s.is_empty()) {
            path.push(segment);
        }
        path.push(format!("{}.java", self.class_name));
        path
    }
}

impl fmt::Display for OutputFileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.qualified_name())
    }
}

/// Whole-file access to previously generated output.
pub trait ArtifactStore: Send + Sync {
    /// Current contents, or `None` when the file does not exist.
    fn read(&self, key: &OutputFileKey) -> io::Result<Option<String>>;

    /// Replace the file with `contents`. Either all of it lands or none of it.
    fn write(&self, key: &OutputFileKey, contents: &str) -> io::Result<()>;
}

/// Stores generated sources under a root directory, one file per class.
#[derive(Debug, Clone)]
pub struct FsArtifactStore {
    root: PathBuf,
}

impl FsArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, key: &OutputFileKey) -> PathBuf {
        self.root.join(key.relative_path())
    }
}

impl ArtifactStore for FsArtifactStore {
    fn read(&self, key: &OutputFileKey) -> io::Result<Option<String>> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn write(&self, key: &OutputFileKey, contents: &str) -> io::Result<()> {
        let path = self.path_for(key);
        let dir = path.parent().unwrap_or(&self.root);
        fs::create_dir_all(dir)?;

        // Temp file in the target directory so the rename stays on one filesystem.
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(contents.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| e.error)?;
        Ok(())
    }
}

/// In-memory store for hosts that own persistence themselves, and for tests.
#[derive(Debug, Default)]
pub struct MemoryArtifactStore {
    files: RwLock<BTreeMap<OutputFileKey, String>>,
}

impl MemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, key: OutputFileKey, contents: impl Into<String>) {
        self.files.write().insert(key, contents.into());
    }

    pub fn get(&self, key: &OutputFileKey) -> Option<String> {
        self.files.read().get(key).cloned()
    }

    pub fn keys(&self) -> Vec<OutputFileKey> {
        self.files.read().keys().cloned().collect()
    }
}

impl ArtifactStore for MemoryArtifactStore {
    fn read(&self, key: &OutputFileKey) -> io::Result<Option<String>> {
        Ok(self.get(key))
    }

    fn write(&self, key: &OutputFileKey, contents: &str) -> io::Result<()> {
        self.insert(key.clone(), contents);
        Ok(())
    }
}

/// One writer lock per output file.
#[derive(Debug, Default)]
pub struct FileLocks {
    locks: Mutex<HashMap<OutputFileKey, Arc<Mutex<()>>>>,
}

impl FileLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lock_for(&self, key: &OutputFileKey) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock();
        Arc::clone(locks.entry(key.clone()).or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_relative_path() {
        let key = OutputFileKey::new("com.example.data", "Hkt");
        assert_eq!(
            key.relative_path(),
            PathBuf::from("com").join("example").join("data").join("Hkt.java")
        );
        assert_eq!(
            OutputFileKey::new("", "Hkt").relative_path(),
            PathBuf::from("Hkt.java")
        );
        assert_eq!(key.qualified_name(), "com.example.data.Hkt");
    }

    #[test]
    fn test_fs_store_missing_file_is_none() {
        let dir = TempDir::new().unwrap();
        let store = FsArtifactStore::new(dir.path());
        let key = OutputFileKey::new("com.example", "Hkt");
        assert!(store.read(&key).unwrap().is_none());
    }

    #[test]
    fn test_fs_store_write_then_read() {
        let dir = TempDir::new().unwrap();
        let store = FsArtifactStore::new(dir.path());
        let key = OutputFileKey::new("com.example", "Hkt");

        store.write(&key, "first").unwrap();
        store.write(&key, "second").unwrap();
        assert_eq!(store.read(&key).unwrap().as_deref(), Some("second"));

        // No temp files left next to the output.
        let siblings: Vec<_> = fs::read_dir(store.path_for(&key).parent().unwrap())
            .unwrap()
            .collect();
        assert_eq!(siblings.len(), 1);
    }

    #[test]
    fn test_fs_store_read_error_is_surfaced() {
        let dir = TempDir::new().unwrap();
        let store = FsArtifactStore::new(dir.path());
        let key = OutputFileKey::new("com.example", "Hkt");
        // A directory where the file should be cannot be read as text.
        fs::create_dir_all(store.path_for(&key)).unwrap();
        assert!(store.read(&key).is_err());
    }

    #[test]
    fn test_file_locks_shared_per_key() {
        let locks = FileLocks::new();
        let a = OutputFileKey::new("com.example", "Hkt");
        let b = OutputFileKey::new("com.other", "Hkt");
        assert!(Arc::ptr_eq(&locks.lock_for(&a), &locks.lock_for(&a)));
        assert!(!Arc::ptr_eq(&locks.lock_for(&a), &locks.lock_for(&b)));
    }
}
