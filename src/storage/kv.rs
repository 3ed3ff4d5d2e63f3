use std::collections::HashMap as StdHashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use super::DurableStorage;
use crate::error::StorageError;

fn sanitize_filename(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' { c } else { '_' })
        .collect()
}

/// File-backed storage rooted at a state directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Open (creating if needed) the state directory.
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self, StorageError> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path { &self.dir }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", sanitize_filename(key)))
    }
}

impl DurableStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match std::fs::read_to_string(self.path_for(key)) {
            Ok(s) => Ok(Some(s)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, value)?;
        std::fs::rename(&tmp, &path)?;
        debug!(target: "fatecraft::storage", "wrote '{}' ({} bytes)", path.display(), value.len());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        match std::fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory storage. Clones share one map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    map: Arc<parking_lot::RwLock<StdHashMap<String, String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self { Self::default() }
    pub fn is_empty(&self) -> bool { self.map.read().is_empty() }
}

impl DurableStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.map.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.map.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.map.write().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_storage_roundtrip_and_remove() {
        let tmp = tempfile::tempdir().unwrap();
        let fs = FileStorage::open(tmp.path().join("state")).unwrap();
        assert_eq!(fs.get("fatecraft.auth.session").unwrap(), None);
        fs.set("fatecraft.auth.session", "{\"a\":1}").unwrap();
        assert_eq!(fs.get("fatecraft.auth.session").unwrap().as_deref(), Some("{\"a\":1}"));
        assert!(fs.dir().join("fatecraft.auth.session.json").exists());
        assert!(!fs.dir().join("fatecraft.auth.session.json.tmp").exists());
        fs.remove("fatecraft.auth.session").unwrap();
        fs.remove("fatecraft.auth.session").unwrap();
        assert_eq!(fs.get("fatecraft.auth.session").unwrap(), None);
    }

    #[test]
    fn keys_are_sanitized_into_the_state_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let fs = FileStorage::open(tmp.path()).unwrap();
        fs.set("../escape/key", "x").unwrap();
        assert!(tmp.path().join(".._escape_key.json").exists());
        assert_eq!(fs.get("../escape/key").unwrap().as_deref(), Some("x"));
    }

    #[test]
    fn memory_storage_clones_share_state() {
        let a = MemoryStorage::new();
        let b = a.clone();
        a.set("k", "v").unwrap();
        assert_eq!(b.get("k").unwrap().as_deref(), Some("v"));
        b.remove("k").unwrap();
        assert!(a.is_empty());
    }
}
