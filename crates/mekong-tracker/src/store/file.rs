//! Directory-backed store: one JSON file per key.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::{validate_key, KeyValueStore};
use crate::error::{Error, Result};

/// Extension appended to every key's file name.
const FILE_EXTENSION: &str = "json";

/// Stores each key as `<dir>/<key>.json`.
///
/// Writes land in a sibling temporary file that is renamed over the target,
/// so a crash mid-write leaves the previous value in place.
#[derive(Debug)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open a store rooted at `dir`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        if !dir.exists() {
            std::fs::create_dir_all(&dir).map_err(|source| Error::DirectoryCreate {
                path: dir.clone(),
                source,
            })?;
        }
        info!("File store opened at {}", dir.display());
        Ok(Self { dir })
    }

    /// Directory holding the key files.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file backing `key`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidKey`] if the key cannot be used as a file name.
    pub fn path_for(&self, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        Ok(self.dir.join(format!("{key}.{FILE_EXTENSION}")))
    }
}

impl KeyValueStore for FileStore {
    fn name(&self) -> &'static str {
        "file"
    }

    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key)?;
        match std::fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key)?;
        let tmp = path.with_extension(format!("{FILE_EXTENSION}.tmp"));
        std::fs::write(&tmp, value)?;
        if let Err(e) = std::fs::rename(&tmp, &path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(e.into());
        }
        debug!("Wrote {} bytes to {}", value.len(), path.display());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("mekong_file_store_{tag}_{}", std::process::id()))
    }

    #[test]
    fn test_open_creates_directory() {
        let dir = temp_dir("create").join("nested");
        let _ = std::fs::remove_dir_all(dir.parent().unwrap());

        let store = FileStore::open(&dir).unwrap();
        assert!(dir.is_dir());
        assert_eq!(store.dir(), dir);

        let _ = std::fs::remove_dir_all(dir.parent().unwrap());
    }

    #[test]
    fn test_set_get_remove() {
        let dir = temp_dir("roundtrip");
        let store = FileStore::open(&dir).unwrap();

        assert_eq!(store.get("downloads").unwrap(), None);
        store.set("downloads", r#"{"totalDownloads":1}"#).unwrap();
        assert_eq!(
            store.get("downloads").unwrap().as_deref(),
            Some(r#"{"totalDownloads":1}"#)
        );
        assert!(dir.join("downloads.json").exists());
        assert!(!dir.join("downloads.json.tmp").exists());

        store.remove("downloads").unwrap();
        assert_eq!(store.get("downloads").unwrap(), None);
        // Removing again is fine
        store.remove("downloads").unwrap();

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_overwrite_replaces_value() {
        let dir = temp_dir("overwrite");
        let store = FileStore::open(&dir).unwrap();

        store.set("k", "first").unwrap();
        store.set("k", "second").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("second"));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_failed_rename_removes_temp_file() {
        let dir = temp_dir("rename_fail");
        let _ = std::fs::remove_dir_all(&dir);
        let store = FileStore::open(&dir).unwrap();
        // A directory in the target's place makes the rename fail
        std::fs::create_dir(dir.join("blocked.json")).unwrap();

        assert!(matches!(store.set("blocked", "value"), Err(Error::Io(_))));
        assert!(!dir.join("blocked.json.tmp").exists());
        assert!(dir.join("blocked.json").is_dir());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_rejects_path_traversal_key() {
        let dir = temp_dir("traversal");
        let store = FileStore::open(&dir).unwrap();

        let err = store.set("../outside", "x").unwrap_err();
        assert!(matches!(err, Error::InvalidKey { .. }));
        assert!(store.get("a/b").is_err());

        let _ = std::fs::remove_dir_all(&dir);
    }
}
