use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::StorageError;

/// A single named value with a maximum age, the way a cookie holds one.
pub trait BlobStorage {
    /// Returns the stored value, or `None` when nothing is stored or it expired.
    fn read(&self) -> Result<Option<String>, StorageError>;

    /// Replaces the stored value. It stops being readable after `max_age`.
    fn write(&self, value: &str, max_age: Duration) -> Result<(), StorageError>;

    fn clear(&self) -> Result<(), StorageError>;
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Envelope {
    expires_at: Option<DateTime<Utc>>,
    value: String,
}

impl Envelope {
    fn new(value: &str, max_age: Duration) -> Self {
        Self {
            expires_at: Utc::now().checked_add_signed(max_age),
            value: value.to_string(),
        }
    }

    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        matches!(self.expires_at, Some(at) if at <= now)
    }
}

/// Keeps each named blob in its own file under a directory.
pub struct FileBlobStorage {
    path: PathBuf,
}

impl FileBlobStorage {
    pub fn new(dir: &Path, name: &str) -> Self {
        Self {
            path: dir.join(format!("{}.json", name)),
        }
    }

    #[cfg(test)]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl BlobStorage for FileBlobStorage {
    fn read(&self) -> Result<Option<String>, StorageError> {
        if !self.path.exists() {
            return Ok(None);
        }

        let raw = fs::read_to_string(&self.path)?;
        let envelope: Envelope = serde_json::from_str(&raw)
            .map_err(|e| StorageError::Corrupt(e.to_string()))?;

        if envelope.is_expired(Utc::now()) {
            debug!("Blob {:?} expired, removing", self.path);
            self.clear()?;
            return Ok(None);
        }

        Ok(Some(envelope.value))
    }

    fn write(&self, value: &str, max_age: Duration) -> Result<(), StorageError> {
        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir)?;

        let envelope = Envelope::new(value, max_age);

        // Readers see either the old blob or the new one, never a torn file
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(&serde_json::to_vec(&envelope)?)?;
        tmp.as_file().sync_all()?;

        // Owner read/write only
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tmp.as_file().set_permissions(fs::Permissions::from_mode(0o600))?;
        }

        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
pub mod memory {
    use super::*;
    use std::cell::{Cell, RefCell};

    /// In-memory stand-in for tests. Can be told to fail reads or writes.
    #[derive(Default)]
    pub struct MemoryBlobStorage {
        value: RefCell<Option<(String, Option<DateTime<Utc>>)>>,
        pub fail_reads: Cell<bool>,
        pub fail_writes: Cell<bool>,
        pub last_max_age: Cell<Option<Duration>>,
    }

    impl MemoryBlobStorage {
        pub fn with_value(value: &str) -> Self {
            let storage = Self::default();
            *storage.value.borrow_mut() = Some((value.to_string(), None));
            storage
        }

        pub fn raw(&self) -> Option<String> {
            self.value.borrow().as_ref().map(|(v, _)| v.clone())
        }
    }

    impl BlobStorage for MemoryBlobStorage {
        fn read(&self) -> Result<Option<String>, StorageError> {
            if self.fail_reads.get() {
                return Err(StorageError::Corrupt("forced read failure".to_string()));
            }
            let now = Utc::now();
            Ok(self
                .value
                .borrow()
                .as_ref()
                .filter(|(_, expires)| !matches!(expires, Some(at) if *at <= now))
                .map(|(v, _)| v.clone()))
        }

        fn write(&self, value: &str, max_age: Duration) -> Result<(), StorageError> {
            if self.fail_writes.get() {
                return Err(StorageError::Io(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "forced write failure",
                )));
            }
            self.last_max_age.set(Some(max_age));
            *self.value.borrow_mut() = Some((value.to_string(), Utc::now().checked_add_signed(max_age)));
            Ok(())
        }

        fn clear(&self) -> Result<(), StorageError> {
            *self.value.borrow_mut() = None;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_reads_none() {
        let dir = tempdir().unwrap();
        let storage = FileBlobStorage::new(dir.path(), "users");

        assert_eq!(storage.read().unwrap(), None);
    }

    #[test]
    fn test_write_then_read() {
        let dir = tempdir().unwrap();
        let storage = FileBlobStorage::new(&dir.path().join("nested"), "users");

        storage.write("[1,2,3]", Duration::days(30)).unwrap();

        assert_eq!(storage.read().unwrap().as_deref(), Some("[1,2,3]"));
    }

    #[test]
    fn test_expired_blob_is_gone() {
        let dir = tempdir().unwrap();
        let storage = FileBlobStorage::new(dir.path(), "session");

        storage.write("authenticated", Duration::seconds(-1)).unwrap();

        assert_eq!(storage.read().unwrap(), None);
        assert!(!storage.path().exists());
    }

    #[test]
    fn test_corrupt_envelope_is_an_error() {
        let dir = tempdir().unwrap();
        let storage = FileBlobStorage::new(dir.path(), "users");
        fs::write(storage.path(), "{{{").unwrap();

        assert!(matches!(storage.read(), Err(StorageError::Corrupt(_))));
    }

    #[test]
    fn test_rewrite_replaces_file_in_place() {
        let dir = tempdir().unwrap();
        let storage = FileBlobStorage::new(dir.path(), "users");

        storage.write("[1]", Duration::days(30)).unwrap();
        storage.write("[1,2]", Duration::days(30)).unwrap();

        assert_eq!(storage.read().unwrap().as_deref(), Some("[1,2]"));
        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("users.json")]);
    }

    #[cfg(unix)]
    #[test]
    fn test_written_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let storage = FileBlobStorage::new(dir.path(), "session");
        storage.write("authenticated", Duration::hours(24)).unwrap();

        let mode = fs::metadata(storage.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_clear_is_idempotent() {
        let dir = tempdir().unwrap();
        let storage = FileBlobStorage::new(dir.path(), "users");

        storage.write("x", Duration::days(1)).unwrap();
        storage.clear().unwrap();
        storage.clear().unwrap();

        assert_eq!(storage.read().unwrap(), None);
    }
}
