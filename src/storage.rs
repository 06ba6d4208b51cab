use crate::error::StoreError;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

/// Opaque revision token of a stored object.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Version(pub String);

/// Condition a write must satisfy before it replaces the object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Precondition {
    Any,
    /// Only create, never overwrite.
    Absent,
    /// The object must still be at this revision.
    Matches(Version),
}

/// Whole-object get/put storage.
pub trait ObjectStore {
    fn get(&self, key: &str) -> Result<(Vec<u8>, Version), StoreError>;
    fn put(&self, key: &str, bytes: &[u8], precondition: Precondition) -> Result<Version, StoreError>;
}

fn check_precondition(
    key: &str,
    current: Option<&Version>,
    precondition: &Precondition,
) -> Result<(), StoreError> {
    let ok = match (precondition, current) {
        (Precondition::Any, _) => true,
        (Precondition::Absent, current) => current.is_none(),
        (Precondition::Matches(expected), Some(current)) => expected == current,
        (Precondition::Matches(_), None) => false,
    };
    if ok {
        Ok(())
    } else {
        Err(StoreError::ConcurrentModification(key.to_string()))
    }
}

/// Objects stored as files in one directory. The version is the SHA-256 of
/// the content.
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }

    fn digest(bytes: &[u8]) -> Version {
        let hash = Sha256::digest(bytes);
        Version(hash.iter().map(|b| format!("{:02x}", b)).collect())
    }

    fn map_io(key: &str, err: std::io::Error) -> StoreError {
        match err.kind() {
            ErrorKind::NotFound => StoreError::NotFound(key.to_string()),
            ErrorKind::PermissionDenied => StoreError::Forbidden(key.to_string()),
            _ => StoreError::Io {
                key: key.to_string(),
                source: err,
            },
        }
    }

    fn current_version(&self, path: &Path, key: &str) -> Result<Option<Version>, StoreError> {
        match fs::read(path) {
            Ok(bytes) => Ok(Some(Self::digest(&bytes))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Self::map_io(key, e)),
        }
    }
}

impl ObjectStore for FileStore {
    fn get(&self, key: &str) -> Result<(Vec<u8>, Version), StoreError> {
        let path = self.path_for(key);
        let bytes = fs::read(&path).map_err(|e| Self::map_io(key, e))?;
        debug!(path = %path.display(), bytes = bytes.len(), "Read object");
        let version = Self::digest(&bytes);
        Ok((bytes, version))
    }

    fn put(&self, key: &str, bytes: &[u8], precondition: Precondition) -> Result<Version, StoreError> {
        let path = self.path_for(key);
        let current = self.current_version(&path, key)?;
        check_precondition(key, current.as_ref(), &precondition)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| Self::map_io(key, e))?;
        }

        // Written next to the target so the rename stays on one filesystem.
        let tmp_path = path.with_extension("tmp");
        let mut file = fs::File::create(&tmp_path).map_err(|e| Self::map_io(key, e))?;
        file.write_all(bytes).map_err(|e| Self::map_io(key, e))?;
        file.sync_all().map_err(|e| Self::map_io(key, e))?;
        drop(file);
        fs::rename(&tmp_path, &path).map_err(|e| Self::map_io(key, e))?;

        debug!(path = %path.display(), bytes = bytes.len(), "Wrote object");
        Ok(Self::digest(bytes))
    }
}

/// In-process store, versioned by a per-key generation counter.
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: Mutex<HashMap<String, (Vec<u8>, u64)>>,
    puts: Mutex<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-filled with one object.
    pub fn with_object(key: &str, bytes: Vec<u8>) -> Self {
        let store = Self::new();
        store
            .lock_objects()
            .insert(key.to_string(), (bytes, 1));
        store
    }

    fn lock_objects(&self) -> std::sync::MutexGuard<'_, HashMap<String, (Vec<u8>, u64)>> {
        // A poisoned map is still consistent: every mutation is a single insert.
        self.objects.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Raw content of an object, if present.
    pub fn object(&self, key: &str) -> Option<Vec<u8>> {
        self.lock_objects().get(key).map(|(bytes, _)| bytes.clone())
    }

    /// Number of successful writes so far.
    pub fn put_count(&self) -> usize {
        *self.puts.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl ObjectStore for MemoryStore {
    fn get(&self, key: &str) -> Result<(Vec<u8>, Version), StoreError> {
        self.lock_objects()
            .get(key)
            .map(|(bytes, generation)| (bytes.clone(), Version(generation.to_string())))
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    fn put(&self, key: &str, bytes: &[u8], precondition: Precondition) -> Result<Version, StoreError> {
        let mut objects = self.lock_objects();
        let current = objects.get(key).map(|(_, generation)| *generation);
        let current_version = current.map(|g| Version(g.to_string()));
        check_precondition(key, current_version.as_ref(), &precondition)?;

        let generation = current.unwrap_or(0) + 1;
        objects.insert(key.to_string(), (bytes.to_vec(), generation));
        *self.puts.lock().unwrap_or_else(|e| e.into_inner()) += 1;
        Ok(Version(generation.to_string()))
    }
}
