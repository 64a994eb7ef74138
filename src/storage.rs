//! Durable key/value storage for client-side session state.
//!
//! Values are opaque strings keyed by name, mirroring browser local storage. The
//! file-backed implementation keeps one JSON object per data directory and rewrites it
//! through a temp file + rename so a crash never leaves a half-written document.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::error::{AppError, AppResult};

/// Key under which the signed-in identity is persisted.
pub const USER_INFO_KEY: &str = "userInfo";

const STORAGE_FILE: &str = "local_storage.json";

pub trait DurableStorage: Send + Sync {
    fn get(&self, key: &str) -> AppResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> AppResult<()>;
    fn remove(&self, key: &str) -> AppResult<()>;
}

pub type SharedStorage = Arc<dyn DurableStorage>;

/// In-memory storage; contents vanish with the process.
#[derive(Default, Clone)]
pub struct MemoryStorage {
    map: Arc<RwLock<BTreeMap<String, String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self { Self::default() }

    pub fn len(&self) -> usize { self.map.read().len() }

    pub fn is_empty(&self) -> bool { self.map.read().is_empty() }
}

impl DurableStorage for MemoryStorage {
    fn get(&self, key: &str) -> AppResult<Option<String>> { Ok(self.map.read().get(key).cloned()) }

    fn set(&self, key: &str, value: &str) -> AppResult<()> {
        self.map.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> AppResult<()> {
        self.map.write().remove(key);
        Ok(())
    }
}

/// File-backed storage rooted at a data directory.
#[derive(Clone)]
pub struct FileStorage {
    path: PathBuf,
    map: Arc<RwLock<BTreeMap<String, String>>>,
}

impl FileStorage {
    pub fn open(data_dir: impl AsRef<Path>) -> AppResult<Self> {
        let dir = data_dir.as_ref();
        std::fs::create_dir_all(dir)
            .map_err(|e| AppError::storage("data_dir".to_string(), format!("cannot create {}: {}", dir.display(), e)))?;
        let path = dir.join(STORAGE_FILE);
        let map = Self::read_document(&path);
        debug!(target: "storage", "opened {} keys={}", path.display(), map.len());
        Ok(Self { path, map: Arc::new(RwLock::new(map)) })
    }

    pub fn path(&self) -> &Path { &self.path }

    // A corrupt document is treated like an empty one; the next write replaces it.
    fn read_document(path: &Path) -> BTreeMap<String, String> {
        let Ok(bytes) = std::fs::read(path) else { return BTreeMap::new(); };
        match serde_json::from_slice::<BTreeMap<String, String>>(&bytes) {
            Ok(m) => m,
            Err(e) => {
                warn!(target: "storage", "ignoring unreadable storage file {}: {}", path.display(), e);
                BTreeMap::new()
            }
        }
    }

    fn flush(&self, map: &BTreeMap<String, String>) -> AppResult<()> {
        let tmp = self.path.with_extension("json.tmp");
        let bytes = serde_json::to_vec_pretty(map)?;
        std::fs::write(&tmp, bytes)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl DurableStorage for FileStorage {
    fn get(&self, key: &str) -> AppResult<Option<String>> { Ok(self.map.read().get(key).cloned()) }

    // Memory only changes once the new document is on disk.
    fn set(&self, key: &str, value: &str) -> AppResult<()> {
        let mut m = self.map.write();
        let mut next = m.clone();
        next.insert(key.to_string(), value.to_string());
        self.flush(&next)?;
        *m = next;
        Ok(())
    }

    fn remove(&self, key: &str) -> AppResult<()> {
        let mut m = self.map.write();
        if !m.contains_key(key) { return Ok(()); }
        let mut next = m.clone();
        next.remove(key);
        self.flush(&next)?;
        *m = next;
        Ok(())
    }
}
