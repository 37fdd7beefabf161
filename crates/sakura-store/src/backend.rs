// ── Storage Backends ──
//
// Durable keyed storage for whole serialized payloads. The file backend
// maps each key to `<root>/<key>.json`.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use sakura_core::{Result, SakuraError};

// ── Types ──

/// A keyed store of whole payloads. `read` returns `None` when nothing has
/// ever been written under `key`.
pub trait StorageBackend: Send + Sync {
    fn read(&self, key: &str) -> Result<Option<String>>;
    fn write(&self, key: &str, payload: &str) -> Result<()>;
}

/// Stores each key as a JSON file under a data directory.
#[derive(Debug, Clone)]
pub struct FileBackend {
    pub root: PathBuf,
}

/// Process-local backend, used by tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: Mutex<HashMap<String, String>>,
}

// ── Public API ──

impl FileBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.json", key))
    }
}

impl StorageBackend for FileBackend {
    fn read(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(SakuraError::storage(
                key,
                format!("reading {}: {}", path.display(), e),
            )),
        }
    }

    fn write(&self, key: &str, payload: &str) -> Result<()> {
        let path = self.path_for(key);
        write_file(&path, payload)
            .map_err(|e| SakuraError::storage(key, format!("writing {}: {}", path.display(), e)))
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate a key, e.g. with a payload written by an older version.
    pub fn with_entry(key: &str, payload: &str) -> Self {
        let backend = Self::new();
        backend
            .lock()
            .insert(key.to_string(), payload.to_string());
        backend
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        // A poisoned map is still a valid map.
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl StorageBackend for MemoryBackend {
    fn read(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock().get(key).cloned())
    }

    fn write(&self, key: &str, payload: &str) -> Result<()> {
        self.lock().insert(key.to_string(), payload.to_string());
        Ok(())
    }
}

// ── Helpers ──

/// Write via a sibling temp file and rename. Creates parent directories.
fn write_file(path: &Path, payload: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, payload)?;
    fs::rename(&tmp, path)
}

// ── Tests ──
