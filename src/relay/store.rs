//! State storage backends
//!
//! The relay reads and writes the whole `ExtensionState` document at once.
//! Transitions go through [`StateStore::update`], which must be exclusive
//! against every other update of the same document, including updates from
//! other processes.

use super::state::ExtensionState;
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;

/// Errors that can occur while loading or saving state
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("State store lock poisoned")]
    Poisoned,
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Key-value style storage for the relay state document.
pub trait StateStore: Send + Sync {
    /// Load the current state. A store that has never been written returns
    /// the default (idle) state.
    fn load(&self) -> StorageResult<ExtensionState>;

    /// Replace the stored state.
    fn save(&self, state: &ExtensionState) -> StorageResult<()>;

    /// Load, let `apply` modify the state, and save it if `apply` returns
    /// true. Returns the state as it stands afterwards.
    ///
    /// The default runs `load` then `save` with nothing held in between;
    /// stores shared by several writers override it.
    fn update(
        &self,
        apply: &mut dyn FnMut(&mut ExtensionState) -> bool,
    ) -> StorageResult<ExtensionState> {
        let mut state = self.load()?;
        if apply(&mut state) {
            self.save(&state)?;
        }
        Ok(state)
    }
}

/// In-process store, for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    state: Mutex<ExtensionState>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStateStore {
    fn load(&self) -> StorageResult<ExtensionState> {
        self.state
            .lock()
            .map(|s| s.clone())
            .map_err(|_| StorageError::Poisoned)
    }

    fn save(&self, state: &ExtensionState) -> StorageResult<()> {
        let mut guard = self.state.lock().map_err(|_| StorageError::Poisoned)?;
        *guard = state.clone();
        Ok(())
    }

    fn update(
        &self,
        apply: &mut dyn FnMut(&mut ExtensionState) -> bool,
    ) -> StorageResult<ExtensionState> {
        let mut guard = self.state.lock().map_err(|_| StorageError::Poisoned)?;
        let mut state = guard.clone();
        if apply(&mut state) {
            *guard = state.clone();
        }
        Ok(state)
    }
}

/// Store backed by a single JSON file.
///
/// Updates hold an exclusive advisory lock on a sibling `.lock` file for the
/// whole load-modify-save, so concurrent processes sharing the file apply
/// their transitions one at a time.
#[derive(Debug, Clone)]
pub struct JsonFileStateStore {
    path: PathBuf,
}

impl JsonFileStateStore {
    pub fn open(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of the lock file guarding updates.
    pub fn lock_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".lock");
        self.path.with_file_name(name)
    }

    fn lock(&self) -> StorageResult<File> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(self.lock_path())?;
        file.lock_exclusive()?;
        Ok(file)
    }
}

impl StateStore for JsonFileStateStore {
    fn load(&self) -> StorageResult<ExtensionState> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ExtensionState::default()),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, state: &ExtensionState) -> StorageResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        // Write to a sibling file first so readers never see a partial document.
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(state)?)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn update(
        &self,
        apply: &mut dyn FnMut(&mut ExtensionState) -> bool,
    ) -> StorageResult<ExtensionState> {
        let lock = self.lock()?;
        let mut state = self.load()?;
        if apply(&mut state) {
            self.save(&state)?;
        }
        // Dropping the handle would release the lock too; unlocking first
        // surfaces any error.
        lock.unlock()?;
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::AnalysisResult;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;
    use tempfile::tempdir;

    #[test]
    fn memory_store_round_trips() {
        let store = MemoryStateStore::new();
        let mut state = ExtensionState::default();
        state.begin("claim");
        store.save(&state).unwrap();
        assert_eq!(store.load().unwrap(), state);
    }

    #[test]
    fn missing_file_loads_default() {
        let dir = tempdir().unwrap();
        let store = JsonFileStateStore::open(dir.path().join("state.json"));
        assert_eq!(store.load().unwrap(), ExtensionState::default());
    }

    #[test]
    fn file_store_creates_parent_and_persists() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("state.json");
        let store = JsonFileStateStore::open(&path);

        let mut state = ExtensionState::default();
        state.begin("Water boils at 100C at sea level.");
        store.save(&state).unwrap();

        assert!(path.exists());
        let reopened = JsonFileStateStore::open(&path);
        assert_eq!(reopened.load().unwrap(), state);
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "not json").unwrap();

        let err = JsonFileStateStore::open(&path).load().unwrap_err();
        assert!(matches!(err, StorageError::Serialization(_)));
    }

    #[test]
    fn update_skips_save_when_nothing_applied() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");
        let store = JsonFileStateStore::open(&path);

        let state = store.update(&mut |_| false).unwrap();

        assert_eq!(state, ExtensionState::default());
        assert!(!path.exists());
        assert!(store.lock_path().ends_with("state.json.lock"));
    }

    #[test]
    fn concurrent_updates_through_separate_handles_serialize() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");
        let older = JsonFileStateStore::open(&path);
        let newer = JsonFileStateStore::open(&path);

        let first = older.update(&mut |s| { s.begin("older claim"); true }).unwrap();
        assert_eq!(first.request_id, 1);

        // The older cycle completes slowly while holding its update.
        let slow = Arc::new(older);
        let completing = {
            let store = slow.clone();
            thread::spawn(move || {
                store
                    .update(&mut |s| {
                        thread::sleep(Duration::from_millis(300));
                        if s.request_id != 1 {
                            return false;
                        }
                        s.succeed(AnalysisResult::new(10.0, "older", vec![]));
                        true
                    })
                    .unwrap()
            })
        };

        // A newer cycle begins during that completion.
        thread::sleep(Duration::from_millis(50));
        let begun = newer.update(&mut |s| { s.begin("newer claim"); true }).unwrap();
        completing.join().unwrap();

        assert_eq!(begun.request_id, 2);
        let stored = newer.load().unwrap();
        assert_eq!(stored.request_id, 2);
        assert!(stored.is_analyzing);
        assert_eq!(stored.last_selected_text, "newer claim");
    }
}
