//! Persistence for the meta-update job checkpoint.
//!
//! At most one job exists at a time. Deleting the checkpoint cancels it.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::{EngineError, EngineResult};

use super::meta_update::MetaUpdateJob;

/// Storage for the single pending meta-update job.
pub trait CheckpointStore: Send + Sync {
    /// Returns the pending job, if any.
    fn load(&self) -> EngineResult<Option<MetaUpdateJob>>;

    /// Stores `job`, replacing any previous checkpoint.
    fn save(&self, job: &MetaUpdateJob) -> EngineResult<()>;

    /// Replaces the checkpoint with `job` only if one still exists.
    ///
    /// Returns `false` without writing when the checkpoint was cleared, so a
    /// running batch cannot bring back a cancelled job.
    fn save_if_present(&self, job: &MetaUpdateJob) -> EngineResult<bool>;

    /// Removes the checkpoint. Clearing an empty store is not an error.
    fn clear(&self) -> EngineResult<()>;
}

fn poisoned() -> EngineError {
    EngineError::Storage {
        message: "checkpoint lock poisoned".to_string(),
    }
}

/// Checkpoint kept in process memory.
#[derive(Debug, Default)]
pub struct InMemoryCheckpointStore {
    job: Mutex<Option<MetaUpdateJob>>,
}

impl InMemoryCheckpointStore {
    /// Creates an empty checkpoint store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl CheckpointStore for InMemoryCheckpointStore {
    fn load(&self) -> EngineResult<Option<MetaUpdateJob>> {
        Ok(self.job.lock().map_err(|_| poisoned())?.clone())
    }

    fn save(&self, job: &MetaUpdateJob) -> EngineResult<()> {
        *self.job.lock().map_err(|_| poisoned())? = Some(job.clone());
        Ok(())
    }

    fn save_if_present(&self, job: &MetaUpdateJob) -> EngineResult<bool> {
        let mut current = self.job.lock().map_err(|_| poisoned())?;
        match current.as_mut() {
            Some(stored) => {
                *stored = job.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn clear(&self) -> EngineResult<()> {
        *self.job.lock().map_err(|_| poisoned())? = None;
        Ok(())
    }
}

/// Checkpoint stored as a JSON file, so a job survives restarts.
///
/// Writes go to a sibling `.tmp` file that is then renamed over the
/// checkpoint, so a crash never leaves a half-written file behind.
#[derive(Debug, Clone)]
pub struct FileCheckpointStore {
    path: PathBuf,
}

impl FileCheckpointStore {
    /// Creates a store backed by the file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the checkpoint file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, err: io::Error) -> EngineError {
        EngineError::Storage {
            message: format!("{}: {}", self.path.display(), err),
        }
    }

    fn exists(&self) -> EngineResult<bool> {
        match fs::metadata(&self.path) {
            Ok(_) => Ok(true),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(self.io_error(err)),
        }
    }

    fn write_tmp(&self, job: &MetaUpdateJob) -> EngineResult<PathBuf> {
        let bytes = serde_json::to_vec_pretty(job).map_err(|e| EngineError::Storage {
            message: e.to_string(),
        })?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }

        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, bytes).map_err(|e| self.io_error(e))?;
        Ok(tmp)
    }
}

impl CheckpointStore for FileCheckpointStore {
    fn load(&self) -> EngineResult<Option<MetaUpdateJob>> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(self.io_error(err)),
        };

        serde_json::from_str(&contents)
            .map(Some)
            .map_err(|e| EngineError::Storage {
                message: format!("{}: {}", self.path.display(), e),
            })
    }

    fn save(&self, job: &MetaUpdateJob) -> EngineResult<()> {
        let tmp = self.write_tmp(job)?;
        fs::rename(&tmp, &self.path).map_err(|e| self.io_error(e))
    }

    fn save_if_present(&self, job: &MetaUpdateJob) -> EngineResult<bool> {
        if !self.exists()? {
            return Ok(false);
        }

        let tmp = self.write_tmp(job)?;
        if !self.exists()? {
            let _ = fs::remove_file(&tmp);
            return Ok(false);
        }
        fs::rename(&tmp, &self.path).map_err(|e| self.io_error(e))?;
        Ok(true)
    }

    fn clear(&self) -> EngineResult<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(self.io_error(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn job() -> MetaUpdateJob {
        MetaUpdateJob {
            remaining_ids: vec![5, 4, 3],
            processed: 2,
            failed: 1,
            started_at: Utc::now(),
        }
    }

    fn temp_path() -> PathBuf {
        std::env::temp_dir()
            .join(format!("shipping-tax-fix-{}", Uuid::new_v4()))
            .join("meta_update.json")
    }

    #[test]
    fn test_in_memory_store_lifecycle() {
        let store = InMemoryCheckpointStore::new();
        assert_eq!(store.load().unwrap(), None);

        store.save(&job()).unwrap();
        assert_eq!(store.load().unwrap().unwrap().remaining_ids, vec![5, 4, 3]);

        store.clear().unwrap();
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn test_in_memory_conditional_save_respects_clear() {
        let store = InMemoryCheckpointStore::new();
        assert!(!store.save_if_present(&job()).unwrap());
        assert_eq!(store.load().unwrap(), None);

        store.save(&job()).unwrap();
        let mut advanced = job();
        advanced.remaining_ids = vec![3];
        assert!(store.save_if_present(&advanced).unwrap());
        assert_eq!(store.load().unwrap(), Some(advanced));
    }

    #[test]
    fn test_file_conditional_save_respects_clear() {
        let path = temp_path();
        let store = FileCheckpointStore::new(path.clone());

        assert!(!store.save_if_present(&job()).unwrap());
        assert!(!path.exists());

        store.save(&job()).unwrap();
        assert!(store.save_if_present(&job()).unwrap());
        store.clear().unwrap();
        assert!(!store.save_if_present(&job()).unwrap());
        assert_eq!(store.load().unwrap(), None);
        assert!(!path.with_extension("tmp").exists());

        if let Some(dir) = path.parent() {
            let _ = fs::remove_dir_all(dir);
        }
    }

    #[test]
    fn test_file_store_survives_reopen() {
        let path = temp_path();
        let saved = job();

        FileCheckpointStore::new(path.clone()).save(&saved).unwrap();
        let reopened = FileCheckpointStore::new(path.clone());

        assert_eq!(reopened.load().unwrap(), Some(saved));
        assert!(!path.with_extension("tmp").exists());

        reopened.clear().unwrap();
        assert_eq!(reopened.load().unwrap(), None);
        reopened.clear().unwrap();

        if let Some(dir) = path.parent() {
            let _ = fs::remove_dir_all(dir);
        }
    }

    #[test]
    fn test_file_store_rejects_corrupt_checkpoint() {
        let path = temp_path();
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).unwrap();
        }
        fs::write(&path, "not json").unwrap();

        let store = FileCheckpointStore::new(path.clone());
        assert!(matches!(store.load(), Err(EngineError::Storage { .. })));

        if let Some(dir) = path.parent() {
            let _ = fs::remove_dir_all(dir);
        }
    }
}
