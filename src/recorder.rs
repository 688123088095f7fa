use std::collections::HashMap;
use std::sync::Mutex;

use log::warn;

use crate::error::{DiskTestError, Result};
use crate::model::FileRecord;

/// Tracks every file a generation run produced and whether verification
/// has seen it again. A record is keyed by hash: recording the same hash
/// twice overwrites the earlier entry (the file it pointed at is
/// considered superseded).
pub trait Recorder: Send + Sync {
    fn record(&self, record: FileRecord) -> Result<()>;
    fn exists(&self, hash: &str) -> Result<bool>;
    fn mark(&self, hash: &str) -> Result<()>;
    fn unmarked(&self) -> Result<Vec<FileRecord>>;
    fn total_unmarked(&self) -> Result<u64>;
    fn total_marked(&self) -> Result<u64>;
}

/// The default recorder: everything lives in a `HashMap` behind a mutex.
/// Sized for the runs this tool is meant for; it does not persist across
/// process restarts.
#[derive(Default)]
pub struct InMemRecorder {
    files: Mutex<HashMap<String, FileRecord>>,
}

impl InMemRecorder {
    pub fn new() -> Self {
        Self {
            files: Mutex::new(HashMap::new()),
        }
    }
}

impl Recorder for InMemRecorder {
    fn record(&self, record: FileRecord) -> Result<()> {
        let mut files = self.files.lock().unwrap();
        if let Some(existing) = files.get(&record.hash) {
            warn!(
                "overwriting {} {} -> {}",
                record.hash,
                existing.path.display(),
                record.path.display()
            );
        }
        files.insert(record.hash.clone(), record);
        Ok(())
    }

    fn exists(&self, hash: &str) -> Result<bool> {
        Ok(self.files.lock().unwrap().contains_key(hash))
    }

    fn mark(&self, hash: &str) -> Result<()> {
        let mut files = self.files.lock().unwrap();
        match files.get_mut(hash) {
            Some(record) => {
                if record.marked {
                    warn!("{} has already been marked", hash);
                }
                record.marked = true;
                Ok(())
            }
            None => Err(DiskTestError::RecorderNotFound {
                hash: hash.to_string(),
            }),
        }
    }

    fn unmarked(&self) -> Result<Vec<FileRecord>> {
        Ok(self
            .files
            .lock()
            .unwrap()
            .values()
            .filter(|r| !r.marked)
            .cloned()
            .collect())
    }

    fn total_unmarked(&self) -> Result<u64> {
        Ok(self
            .files
            .lock()
            .unwrap()
            .values()
            .filter(|r| !r.marked)
            .map(|r| r.size)
            .sum())
    }

    fn total_marked(&self) -> Result<u64> {
        Ok(self
            .files
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.marked)
            .map(|r| r.size)
            .sum())
    }
}

/// Placeholder for a persistent recorder backed by SQLite. Not
/// implemented: every method is a benign no-op rather than a panic, so
/// `--verify sqlite` is legal to select but simply never finds or
/// retains anything (mirroring the stubbed Go backend this is grounded
/// on, whose methods return nil/false/empty rather than aborting).
#[derive(Default)]
pub struct SqliteRecorder;

impl SqliteRecorder {
    pub fn new() -> Self {
        Self
    }
}

impl Recorder for SqliteRecorder {
    fn record(&self, _record: FileRecord) -> Result<()> {
        Ok(())
    }

    fn exists(&self, _hash: &str) -> Result<bool> {
        Ok(false)
    }

    fn mark(&self, _hash: &str) -> Result<()> {
        Ok(())
    }

    fn unmarked(&self) -> Result<Vec<FileRecord>> {
        Ok(Vec::new())
    }

    fn total_unmarked(&self) -> Result<u64> {
        Ok(0)
    }

    fn total_marked(&self) -> Result<u64> {
        Ok(0)
    }
}
