use std::path::PathBuf;

/// One file known to the recorder.
///
/// `hash` uniquely identifies a record within one recorder: re-recording
/// the same hash overwrites the prior record (see `Recorder::record`).
/// `marked` only ever transitions false -> true.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    pub path: PathBuf,
    pub size: u64,
    pub hash: String,
    pub marked: bool,
}

impl FileRecord {
    pub fn new(path: PathBuf, size: u64, hash: String) -> Self {
        Self {
            path,
            size,
            hash,
            marked: false,
        }
    }
}

/// The unit flowing through both pipelines.
///
/// Created by the Path Planner (generation) or the filesystem walker
/// (verification), consumed by exactly one worker, and filled in with a
/// hash before being handed to the recorder or discarded after a mark call.
#[derive(Debug, Clone)]
pub struct WorkItem {
    pub path: PathBuf,
    pub size: u64,
    pub hash: String,
}

impl WorkItem {
    pub fn new(path: PathBuf, size: u64) -> Self {
        Self {
            path,
            size,
            hash: String::new(),
        }
    }

    pub fn into_record(self) -> FileRecord {
        FileRecord::new(self.path, self.size, self.hash)
    }
}

/// Internal Path Planner state for one scheduled folder.
/// Mutated only by the planner's per-folder emission step;
/// discarded once `remaining_files` hits zero or the volume budget runs out.
#[derive(Debug, Clone)]
pub struct FolderFrame {
    pub base_path: PathBuf,
    pub remaining_files: u32,
}

impl FolderFrame {
    pub fn new(base_path: PathBuf, remaining_files: u32) -> Self {
        Self {
            base_path,
            remaining_files,
        }
    }
}
