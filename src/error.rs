use thiserror::Error;

/// The error kinds surfaced on the shared error channel.
///
/// Per-item failures (one bad write, one bad walk entry) are logged and
/// forwarded on the shared channel but do not themselves stop a pipeline;
/// the orchestrator decides whether to cancel on the first one it sees.
#[derive(Error, Debug, Clone)]
pub enum DiskTestError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("could not create {path}: {source}")]
    FilesystemCreate { path: String, source: String },

    #[error("error while writing {path}: {source}")]
    FilesystemWrite { path: String, source: String },

    #[error("error while reading {path}: {source}")]
    FilesystemRead { path: String, source: String },

    #[error("error while walking {path}: {source}")]
    FilesystemWalk { path: String, source: String },

    #[error("{hash} does not exist in the recorder")]
    RecorderNotFound { hash: String },

    #[error("queue has no elements")]
    QueueEmpty,

    #[error("operation cancelled")]
    Cancelled,
}

impl DiskTestError {
    pub fn create(path: impl Into<String>, source: &std::io::Error) -> Self {
        DiskTestError::FilesystemCreate {
            path: path.into(),
            source: source.to_string(),
        }
    }

    pub fn write(path: impl Into<String>, source: &std::io::Error) -> Self {
        DiskTestError::FilesystemWrite {
            path: path.into(),
            source: source.to_string(),
        }
    }

    pub fn read(path: impl Into<String>, source: &std::io::Error) -> Self {
        DiskTestError::FilesystemRead {
            path: path.into(),
            source: source.to_string(),
        }
    }

    pub fn walk(path: impl Into<String>, source: &walkdir::Error) -> Self {
        DiskTestError::FilesystemWalk {
            path: path.into(),
            source: source.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, DiskTestError>;
