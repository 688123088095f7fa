pub mod buffer_pool;
pub mod cancel;
pub mod cli;
pub mod config;
pub mod error;
pub mod generate;
pub mod hash;
pub mod model;
pub mod orchestrator;
pub mod planner;
pub mod queue;
pub mod recorder;
pub mod sizing;
pub mod utils;
pub mod verify;
pub mod writer;

pub use buffer_pool::BufferPool;
pub use cancel::CancelToken;
pub use config::RuntimeConfig;
pub use error::{DiskTestError, Result};
pub use recorder::{InMemRecorder, Recorder, SqliteRecorder};
