// Library exports for shardlog

pub mod cli;
pub mod config;
pub mod error;
pub mod logs;
pub mod store;

pub use config::{ensure_credentials, LogConfig};
pub use error::{ErrorKind, Result, ShardLogError};
pub use logs::{download_log, tail_log, AssembledLog, LogClient, LogPath, Shard};
pub use store::{ListPage, ObjectStore};
