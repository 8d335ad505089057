// Logs module - Shard listing, log assembly and tailing

mod assembler;
mod cancel;
mod client;
mod lister;
mod path;
mod reader;

pub use assembler::{assemble_shards, AssembledLog};
pub use cancel::{cancel_pair, CancelHandle, CancelSignal};
pub use client::{download_log, list_log_shards, tail_log, LogClient};
pub use lister::list_shards;
pub use path::{LogPath, Shard};
pub use reader::{read_last_lines, split_lines};
