use super::assembler::fetch_shard;
use super::cancel::CancelSignal;
use super::path::{LogPath, Shard};
use crate::error::Result;
use crate::store::ObjectStore;
use std::collections::VecDeque;
use tracing::debug;

/// Split raw log bytes into lines
///
/// Lines end at `\n`; a `\r` before it is dropped. A trailing terminator does
/// not produce an empty last line. Invalid UTF-8 is replaced rather than
/// rejected, since log content is never interpreted.
pub fn split_lines(data: &[u8]) -> Vec<String> {
    if data.is_empty() {
        return Vec::new();
    }

    let body = data.strip_suffix(b"\n").unwrap_or(data);

    body.split(|b| *b == b'\n')
        .map(|line| {
            let line = line.strip_suffix(b"\r").unwrap_or(line);
            String::from_utf8_lossy(line).into_owned()
        })
        .collect()
}

/// Read the last `lines` lines across `shards`, oldest first
///
/// Shards are fetched one at a time from the newest backwards and fetching
/// stops as soon as enough lines have been collected, so a small tail of a
/// long log touches only the last few shards.
///
/// # Arguments
/// * `store` - Store holding the shards
/// * `path` - Log the shards belong to
/// * `shards` - Shards in ascending key order
/// * `lines` - Number of lines wanted
/// * `cancel` - Aborts between or during fetches
///
/// # Returns
/// * `Ok(Vec<String>)` - At most `lines` lines; fewer if the log is shorter
/// * `Err(ShardLogError)` - A fetch failed or was cancelled
pub async fn read_last_lines(
    store: &dyn ObjectStore,
    path: &LogPath,
    shards: &[Shard],
    lines: usize,
    cancel: &CancelSignal,
) -> Result<Vec<String>> {
    let mut window: VecDeque<String> = VecDeque::new();
    let mut fetched = 0usize;

    for shard in shards.iter().rev() {
        if window.len() >= lines {
            break;
        }

        let data = fetch_shard(store, path, shard, cancel).await?;
        fetched += 1;

        // Prepend this shard's lines, newest first, until the window is full
        for line in split_lines(&data).into_iter().rev() {
            if window.len() == lines {
                break;
            }
            window.push_front(line);
        }
    }

    debug!(
        log = %path,
        requested = lines,
        returned = window.len(),
        shards_fetched = fetched,
        shards_total = shards.len(),
        "Read log tail"
    );

    Ok(window.into())
}
