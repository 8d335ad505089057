use super::cancel::CancelSignal;
use super::path::{LogPath, Shard};
use super::reader::split_lines;
use crate::error::{Result, ShardLogError};
use crate::store::ObjectStore;
use bytes::Bytes;
use futures::stream::{self, StreamExt, TryStreamExt};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

/// A fully assembled log held in a temporary file
///
/// The file is deleted when the handle is dropped unless it has been moved
/// somewhere permanent with [`AssembledLog::persist`].
#[derive(Debug)]
pub struct AssembledLog {
    file: NamedTempFile,
    shard_count: usize,
    len: u64,
}

impl AssembledLog {
    /// Location of the temporary file
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Number of shards that were concatenated
    pub fn shard_count(&self) -> usize {
        self.shard_count
    }

    /// Total size in bytes
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Open a fresh read handle positioned at the start of the log
    pub fn reopen(&self) -> Result<std::fs::File> {
        Ok(self.file.reopen()?)
    }

    /// Read the raw bytes of the whole log
    pub async fn read_bytes(&self) -> Result<Vec<u8>> {
        Ok(tokio::fs::read(self.path()).await?)
    }

    /// Read the log as lines, oldest first
    pub async fn lines(&self) -> Result<Vec<String>> {
        let data = self.read_bytes().await?;
        Ok(split_lines(&data))
    }

    /// Move the log to `dest`, keeping it after the handle is gone
    pub fn persist<P: AsRef<Path>>(self, dest: P) -> Result<PathBuf> {
        let dest = dest.as_ref().to_path_buf();

        match self.file.persist(&dest) {
            Ok(_) => Ok(dest),
            // rename(2) cannot cross filesystems; copy instead and let the
            // temporary file be removed on drop
            Err(e) if crosses_devices(&e.error) => {
                std::fs::copy(e.file.path(), &dest)?;
                Ok(dest)
            }
            Err(e) => Err(e.error.into()),
        }
    }
}

fn crosses_devices(err: &std::io::Error) -> bool {
    err.kind() == std::io::ErrorKind::CrossesDevices
}

/// Fetch one shard, racing the request against cancellation
pub(crate) async fn fetch_shard(
    store: &dyn ObjectStore,
    path: &LogPath,
    shard: &Shard,
    cancel: &CancelSignal,
) -> Result<Bytes> {
    let result = cancel
        .guard(store.get_object(path.bucket(), &shard.key))
        .await;

    match result {
        Ok(data) => {
            debug!(key = %shard.key, bytes = data.len(), "Fetched shard");
            Ok(data)
        }
        Err(ShardLogError::Cancelled) => Err(ShardLogError::Cancelled),
        Err(e @ ShardLogError::Fetch { .. }) => {
            warn!(key = %shard.key, error = %e, "Shard fetch failed");
            Err(e)
        }
        // Make sure the failing key is always named
        Err(e) => {
            warn!(key = %shard.key, error = %e, "Shard fetch failed");
            Err(ShardLogError::fetch(shard.key.clone(), e))
        }
    }
}

/// Concatenate `shards` into a temporary file, in the order given
///
/// Up to `concurrency` fetches run at once; results are written strictly in
/// shard order. On any failure the temporary file is removed and the error
/// is returned.
///
/// # Arguments
/// * `store` - Store holding the shards
/// * `path` - Log the shards belong to
/// * `shards` - Shards in ascending key order
/// * `concurrency` - Maximum fetches in flight
/// * `cancel` - Aborts the assembly
pub async fn assemble_shards(
    store: &dyn ObjectStore,
    path: &LogPath,
    shards: &[Shard],
    concurrency: usize,
    cancel: &CancelSignal,
) -> Result<AssembledLog> {
    let temp = tempfile::Builder::new()
        .prefix("shardlog-")
        .suffix(".log")
        .tempfile()?;

    let mut out = tokio::fs::File::from_std(temp.as_file().try_clone()?);
    let mut len = 0u64;

    // Iterate by index: a closure over `&Shard` trips rustc's higher-ranked
    // lifetime inference and makes the future non-`Send`
    let mut fetches = stream::iter(0..shards.len())
        .map(|i| fetch_shard(store, path, &shards[i], cancel))
        .buffered(concurrency.max(1));

    while let Some(data) = fetches.try_next().await? {
        out.write_all(&data).await?;
        len += data.len() as u64;
    }

    out.flush().await?;
    drop(out);

    debug!(
        log = %path,
        shards = shards.len(),
        bytes = len,
        file = %temp.path().display(),
        "Assembled log"
    );

    Ok(AssembledLog {
        file: temp,
        shard_count: shards.len(),
        len,
    })
}
