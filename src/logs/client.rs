use super::assembler::{assemble_shards, AssembledLog};
use super::cancel::CancelSignal;
use super::lister::list_shards;
use super::path::{LogPath, Shard};
use super::reader::read_last_lines;
use crate::config::{ensure_credentials, LogConfig};
use crate::error::Result;
use crate::store::{ObjectStore, S3ObjectStore};
use std::sync::Arc;
use tracing::info;

/// LogClient retrieves sharded logs from one object store
///
/// Every call lists the shards afresh; nothing is cached between calls.
/// Credentials are checked before each call touches the store.
#[derive(Clone)]
pub struct LogClient {
    config: LogConfig,
    store: Arc<dyn ObjectStore>,
    cancel: CancelSignal,
}

impl LogClient {
    /// Create a client over an existing store
    pub fn new(config: LogConfig, store: Arc<dyn ObjectStore>) -> Self {
        Self {
            config,
            store,
            cancel: CancelSignal::never(),
        }
    }

    /// Create a client backed by S3
    ///
    /// Fails with a configuration error, without building a client, when
    /// credentials are missing.
    pub async fn connect_s3(config: LogConfig) -> Result<Self> {
        ensure_credentials(&config)?;
        let store = S3ObjectStore::connect(&config).await?;
        Ok(Self::new(config, Arc::new(store)))
    }

    /// Abort in-flight and future calls when `cancel` fires
    pub fn with_cancel_signal(mut self, cancel: CancelSignal) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn config(&self) -> &LogConfig {
        &self.config
    }

    /// List the shards of a log in key order
    pub async fn list_shards(&self, path: &LogPath) -> Result<Vec<Shard>> {
        self.preflight(path)?;
        list_shards(
            self.store.as_ref(),
            path,
            self.config.page_size,
            &self.cancel,
        )
        .await
    }

    /// Download and concatenate every shard of a log into a temporary file
    ///
    /// # Returns
    /// * `Ok(AssembledLog)` - The whole log, oldest byte first
    /// * `Err(ShardLogError)` - Configuration, listing, fetch or cancellation
    ///   failure; no partial log is ever returned
    pub async fn download_log(&self, path: &LogPath) -> Result<AssembledLog> {
        let shards = self.list_shards(path).await?;

        let log = assemble_shards(
            self.store.as_ref(),
            path,
            &shards,
            self.config.fetch_concurrency,
            &self.cancel,
        )
        .await?;

        info!(
            log = %path,
            shards = log.shard_count(),
            bytes = log.len(),
            "Downloaded log"
        );

        Ok(log)
    }

    /// Read the last `lines` lines of a log, oldest first
    ///
    /// Asking for zero lines returns immediately without listing or fetching.
    pub async fn tail_log(&self, path: &LogPath, lines: usize) -> Result<Vec<String>> {
        self.preflight(path)?;
        if lines == 0 {
            return Ok(Vec::new());
        }

        let shards = self.list_shards(path).await?;
        let tail = read_last_lines(self.store.as_ref(), path, &shards, lines, &self.cancel).await?;

        info!(
            log = %path,
            requested = lines,
            returned = tail.len(),
            "Tailed log"
        );

        Ok(tail)
    }

    /// Checks that run before any request is sent
    fn preflight(&self, path: &LogPath) -> Result<()> {
        ensure_credentials(&self.config)?;
        path.validate()
    }
}

/// Download the full log at `path`
pub async fn download_log(
    config: &LogConfig,
    store: Arc<dyn ObjectStore>,
    path: &LogPath,
) -> Result<AssembledLog> {
    LogClient::new(config.clone(), store).download_log(path).await
}

/// Read the last `lines` lines of the log at `path`, oldest first
pub async fn tail_log(
    config: &LogConfig,
    store: Arc<dyn ObjectStore>,
    path: &LogPath,
    lines: usize,
) -> Result<Vec<String>> {
    LogClient::new(config.clone(), store).tail_log(path, lines).await
}

/// List the shards of the log at `path`, in key order
pub async fn list_log_shards(
    config: &LogConfig,
    store: Arc<dyn ObjectStore>,
    path: &LogPath,
) -> Result<Vec<Shard>> {
    LogClient::new(config.clone(), store).list_shards(path).await
}
