// Store module - object storage backends that hold log shards

mod fs;
mod memory;
mod s3;

pub use fs::FsObjectStore;
pub use memory::InMemoryObjectStore;
pub use s3::S3ObjectStore;

use crate::error::Result;
use crate::logs::Shard;
use async_trait::async_trait;
use bytes::Bytes;

/// Capability interface over an object store.
///
/// Implementations include:
/// - S3 and S3-compatible services (production)
/// - A local directory tree
/// - An in-memory map (tests)
///
/// Implementations report listing failures as
/// [`ShardLogError::Listing`](crate::error::ShardLogError::Listing) and
/// retrieval failures as
/// [`ShardLogError::Fetch`](crate::error::ShardLogError::Fetch). Retries and
/// timeouts are the implementation's business; callers never retry.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Lists one page of objects under `prefix`.
    ///
    /// # Arguments
    ///
    /// * `continuation_token` - Token from the previous page, `None` for the first page
    /// * `max_keys` - Upper bound on the number of objects in this page
    async fn list_objects(
        &self,
        bucket: &str,
        prefix: &str,
        continuation_token: Option<&str>,
        max_keys: usize,
    ) -> Result<ListPage>;

    /// Fetches the full content of one object.
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Bytes>;
}

/// One page of a listing.
#[derive(Debug, Clone, Default)]
pub struct ListPage {
    /// Objects in this page, in the order the store returned them
    pub shards: Vec<Shard>,

    /// Cursor for the next page, `None` once the listing is complete
    pub next_token: Option<String>,

    /// Whether the store reported more results after this page
    pub truncated: bool,
}

impl ListPage {
    /// A page that ends the listing.
    pub fn last(shards: Vec<Shard>) -> Self {
        Self {
            shards,
            next_token: None,
            truncated: false,
        }
    }

    /// A page followed by more results.
    pub fn more(shards: Vec<Shard>, next_token: impl Into<String>) -> Self {
        Self {
            shards,
            next_token: Some(next_token.into()),
            truncated: true,
        }
    }
}
