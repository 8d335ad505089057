//! S3 object store and client creation.

use super::{ListPage, ObjectStore};
use crate::config::LogConfig;
use crate::error::{Result, ShardLogError};
use crate::logs::Shard;
use async_trait::async_trait;
use aws_config::timeout::TimeoutConfig;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::Client;
use bytes::Bytes;
use chrono::DateTime;
use tracing::debug;

/// Object store backed by S3 or an S3-compatible service.
#[derive(Debug, Clone)]
pub struct S3ObjectStore {
    client: Client,
}

impl S3ObjectStore {
    /// Wrap an existing client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Create a client from configuration.
    ///
    /// Explicit credentials from `config` are always used; the ambient AWS
    /// credential chain is never consulted.
    pub async fn connect(config: &LogConfig) -> Result<Self> {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());

        if let Some(region) = &config.region {
            loader = loader.region(Region::new(region.clone()));
        }

        // Custom endpoint (MinIO, LocalStack)
        if let Some(endpoint) = &config.endpoint {
            loader = loader.endpoint_url(endpoint);
        }

        let credentials = aws_sdk_s3::config::Credentials::new(
            config.access_key.clone(),
            config.secret_key.clone(),
            None,
            None,
            "shardlog",
        );
        loader = loader.credentials_provider(credentials);

        loader = loader.timeout_config(
            TimeoutConfig::builder()
                .operation_attempt_timeout(config.request_timeout())
                .build(),
        );

        let sdk_config = loader.load().await;
        let builder = aws_sdk_s3::config::Builder::from(&sdk_config);

        // Path-style access for S3-compatible endpoints
        let s3_config = if config.endpoint.is_some() {
            builder.force_path_style(true).build()
        } else {
            builder.build()
        };

        debug!(
            region = ?config.region,
            endpoint = ?config.endpoint,
            "Created S3 client"
        );

        Ok(Self::new(Client::from_conf(s3_config)))
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn list_objects(
        &self,
        bucket: &str,
        prefix: &str,
        continuation_token: Option<&str>,
        max_keys: usize,
    ) -> Result<ListPage> {
        let max_keys = i32::try_from(max_keys).unwrap_or(i32::MAX);

        let resp = self
            .client
            .list_objects_v2()
            .bucket(bucket)
            .prefix(prefix)
            .max_keys(max_keys)
            .set_continuation_token(continuation_token.map(str::to_string))
            .send()
            .await
            .map_err(|e| ShardLogError::listing(prefix, DisplayErrorContext(&e)))?;

        let mut shards = Vec::with_capacity(resp.contents().len());
        for obj in resp.contents() {
            let Some(key) = obj.key() else {
                return Err(ShardLogError::listing(prefix, "object without a key in listing"));
            };

            // Skip directory markers
            if key.ends_with('/') {
                continue;
            }

            let mut shard = Shard::new(key, reported_size(key, obj.size()));
            shard.last_modified = obj
                .last_modified()
                .and_then(|t| DateTime::from_timestamp(t.secs(), t.subsec_nanos()));
            shards.push(shard);
        }

        Ok(ListPage {
            shards,
            next_token: resp.next_continuation_token().map(str::to_string),
            truncated: resp.is_truncated().unwrap_or(false),
        })
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Bytes> {
        let resp = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| ShardLogError::fetch(key, DisplayErrorContext(&e)))?;

        let data = resp
            .body
            .collect()
            .await
            .map_err(|e| ShardLogError::fetch(key, e))?;

        Ok(data.into_bytes())
    }
}

/// Size of a listed object in bytes
///
/// Listings normally carry the size; when one does not, or reports a
/// negative value, the shard is shown as empty and the gap is logged.
fn reported_size(key: &str, size: Option<i64>) -> u64 {
    match size.map(u64::try_from) {
        Some(Ok(bytes)) => bytes,
        Some(Err(_)) | None => {
            debug!(key, size = ?size, "Listing did not report a usable object size");
            0
        }
    }
}
