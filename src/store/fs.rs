use super::{ListPage, ObjectStore};
use crate::error::{Result, ShardLogError};
use crate::logs::Shard;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::path::{Component, Path, PathBuf};

/// Object store backed by a local directory tree.
///
/// Each bucket is a subdirectory of the root and each object key is a path
/// relative to that bucket, using `/` as separator. Listing pages use the
/// last key of the previous page as continuation token, so the paging
/// contract is the same as the remote stores.
#[derive(Debug, Clone)]
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Directory that holds the objects of `bucket`
    fn bucket_dir(&self, bucket: &str) -> Result<PathBuf> {
        let dir = self.root.join(Self::checked_relative(bucket)?);
        Ok(dir)
    }

    /// Reject keys that would escape the bucket directory
    fn checked_relative(key: &str) -> Result<PathBuf> {
        let path = Path::new(key);
        let escapes = path
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));

        if key.is_empty() || escapes {
            return Err(ShardLogError::InvalidLogPath(format!(
                "'{}' is not a valid relative key",
                key
            )));
        }

        Ok(path.to_path_buf())
    }

    /// Walk the bucket directory and collect every file as a shard, sorted by key
    async fn collect_shards(&self, bucket_dir: &Path, prefix: &str) -> std::io::Result<Vec<Shard>> {
        let mut shards = Vec::new();

        if !tokio::fs::try_exists(bucket_dir).await? {
            return Ok(shards);
        }

        let mut pending = vec![bucket_dir.to_path_buf()];
        while let Some(dir) = pending.pop() {
            let mut entries = tokio::fs::read_dir(&dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let metadata = entry.metadata().await?;
                let path = entry.path();

                if metadata.is_dir() {
                    pending.push(path);
                    continue;
                }

                let Ok(relative) = path.strip_prefix(bucket_dir) else {
                    continue;
                };
                let key = relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");

                if !key.starts_with(prefix) {
                    continue;
                }

                let mut shard = Shard::new(key, metadata.len());
                shard.last_modified = metadata.modified().ok().map(DateTime::<Utc>::from);
                shards.push(shard);
            }
        }

        shards.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(shards)
    }
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn list_objects(
        &self,
        bucket: &str,
        prefix: &str,
        continuation_token: Option<&str>,
        max_keys: usize,
    ) -> Result<ListPage> {
        let bucket_dir = self
            .bucket_dir(bucket)
            .map_err(|e| ShardLogError::listing(prefix, e))?;

        let all = self
            .collect_shards(&bucket_dir, prefix)
            .await
            .map_err(|e| ShardLogError::listing(prefix, e))?;

        let mut remaining = all
            .into_iter()
            .filter(|s| continuation_token.map_or(true, |token| s.key.as_str() > token));

        let shards: Vec<Shard> = remaining.by_ref().take(max_keys.max(1)).collect();

        if remaining.next().is_some() {
            let token = shards.last().map(|s| s.key.clone()).unwrap_or_default();
            Ok(ListPage::more(shards, token))
        } else {
            Ok(ListPage::last(shards))
        }
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Bytes> {
        let path = self
            .bucket_dir(bucket)
            .and_then(|dir| Ok(dir.join(Self::checked_relative(key)?)))
            .map_err(|e| ShardLogError::fetch(key, e))?;

        let data = tokio::fs::read(&path)
            .await
            .map_err(|e| ShardLogError::fetch(key, e))?;

        Ok(Bytes::from(data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use tempfile::TempDir;

    async fn write(root: &Path, relative: &str, content: &str) {
        let path = root.join(relative);
        tokio::fs::create_dir_all(path.parent().unwrap()).await.unwrap();
        tokio::fs::write(path, content).await.unwrap();
    }

    #[tokio::test]
    async fn test_list_nested_keys_in_order() {
        let temp_dir = TempDir::new().unwrap();
        write(temp_dir.path(), "bucket/job/2-file", "c\n").await;
        write(temp_dir.path(), "bucket/job/0-file", "a\n").await;
        write(temp_dir.path(), "bucket/job/sub/1-file", "b\n").await;
        write(temp_dir.path(), "bucket/other/x", "x\n").await;

        let store = FsObjectStore::new(temp_dir.path());
        let page = store.list_objects("bucket", "job/", None, 10).await.unwrap();

        let keys: Vec<_> = page.shards.iter().map(|s| s.key.as_str()).collect();
        assert_eq!(keys, vec!["job/0-file", "job/2-file", "job/sub/1-file"]);
        assert!(!page.truncated);
        assert!(page.shards.iter().all(|s| s.last_modified.is_some()));
    }

    #[tokio::test]
    async fn test_list_paginates() {
        let temp_dir = TempDir::new().unwrap();
        for i in 0..5 {
            write(temp_dir.path(), &format!("bucket/job/{}-file", i), "x\n").await;
        }

        let store = FsObjectStore::new(temp_dir.path());
        let first = store.list_objects("bucket", "job/", None, 3).await.unwrap();
        assert_eq!(first.shards.len(), 3);
        assert_eq!(first.next_token.as_deref(), Some("job/2-file"));

        let second = store
            .list_objects("bucket", "job/", first.next_token.as_deref(), 3)
            .await
            .unwrap();
        assert_eq!(second.shards.len(), 2);
        assert!(second.next_token.is_none());
    }

    #[tokio::test]
    async fn test_missing_bucket_lists_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let store = FsObjectStore::new(temp_dir.path());

        let page = store.list_objects("absent", "", None, 10).await.unwrap();
        assert!(page.shards.is_empty());
    }

    #[tokio::test]
    async fn test_get_object_rejects_parent_components() {
        let temp_dir = TempDir::new().unwrap();
        let store = FsObjectStore::new(temp_dir.path());

        let err = store.get_object("bucket", "../secret").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Fetch);
    }

    #[tokio::test]
    async fn test_get_object_reads_bytes() {
        let temp_dir = TempDir::new().unwrap();
        write(temp_dir.path(), "bucket/job/0-file", "Line 0\n").await;

        let store = FsObjectStore::new(temp_dir.path());
        let data = store.get_object("bucket", "job/0-file").await.unwrap();
        assert_eq!(&data[..], b"Line 0\n");
    }
}
