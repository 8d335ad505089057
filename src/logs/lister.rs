use super::cancel::CancelSignal;
use super::path::{LogPath, Shard};
use crate::error::{Result, ShardLogError};
use crate::store::ObjectStore;
use std::collections::HashSet;
use tracing::{debug, warn};

/// List every shard of a log, following continuation tokens until the store
/// reports the listing complete
///
/// # Arguments
/// * `store` - Store holding the shards
/// * `path` - Log whose shards are listed
/// * `page_size` - Keys requested per page
/// * `cancel` - Aborts the listing between or during page requests
///
/// # Returns
/// * `Ok(Vec<Shard>)` - All shards in ascending key order (empty if none exist)
/// * `Err(ShardLogError::Listing)` - A page failed or pagination state was malformed;
///   no partial listing is ever returned
pub async fn list_shards(
    store: &dyn ObjectStore,
    path: &LogPath,
    page_size: usize,
    cancel: &CancelSignal,
) -> Result<Vec<Shard>> {
    let prefix = path.prefix();
    let mut shards = Vec::new();
    let mut continuation_token: Option<String> = None;
    let mut seen_tokens = HashSet::new();
    let mut page = 0usize;

    loop {
        page += 1;

        let result = cancel
            .guard(store.list_objects(
                path.bucket(),
                prefix,
                continuation_token.as_deref(),
                page_size,
            ))
            .await;

        let listed = match result {
            Ok(listed) => listed,
            Err(e) => {
                warn!(bucket = path.bucket(), prefix = %prefix, page, error = %e, "Shard listing failed");
                return Err(e);
            }
        };

        debug!(
            bucket = path.bucket(),
            prefix = %prefix,
            page,
            keys = listed.shards.len(),
            truncated = listed.truncated,
            "Listed shard page"
        );

        shards.extend(listed.shards);

        match listed.next_token {
            Some(token) if token.is_empty() => {
                return Err(ShardLogError::listing(
                    prefix,
                    format!("page {} returned an empty continuation token", page),
                ));
            }
            Some(token) => {
                if !seen_tokens.insert(token.clone()) {
                    return Err(ShardLogError::listing(
                        prefix,
                        format!("continuation token repeated on page {}", page),
                    ));
                }
                continuation_token = Some(token);
            }
            None if listed.truncated => {
                return Err(ShardLogError::listing(
                    prefix,
                    format!("page {} is truncated but has no continuation token", page),
                ));
            }
            None => break,
        }
    }

    // Stable, so a store that already returns key order is left untouched
    shards.sort_by(|a, b| a.key.cmp(&b.key));

    debug!(
        bucket = path.bucket(),
        prefix = %prefix,
        pages = page,
        shards = shards.len(),
        "Shard listing complete"
    );

    Ok(shards)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::store::{InMemoryObjectStore, ListPage};
    use async_trait::async_trait;
    use bytes::Bytes;

    fn keys(shards: &[Shard]) -> Vec<&str> {
        shards.iter().map(|s| s.key.as_str()).collect()
    }

    #[tokio::test]
    async fn test_list_follows_pages() {
        let store = InMemoryObjectStore::new();
        for i in 0..9 {
            store.put("bucket", &format!("paginate/{}-file", i), format!("Line {}\n", i));
        }

        let path = LogPath::new("bucket", "paginate");
        let shards = list_shards(&store, &path, 4, &CancelSignal::never())
            .await
            .unwrap();

        assert_eq!(shards.len(), 9);
        assert_eq!(shards[0].key, "paginate/0-file");
        assert_eq!(shards[8].key, "paginate/8-file");
        assert_eq!(store.list_calls(), 3);
    }

    #[tokio::test]
    async fn test_list_sorts_unordered_pages() {
        let store = InMemoryObjectStore::new().with_reversed_pages();
        for name in ["a", "b", "c", "d", "e"] {
            store.put("bucket", &format!("logs/{}", name), "x\n");
        }

        let path = LogPath::new("bucket", "logs");
        let shards = list_shards(&store, &path, 2, &CancelSignal::never())
            .await
            .unwrap();

        assert_eq!(
            keys(&shards),
            vec!["logs/a", "logs/b", "logs/c", "logs/d", "logs/e"]
        );
    }

    #[tokio::test]
    async fn test_list_empty_prefix_is_not_an_error() {
        let store = InMemoryObjectStore::new();
        let path = LogPath::new("bucket", "nothing-here");

        let shards = list_shards(&store, &path, 10, &CancelSignal::never())
            .await
            .unwrap();
        assert!(shards.is_empty());
    }

    #[tokio::test]
    async fn test_list_matches_raw_key_prefix() {
        let store = InMemoryObjectStore::new();
        store.put("bucket", "job-1/a", "x\n");
        store.put("bucket", "job-10/a", "y\n");
        store.put("bucket", "job-2/a", "z\n");

        let path = LogPath::new("bucket", "job-1");
        let shards = list_shards(&store, &path, 10, &CancelSignal::never())
            .await
            .unwrap();
        assert_eq!(keys(&shards), vec!["job-1/a", "job-10/a"]);

        let path = LogPath::new("bucket", "job-1/");
        let shards = list_shards(&store, &path, 10, &CancelSignal::never())
            .await
            .unwrap();
        assert_eq!(keys(&shards), vec!["job-1/a"]);
    }

    #[tokio::test]
    async fn test_list_second_page_failure_fails_listing() {
        let store = InMemoryObjectStore::new();
        for i in 0..4 {
            store.put("bucket", &format!("logs/{}", i), "x\n");
        }
        store.fail_list_page(2);

        let path = LogPath::new("bucket", "logs");
        let err = list_shards(&store, &path, 2, &CancelSignal::never())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Listing);
    }

    /// Store whose pagination state is broken in a configurable way
    struct BrokenPaging {
        repeat_token: bool,
    }

    #[async_trait]
    impl ObjectStore for BrokenPaging {
        async fn list_objects(
            &self,
            _bucket: &str,
            _prefix: &str,
            _continuation_token: Option<&str>,
            _max_keys: usize,
        ) -> Result<ListPage> {
            let shards = vec![Shard::new("logs/a", 1)];
            if self.repeat_token {
                Ok(ListPage::more(shards, "same"))
            } else {
                Ok(ListPage {
                    shards,
                    next_token: None,
                    truncated: true,
                })
            }
        }

        async fn get_object(&self, _bucket: &str, key: &str) -> Result<Bytes> {
            Err(ShardLogError::fetch(key, "unused"))
        }
    }

    #[tokio::test]
    async fn test_list_rejects_repeated_token() {
        let store = BrokenPaging { repeat_token: true };
        let path = LogPath::new("bucket", "logs");

        let err = list_shards(&store, &path, 10, &CancelSignal::never())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Listing);
        assert!(err.to_string().contains("repeated"));
    }

    #[tokio::test]
    async fn test_list_rejects_truncated_page_without_token() {
        let store = BrokenPaging {
            repeat_token: false,
        };
        let path = LogPath::new("bucket", "logs");

        let err = list_shards(&store, &path, 10, &CancelSignal::never())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Listing);
    }
}
