use super::{ListPage, ObjectStore};
use crate::error::{Result, ShardLogError};
use crate::logs::Shard;
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Object store kept entirely in memory.
///
/// Serves as the test double for retrieval code: it counts calls, can fail a
/// given listing page or object, can return pages in reverse order and can
/// add latency to every call.
#[derive(Debug, Default)]
pub struct InMemoryObjectStore {
    objects: Mutex<BTreeMap<(String, String), Bytes>>,
    list_calls: AtomicUsize,
    get_calls: AtomicUsize,
    failing_pages: Mutex<HashSet<usize>>,
    failing_keys: Mutex<HashSet<String>>,
    reverse_pages: bool,
    latency: Option<Duration>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return every page's keys in descending order.
    pub fn with_reversed_pages(mut self) -> Self {
        self.reverse_pages = true;
        self
    }

    /// Sleep for `latency` before answering each call.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Store an object, replacing any previous content.
    pub fn put(&self, bucket: &str, key: &str, data: impl Into<Bytes>) {
        let mut objects = self.objects.lock().unwrap_or_else(|e| e.into_inner());
        objects.insert((bucket.to_string(), key.to_string()), data.into());
    }

    /// Fail the `page`-th listing request (1-based, counted across all listings).
    pub fn fail_list_page(&self, page: usize) {
        let mut pages = self.failing_pages.lock().unwrap_or_else(|e| e.into_inner());
        pages.insert(page);
    }

    /// Fail every fetch of `key`.
    pub fn fail_get(&self, key: &str) {
        let mut keys = self.failing_keys.lock().unwrap_or_else(|e| e.into_inner());
        keys.insert(key.to_string());
    }

    /// Number of listing requests served so far.
    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    /// Number of fetch requests served so far.
    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    async fn simulate_latency(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn list_objects(
        &self,
        bucket: &str,
        prefix: &str,
        continuation_token: Option<&str>,
        max_keys: usize,
    ) -> Result<ListPage> {
        let page_number = self.list_calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.simulate_latency().await;

        let should_fail = self
            .failing_pages
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(&page_number);
        if should_fail {
            return Err(ShardLogError::listing(
                prefix,
                format!("injected failure on page {}", page_number),
            ));
        }

        let objects = self.objects.lock().unwrap_or_else(|e| e.into_inner());

        // The token is the last key of the previous page
        let mut matching = objects
            .iter()
            .filter(|((b, key), _)| b == bucket && key.starts_with(prefix))
            .filter(|((_, key), _)| continuation_token.map_or(true, |token| key.as_str() > token))
            .map(|((_, key), data)| Shard::new(key.clone(), data.len() as u64));

        let mut shards: Vec<Shard> = matching.by_ref().take(max_keys.max(1)).collect();
        let has_more = matching.next().is_some();

        let next_token = if has_more {
            shards.last().map(|s| s.key.clone())
        } else {
            None
        };

        if self.reverse_pages {
            shards.reverse();
        }

        Ok(match next_token {
            Some(token) => ListPage::more(shards, token),
            None => ListPage::last(shards),
        })
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Bytes> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;

        let should_fail = self
            .failing_keys
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(key);
        if should_fail {
            return Err(ShardLogError::fetch(key, "injected failure"));
        }

        let objects = self.objects.lock().unwrap_or_else(|e| e.into_inner());
        objects
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
            .ok_or_else(|| ShardLogError::fetch(key, "no such key"))
    }
}
