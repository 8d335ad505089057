// Integration tests running the log client over a local directory store

use shardlog::store::FsObjectStore;
use shardlog::{ErrorKind, LogClient, LogConfig, LogPath};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

fn write_shard(root: &Path, bucket: &str, key: &str, content: &str) {
    let path = root.join(bucket).join(key);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

fn client(root: &Path, page_size: usize) -> LogClient {
    let config = LogConfig::new("job-logs")
        .with_credentials("AKIA", "secret")
        .with_page_size(page_size);
    LogClient::new(config, Arc::new(FsObjectStore::new(root)))
}

#[tokio::test]
async fn test_download_and_persist_from_directory() {
    let temp_dir = TempDir::new().unwrap();
    for i in 0..9 {
        write_shard(
            temp_dir.path(),
            "job-logs",
            &format!("paginate/{}-file", i),
            &format!("Line {}\n", i),
        );
    }

    let client = client(temp_dir.path(), 4);
    let path = client.config().log_path("paginate");

    let log = client.download_log(&path).await.unwrap();
    assert_eq!(log.shard_count(), 9);

    let dest = temp_dir.path().join("assembled.log");
    log.persist(&dest).unwrap();

    let contents = std::fs::read_to_string(&dest).unwrap();
    let expected: String = (0..9).map(|i| format!("Line {}\n", i)).collect();
    assert_eq!(contents, expected);
}

#[tokio::test]
async fn test_tail_from_directory() {
    let temp_dir = TempDir::new().unwrap();
    write_shard(temp_dir.path(), "job-logs", "tail/first-file.txt", "Line 1\nLine 2\nLine 3\n");
    write_shard(temp_dir.path(), "job-logs", "tail/second-file.txt", "Line 4\nLine 5\nLine 6\n");
    write_shard(temp_dir.path(), "job-logs", "tail/third-file.txt", "Line 7\nLine 8\nLine 9\n");

    let client = client(temp_dir.path(), 2);
    let path: LogPath = "s3://job-logs/tail".parse().unwrap();

    let data = client.tail_log(&path, 6).await.unwrap();
    assert_eq!(
        data,
        vec!["Line 4", "Line 5", "Line 6", "Line 7", "Line 8", "Line 9"]
    );
}

#[tokio::test]
async fn test_list_shards_from_directory() {
    let temp_dir = TempDir::new().unwrap();
    write_shard(temp_dir.path(), "job-logs", "job/b", "bb\n");
    write_shard(temp_dir.path(), "job-logs", "job/a", "a\n");
    write_shard(temp_dir.path(), "job-logs", "job-2/a", "other\n");

    let client = client(temp_dir.path(), 1);
    let shards = client
        .list_shards(&LogPath::new("job-logs", "job/"))
        .await
        .unwrap();

    let keys: Vec<_> = shards.iter().map(|s| s.key.as_str()).collect();
    assert_eq!(keys, vec!["job/a", "job/b"]);
    assert_eq!(shards[1].size_bytes, 3);
}

#[tokio::test]
async fn test_shard_removed_after_listing_is_fetch_error() {
    let temp_dir = TempDir::new().unwrap();
    write_shard(temp_dir.path(), "job-logs", "job/a", "a\n");

    let store = FsObjectStore::new(temp_dir.path());
    let path = LogPath::new("job-logs", "job");
    let config = LogConfig::new("job-logs").with_credentials("AKIA", "secret");
    let shards = shardlog::logs::list_log_shards(&config, Arc::new(store.clone()), &path)
        .await
        .unwrap();

    std::fs::remove_file(temp_dir.path().join("job-logs/job/a")).unwrap();

    let err = shardlog::logs::assemble_shards(
        &store,
        &path,
        &shards,
        1,
        &shardlog::logs::CancelSignal::never(),
    )
    .await
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Fetch);
}
