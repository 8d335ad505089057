use crate::error::{Result, ShardLogError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifies one logical log: a bucket plus the key prefix its shards live under
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LogPath {
    bucket: String,
    prefix: String,
}

impl LogPath {
    /// Create a log path. Leading slashes are dropped from the prefix.
    pub fn new(bucket: impl Into<String>, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        Self {
            bucket: bucket.into(),
            prefix: prefix.trim_start_matches('/').to_string(),
        }
    }

    /// Parse `s3://bucket/prefix`, or treat `value` as a prefix inside `default_bucket`
    pub fn parse_with_default_bucket(value: &str, default_bucket: &str) -> Result<Self> {
        if value.contains("://") {
            return value.parse();
        }

        let path = Self::new(default_bucket, value);
        path.validate()?;
        Ok(path)
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Key prefix sent to the store when listing shards
    ///
    /// Matched as a raw key prefix: `job-1` also covers `job-10/...`, so a
    /// caller scoping to one directory writes `job-1/`. The empty prefix
    /// lists the whole bucket.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn validate(&self) -> Result<()> {
        if self.bucket.trim().is_empty() {
            return Err(ShardLogError::InvalidLogPath(format!(
                "no bucket given for '{}'",
                self.prefix
            )));
        }
        Ok(())
    }
}

impl FromStr for LogPath {
    type Err = ShardLogError;

    fn from_str(s: &str) -> Result<Self> {
        let rest = s.strip_prefix("s3://").ok_or_else(|| {
            ShardLogError::InvalidLogPath(format!("'{}' is not an s3:// path", s))
        })?;

        let (bucket, prefix) = rest.split_once('/').unwrap_or((rest, ""));
        let path = Self::new(bucket, prefix);
        path.validate()?;
        Ok(path)
    }
}

impl fmt::Display for LogPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s3://{}/{}", self.bucket, self.prefix)
    }
}

/// One stored object holding a contiguous slice of a log
///
/// Key order is shard order: the log writer names shards so that lexical key
/// order matches the order in which they were appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shard {
    pub key: String,
    pub size_bytes: u64,
    #[serde(default)]
    pub last_modified: Option<DateTime<Utc>>,
}

impl Shard {
    pub fn new(key: impl Into<String>, size_bytes: u64) -> Self {
        Self {
            key: key.into(),
            size_bytes,
            last_modified: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_s3_url() {
        let path: LogPath = "s3://job-logs/workspace/1/0".parse().unwrap();
        assert_eq!(path.bucket(), "job-logs");
        assert_eq!(path.prefix(), "workspace/1/0");
        assert_eq!(path.to_string(), "s3://job-logs/workspace/1/0");
    }

    #[test]
    fn test_parse_bucket_only() {
        let path: LogPath = "s3://job-logs".parse().unwrap();
        assert_eq!(path.prefix(), "");
    }

    #[test]
    fn test_parse_rejects_missing_bucket() {
        assert!("s3:///tail".parse::<LogPath>().is_err());
        assert!("gs://bucket/tail".parse::<LogPath>().is_err());
    }

    #[test]
    fn test_default_bucket() {
        let path = LogPath::parse_with_default_bucket("/tail", "job-logs").unwrap();
        assert_eq!(path.bucket(), "job-logs");
        assert_eq!(path.prefix(), "tail");

        let path = LogPath::parse_with_default_bucket("s3://other/tail/", "job-logs").unwrap();
        assert_eq!(path.bucket(), "other");
        assert_eq!(path.prefix(), "tail/");

        assert!(LogPath::parse_with_default_bucket("tail", "").is_err());
    }
}
