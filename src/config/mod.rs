use crate::error::{Result, ShardLogError};
use crate::logs::LogPath;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;

/// S3 rejects `max-keys` above this value
pub const MAX_PAGE_SIZE: usize = 1000;

/// Settings needed to reach the bucket that holds log shards
#[derive(Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Bucket that holds the log shards
    #[serde(default)]
    pub bucket: String,

    /// Region of the bucket
    #[serde(default)]
    pub region: Option<String>,

    /// Custom endpoint (MinIO, LocalStack). Enables path-style addressing.
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Access key id
    #[serde(default)]
    pub access_key: String,

    /// Secret access key
    #[serde(default)]
    pub secret_key: String,

    /// Keys requested per listing page
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Maximum number of shard downloads in flight during assembly
    #[serde(default = "default_fetch_concurrency")]
    pub fetch_concurrency: usize,

    /// Per-request timeout handed to the transport (in seconds)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

// Default value functions for serde
fn default_page_size() -> usize {
    MAX_PAGE_SIZE
}

fn default_fetch_concurrency() -> usize {
    4
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            bucket: String::new(),
            region: None,
            endpoint: None,
            access_key: String::new(),
            secret_key: String::new(),
            page_size: default_page_size(),
            fetch_concurrency: default_fetch_concurrency(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

// The secret never ends up in logs or panic messages
impl fmt::Debug for LogConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogConfig")
            .field("bucket", &self.bucket)
            .field("region", &self.region)
            .field("endpoint", &self.endpoint)
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .field("page_size", &self.page_size)
            .field("fetch_concurrency", &self.fetch_concurrency)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

impl LogConfig {
    /// Create a configuration for the given bucket with default settings
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            ..Default::default()
        }
    }

    /// Set explicit credentials.
    pub fn with_credentials(
        mut self,
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        self.access_key = access_key.into();
        self.secret_key = secret_key.into();
        self
    }

    /// Set the bucket region.
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Set a custom endpoint (for MinIO or LocalStack).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Set the listing page size.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Set the assembly fetch concurrency.
    pub fn with_fetch_concurrency(mut self, fetch_concurrency: usize) -> Self {
        self.fetch_concurrency = fetch_concurrency;
        self
    }

    /// Load a configuration file (supports TOML and JSON)
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            ShardLogError::InvalidConfig(format!("Failed to read config file: {}", e))
        })?;

        // Determine format based on file extension
        let extension = path.extension().and_then(|s| s.to_str()).unwrap_or("");

        let mut config = match extension {
            "toml" => Self::parse_toml(&contents)?,
            "json" => Self::parse_json(&contents)?,
            _ => {
                return Err(ShardLogError::InvalidConfig(format!(
                    "Unsupported file format: {}. Use .toml or .json",
                    extension
                )))
            }
        };

        config.expand_env_vars();
        config.validate()?;

        Ok(config)
    }

    fn parse_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents)
            .map_err(|e| ShardLogError::InvalidConfig(format!("Failed to parse TOML: {}", e)))
    }

    fn parse_json(contents: &str) -> Result<Self> {
        serde_json::from_str(contents)
            .map_err(|e| ShardLogError::InvalidConfig(format!("Failed to parse JSON: {}", e)))
    }

    /// Build a configuration from the process environment
    ///
    /// Reads `SHARDLOG_BUCKET`, `SHARDLOG_REGION`, `SHARDLOG_ENDPOINT`,
    /// `AWS_ACCESS_KEY_ID` and `AWS_SECRET_ACCESS_KEY`. Missing credentials
    /// are left empty and rejected later by [`ensure_credentials`].
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.is_empty());

        Self {
            bucket: lookup("SHARDLOG_BUCKET").unwrap_or_default(),
            region: non_empty("SHARDLOG_REGION").or_else(|| non_empty("AWS_REGION")),
            endpoint: non_empty("SHARDLOG_ENDPOINT"),
            access_key: lookup("AWS_ACCESS_KEY_ID").unwrap_or_default(),
            secret_key: lookup("AWS_SECRET_ACCESS_KEY").unwrap_or_default(),
            ..Default::default()
        }
    }

    /// Validate the structure of the configuration
    ///
    /// Credentials are checked separately by [`ensure_credentials`] right
    /// before retrieval. The bucket may be left empty when every log path
    /// names its own bucket.
    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(ShardLogError::ConfigValidationError(format!(
                "page_size must be between 1 and {}",
                MAX_PAGE_SIZE
            )));
        }

        if self.fetch_concurrency == 0 {
            return Err(ShardLogError::ConfigValidationError(
                "fetch_concurrency must be at least 1".to_string(),
            ));
        }

        if self.request_timeout_secs == 0 {
            return Err(ShardLogError::ConfigValidationError(
                "request_timeout_secs must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    /// Log path for a prefix inside the configured bucket
    pub fn log_path(&self, prefix: impl Into<String>) -> LogPath {
        LogPath::new(self.bucket.clone(), prefix)
    }

    /// Get the request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    fn expand_env_vars(&mut self) {
        let lookup = |name: &str| std::env::var(name).ok();
        self.bucket = expand_references(&self.bucket, lookup);
        self.access_key = expand_references(&self.access_key, lookup);
        self.secret_key = expand_references(&self.secret_key, lookup);
        self.region = self.region.as_deref().map(|s| expand_references(s, lookup));
        self.endpoint = self.endpoint.as_deref().map(|s| expand_references(s, lookup));
    }
}

/// Expand `$VAR` and `${VAR}` references in a string
///
/// A reference takes the longest run of `[A-Za-z0-9_]` after the `$`, so
/// `$LOG_SECRET` never resolves through a shorter `$LOG`. References to unset
/// variables, and a `$` not followed by a name, are kept as written.
fn expand_references<F>(s: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let is_name = |c: char| c.is_ascii_alphanumeric() || c == '_';
    let mut result = String::with_capacity(s.len());
    let mut rest = s;

    while let Some(pos) = rest.find('$') {
        result.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];

        let (name, reference_len) = match after.strip_prefix('{') {
            Some(braced) => match braced.find('}') {
                Some(end) if end > 0 && braced[..end].chars().all(is_name) => {
                    (&braced[..end], end + 2)
                }
                _ => ("", 0),
            },
            None => {
                let end = after.find(|c: char| !is_name(c)).unwrap_or(after.len());
                (&after[..end], end)
            }
        };

        let reference = &rest[pos..pos + 1 + reference_len];
        let value = if name.is_empty() { None } else { lookup(name) };
        result.push_str(value.as_deref().unwrap_or(reference));
        rest = &rest[pos + 1 + reference_len..];
    }

    result.push_str(rest);
    result
}

/// Fail fast when the access key or secret key is missing
///
/// Runs before every retrieval so that a misconfigured process never issues
/// a request. The error is [`ShardLogError::Configuration`], never a
/// retrieval error.
pub fn ensure_credentials(config: &LogConfig) -> Result<()> {
    let mut missing = Vec::new();
    if config.access_key.trim().is_empty() {
        missing.push("access key");
    }
    if config.secret_key.trim().is_empty() {
        missing.push("secret key");
    }

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ShardLogError::Configuration(format!(
            "missing {}",
            missing.join(" and ")
        )))
    }
}
