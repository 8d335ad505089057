// CLI module - User-facing command-line interface

mod output;

use crate::config::LogConfig;
use crate::error::Result;
use crate::logs::{cancel_pair, LogClient, LogPath};
use clap::{Parser, Subcommand};
use std::io::ErrorKind as IoErrorKind;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// shardlog - read logs stored as shards in object storage
#[derive(Parser)]
#[command(name = "shardlog")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (.toml or .json); the environment is used when absent
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Bucket holding the logs (overrides the configuration)
    #[arg(long, global = true)]
    bucket: Option<String>,

    /// Bucket region (overrides the configuration)
    #[arg(long, global = true)]
    region: Option<String>,

    /// Custom S3 endpoint such as MinIO or LocalStack (overrides the configuration)
    #[arg(long, global = true)]
    endpoint: Option<String>,

    /// Keys requested per listing page
    #[arg(long, global = true)]
    page_size: Option<usize>,

    /// Shard downloads in flight while assembling a log
    #[arg(long, global = true)]
    concurrency: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print or save a whole log
    Cat {
        /// Log path: `s3://bucket/prefix`, or a prefix in the configured bucket
        path: String,

        /// Save the log to this file instead of printing it
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the last lines of a log
    Tail {
        /// Log path: `s3://bucket/prefix`, or a prefix in the configured bucket
        path: String,

        /// Number of lines to display
        #[arg(short = 'n', long, default_value = "100")]
        lines: usize,
    },

    /// List the shards of a log
    Ls {
        /// Log path: `s3://bucket/prefix`, or a prefix in the configured bucket
        path: String,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

impl Cli {
    /// Run the CLI application
    pub fn run() -> Result<()> {
        let cli = Cli::parse();
        init_tracing();

        let runtime = tokio::runtime::Runtime::new()?;
        runtime.block_on(cli.execute())
    }

    /// Execute the parsed command
    async fn execute(&self) -> Result<()> {
        let config = self.load_config()?;

        let path = LogPath::parse_with_default_bucket(self.command.path(), &config.bucket)?;

        // Ctrl-C aborts the in-flight retrieval
        let (handle, signal) = cancel_pair();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                handle.cancel();
            }
        });

        let client = LogClient::connect_s3(config).await?.with_cancel_signal(signal);

        match &self.command {
            Commands::Cat { output: None, .. } => {
                let log = client.download_log(&path).await?;
                let mut file = log.reopen()?;
                let stdout = std::io::stdout();
                match std::io::copy(&mut file, &mut stdout.lock()) {
                    Ok(_) => Ok(()),
                    // Output piped into `head` and friends
                    Err(e) if e.kind() == IoErrorKind::BrokenPipe => Ok(()),
                    Err(e) => Err(e.into()),
                }
            }

            Commands::Cat {
                output: Some(dest), ..
            } => {
                let pb = output::create_progress_bar(&format!("Downloading {}", path));
                match client.download_log(&path).await {
                    Ok(log) => {
                        let shards = log.shard_count();
                        let bytes = log.len();
                        let saved = log.persist(dest)?;
                        output::finish_progress_success(
                            pb,
                            &format!(
                                "Saved {} shard(s), {} to {}",
                                shards,
                                output::format_size(bytes),
                                saved.display()
                            ),
                        );
                        Ok(())
                    }
                    Err(e) => {
                        output::finish_progress_error(pb, &format!("Download of {} failed", path));
                        Err(e)
                    }
                }
            }

            Commands::Tail { lines, .. } => {
                let tail = client.tail_log(&path, *lines).await?;
                output::print_lines(&tail);
                Ok(())
            }

            Commands::Ls { json, .. } => {
                let shards = client.list_shards(&path).await?;
                if *json {
                    output::print_shards_json(&shards)
                } else {
                    output::print_shard_table(&path, &shards);
                    Ok(())
                }
            }
        }
    }

    /// Load configuration from file or environment, then apply flag overrides
    fn load_config(&self) -> Result<LogConfig> {
        let config = match &self.config {
            Some(path) => LogConfig::from_file(path)?,
            None => LogConfig::from_env(),
        };

        let config = self.apply_overrides(config);
        config.validate()?;
        Ok(config)
    }

    fn apply_overrides(&self, mut config: LogConfig) -> LogConfig {
        if let Some(bucket) = &self.bucket {
            config.bucket = bucket.clone();
        }
        if let Some(region) = &self.region {
            config.region = Some(region.clone());
        }
        if let Some(endpoint) = &self.endpoint {
            config.endpoint = Some(endpoint.clone());
        }
        if let Some(page_size) = self.page_size {
            config.page_size = page_size;
        }
        if let Some(concurrency) = self.concurrency {
            config.fetch_concurrency = concurrency;
        }
        config
    }
}

impl Commands {
    fn path(&self) -> &str {
        match self {
            Commands::Cat { path, .. } | Commands::Tail { path, .. } | Commands::Ls { path, .. } => {
                path
            }
        }
    }
}

/// Install the stderr log subscriber
///
/// The filter comes from `SHARDLOG_LOG`, then `RUST_LOG`, and defaults to `warn`
/// so that stdout carries nothing but log content.
fn init_tracing() {
    let filter = EnvFilter::try_from_env("SHARDLOG_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tail_defaults() {
        let cli = Cli::try_parse_from(["shardlog", "tail", "s3://job-logs/tail"]).unwrap();
        match cli.command {
            Commands::Tail { ref path, lines } => {
                assert_eq!(path, "s3://job-logs/tail");
                assert_eq!(lines, 100);
            }
            _ => panic!("expected tail command"),
        }
    }

    #[test]
    fn test_parse_cat_with_output_and_global_flags() {
        let cli = Cli::try_parse_from([
            "shardlog",
            "cat",
            "paginate",
            "--output",
            "/tmp/job.log",
            "--bucket",
            "job-logs",
            "--page-size",
            "6",
        ])
        .unwrap();

        assert_eq!(cli.command.path(), "paginate");
        assert!(matches!(
            cli.command,
            Commands::Cat { output: Some(ref p), .. } if p == &PathBuf::from("/tmp/job.log")
        ));
        assert_eq!(cli.bucket.as_deref(), Some("job-logs"));
        assert_eq!(cli.page_size, Some(6));
    }

    #[test]
    fn test_apply_overrides() {
        let cli = Cli::try_parse_from([
            "shardlog",
            "--bucket",
            "override",
            "--endpoint",
            "http://localhost:9000",
            "--concurrency",
            "2",
            "ls",
            "logs",
        ])
        .unwrap();

        let config = cli.apply_overrides(LogConfig::new("from-file").with_region("us-west-2"));
        assert_eq!(config.bucket, "override");
        assert_eq!(config.region, Some("us-west-2".to_string()));
        assert_eq!(config.endpoint, Some("http://localhost:9000".to_string()));
        assert_eq!(config.fetch_concurrency, 2);
        assert_eq!(config.page_size, 1000);
    }

    #[test]
    fn test_parse_tail_line_count() {
        let cli = Cli::try_parse_from(["shardlog", "tail", "logs", "-n", "6"]).unwrap();
        assert!(matches!(cli.command, Commands::Tail { lines: 6, .. }));
    }
}
