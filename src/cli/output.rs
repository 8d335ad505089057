// Output formatting and display for CLI

use crate::error::{Result, ShardLogError};
use crate::logs::{LogPath, Shard};
use chrono::{DateTime, Local, Utc};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};

/// Print log lines to stdout exactly as stored
pub fn print_lines(lines: &[String]) {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    for line in lines {
        // Stop quietly when the reader goes away (e.g. piped into `head`)
        if writeln!(out, "{}", line).is_err() {
            return;
        }
    }
}

/// Print a formatted table of shards
pub fn print_shard_table(path: &LogPath, shards: &[Shard]) {
    if shards.is_empty() {
        eprintln!("{}", format!("No shards found under {}", path).yellow());
        return;
    }

    #[derive(Tabled)]
    struct ShardRow {
        #[tabled(rename = "#")]
        index: usize,
        #[tabled(rename = "Key")]
        key: String,
        #[tabled(rename = "Size")]
        size: String,
        #[tabled(rename = "Last Modified")]
        last_modified: String,
    }

    let rows: Vec<ShardRow> = shards
        .iter()
        .enumerate()
        .map(|(index, shard)| ShardRow {
            index,
            key: truncate(&shard.key, 60),
            size: format_size(shard.size_bytes),
            last_modified: shard
                .last_modified
                .map(format_timestamp)
                .unwrap_or_else(|| "-".to_string()),
        })
        .collect();

    let mut table = Table::new(rows);
    table
        .with(Style::rounded())
        .with(Modify::new(Rows::first()).with(Alignment::center()));

    let total: u64 = shards.iter().map(|s| s.size_bytes).sum();

    println!("\n{}\n", table);
    println!(
        "{}",
        format!(
            "Total: {} shard(s), {}",
            shards.len(),
            format_size(total)
        )
        .dimmed()
        .italic()
    );
}

/// Print shards as a JSON array
pub fn print_shards_json(shards: &[Shard]) -> Result<()> {
    let json = serde_json::to_string_pretty(shards)
        .map_err(|e| ShardLogError::Io(io::Error::new(io::ErrorKind::Other, e)))?;
    println!("{}", json);
    Ok(())
}

/// Format a byte count in human-readable form
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes < KB {
        format!("{}B", bytes)
    } else if bytes < MB {
        format!("{:.1}KB", bytes as f64 / KB as f64)
    } else if bytes < GB {
        format!("{:.1}MB", bytes as f64 / MB as f64)
    } else {
        format!("{:.2}GB", bytes as f64 / GB as f64)
    }
}

fn format_timestamp(at: DateTime<Utc>) -> String {
    let local: DateTime<Local> = at.into();
    local.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Shorten long keys from the left; the end of a key names the shard
fn truncate(s: &str, max_len: usize) -> String {
    let count = s.chars().count();
    if count <= max_len {
        s.to_string()
    } else {
        let tail: String = s.chars().skip(count - (max_len - 3)).collect();
        format!("...{}", tail)
    }
}

/// Create a spinner for long operations
pub fn create_progress_bar(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::default_spinner()
        .template("{spinner:.green} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
    pb.set_style(style);
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

/// Finish a spinner with success
pub fn finish_progress_success(pb: ProgressBar, message: &str) {
    pb.finish_with_message(format!("{} {}", "✓".green(), message));
}

/// Finish a spinner with error
pub fn finish_progress_error(pb: ProgressBar, message: &str) {
    pb.finish_with_message(format!("{} {}", "✗".red(), message));
}
