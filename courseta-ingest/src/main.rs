//! Courseta ingestion run
//!
//! Offline batch job: scrape the course forum and repository, merge the
//! results, and atomically replace the persisted snapshot the web server
//! reads.

use chrono::{NaiveDate, TimeZone, Utc};
use clap::Parser;
use courseta_core::{init_logging_with_level, IngestConfig};
use courseta_ingest::{build_snapshot, DiscourseClient, ForumScraper, GitHubClient, RepoWalker, SnapshotStore};
use std::path::PathBuf;

/// Scrape Discourse and GitHub into a fresh corpus snapshot
#[derive(Parser)]
#[command(name = "courseta-ingest")]
#[command(about = "Build the course corpus snapshot from Discourse and GitHub")]
#[command(version)]
struct Args {
    /// First day of the topic window (inclusive), YYYY-MM-DD
    #[arg(long, default_value = "2025-01-01")]
    start_date: NaiveDate,

    /// Last day of the topic window (inclusive), YYYY-MM-DD
    #[arg(long, default_value = "2025-04-14")]
    end_date: NaiveDate,

    /// Where to write the snapshot; defaults to the configured path
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// TOML file overriding the built-in ingestion settings
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    dotenvy::dotenv().ok();
    init_logging_with_level(&args.log_level);

    let config = match &args.config {
        Some(path) => IngestConfig::from_file(path)?,
        None => IngestConfig::from_env(),
    };

    let start = Utc.from_utc_datetime(&args.start_date.and_hms_opt(0, 0, 0).unwrap());
    let end = Utc.from_utc_datetime(&args.end_date.and_hms_opt(23, 59, 59).unwrap());
    if start > end {
        anyhow::bail!("start date {} is after end date {}", args.start_date, args.end_date);
    }

    println!("🧲 Ingesting {} .. {}", args.start_date, args.end_date);
    println!("📚 Forum: {}/{}", config.discourse_base_url, config.category_path);
    println!("🗂️  Repository: {}", config.github_repo);

    let scraper = ForumScraper::new(DiscourseClient::new(&config)?, config.max_pages);
    let walker = RepoWalker::new(GitHubClient::new(&config)?, config.allowed_extensions.clone());

    let snapshot = build_snapshot(&scraper, &walker, start, end).await;

    let output = args
        .output
        .unwrap_or_else(|| PathBuf::from(&config.snapshot_path));
    let store = SnapshotStore::new(&output);
    store.save(&snapshot)?;

    println!(
        "✅ Snapshot written to {} ({} posts, {} files)",
        output.display(),
        snapshot.discourse.len(),
        snapshot.github.len()
    );

    if snapshot.is_empty() {
        println!("⚠️  Snapshot is empty; check credentials and source availability");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_parsing() {
        let args = Args::parse_from(["courseta-ingest"]);
        assert_eq!(args.start_date, NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
        assert_eq!(args.end_date, NaiveDate::from_ymd_opt(2025, 4, 14).unwrap());
        assert!(args.output.is_none());

        let args = Args::parse_from([
            "courseta-ingest",
            "--start-date",
            "2025-05-01",
            "--end-date",
            "2025-08-31",
            "--output",
            "out.json",
        ]);
        assert_eq!(args.start_date, NaiveDate::from_ymd_opt(2025, 5, 1).unwrap());
        assert_eq!(args.output, Some(PathBuf::from("out.json")));
    }
}
