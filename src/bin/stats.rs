//! Loading-log statistics: files and segments logged per day and gateway.

use anyhow::{Context, Result};
use cdrlog::db::store::{daily_summary, entries_for_file, TIME_FORMAT};
use cdrlog::db::Db;
use cdrlog::Config;
use chrono::{Duration, Local};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "stats")]
#[command(about = "Summarize the CDR loading log")]
struct Args {
    /// Configuration file (defaults to $CDRLOG_CONFIG, then ./config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of past days to summarize
    #[arg(short, long, default_value = "7")]
    days: i64,

    /// Show the logged segments of a single file instead of the summary
    #[arg(short, long)]
    file: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Args::parse();
    let config = Config::load_report(args.config.as_deref())?;
    let db = Db::open_existing(config.db_path())
        .await
        .with_context(|| format!("Cannot read loading log {}", config.db_path().display()))?;

    if let Some(file_name) = &args.file {
        let entries = entries_for_file(&db, file_name).await?;
        if entries.is_empty() {
            println!("{} has not been logged.", file_name);
            return Ok(());
        }

        println!("\n=== {} ===\n", file_name);
        println!("{:-<80}", "");
        println!(
            "{:>4} {:<6} {:<24} {:<24} {:<20}",
            "Seg", "GW", "Begin", "End", "Logged at"
        );
        println!("{:-<80}", "");
        for entry in &entries {
            println!(
                "{:>4} {:<6} {:<24} {:<24} {:<20}",
                entry.segment.sequence,
                entry.gateway.label(),
                entry.segment.begin.format(TIME_FORMAT).to_string(),
                entry.segment.end.format(TIME_FORMAT).to_string(),
                entry.logged_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            );
        }
        println!("{:-<80}", "");
        if let Some(file_time) = entries[0].file_time {
            println!("File time: {}", file_time);
        }
        println!("Directory: {}\n", entries[0].file_dir);
        return Ok(());
    }

    let since = (Local::now() - Duration::days(args.days.max(1) - 1)).date_naive();
    let summary = daily_summary(&db, since).await?;

    println!("\n=== CDR Loading Log since {} ===\n", since);

    if summary.is_empty() {
        println!("No segments logged in the last {} day(s).\n", args.days.max(1));
        return Ok(());
    }

    println!("{:-<44}", "");
    println!("{:<12} {:<8} {:>10} {:>10}", "Day", "Gateway", "Files", "Segments");
    println!("{:-<44}", "");
    let mut total_files = 0;
    let mut total_segments = 0;
    for row in &summary {
        println!(
            "{:<12} {:<8} {:>10} {:>10}",
            row.day.to_string(),
            row.gateway.label(),
            row.files,
            row.segments
        );
        total_files += row.files;
        total_segments += row.segments;
    }
    println!("{:-<44}", "");
    println!("{:<21} {:>10} {:>10}", "Total", total_files, total_segments);
    println!();

    Ok(())
}
