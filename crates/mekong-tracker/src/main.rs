//! `mekong` - CLI for mekong-tracker
//!
//! Records download requests and feedback the way the site's forms do, and
//! prints the statistics and exports the admin pages offer.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Parser;
use tracing::warn;

use mekong_tracker::cli::{
    Cli, Command, ConfigCommand, DownloadCommand, ExportArgs, FeedbackCommand, RecentArgs,
};
use mekong_tracker::{
    init_logging, store, validate, AdminReport, Backend, Config, DownloadTracker,
    FeedbackCategory, FeedbackTracker, KeyValueStore, NewFeedback,
};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbosity());

    let config = Config::load_from(cli.config.clone())?;

    match cli.command {
        Command::Download(cmd) => {
            let tracker =
                DownloadTracker::new(open_store(&config)?).with_key(config.keys.downloads.clone());
            handle_download(&config, &tracker, cmd)
        }
        Command::Feedback(cmd) => {
            let tracker =
                FeedbackTracker::new(open_store(&config)?).with_key(config.keys.feedbacks.clone());
            handle_feedback(&config, &tracker, cmd)
        }
        Command::Report { json } => handle_report(&config, json),
        Command::Config(cmd) => handle_config(&config, cmd),
    }
}

fn open_store(config: &Config) -> anyhow::Result<Arc<dyn KeyValueStore>> {
    if config.storage.backend == Backend::Memory {
        warn!("Using the memory backend; nothing will be kept after this command");
    }
    store::open(config).context("failed to open storage")
}

fn write_export(text: &str, output: Option<&Path>) -> anyhow::Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, text)
                .with_context(|| format!("failed to write {}", path.display()))?;
            eprintln!("Exported to {}", path.display());
        }
        None => println!("{text}"),
    }
    Ok(())
}

fn handle_download(
    config: &Config,
    tracker: &DownloadTracker,
    cmd: DownloadCommand,
) -> anyhow::Result<()> {
    match cmd {
        DownloadCommand::Record { name, email } => {
            validate::download(&name, &email)?;
            let outcome = tracker.record_download(name.trim(), email.trim());
            if !outcome.success {
                bail!("download request was not saved (see log for details)");
            }
            println!(
                "Download recorded. Total downloads: {}",
                outcome.total_downloads
            );
        }
        DownloadCommand::Stats { json } => {
            let stats = tracker.stats();
            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                println!("Download Statistics");
                println!("===================");
                println!("Total downloads:  {}", stats.total_downloads);
                println!("Last updated:     {}", stats.last_updated.to_rfc3339());
                if let Some(newest) = stats.newest() {
                    println!(
                        "Latest request:   {} <{}> at {}",
                        newest.name,
                        newest.email,
                        newest.download_time.to_rfc3339()
                    );
                }
            }
        }
        DownloadCommand::Recent(RecentArgs { limit, json }) => {
            let recent = tracker.get_recent(limit.unwrap_or(config.display.recent_limit));
            if json {
                println!("{}", serde_json::to_string_pretty(&recent)?);
            } else if recent.is_empty() {
                println!("No downloads recorded yet.");
            } else {
                for record in recent {
                    println!(
                        "{}  {:<24} {}",
                        record.download_time.format("%Y-%m-%d %H:%M:%S"),
                        record.name,
                        record.email
                    );
                }
            }
        }
        DownloadCommand::Export(ExportArgs { output }) => {
            write_export(&tracker.export_as_text(), output.as_deref())?;
        }
    }
    Ok(())
}

fn handle_feedback(
    config: &Config,
    tracker: &FeedbackTracker,
    cmd: FeedbackCommand,
) -> anyhow::Result<()> {
    match cmd {
        FeedbackCommand::Submit(args) => {
            let feedback: NewFeedback = args.into();
            validate::feedback(&feedback)?;
            if !tracker.record_feedback(feedback) {
                bail!("feedback was not saved (see log for details)");
            }
            let stats = tracker.stats();
            if let Some(newest) = stats.recent_feedbacks.first() {
                println!("Feedback recorded with id {}.", newest.id);
            }
            println!(
                "Total feedback: {}, average rating: {:.1}",
                stats.total_feedbacks, stats.average_rating
            );
        }
        FeedbackCommand::Stats { json } => {
            let stats = tracker.stats();
            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                println!("Feedback Statistics");
                println!("===================");
                println!("Total feedback:   {}", stats.total_feedbacks);
                println!("Average rating:   {:.1} / 5", stats.average_rating);
                println!("Total likes:      {}", stats.total_likes());
                println!("Last updated:     {}", stats.last_updated.to_rfc3339());
                println!();
                for category in FeedbackCategory::ALL {
                    println!(
                        "  {:<12} {:>4}  ({:.0}%)",
                        category.as_str(),
                        stats.category_count(category),
                        stats.category_percentage(category)
                    );
                }
            }
        }
        FeedbackCommand::Recent(RecentArgs { limit, json }) => {
            let recent = tracker.get_recent(limit.unwrap_or(config.display.recent_limit));
            if json {
                println!("{}", serde_json::to_string_pretty(&recent)?);
            } else if recent.is_empty() {
                println!("No feedback yet.");
            } else {
                for record in recent {
                    println!(
                        "[{}] {} {:.1}/5 {} - {} ({} likes)",
                        record.id,
                        record.category,
                        record.rating,
                        record.title,
                        record.display_name(),
                        record.likes
                    );
                    println!("    {}", record.content);
                }
            }
        }
        FeedbackCommand::Like { id, by } => {
            if !tracker.like_feedback(&id, by) {
                bail!("no feedback with id {id} was updated");
            }
            if let Some(record) = tracker.stats().find(&id) {
                println!("Feedback {} now has {} likes.", record.id, record.likes);
            }
        }
        FeedbackCommand::Export(ExportArgs { output }) => {
            write_export(&tracker.export_as_text(), output.as_deref())?;
        }
        FeedbackCommand::Clear { yes } => {
            if !yes {
                println!("This will delete all stored feedback.");
                println!("Use --yes to confirm.");
                return Ok(());
            }
            if !tracker.clear_all() {
                bail!("feedback could not be cleared (see log for details)");
            }
            println!("All feedback cleared.");
        }
    }
    Ok(())
}

fn handle_report(config: &Config, json: bool) -> anyhow::Result<()> {
    let store = open_store(config)?;
    let downloads = DownloadTracker::new(store.clone()).with_key(config.keys.downloads.clone());
    let feedback = FeedbackTracker::new(store).with_key(config.keys.feedbacks.clone());
    let report = AdminReport::build(&downloads.stats(), &feedback.stats());

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Mekong Pathfinder Statistics");
    println!("============================");
    println!("Downloads:        {}", report.total_downloads);
    println!("Feedback:         {}", report.total_feedbacks);
    println!("Average rating:   {:.1} / 5", report.average_rating);
    println!("Total likes:      {}", report.total_likes);
    if let Some(at) = report.last_download {
        println!("Last download:    {}", at.to_rfc3339());
    }
    if let Some(at) = report.last_feedback {
        println!("Last feedback:    {}", at.to_rfc3339());
    }
    println!();
    println!("[Categories]");
    for share in &report.categories {
        println!(
            "  {:<12} {:>4}  ({:.0}%)",
            share.category.as_str(),
            share.count,
            share.percent
        );
    }
    println!();
    println!("[Ratings]");
    for star in (1..=5).rev() {
        let plural = if star == 1 { " " } else { "s" };
        println!("  {star} star{plural}  {}", report.ratings.count(star));
    }
    if report.ratings.unrated > 0 {
        println!("  unrated  {}", report.ratings.unrated);
    }
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Storage]");
                println!("  Backend:            {}", config.storage.backend);
                match config.storage.backend {
                    Backend::Sqlite => {
                        println!("  Database path:      {}", config.database_path().display());
                    }
                    Backend::File => {
                        println!("  Data directory:     {}", config.data_dir().display());
                    }
                    Backend::Memory => {
                        println!("  Quota (bytes):      {}", config.storage.quota_bytes);
                    }
                }
                println!();
                println!("[Keys]");
                println!("  Downloads:          {}", config.keys.downloads);
                println!("  Feedbacks:          {}", config.keys.feedbacks);
                println!();
                println!("[Display]");
                println!("  Recent limit:       {}", config.display.recent_limit);
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => println!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}
