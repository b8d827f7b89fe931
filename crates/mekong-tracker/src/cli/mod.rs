//! Command-line interface for mekong-tracker.
//!
//! This module provides the CLI structure for the `mekong` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    CategoryArg, ConfigCommand, DownloadCommand, ExportArgs, FeedbackCommand, RecentArgs,
    SubmitArgs,
};

use crate::logging::Verbosity;

/// mekong - Download and feedback records for the Mekong Pathfinder site
#[derive(Debug, Parser)]
#[command(name = "mekong")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Record and inspect download requests
    #[command(subcommand)]
    Download(DownloadCommand),

    /// Record and inspect feedback
    #[command(subcommand)]
    Feedback(FeedbackCommand),

    /// Show the admin statistics summary
    Report {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.quiet, self.verbose)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_name() {
        assert_eq!(Cli::command().get_name(), "mekong");
    }

    #[test]
    fn test_cli_verify() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_verbosity_flags() {
        let cli = Cli::try_parse_from(["mekong", "-q", "report"]).unwrap();
        assert_eq!(cli.verbosity(), Verbosity::Quiet);

        let cli = Cli::try_parse_from(["mekong", "-vv", "report"]).unwrap();
        assert_eq!(cli.verbosity(), Verbosity::Trace);
    }

    #[test]
    fn test_parse_download_record() {
        let cli = Cli::try_parse_from([
            "mekong", "download", "record", "--name", "Alice", "--email", "a@x.com",
        ])
        .unwrap();
        match cli.command {
            Command::Download(DownloadCommand::Record { name, email }) => {
                assert_eq!(name, "Alice");
                assert_eq!(email, "a@x.com");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_feedback_submit() {
        let cli = Cli::try_parse_from([
            "mekong",
            "feedback",
            "submit",
            "--email",
            "a@x.com",
            "--category",
            "improvement",
            "--rating",
            "4.5",
            "--title",
            "Maps",
            "--content",
            "More maps",
            "--anonymous",
        ])
        .unwrap();
        match cli.command {
            Command::Feedback(FeedbackCommand::Submit(args)) => {
                assert_eq!(args.category, CategoryArg::Improvement);
                assert!((args.rating - 4.5).abs() < f64::EPSILON);
                assert!(args.anonymous);
                assert!(args.name.is_empty());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_feedback_like_default_increment() {
        let cli = Cli::try_parse_from(["mekong", "feedback", "like", "1717230600000"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Feedback(FeedbackCommand::Like { by: 1, .. })
        ));
    }

    #[test]
    fn test_parse_recent_limit() {
        let cli = Cli::try_parse_from(["mekong", "download", "recent", "-l", "3"]).unwrap();
        match cli.command {
            Command::Download(DownloadCommand::Recent(args)) => {
                assert_eq!(args.limit, Some(3));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_with_config() {
        let cli =
            Cli::try_parse_from(["mekong", "-c", "/custom/config.toml", "config", "path"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/custom/config.toml")));
    }

    #[test]
    fn test_rejects_unknown_category() {
        let result = Cli::try_parse_from([
            "mekong", "feedback", "submit", "--email", "a@x.com", "--category", "praise",
            "--rating", "5", "--title", "t", "--content", "c",
        ]);
        assert!(result.is_err());
    }
}
