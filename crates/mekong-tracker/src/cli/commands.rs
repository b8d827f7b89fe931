//! CLI command definitions.

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

use crate::feedback::{FeedbackCategory, NewFeedback};

/// Download tracker commands.
#[derive(Debug, Subcommand)]
pub enum DownloadCommand {
    /// Record a download request
    Record {
        /// Name from the download form
        #[arg(short, long)]
        name: String,

        /// Email from the download form
        #[arg(short, long)]
        email: String,
    },

    /// Show the stored download collection
    Stats {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// List the most recent downloads
    Recent(RecentArgs),

    /// Export all download data as JSON
    Export(ExportArgs),
}

/// Feedback tracker commands.
#[derive(Debug, Subcommand)]
pub enum FeedbackCommand {
    /// Submit a feedback entry
    Submit(SubmitArgs),

    /// Show feedback statistics
    Stats {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// List the most recent feedback
    Recent(RecentArgs),

    /// Like a feedback entry
    Like {
        /// Feedback id
        id: String,

        /// Number of likes to add
        #[arg(long, default_value = "1")]
        by: u64,
    },

    /// Export all feedback data as JSON
    Export(ExportArgs),

    /// Delete all stored feedback
    Clear {
        /// Skip confirmation
        #[arg(short, long)]
        yes: bool,
    },
}

/// Arguments for `recent` listings.
#[derive(Debug, Args)]
pub struct RecentArgs {
    /// Maximum number of entries (defaults to `display.recent_limit`)
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Arguments for `export`.
#[derive(Debug, Args)]
pub struct ExportArgs {
    /// Write to this file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

/// Feedback form fields.
#[derive(Debug, Args)]
pub struct SubmitArgs {
    /// Your name
    #[arg(short, long, default_value = "")]
    pub name: String,

    /// Your email
    #[arg(short, long)]
    pub email: String,

    /// Phone number
    #[arg(short, long)]
    pub phone: Option<String>,

    /// What the feedback is about
    #[arg(long, value_enum)]
    pub category: CategoryArg,

    /// Rating from 0 to 5
    #[arg(short, long)]
    pub rating: f64,

    /// Short headline
    #[arg(short, long)]
    pub title: String,

    /// Feedback text
    #[arg(long)]
    pub content: String,

    /// Hide your name when the feedback is shown
    #[arg(short, long)]
    pub anonymous: bool,

    /// Avatar image URL
    #[arg(long)]
    pub avatar: Option<String>,
}

impl From<SubmitArgs> for NewFeedback {
    fn from(args: SubmitArgs) -> Self {
        Self {
            name: args.name,
            email: args.email,
            phone: args.phone,
            category: args.category.into(),
            rating: args.rating,
            title: args.title,
            content: args.content,
            is_anonymous: args.anonymous,
            avatar: args.avatar,
        }
    }
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Feedback category argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CategoryArg {
    /// Feature request
    Feature,
    /// Improvement suggestion
    Improvement,
    /// Bug report
    Bug,
    /// Anything else
    Other,
}

impl From<CategoryArg> for FeedbackCategory {
    fn from(arg: CategoryArg) -> Self {
        match arg {
            CategoryArg::Feature => Self::Feature,
            CategoryArg::Improvement => Self::Improvement,
            CategoryArg::Bug => Self::Bug,
            CategoryArg::Other => Self::Other,
        }
    }
}
