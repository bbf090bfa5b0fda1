use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::output::OutputFormat;
use crate::styles::cli_styles;

#[derive(Parser, Debug)]
#[command(name = "sk")]
#[command(about = "Sidekick - chat with pages and videos from the command line")]
#[command(version)]
#[command(styles = cli_styles())]
pub struct Cli {
    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Output format: text (default), json, or ndjson
    #[arg(short = 'f', long, global = true, value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Base URL of the assist service
    #[arg(
        long,
        global = true,
        value_name = "URL",
        default_value = sidekick_client::DEFAULT_BASE_URL
    )]
    pub base_url: String,

    /// Skip the lifecycle daemon (sessions are not tracked or swept)
    #[arg(long, global = true)]
    pub no_daemon: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start an interactive chat panel for a page or video
    Chat {
        /// Page or YouTube watch URL
        url: String,
        /// File with the page text (required for non-YouTube URLs; stdin is
        /// reserved for the conversation)
        #[arg(long, value_name = "FILE")]
        content_file: Option<PathBuf>,
        /// Page title to report to the assist service (defaults to the URL)
        #[arg(long, value_name = "TITLE")]
        title: Option<String>,
    },

    /// Ask a single question about a page or video
    Ask {
        /// Page or YouTube watch URL
        url: String,
        /// Question to ask
        question: String,
        /// File with the page text (defaults to stdin for non-YouTube URLs)
        #[arg(long, value_name = "FILE")]
        content_file: Option<PathBuf>,
        /// Page title to report to the assist service (defaults to the URL)
        #[arg(long, value_name = "TITLE")]
        title: Option<String>,
    },

    /// List sessions currently tracked by the daemon
    Sessions,

    /// Check assist service health
    Health,

    /// Manage the session lifecycle daemon
    Daemon {
        #[command(subcommand)]
        action: DaemonAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum DaemonAction {
    /// Start the daemon
    Start {
        /// Run in the foreground instead of detaching
        #[arg(long)]
        foreground: bool,
    },
    /// Stop the daemon (sweeps any tracked sessions first)
    Stop,
    /// Show daemon status and tracked sessions
    Status,
}
