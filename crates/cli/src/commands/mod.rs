mod chat;
mod daemon;
mod health;
mod sessions;

use crate::cli::{Cli, Commands, DaemonAction};
use crate::error::Result;
use crate::output::OutputFormat;

pub async fn dispatch(cli: Cli, format: OutputFormat) -> Result<()> {
    let Cli {
        base_url,
        no_daemon,
        command,
        ..
    } = cli;

    match command {
        Commands::Chat {
            url,
            content_file,
            title,
        } => {
            chat::chat(
                &base_url,
                no_daemon,
                &url,
                content_file.as_deref(),
                title.as_deref(),
            )
            .await
        }
        Commands::Ask {
            url,
            question,
            content_file,
            title,
        } => {
            chat::ask_once(
                &base_url,
                no_daemon,
                &url,
                &question,
                content_file.as_deref(),
                title.as_deref(),
                format,
            )
            .await
        }
        Commands::Sessions => sessions::execute(format).await,
        Commands::Health => health::execute(&base_url, format).await,
        Commands::Daemon { action } => match action {
            DaemonAction::Start { foreground } => daemon::start(&base_url, foreground, format).await,
            DaemonAction::Stop => daemon::stop(format).await,
            DaemonAction::Status => daemon::status(format).await,
        },
    }
}
