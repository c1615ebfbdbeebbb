//! karaoke-sync - Download karaoke songs from USDB and keep them in sync

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod config;
mod events;
mod library;
mod media;
mod song_txt;
mod sync;
mod usdb;
mod utils;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "karaoke_sync=debug,reqwest=debug"
    } else {
        "karaoke_sync=info"
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    match cli.command {
        Commands::Auth {
            username,
            password,
            force,
            logout,
        } => {
            cli::commands::auth(username, password, force, logout).await?;
        }
        Commands::Sync {
            song_ids,
            parallel,
            trash_dir,
            song_dir,
        } => {
            cli::commands::sync(song_ids, parallel, trash_dir, song_dir).await?;
        }
        Commands::List { search, reload } => {
            cli::commands::list(reload, search).await?;
        }
        Commands::Status { song_id } => {
            cli::commands::status(song_id).await?;
        }
        Commands::Config { action } => {
            cli::commands::config(action)?;
        }
        Commands::Completion { shell } => {
            cli::commands::completion(shell);
        }
    }

    Ok(())
}
