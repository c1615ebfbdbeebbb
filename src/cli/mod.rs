//! CLI module for karaoke-sync

use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub mod auth;
pub mod commands;

pub use auth::AuthManager;

#[derive(Parser, Debug)]
#[command(name = "karaoke-sync", about = "Download and sync karaoke songs from USDB")]
#[command(version, author)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Configure USDB credentials
    Auth {
        /// Username
        #[arg(short, long, env = "USDB_USER")]
        username: Option<String>,

        /// Password
        #[arg(short, long, env = "USDB_PASS")]
        password: Option<String>,

        /// Force re-authentication (ignore stored credentials)
        #[arg(long)]
        force: bool,

        /// Remove stored credentials
        #[arg(long, conflicts_with = "force")]
        logout: bool,
    },

    /// Download songs, or update every song in the library if none are given
    Sync {
        /// USDB song ids
        #[arg(value_name = "SONG_ID")]
        song_ids: Vec<u32>,

        /// Number of parallel downloads
        #[arg(short, long, default_value = "4")]
        parallel: usize,

        /// Directory to move replaced files into instead of the system trash
        #[arg(long, value_name = "DIR")]
        trash_dir: Option<PathBuf>,

        /// Base directory of song folders (overrides the saved setting)
        #[arg(long, env = "KARAOKE_SONG_DIR")]
        song_dir: Option<PathBuf>,
    },

    /// Refresh the USDB song list and show matching songs
    List {
        /// Only show songs whose artist or title contains this text
        search: Option<String>,

        /// Fetch the whole list instead of only songs added since the last refresh
        #[arg(long)]
        reload: bool,
    },

    /// Show songs in the library and their synced files
    Status {
        /// Only show this song
        song_id: Option<u32>,
    },

    /// Show or change download settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completions
    Completion {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print current settings
    Show,
    /// Set the base directory of song folders
    SetSongDir { path: PathBuf },
    /// Restore default settings
    Reset,
}
