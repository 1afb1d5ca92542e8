use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::ranking::types::PreferredDifficulty;

#[derive(Parser, Debug)]
#[command(author, version, about = "adaptive placement ranking engine")]
pub struct Cli {
    /// Command
    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
#[clap(rename_all = "kebab-case")]
pub enum Command {
    /// Start the HTTP server
    Serve {
        /// Port number (optional, defaults to 3000)
        #[arg(short, long, default_value_t = 3000)]
        port: u16,
    },
    /// Create the database schema
    InitDb {
        /// Drop all tables first
        #[arg(long)]
        reset: bool,
    },
    /// Settle one match (or a JSON array of matches) from a file
    Settle {
        #[arg(short, long)]
        file: PathBuf,
    },
    /// Tune one player's config, or every player when no uid is given
    Tune {
        #[arg(short, long)]
        uid: Option<String>,
    },
    /// Fold new match records into seed statistics
    RefreshSeeds {
        /// Only refresh this seed
        #[arg(short, long)]
        seed: Option<String>,
    },
    /// Remove seed statistics not analyzed recently
    Cleanup {
        /// Days to keep (defaults to the configured retention)
        #[arg(short, long)]
        days: Option<i64>,
    },
    /// Recommend seeds for a player
    Recommend {
        #[arg(short, long)]
        uid: String,
        #[arg(short, long, default_value = "balanced")]
        difficulty: PreferredDifficulty,
        #[arg(short, long, default_value_t = 5)]
        limit: usize,
    },
    /// Print row counts
    Stats,
}
