pub mod app;

use clap::{Args, Parser, Subcommand};
use liveboard::ViewParameterStore;
use std::path::PathBuf;
use tracing::Level;

#[derive(Parser)]
#[command(name = "liveboard")]
#[command(about = "Live, paginated player leaderboard over crawler output")]
pub struct Cli {
    /// Crawler output: a JSON array of player rows
    #[arg(long)]
    pub data: PathBuf,

    /// Optional JSON file with leaderboard settings
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[arg(long, default_value_t = Level::INFO)]
    pub log_level: Level,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Print one page
    Page {
        #[command(flatten)]
        view: ViewArgs,
        #[arg(long)]
        json: bool,
    },
    /// Print per-metric maxima and distributions
    Stats {
        #[arg(long)]
        json: bool,
    },
    /// Re-import the data file periodically and print the page as it changes
    Follow {
        #[command(flatten)]
        view: ViewArgs,
        /// Seconds between imports
        #[arg(long, default_value_t = 5)]
        interval: u64,
        /// Stop after this many page updates
        #[arg(long)]
        updates: Option<usize>,
    },
}

#[derive(Args, Clone)]
pub struct ViewArgs {
    #[arg(long, default_value_t = 0)]
    pub page: u64,
    #[arg(long, default_value = "vpb")]
    pub sort: String,
    #[arg(long, default_value = "all")]
    pub realm: String,
    /// Username prefix, case-insensitive
    #[arg(long)]
    pub user: Option<String>,
}

impl ViewArgs {
    /// Push the flags through the store's setters so they get the same
    /// normalization as interactive changes.
    pub fn apply(&self, store: &ViewParameterStore) {
        store.set_page(self.page);
        store.set_sort(&self.sort);
        store.set_realm(&self.realm);
        store.set_username(self.user.as_deref());
    }
}
