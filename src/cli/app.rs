use super::{Cli, Command, ViewArgs};
use anyhow::{Context, Result, bail};
use clap::Parser;
use liveboard::presentation::render_page;
use liveboard::storage::import::import_file;
use liveboard::{
    InMemoryRankingStore, Leaderboard, LeaderboardConfig, LeaderboardStatistics, RankingEvent,
    ViewParameterStore, format_percent,
};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{Level, event};

pub struct App {
    cli: Cli,
}

impl App {
    pub fn from_args() -> Self {
        Self { cli: Cli::parse() }
    }

    pub async fn run(self) -> Result<()> {
        tracing_subscriber::fmt()
            .with_max_level(self.cli.log_level)
            .with_writer(std::io::stderr)
            .init();

        let config = match &self.cli.config {
            Some(path) => LeaderboardConfig::from_json_file(path)
                .with_context(|| format!("loading config from {}", path.display()))?,
            None => LeaderboardConfig::default(),
        };
        let (store, board) = liveboard::open_in_memory_with_config(config)?;
        load(&store, &self.cli.data).await?;

        match &self.cli.command {
            Command::Page { view, json } => print_page(&board, view, *json).await,
            Command::Stats { json } => print_stats(board.statistics().await?, *json),
            Command::Follow {
                view,
                interval,
                updates,
            } => follow(&store, &board, &self.cli.data, view, *interval, *updates).await,
        }
    }
}

async fn load(store: &InMemoryRankingStore, path: &Path) -> Result<usize> {
    let imported = import_file(store, path)
        .await
        .with_context(|| format!("importing {}", path.display()))?;
    event!(Level::INFO, imported, path = %path.display(), "player data imported");
    Ok(imported)
}

fn params_for(board: &Leaderboard, view: &ViewArgs) -> Arc<ViewParameterStore> {
    let params = ViewParameterStore::with_min_username_len(board.config().min_username_filter_len);
    view.apply(&params);
    Arc::new(params)
}

async fn print_page(board: &Leaderboard, view: &ViewArgs, json: bool) -> Result<()> {
    let params = params_for(board, view).get();
    let rows = board.page(&params).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    let mut count = board.subscribe_count();
    let total = tokio::time::timeout(Duration::from_secs(5), count.wait_for(|state| state.total().is_some()))
        .await
        .ok()
        .and_then(|state| state.ok())
        .and_then(|state| state.total());
    print!("{}", render_page(&rows, params.page, total, board.config().page_size));
    Ok(())
}

fn print_stats(stats: LeaderboardStatistics, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!("{} players, computed {}", stats.count, stats.created_at.to_rfc3339());
    for summary in &stats.fields {
        println!("\n{} (max {})", summary.field, format_percent(summary.max));
        for (point, fraction) in summary.points.iter().zip(&summary.distribution) {
            println!("  < {:>12}  {:>7}%", format_percent(*point), format_percent(fraction * 100.0));
        }
    }
    Ok(())
}

async fn follow(
    store: &InMemoryRankingStore,
    board: &Leaderboard,
    path: &Path,
    view: &ViewArgs,
    interval: u64,
    updates: Option<usize>,
) -> Result<()> {
    let params = params_for(board, view);
    let mut session = board.session_with(Arc::clone(&params))?;
    let page_size = board.config().page_size;

    let mut ticker = tokio::time::interval(Duration::from_secs(interval.max(1)));
    // The first tick fires immediately; the data was just loaded.
    ticker.tick().await;

    let mut printed = 0;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                event!(Level::INFO, "interrupted");
                return Ok(());
            }
            _ = ticker.tick() => {
                if let Err(err) = load(store, path).await {
                    event!(Level::WARN, error = %err, "re-import failed, keeping previous data");
                }
            }
            received = session.next_event() => {
                match received {
                    Some(RankingEvent::Failed(err)) => bail!("leaderboard feed failed: {err}"),
                    Some(_) => {
                        print!("{}", render_page(session.rows(), params.page(), session.total(), page_size));
                        println!();
                        printed += 1;
                        if updates.is_some_and(|limit| printed >= limit) {
                            return Ok(());
                        }
                    }
                    None => bail!("leaderboard feed ended"),
                }
            }
        }
    }
}
