// ============================================================================
// Liveboard Library
// ============================================================================

pub mod config;
pub mod core;
pub mod executor;
pub mod expression;
pub mod facade;
pub mod planner;
pub mod presentation;
pub mod service;
pub mod session;
pub mod stats;
pub mod storage;

// Re-export main types for convenience
pub use config::LeaderboardConfig;
pub use core::{
    DbError, PlayerStats, RankedRecord, RankingRecord, Realm, RealmFilter, RecordId, Result,
    SortField, UsernameFilter, ViewParameters,
};
pub use facade::Leaderboard;
pub use planner::{FilterBuilder, PageWindow, QueryPredicate};
pub use presentation::{format_percent, realm_display_name};
pub use service::{
    CountService, CountState, CountSubscription, PageView, RankingEvent, RankingQueryService,
    RankingSubscription, RowChange, ViewState,
};
pub use session::{LeaderboardSession, SessionId, ViewParameterStore};
pub use stats::{FieldSummary, LeaderboardStatistics};
pub use storage::{InMemoryRankingStore, RecordSource, StoreChange, StoreSnapshot};

// ============================================================================
// Quick start
// ============================================================================

/// Open a leaderboard over an in-memory store with the default configuration
///
/// Must be called from within a tokio runtime; live feeds run on it.
///
/// # Examples
///
/// ```no_run
/// use liveboard::{PlayerStats, Realm};
///
/// # tokio_test::block_on(async {
/// let (store, board) = liveboard::open_in_memory().unwrap();
/// store
///     .upsert(PlayerStats::new(1, "tanker", Realm::Eu).battles(1200).victories(700))
///     .await
///     .unwrap();
///
/// let mut session = board.session().unwrap();
/// session.params().set_sort("battles");
/// if let Some(event) = session.next_event().await {
///     println!("{event:?} rows={}", session.rows().len());
/// }
/// # });
/// ```
pub fn open_in_memory() -> Result<(std::sync::Arc<InMemoryRankingStore>, Leaderboard)> {
    open_in_memory_with_config(LeaderboardConfig::default())
}

/// Same as [`open_in_memory`], with an explicit configuration
///
/// # Examples
///
/// ```no_run
/// # tokio_test::block_on(async {
/// let config = liveboard::LeaderboardConfig::new().page_size(50).min_battles(100);
/// let (_store, board) = liveboard::open_in_memory_with_config(config).unwrap();
/// assert_eq!(board.config().page_size, 50);
/// # });
/// ```
pub fn open_in_memory_with_config(
    config: LeaderboardConfig,
) -> Result<(std::sync::Arc<InMemoryRankingStore>, Leaderboard)> {
    let store = std::sync::Arc::new(InMemoryRankingStore::with_config(&config));
    let board = Leaderboard::open(store.clone(), config)?;
    Ok((store, board))
}
