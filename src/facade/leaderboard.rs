use crate::config::LeaderboardConfig;
use crate::core::{RankedRecord, Result, ViewParameters};
use crate::planner::FilterBuilder;
use crate::service::{CountService, CountSubscription, RankingQueryService, RankingSubscription};
use crate::session::{LeaderboardSession, ViewParameterStore};
use crate::stats::LeaderboardStatistics;
use crate::storage::RecordSource;
use std::sync::Arc;
use tracing::{Level, event};

/// Entry point tying a record source to the query and count services.
///
/// Cloning is cheap; every clone shares the same source and services.
#[derive(Clone)]
pub struct Leaderboard {
    source: Arc<dyn RecordSource>,
    config: LeaderboardConfig,
    filter: FilterBuilder,
    ranking: RankingQueryService,
    counts: CountService,
}

impl Leaderboard {
    /// Validates `config` and captures the current tokio runtime.
    pub fn open(source: Arc<dyn RecordSource>, config: LeaderboardConfig) -> Result<Self> {
        config.validate()?;
        let ranking = RankingQueryService::new(Arc::clone(&source), &config)?;
        let counts = CountService::new(Arc::clone(&source))?;
        event!(
            Level::INFO,
            page_size = config.page_size,
            min_battles = config.min_battles,
            "leaderboard opened"
        );
        Ok(Self {
            filter: FilterBuilder::new(config.clone()),
            source,
            config,
            ranking,
            counts,
        })
    }

    pub fn config(&self) -> &LeaderboardConfig {
        &self.config
    }

    pub fn filter(&self) -> &FilterBuilder {
        &self.filter
    }

    pub fn ranking(&self) -> &RankingQueryService {
        &self.ranking
    }

    pub fn counts(&self) -> &CountService {
        &self.counts
    }

    /// Session with its own, default-initialized parameter store.
    pub fn session(&self) -> Result<LeaderboardSession> {
        let params = ViewParameterStore::with_min_username_len(self.config.min_username_filter_len);
        self.session_with(Arc::new(params))
    }

    /// Session driven by an existing parameter store.
    pub fn session_with(&self, params: Arc<ViewParameterStore>) -> Result<LeaderboardSession> {
        LeaderboardSession::open(params, self.ranking.clone(), &self.counts, self.filter.clone())
    }

    /// Live page for fixed parameters, without a parameter store.
    pub fn subscribe(&self, params: &ViewParameters) -> RankingSubscription {
        let (predicate, window) = self.filter.plan(params);
        self.ranking.subscribe(predicate, window)
    }

    pub fn subscribe_count(&self) -> CountSubscription {
        self.counts.subscribe()
    }

    /// Live count of the records `params` would list.
    pub fn subscribe_filtered_count(&self, params: &ViewParameters) -> CountSubscription {
        self.counts.subscribe_filtered(self.filter.build(params))
    }

    /// One page, evaluated once.
    pub async fn page(&self, params: &ViewParameters) -> Result<Vec<RankedRecord>> {
        let (predicate, window) = self.filter.plan(params);
        self.ranking.query(&predicate, &window).await
    }

    pub async fn statistics(&self) -> Result<LeaderboardStatistics> {
        let snapshot = self.source.snapshot().await?;
        Ok(LeaderboardStatistics::compute(&snapshot.table, self.config.min_battles))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{DbError, PlayerStats, Realm};
    use crate::storage::InMemoryRankingStore;

    #[test]
    fn test_open_requires_runtime() {
        let store = Arc::new(InMemoryRankingStore::new());
        let err = Leaderboard::open(store, LeaderboardConfig::default()).err();
        assert!(matches!(err, Some(DbError::RuntimeUnavailable(_))));
    }

    #[tokio::test]
    async fn test_open_rejects_invalid_config() {
        let store = Arc::new(InMemoryRankingStore::new());
        let err = Leaderboard::open(store, LeaderboardConfig::default().page_size(0)).err();
        assert!(matches!(err, Some(DbError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn test_page_uses_configured_size() {
        let store = Arc::new(InMemoryRankingStore::new());
        for i in 0..10 {
            store
                .upsert(PlayerStats::new(i, format!("player{i}"), Realm::Ru).battles(600).victories(300 + i))
                .await
                .unwrap();
        }
        let board = Leaderboard::open(store, LeaderboardConfig::default().page_size(4)).unwrap();

        let first = board.page(&ViewParameters::default()).await.unwrap();
        assert_eq!(first.len(), 4);
        assert_eq!(first[0].record.spa_id, 9);

        let last = board.page(&ViewParameters::default().page(2)).await.unwrap();
        assert_eq!(last.len(), 2);
        assert_eq!(last[0].rank, 9);
    }
}
