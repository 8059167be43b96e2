/// Record source failure tests
///
/// A broken or closed store must surface as an explicit failure, never as an
/// empty leaderboard.

use async_trait::async_trait;
use liveboard::storage::RankingTable;
use liveboard::{
    CountState, DbError, Leaderboard, LeaderboardConfig, RankingEvent, RecordSource, Result,
    StoreChange, StoreSnapshot, ViewParameters, ViewState,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(5);

struct UnavailableSource {
    changes: broadcast::Sender<StoreChange>,
}

impl UnavailableSource {
    fn new() -> Self {
        let (changes, _) = broadcast::channel(8);
        Self { changes }
    }
}

#[async_trait]
impl RecordSource for UnavailableSource {
    async fn snapshot(&self) -> Result<StoreSnapshot> {
        Err(DbError::StoreUnavailable("replica offline".into()))
    }

    fn subscribe_changes(&self) -> broadcast::Receiver<StoreChange> {
        self.changes.subscribe()
    }
}

/// Serves an empty snapshot, but its change feed is already closed.
struct ClosedSource;

#[async_trait]
impl RecordSource for ClosedSource {
    async fn snapshot(&self) -> Result<StoreSnapshot> {
        Ok(StoreSnapshot {
            version: 0,
            table: RankingTable::new(),
        })
    }

    fn subscribe_changes(&self) -> broadcast::Receiver<StoreChange> {
        let (_tx, rx) = broadcast::channel(1);
        rx
    }
}

#[tokio::test]
async fn test_unavailable_source_fails_session() {
    let board = Leaderboard::open(Arc::new(UnavailableSource::new()), LeaderboardConfig::default()).unwrap();
    let mut session = board.session().unwrap();

    let event = timeout(WAIT, session.next_event()).await.unwrap().unwrap();
    assert_eq!(
        event,
        RankingEvent::Failed(DbError::StoreUnavailable("replica offline".into()))
    );
    assert!(matches!(session.state(), ViewState::Failed(DbError::StoreUnavailable(_))));
    assert!(session.rows().is_empty());

    let count = timeout(WAIT, session.count().wait_for(|state| matches!(state, CountState::Failed(_))))
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(count, CountState::Failed(DbError::StoreUnavailable(_))));
    assert_eq!(session.total(), None);
}

#[tokio::test]
async fn test_unavailable_source_fails_one_shot_queries() {
    let board = Leaderboard::open(Arc::new(UnavailableSource::new()), LeaderboardConfig::default()).unwrap();
    let err = board.page(&ViewParameters::default()).await.unwrap_err();
    assert!(err.is_transient());
    assert!(board.statistics().await.is_err());
}

#[tokio::test]
async fn test_wait_for_total_reports_failure() {
    let board = Leaderboard::open(Arc::new(UnavailableSource::new()), LeaderboardConfig::default()).unwrap();
    let mut count = board.subscribe_count();
    let err = timeout(WAIT, count.wait_for_total(10)).await.unwrap().unwrap_err();
    assert!(matches!(err, DbError::StoreUnavailable(_)));
}

#[tokio::test]
async fn test_empty_page_then_closed_feed() {
    let board = Leaderboard::open(Arc::new(ClosedSource), LeaderboardConfig::default()).unwrap();
    let mut session = board.session().unwrap();

    // An empty store is a ready, empty page.
    match timeout(WAIT, session.next_event()).await.unwrap().unwrap() {
        RankingEvent::Snapshot { rows, .. } => assert!(rows.is_empty()),
        other => panic!("expected empty snapshot, got {:?}", other),
    }
    assert_eq!(session.state(), ViewState::Ready);

    // Losing the change feed is a failure, distinct from that empty page.
    let event = timeout(WAIT, session.next_event()).await.unwrap().unwrap();
    assert_eq!(event, RankingEvent::Failed(DbError::StoreClosed));
    assert_eq!(session.state(), ViewState::Failed(DbError::StoreClosed));
}
