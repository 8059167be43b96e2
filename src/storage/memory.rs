use super::source::{RecordSource, StoreChange, StoreSnapshot};
use super::table::RankingTable;
use crate::config::LeaderboardConfig;
use crate::core::{PlayerStats, RankingRecord, RecordId, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{RwLock, broadcast};
use tracing::{Level, event};

struct StoreState {
    table: RankingTable,
    version: u64,
}

/// In-memory ranking store with a write path for ingestion.
///
/// Writers take the lock for the duration of one write. Readers take it only
/// long enough to clone the persistent table, then query without any lock.
pub struct InMemoryRankingStore {
    state: RwLock<StoreState>,
    changes: broadcast::Sender<StoreChange>,
}

impl InMemoryRankingStore {
    pub fn new() -> Self {
        Self::with_change_buffer(LeaderboardConfig::default().change_buffer)
    }

    pub fn with_config(config: &LeaderboardConfig) -> Self {
        Self::with_change_buffer(config.change_buffer)
    }

    fn with_change_buffer(capacity: usize) -> Self {
        let (changes, _) = broadcast::channel(capacity.max(1));
        Self {
            state: RwLock::new(StoreState {
                table: RankingTable::new(),
                version: 0,
            }),
            changes,
        }
    }

    /// Insert or replace one player row.
    pub async fn upsert(&self, stats: PlayerStats) -> Result<RecordId> {
        let mut state = self.state.write().await;
        let upserted = state.table.upsert(stats)?;
        state.version += 1;

        let id = upserted.after.id;
        event!(Level::TRACE, record = %id, version = state.version, "ranking record written");

        // Published under the write lock so subscribers see versions in order.
        let _ = self.changes.send(StoreChange {
            version: state.version,
            before: upserted.before,
            after: Some(upserted.after),
        });
        Ok(id)
    }

    /// Upsert a batch. Stops at the first invalid row; rows before it stay written.
    pub async fn upsert_many(&self, rows: impl IntoIterator<Item = PlayerStats>) -> Result<usize> {
        let mut written = 0;
        for stats in rows {
            self.upsert(stats).await?;
            written += 1;
        }
        event!(Level::DEBUG, written, "ranking batch written");
        Ok(written)
    }

    pub async fn remove(&self, id: RecordId) -> Result<Arc<RankingRecord>> {
        let mut state = self.state.write().await;
        let removed = state.table.remove(id)?;
        state.version += 1;

        event!(Level::TRACE, record = %id, version = state.version, "ranking record removed");

        let _ = self.changes.send(StoreChange {
            version: state.version,
            before: Some(Arc::clone(&removed)),
            after: None,
        });
        Ok(removed)
    }

    pub async fn get(&self, id: RecordId) -> Option<Arc<RankingRecord>> {
        self.state.read().await.table.get(id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.table.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn version(&self) -> u64 {
        self.state.read().await.version
    }
}

impl Default for InMemoryRankingStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecordSource for InMemoryRankingStore {
    async fn snapshot(&self) -> Result<StoreSnapshot> {
        let state = self.state.read().await;
        Ok(StoreSnapshot {
            version: state.version,
            table: state.table.clone(),
        })
    }

    fn subscribe_changes(&self) -> broadcast::Receiver<StoreChange> {
        self.changes.subscribe()
    }
}
