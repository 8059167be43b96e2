use super::table::RankingTable;
use crate::core::{RankingRecord, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Point-in-time view of the collection, tagged with the version of the last
/// write it contains.
#[derive(Debug, Clone)]
pub struct StoreSnapshot {
    pub version: u64,
    pub table: RankingTable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Inserted,
    Updated,
    Removed,
}

/// One committed write, published after it is visible to snapshots.
#[derive(Debug, Clone)]
pub struct StoreChange {
    pub version: u64,
    pub before: Option<Arc<RankingRecord>>,
    pub after: Option<Arc<RankingRecord>>,
}

impl StoreChange {
    pub fn kind(&self) -> ChangeKind {
        match (&self.before, &self.after) {
            (None, _) => ChangeKind::Inserted,
            (Some(_), Some(_)) => ChangeKind::Updated,
            (Some(_), None) => ChangeKind::Removed,
        }
    }

    /// The old and new versions of the record, whichever exist.
    pub fn versions(&self) -> impl Iterator<Item = &Arc<RankingRecord>> {
        self.before.iter().chain(self.after.iter())
    }
}

/// Read side of the ranking store as the live services see it.
///
/// Services call `subscribe_changes` before `snapshot`, then skip changes
/// whose version the snapshot already covers, so no write falls between the two.
#[async_trait]
pub trait RecordSource: Send + Sync + 'static {
    async fn snapshot(&self) -> Result<StoreSnapshot>;

    fn subscribe_changes(&self) -> broadcast::Receiver<StoreChange>;
}
