use crate::core::{DbError, MetricKey, PlayerKey, PlayerStats, RankingRecord, Realm, RecordId, Result, SortField};
use im::{HashMap, OrdMap, OrdSet};
use std::cmp::Reverse;
use std::sync::Arc;

/// Which records an index covers: all of them, or one realm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IndexScope {
    pub field: SortField,
    pub realm: Option<Realm>,
}

/// Index entries sort by metric descending, then by id ascending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct IndexEntry {
    pub key: Reverse<MetricKey>,
    pub id: RecordId,
}

impl IndexEntry {
    fn of(record: &RankingRecord, field: SortField) -> Self {
        Self {
            key: Reverse(MetricKey(record.metric(field))),
            id: record.id,
        }
    }
}

/// Result of writing one player row.
#[derive(Debug, Clone)]
pub struct Upserted {
    pub before: Option<Arc<RankingRecord>>,
    pub after: Arc<RankingRecord>,
}

/// Ranking records plus ordered indexes per (sort field, realm scope).
///
/// Built on persistent collections: `clone` is O(1) and yields an
/// independent snapshot that later writes never touch.
#[derive(Debug, Clone)]
pub struct RankingTable {
    records: OrdMap<RecordId, Arc<RankingRecord>>,
    by_player: HashMap<PlayerKey, RecordId>,
    indexes: HashMap<IndexScope, OrdSet<IndexEntry>>,
    next_record_id: u64,
}

impl Default for RankingTable {
    fn default() -> Self {
        Self::new()
    }
}

impl RankingTable {
    pub fn new() -> Self {
        let mut indexes = HashMap::new();
        for scope in Self::scopes() {
            indexes.insert(scope, OrdSet::new());
        }
        Self {
            records: OrdMap::new(),
            by_player: HashMap::new(),
            indexes,
            next_record_id: 0,
        }
    }

    fn scopes() -> impl Iterator<Item = IndexScope> {
        SortField::ALL.into_iter().flat_map(|field| {
            std::iter::once(None)
                .chain(Realm::ALL.into_iter().map(Some))
                .map(move |realm| IndexScope { field, realm })
        })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: RecordId) -> Option<&Arc<RankingRecord>> {
        self.records.get(&id)
    }

    pub fn find_player(&self, realm: Realm, spa_id: u64) -> Option<&Arc<RankingRecord>> {
        self.by_player
            .get(&PlayerKey { realm, spa_id })
            .and_then(|id| self.records.get(id))
    }

    /// All records in insertion order.
    pub fn records(&self) -> impl Iterator<Item = &Arc<RankingRecord>> {
        self.records.values()
    }

    /// Records of `scope` in index order, i.e. best first.
    pub fn ranked(&self, scope: IndexScope) -> impl Iterator<Item = &Arc<RankingRecord>> {
        self.indexes
            .get(&scope)
            .into_iter()
            .flat_map(|index| index.iter())
            .filter_map(|entry| self.records.get(&entry.id))
    }

    /// Insert a new player row or replace an existing one. The record keeps its
    /// id across updates, so its tie-break position is stable.
    pub fn upsert(&mut self, stats: PlayerStats) -> Result<Upserted> {
        stats.validate()?;
        let key = PlayerKey { realm: stats.realm, spa_id: stats.spa_id };

        let (id, before) = match self.by_player.get(&key).copied() {
            Some(id) => (id, self.records.get(&id).cloned()),
            None => {
                let id = RecordId(self.next_record_id);
                self.next_record_id += 1;
                (id, None)
            }
        };

        if let Some(old) = &before {
            self.remove_from_indexes(old);
        }

        let after = Arc::new(RankingRecord::from_stats(id, stats));
        self.records.insert(id, Arc::clone(&after));
        self.by_player.insert(key, id);
        self.add_to_indexes(&after);

        Ok(Upserted { before, after })
    }

    pub fn remove(&mut self, id: RecordId) -> Result<Arc<RankingRecord>> {
        let removed = self.records.remove(&id).ok_or(DbError::RecordNotFound(id.0))?;
        self.by_player.remove(&removed.player_key());
        self.remove_from_indexes(&removed);
        Ok(removed)
    }

    fn add_to_indexes(&mut self, record: &RankingRecord) {
        for field in SortField::ALL {
            let entry = IndexEntry::of(record, field);
            for realm in [None, Some(record.realm)] {
                if let Some(index) = self.indexes.get_mut(&IndexScope { field, realm }) {
                    index.insert(entry);
                }
            }
        }
    }

    fn remove_from_indexes(&mut self, record: &RankingRecord) {
        for field in SortField::ALL {
            let entry = IndexEntry::of(record, field);
            for realm in [None, Some(record.realm)] {
                if let Some(index) = self.indexes.get_mut(&IndexScope { field, realm }) {
                    index.remove(&entry);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(spa_id: u64, realm: Realm, battles: u64, victories: u64) -> PlayerStats {
        PlayerStats::new(spa_id, format!("player{spa_id}"), realm)
            .battles(battles)
            .victories(victories)
    }

    #[test]
    fn test_upsert_assigns_ids_in_insertion_order() {
        let mut table = RankingTable::new();
        let a = table.upsert(stats(10, Realm::Ru, 600, 300)).unwrap();
        let b = table.upsert(stats(11, Realm::Ru, 600, 300)).unwrap();
        assert_eq!(a.after.id, RecordId(0));
        assert_eq!(b.after.id, RecordId(1));
        assert!(a.before.is_none());
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_upsert_same_player_keeps_id() {
        let mut table = RankingTable::new();
        table.upsert(stats(10, Realm::Ru, 600, 300)).unwrap();
        let updated = table.upsert(stats(10, Realm::Ru, 700, 500)).unwrap();
        assert_eq!(updated.after.id, RecordId(0));
        assert_eq!(updated.before.as_ref().unwrap().battles, 600);
        assert_eq!(table.len(), 1);

        // Same account id in another realm is a different row.
        table.upsert(stats(10, Realm::Eu, 600, 300)).unwrap();
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_ranked_orders_by_metric_then_id() {
        let mut table = RankingTable::new();
        table.upsert(stats(1, Realm::Ru, 1000, 500)).unwrap();
        table.upsert(stats(2, Realm::Eu, 1000, 700)).unwrap();
        table.upsert(stats(3, Realm::Ru, 1000, 500)).unwrap();

        let scope = IndexScope { field: SortField::Vpb, realm: None };
        let order: Vec<u64> = table.ranked(scope).map(|r| r.spa_id).collect();
        assert_eq!(order, vec![2, 1, 3]);

        let ru = IndexScope { field: SortField::Vpb, realm: Some(Realm::Ru) };
        let order: Vec<u64> = table.ranked(ru).map(|r| r.spa_id).collect();
        assert_eq!(order, vec![1, 3]);
    }

    #[test]
    fn test_indexes_follow_updates_and_removals() {
        let mut table = RankingTable::new();
        table.upsert(stats(1, Realm::Ru, 1000, 500)).unwrap();
        let second = table.upsert(stats(2, Realm::Ru, 1000, 400)).unwrap();
        table.upsert(stats(2, Realm::Ru, 1000, 900)).unwrap();

        let scope = IndexScope { field: SortField::Victories, realm: Some(Realm::Ru) };
        let order: Vec<u64> = table.ranked(scope).map(|r| r.victories).collect();
        assert_eq!(order, vec![900, 500]);

        table.remove(second.after.id).unwrap();
        let order: Vec<u64> = table.ranked(scope).map(|r| r.victories).collect();
        assert_eq!(order, vec![500]);
        assert!(table.find_player(Realm::Ru, 2).is_none());
        assert!(matches!(table.remove(second.after.id), Err(DbError::RecordNotFound(_))));
    }

    #[test]
    fn test_clone_is_an_isolated_snapshot() {
        let mut table = RankingTable::new();
        table.upsert(stats(1, Realm::Ru, 1000, 500)).unwrap();
        let snapshot = table.clone();
        table.upsert(stats(2, Realm::Ru, 1000, 500)).unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_invalid_rows_rejected() {
        let mut table = RankingTable::new();
        assert!(table.upsert(stats(1, Realm::Ru, 10, 20)).is_err());
        assert!(table.is_empty());
    }
}
