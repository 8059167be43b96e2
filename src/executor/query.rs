use super::sort::RecordComparator;
use crate::core::{RankedRecord, RankingRecord, Result};
use crate::planner::{PageWindow, QueryPredicate};
use crate::storage::{IndexScope, RankingTable};
use std::cmp::Ordering;
use std::sync::Arc;

/// Evaluates a predicate and page window against one table snapshot.
pub struct QueryExecutor;

impl QueryExecutor {
    /// Rows of the window, best first. An offset past the last match yields an
    /// empty page.
    pub fn execute(
        table: &RankingTable,
        predicate: &QueryPredicate,
        window: &PageWindow,
    ) -> Result<Vec<RankedRecord>> {
        let limit = usize::try_from(window.limit).unwrap_or(usize::MAX);
        let offset = usize::try_from(window.offset).unwrap_or(usize::MAX);

        let scope = IndexScope {
            field: window.sort_field,
            realm: predicate.realm,
        };
        let mut rows = Vec::with_capacity(limit.min(256));
        let mut skipped = 0usize;

        for record in table.ranked(scope) {
            if rows.len() >= limit {
                break;
            }
            if !predicate.matches(record)? {
                continue;
            }
            if skipped < offset {
                skipped += 1;
                continue;
            }
            rows.push(RankedRecord {
                rank: window.rank_at(rows.len()),
                record: Arc::clone(record),
            });
        }

        Ok(rows)
    }

    /// Number of records in the table matching `predicate`.
    pub fn count(table: &RankingTable, predicate: &QueryPredicate) -> Result<usize> {
        let mut count = 0;
        for record in table.records() {
            if predicate.matches(record)? {
                count += 1;
            }
        }
        Ok(count)
    }

    /// Whether a record sorts at or before `bound` in the window's ordering.
    pub fn sorts_within(window: &PageWindow, record: &RankingRecord, bound: &RankingRecord) -> bool {
        let comparator = RecordComparator::new(window.sort_field);
        comparator.compare(record, bound) != Ordering::Greater
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{PlayerStats, Realm, SortField};

    fn table_with(rows: &[(u64, Realm, u64, u64)]) -> RankingTable {
        let mut table = RankingTable::new();
        for (spa_id, realm, battles, victories) in rows {
            table
                .upsert(
                    PlayerStats::new(*spa_id, format!("player{spa_id}"), *realm)
                        .battles(*battles)
                        .victories(*victories),
                )
                .unwrap();
        }
        table
    }

    #[test]
    fn test_eligibility_floor_filters_rows() {
        let table = table_with(&[(1, Realm::Ru, 500, 400), (2, Realm::Ru, 501, 100)]);
        let window = PageWindow::for_page(0, SortField::Vpb, 20);
        let rows = QueryExecutor::execute(&table, &QueryPredicate::eligible(500), &window).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].record.spa_id, 2);
        assert_eq!(rows[0].rank, 1);
    }

    #[test]
    fn test_offset_and_ranks() {
        let rows: Vec<_> = (0..7).map(|i| (i, Realm::Eu, 600 + i, 300)).collect();
        let table = table_with(&rows);
        let window = PageWindow::for_page(1, SortField::Battles, 3);
        let page = QueryExecutor::execute(&table, &QueryPredicate::eligible(500), &window).unwrap();
        let battles: Vec<u64> = page.iter().map(|r| r.record.battles).collect();
        let ranks: Vec<u64> = page.iter().map(|r| r.rank).collect();
        assert_eq!(battles, vec![603, 602, 601]);
        assert_eq!(ranks, vec![4, 5, 6]);

        let past_end = PageWindow::for_page(5, SortField::Battles, 3);
        assert!(QueryExecutor::execute(&table, &QueryPredicate::eligible(500), &past_end)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_realm_scoped_index() {
        let table = table_with(&[(1, Realm::Ru, 900, 800), (2, Realm::Asia, 900, 700), (3, Realm::Ru, 900, 100)]);
        let predicate = QueryPredicate {
            realm: Some(Realm::Ru),
            ..QueryPredicate::eligible(500)
        };
        let window = PageWindow::for_page(0, SortField::Vpb, 20);
        let page = QueryExecutor::execute(&table, &predicate, &window).unwrap();
        let ids: Vec<u64> = page.iter().map(|r| r.record.spa_id).collect();
        assert_eq!(ids, vec![1, 3]);
        assert_eq!(QueryExecutor::count(&table, &predicate).unwrap(), 2);
    }

    #[test]
    fn test_sorts_within() {
        let table = table_with(&[(1, Realm::Ru, 900, 800), (2, Realm::Ru, 900, 100)]);
        let window = PageWindow::for_page(0, SortField::Vpb, 20);
        let best = table.find_player(Realm::Ru, 1).unwrap();
        let worst = table.find_player(Realm::Ru, 2).unwrap();
        assert!(QueryExecutor::sorts_within(&window, best, worst));
        assert!(QueryExecutor::sorts_within(&window, worst, worst));
        assert!(!QueryExecutor::sorts_within(&window, worst, best));
    }
}
