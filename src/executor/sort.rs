// ============================================================================
// src/executor/sort.rs - Record ordering
// ============================================================================
//
// Design Patterns:
// - Comparator Pattern: one ordering shared by index order checks and
//   live-window relevance checks
//
// Features:
// - Best first: metric descending, ties fall back to record id ascending
// - Total order over f64 metrics (no NaN surprises)
//
// ============================================================================

use crate::core::{RankingRecord, SortField};
use std::cmp::Ordering;

/// Leaderboard ordering over one sort field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordComparator {
    field: SortField,
}

impl RecordComparator {
    pub fn new(field: SortField) -> Self {
        Self { field }
    }

    /// Returns `Ordering::Less` when `a` ranks above `b`.
    pub fn compare(&self, a: &RankingRecord, b: &RankingRecord) -> Ordering {
        b.metric(self.field)
            .total_cmp(&a.metric(self.field))
            .then_with(|| a.id.cmp(&b.id))
    }
}
