//! Incremental page updates.

use crate::core::{DbError, RankedRecord, RecordId};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, PartialEq)]
pub enum RowChange {
    /// A record entered the page at `index`.
    Added { index: usize, row: RankedRecord },
    /// A record already on the page changed content or position.
    Changed { index: usize, row: RankedRecord },
    /// A record left the page.
    Removed { id: RecordId },
}

/// Changes turning page `old` into page `new`. Rows absent from the result
/// keep both their content and their rank.
pub fn diff_rows(old: &[RankedRecord], new: &[RankedRecord]) -> Vec<RowChange> {
    let previous: HashMap<RecordId, &RankedRecord> = old.iter().map(|row| (row.id(), row)).collect();
    let current: HashSet<RecordId> = new.iter().map(RankedRecord::id).collect();

    let mut changes: Vec<RowChange> = old
        .iter()
        .filter(|row| !current.contains(&row.id()))
        .map(|row| RowChange::Removed { id: row.id() })
        .collect();

    for (index, row) in new.iter().enumerate() {
        match previous.get(&row.id()) {
            None => changes.push(RowChange::Added { index, row: row.clone() }),
            Some(before) if *before != row => changes.push(RowChange::Changed { index, row: row.clone() }),
            Some(_) => {}
        }
    }

    changes
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum ViewState {
    #[default]
    Loading,
    Ready,
    Failed(DbError),
}

/// Consumer-side copy of one live page.
#[derive(Debug, Clone, Default)]
pub struct PageView {
    rows: Vec<RankedRecord>,
    version: u64,
    state: ViewState,
}

impl PageView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> &[RankedRecord] {
        &self.rows
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn replace(&mut self, version: u64, rows: Vec<RankedRecord>) {
        self.rows = rows;
        self.version = version;
        self.state = ViewState::Ready;
    }

    pub fn apply(&mut self, version: u64, changes: &[RowChange]) {
        for change in changes {
            match change {
                RowChange::Removed { id } => self.rows.retain(|row| row.id() != *id),
                RowChange::Added { row, .. } | RowChange::Changed { row, .. } => {
                    self.rows.retain(|existing| existing.id() != row.id());
                    self.rows.push(row.clone());
                }
            }
        }
        // Ranks are unique within a page and equal to position + offset + 1.
        self.rows.sort_by_key(|row| row.rank);
        self.version = version;
        self.state = ViewState::Ready;
    }

    pub fn fail(&mut self, error: DbError) {
        self.state = ViewState::Failed(error);
    }
}
