//! Per-metric maxima and value distributions over the whole leaderboard.

use crate::core::{RankingRecord, SortField};
use crate::storage::RankingTable;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

/// Number of distribution points per metric, evenly spaced up to the maximum.
pub const DISTRIBUTION_POINTS: usize = 20;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldSummary {
    pub field: SortField,
    /// Largest value among records eligible for ranking.
    pub max: f64,
    /// `max * 0.05 * i` for `i` in `1..=20`.
    pub points: Vec<f64>,
    /// Fraction of all records whose value lies strictly below each point.
    pub distribution: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaderboardStatistics {
    pub count: usize,
    pub fields: Vec<FieldSummary>,
    pub created_at: DateTime<Utc>,
}

impl LeaderboardStatistics {
    /// Maxima come from records with more than `min_battles` battles; the
    /// distribution is taken over every record.
    pub fn compute(table: &RankingTable, min_battles: u64) -> Self {
        let records: Vec<&Arc<RankingRecord>> = table.records().collect();
        let count = records.len();

        let fields = SortField::ALL
            .iter()
            .map(|&field| {
                let max = records
                    .iter()
                    .filter(|record| record.battles > min_battles)
                    .map(|record| record.metric(field))
                    .fold(0.0_f64, f64::max);

                let points: Vec<f64> = (1..=DISTRIBUTION_POINTS)
                    .map(|i| 0.05 * i as f64 * max)
                    .collect();

                let distribution = points
                    .iter()
                    .map(|&point| {
                        if count == 0 {
                            return 0.0;
                        }
                        let below = records.iter().filter(|record| record.metric(field) < point).count();
                        below as f64 / count as f64
                    })
                    .collect();

                FieldSummary {
                    field,
                    max,
                    points,
                    distribution,
                }
            })
            .collect();

        Self {
            count,
            fields,
            created_at: Utc::now(),
        }
    }

    pub fn field(&self, field: SortField) -> Option<&FieldSummary> {
        self.fields.iter().find(|summary| summary.field == field)
    }
}
