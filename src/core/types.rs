use super::{DbError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

/// Regional server partition a record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Realm {
    Ru,
    Eu,
    Com,
    Asia,
}

impl Realm {
    pub const ALL: [Realm; 4] = [Realm::Ru, Realm::Eu, Realm::Com, Realm::Asia];

    /// Look up a realm by its wire code. Codes are matched exactly.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "ru" => Some(Self::Ru),
            "eu" => Some(Self::Eu),
            "com" => Some(Self::Com),
            "asia" => Some(Self::Asia),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Ru => "ru",
            Self::Eu => "eu",
            Self::Com => "com",
            Self::Asia => "asia",
        }
    }
}

impl fmt::Display for Realm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Closed set of metrics a leaderboard may be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortField {
    #[default]
    Vpb,
    Battles,
    Victories,
    Experience,
}

/// Name → field lookup table. Nothing outside this table reaches a query.
const SORT_FIELDS: [(&str, SortField); 4] = [
    ("vpb", SortField::Vpb),
    ("battles", SortField::Battles),
    ("victories", SortField::Victories),
    ("experience", SortField::Experience),
];

impl SortField {
    pub const ALL: [SortField; 4] = [
        SortField::Vpb,
        SortField::Battles,
        SortField::Victories,
        SortField::Experience,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        SORT_FIELDS
            .iter()
            .find(|(known, _)| *known == name)
            .map(|(_, field)| *field)
    }

    /// Unknown names fall back to the default field instead of failing.
    pub fn from_name_or_default(name: &str) -> Self {
        Self::from_name(name).unwrap_or_default()
    }

    pub fn name(&self) -> &'static str {
        SORT_FIELDS
            .iter()
            .find(|(_, field)| field == self)
            .map(|(name, _)| *name)
            .unwrap_or("vpb")
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Store-assigned identity. Monotonic in insertion order, which makes it the
/// tie-breaker for every ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordId(pub u64);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A player row as produced by the crawler, before the store assigns an id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerStats {
    pub spa_id: u64,
    #[serde(rename = "user")]
    pub username: String,
    pub realm: Realm,
    pub battles: u64,
    pub victories: u64,
    pub experience: u64,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl PlayerStats {
    pub fn new(spa_id: u64, username: impl Into<String>, realm: Realm) -> Self {
        Self {
            spa_id,
            username: username.into(),
            realm,
            battles: 0,
            victories: 0,
            experience: 0,
            updated_at: None,
        }
    }

    pub fn battles(mut self, battles: u64) -> Self {
        self.battles = battles;
        self
    }

    pub fn victories(mut self, victories: u64) -> Self {
        self.victories = victories;
        self
    }

    pub fn experience(mut self, experience: u64) -> Self {
        self.experience = experience;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.username.is_empty() {
            return Err(DbError::InvalidRecord(format!(
                "player {} on {} has an empty username",
                self.spa_id, self.realm
            )));
        }
        if self.victories > self.battles {
            return Err(DbError::InvalidRecord(format!(
                "player '{}' has {} victories in {} battles",
                self.username, self.victories, self.battles
            )));
        }
        Ok(())
    }
}

/// Victories per battle as a percentage, rounded to four decimal places of the
/// ratio before scaling.
pub fn victories_per_battle(victories: u64, battles: u64) -> f64 {
    if battles == 0 {
        return 0.0;
    }
    let ratio = victories as f64 / battles as f64;
    (ratio * 10_000.0).round() / 10_000.0 * 100.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingRecord {
    pub id: RecordId,
    pub spa_id: u64,
    pub username: String,
    pub realm: Realm,
    pub battles: u64,
    pub victories: u64,
    pub experience: u64,
    pub vpb: f64,
    pub updated_at: DateTime<Utc>,
}

impl RankingRecord {
    pub fn from_stats(id: RecordId, stats: PlayerStats) -> Self {
        Self {
            id,
            spa_id: stats.spa_id,
            vpb: victories_per_battle(stats.victories, stats.battles),
            username: stats.username,
            realm: stats.realm,
            battles: stats.battles,
            victories: stats.victories,
            experience: stats.experience,
            updated_at: stats.updated_at.unwrap_or_else(Utc::now),
        }
    }

    pub fn metric(&self, field: SortField) -> f64 {
        match field {
            SortField::Vpb => self.vpb,
            SortField::Battles => self.battles as f64,
            SortField::Victories => self.victories as f64,
            SortField::Experience => self.experience as f64,
        }
    }

    pub fn player_key(&self) -> PlayerKey {
        PlayerKey { realm: self.realm, spa_id: self.spa_id }
    }
}

/// Upsert identity: one row per player per realm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlayerKey {
    pub realm: Realm,
    pub spa_id: u64,
}

/// A record together with its position in a query result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedRecord {
    /// 1-based position across the whole ordering, not just the page.
    pub rank: u64,
    pub record: Arc<RankingRecord>,
}

impl RankedRecord {
    pub fn id(&self) -> RecordId {
        self.record.id
    }
}

/// Totally ordered metric value for index keys.
#[derive(Debug, Clone, Copy)]
pub struct MetricKey(pub f64);

impl PartialEq for MetricKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for MetricKey {}

impl PartialOrd for MetricKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MetricKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}
