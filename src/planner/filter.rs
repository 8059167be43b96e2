// ============================================================================
// src/planner/filter.rs - View parameters → query predicate and page window
// ============================================================================

use crate::config::LeaderboardConfig;
use crate::core::{RankingRecord, Realm, Result, SortField, ViewParameters};
use crate::expression::{eval_like, prefix_pattern};

/// Case-insensitive "username starts with" clause. The prefix is escaped
/// before it becomes a pattern, so user text never acts as a wildcard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsernameClause {
    prefix: String,
    pattern: String,
}

impl UsernameClause {
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            pattern: prefix_pattern(prefix),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// The escaped LIKE pattern handed to the matcher.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn matches(&self, username: &str) -> Result<bool> {
        eval_like(username, &self.pattern, false)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryPredicate {
    /// Exclusive lower bound on battle count.
    pub min_battles: u64,
    pub realm: Option<Realm>,
    pub username: Option<UsernameClause>,
}

impl QueryPredicate {
    /// Predicate with only the eligibility floor.
    pub fn eligible(min_battles: u64) -> Self {
        Self {
            min_battles,
            realm: None,
            username: None,
        }
    }

    pub fn matches(&self, record: &RankingRecord) -> Result<bool> {
        if record.battles <= self.min_battles {
            return Ok(false);
        }
        if let Some(realm) = self.realm
            && record.realm != realm
        {
            return Ok(false);
        }
        match &self.username {
            Some(clause) => clause.matches(&record.username),
            None => Ok(true),
        }
    }
}

/// Sort, limit and offset of one page. Pages are always ordered best first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub sort_field: SortField,
    pub limit: u64,
    pub offset: u64,
}

impl PageWindow {
    pub fn for_page(page: u64, sort_field: SortField, page_size: u64) -> Self {
        Self {
            sort_field,
            limit: page_size,
            offset: page.saturating_mul(page_size),
        }
    }

    /// Rank of the row at `position` within this window.
    pub fn rank_at(&self, position: usize) -> u64 {
        self.offset.saturating_add(position as u64 + 1)
    }
}

/// Pure translation of view parameters into query inputs.
#[derive(Debug, Clone, Default)]
pub struct FilterBuilder {
    config: LeaderboardConfig,
}

impl FilterBuilder {
    pub fn new(config: LeaderboardConfig) -> Self {
        Self { config }
    }

    pub fn build(&self, params: &ViewParameters) -> QueryPredicate {
        let username = params
            .username_filter
            .prefix()
            .filter(|prefix| prefix.chars().count() >= self.config.min_username_filter_len)
            .map(UsernameClause::new);

        QueryPredicate {
            min_battles: self.config.min_battles,
            realm: params.realm_filter.realm(),
            username,
        }
    }

    pub fn window(&self, params: &ViewParameters) -> PageWindow {
        PageWindow::for_page(params.page, params.sort_field, self.config.page_size)
    }

    pub fn plan(&self, params: &ViewParameters) -> (QueryPredicate, PageWindow) {
        (self.build(params), self.window(params))
    }
}

/// [`FilterBuilder::build`] with the default configuration.
pub fn build(params: &ViewParameters) -> QueryPredicate {
    FilterBuilder::default().build(params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{PlayerStats, RealmFilter, RecordId};

    fn record(name: &str, realm: Realm, battles: u64) -> RankingRecord {
        RankingRecord::from_stats(
            RecordId(1),
            PlayerStats::new(7, name, realm).battles(battles).victories(battles / 2),
        )
    }

    #[test]
    fn test_battle_floor_always_present() {
        let cases = [
            ViewParameters::default(),
            ViewParameters::default().page(9).sort_by(SortField::Experience),
            ViewParameters::default().realm(RealmFilter::Only(Realm::Ru)).username("abc"),
        ];
        for params in cases {
            let predicate = build(&params);
            assert_eq!(predicate.min_battles, 500);
            assert!(!predicate.matches(&record("abcd", Realm::Ru, 500)).unwrap());
            assert!(predicate.matches(&record("abcd", Realm::Ru, 501)).unwrap());
        }
    }

    #[test]
    fn test_unknown_realm_equals_all() {
        let unknown = ViewParameters::from_raw(0, "vpb", "atlantis", None);
        let all = ViewParameters::from_raw(0, "vpb", "all", None);
        assert_eq!(build(&unknown), build(&all));
        assert_eq!(build(&all).realm, None);
    }

    #[test]
    fn test_realm_clause() {
        let params = ViewParameters::default().realm(RealmFilter::Only(Realm::Eu));
        let predicate = build(&params);
        assert_eq!(predicate.realm, Some(Realm::Eu));
        assert!(predicate.matches(&record("abc", Realm::Eu, 600)).unwrap());
        assert!(!predicate.matches(&record("abc", Realm::Com, 600)).unwrap());
    }

    #[test]
    fn test_username_clause_activation() {
        let short = ViewParameters::from_raw(0, "vpb", "all", Some("ab"));
        assert!(build(&short).username.is_none());

        let active = ViewParameters::from_raw(0, "vpb", "all", Some("abc"));
        let predicate = build(&active);
        let clause = predicate.username.as_ref().unwrap();
        assert_eq!(clause.prefix(), "abc");
        assert!(predicate.matches(&record("ABCDEF", Realm::Asia, 900)).unwrap());
        assert!(!predicate.matches(&record("xabc", Realm::Asia, 900)).unwrap());
    }

    #[test]
    fn test_username_pattern_is_escaped() {
        let params = ViewParameters::from_raw(0, "vpb", "all", Some("%_%"));
        let predicate = build(&params);
        assert_eq!(predicate.username.as_ref().unwrap().pattern(), "\\%\\_\\%%");
        assert!(!predicate.matches(&record("anyone", Realm::Ru, 900)).unwrap());
        assert!(predicate.matches(&record("%_%er", Realm::Ru, 900)).unwrap());
    }

    #[test]
    fn test_sort_field_does_not_touch_predicate() {
        let base = ViewParameters::default().username("sea");
        for field in SortField::ALL {
            assert_eq!(build(&base.clone().sort_by(field)), build(&base));
        }
    }

    #[test]
    fn test_window_offsets() {
        let builder = FilterBuilder::default();
        for page in [0u64, 1, 2, 17] {
            let window = builder.window(&ViewParameters::default().page(page));
            assert_eq!(window.offset, page * 20);
            assert_eq!(window.limit, 20);
            assert_eq!(window.sort_field, SortField::Vpb);
        }
        assert_eq!(PageWindow::for_page(u64::MAX, SortField::Vpb, 20).offset, u64::MAX);
    }

    #[test]
    fn test_configured_floor_and_threshold() {
        let builder = FilterBuilder::new(
            LeaderboardConfig::default().min_battles(10).min_username_filter_len(5),
        );
        let params = ViewParameters::default().username("abcd");
        let predicate = builder.build(&params);
        assert_eq!(predicate.min_battles, 10);
        assert!(predicate.username.is_none());
    }
}
