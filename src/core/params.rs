use super::types::{Realm, SortField};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Minimum number of characters before a username filter takes effect.
pub const MIN_USERNAME_FILTER_LEN: usize = 3;

/// Realm filter: either one known realm or no filtering at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RealmFilter {
    #[default]
    All,
    Only(Realm),
}

impl RealmFilter {
    /// `"all"` and any unknown code both mean "no filter".
    pub fn from_code(code: &str) -> Self {
        Realm::from_code(code).map(Self::Only).unwrap_or(Self::All)
    }

    pub fn realm(&self) -> Option<Realm> {
        match self {
            Self::All => None,
            Self::Only(realm) => Some(*realm),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Only(realm) => realm.code(),
        }
    }
}

impl fmt::Display for RealmFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Username prefix filter. Text shorter than the activation threshold is
/// stored as inactive rather than kept verbatim, including when deserialized.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "Option<String>")]
pub struct UsernameFilter(Option<String>);

impl From<Option<String>> for UsernameFilter {
    fn from(text: Option<String>) -> Self {
        Self::new(text.as_deref(), MIN_USERNAME_FILTER_LEN)
    }
}

impl From<UsernameFilter> for Option<String> {
    fn from(filter: UsernameFilter) -> Self {
        filter.0
    }
}

impl UsernameFilter {
    pub fn inactive() -> Self {
        Self(None)
    }

    pub fn new(text: Option<&str>, min_len: usize) -> Self {
        match text {
            Some(text) if text.chars().count() >= min_len => Self(Some(text.to_string())),
            _ => Self(None),
        }
    }

    pub fn is_active(&self) -> bool {
        self.0.is_some()
    }

    pub fn prefix(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ViewParameters {
    pub page: u64,
    pub sort_field: SortField,
    pub realm_filter: RealmFilter,
    pub username_filter: UsernameFilter,
}

impl ViewParameters {
    /// Normalize untrusted inputs the same way the parameter store setters do.
    pub fn from_raw(page: u64, sort: &str, realm: &str, username: Option<&str>) -> Self {
        Self {
            page,
            sort_field: SortField::from_name_or_default(sort),
            realm_filter: RealmFilter::from_code(realm),
            username_filter: UsernameFilter::new(username, MIN_USERNAME_FILTER_LEN),
        }
    }

    pub fn page(mut self, page: u64) -> Self {
        self.page = page;
        self
    }

    pub fn sort_by(mut self, field: SortField) -> Self {
        self.sort_field = field;
        self
    }

    pub fn realm(mut self, filter: RealmFilter) -> Self {
        self.realm_filter = filter;
        self
    }

    pub fn username(mut self, text: &str) -> Self {
        self.username_filter = UsernameFilter::new(Some(text), MIN_USERNAME_FILTER_LEN);
        self
    }
}
