pub mod error;
pub mod params;
pub mod types;

pub use error::{DbError, Result};
pub use params::{MIN_USERNAME_FILTER_LEN, RealmFilter, UsernameFilter, ViewParameters};
pub use types::{
    MetricKey, PlayerKey, PlayerStats, RankedRecord, RankingRecord, Realm, RecordId, SortField,
    victories_per_battle,
};
