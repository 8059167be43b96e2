pub mod count;
pub mod diff;
pub mod ranking;

pub use count::{CountService, CountState, CountSubscription};
pub use diff::{PageView, RowChange, ViewState, diff_rows};
pub use ranking::{RankingEvent, RankingQueryService, RankingSubscription};
