pub mod import;
pub mod memory;
pub mod source;
pub mod table;

pub use memory::InMemoryRankingStore;
pub use source::{ChangeKind, RecordSource, StoreChange, StoreSnapshot};
pub use table::{IndexEntry, IndexScope, RankingTable, Upserted};
