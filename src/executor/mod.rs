pub mod query;
pub mod sort;

pub use query::QueryExecutor;
pub use sort::RecordComparator;
