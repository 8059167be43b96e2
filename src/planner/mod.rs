pub mod filter;

pub use filter::{FilterBuilder, PageWindow, QueryPredicate, UsernameClause, build};
