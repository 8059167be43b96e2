use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DbError {
    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Record {0} not found")]
    RecordNotFound(u64),

    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Change feed closed")]
    StoreClosed,

    #[error("Execution error: {0}")]
    ExecutionError(String),

    #[error("No tokio runtime available: {0}")]
    RuntimeUnavailable(String),

    #[error("Lock error: {0}")]
    LockError(String),

    #[error("I/O error: {0}")]
    IoError(String),
}

pub type Result<T> = std::result::Result<T, DbError>;

impl<T> From<std::sync::PoisonError<T>> for DbError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::LockError(err.to_string())
    }
}

impl From<std::io::Error> for DbError {
    fn from(err: std::io::Error) -> Self {
        Self::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for DbError {
    fn from(err: serde_json::Error) -> Self {
        Self::ParseError(err.to_string())
    }
}

impl DbError {
    /// Whether a consumer may reasonably retry the operation that failed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_) | Self::StoreClosed | Self::LockError(_))
    }
}
