use crate::core::{DbError, Result, MIN_USERNAME_FILTER_LEN};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Leaderboard configuration
///
/// Every field has a default, so a config file only needs the keys it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeaderboardConfig {
    /// Rows per page
    pub page_size: u64,

    /// Records need strictly more battles than this to be listed
    pub min_battles: u64,

    /// Username filters shorter than this are ignored
    pub min_username_filter_len: usize,

    /// Capacity of the store change feed before slow readers lag
    pub change_buffer: usize,

    /// Capacity of each subscription's event queue
    pub event_buffer: usize,
}

impl Default for LeaderboardConfig {
    fn default() -> Self {
        Self {
            page_size: 20,
            min_battles: 500,
            min_username_filter_len: MIN_USERNAME_FILTER_LEN,
            change_buffer: 1024,
            event_buffer: 64,
        }
    }
}

impl LeaderboardConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set rows per page
    pub fn page_size(mut self, size: u64) -> Self {
        self.page_size = size;
        self
    }

    /// Set the battle-count floor
    pub fn min_battles(mut self, battles: u64) -> Self {
        self.min_battles = battles;
        self
    }

    pub fn min_username_filter_len(mut self, len: usize) -> Self {
        self.min_username_filter_len = len;
        self
    }

    pub fn change_buffer(mut self, capacity: usize) -> Self {
        self.change_buffer = capacity;
        self
    }

    pub fn event_buffer(mut self, capacity: usize) -> Self {
        self.event_buffer = capacity;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(DbError::InvalidConfig("page_size must be positive".into()));
        }
        if self.change_buffer == 0 || self.event_buffer == 0 {
            return Err(DbError::InvalidConfig("buffer capacities must be positive".into()));
        }
        Ok(())
    }

    /// Load from a JSON file
    ///
    /// ```ignore
    /// let config = LeaderboardConfig::from_json_file("leaderboard.json")?;
    /// ```
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }
}
