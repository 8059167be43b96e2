//! Loading crawler output into a store.

use super::memory::InMemoryRankingStore;
use crate::core::{PlayerStats, Result};
use std::path::Path;

/// Parse a JSON array of crawler rows.
pub fn parse_player_stats(text: &str) -> Result<Vec<PlayerStats>> {
    let rows: Vec<PlayerStats> = serde_json::from_str(text)?;
    for row in &rows {
        row.validate()?;
    }
    Ok(rows)
}

pub fn read_player_stats(path: impl AsRef<Path>) -> Result<Vec<PlayerStats>> {
    let text = std::fs::read_to_string(path)?;
    parse_player_stats(&text)
}

/// Read a crawler file and upsert every row. Returns the number of rows written.
pub async fn import_file(store: &InMemoryRankingStore, path: impl AsRef<Path>) -> Result<usize> {
    let rows = read_player_stats(path)?;
    store.upsert_many(rows).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{DbError, Realm};

    #[test]
    fn test_parse_rows() {
        let rows = parse_player_stats(
            r#"[
                {"user":"alpha","spa_id":1,"realm":"eu","battles":800,"victories":400,"experience":10},
                {"user":"beta","spa_id":2,"realm":"asia","battles":20,"victories":1,"experience":2,
                 "updated_at":"2015-06-01T12:00:00Z"}
            ]"#,
        )
        .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].realm, Realm::Asia);
        assert!(rows[1].updated_at.is_some());
    }

    #[test]
    fn test_unknown_realm_rejected_at_import() {
        let err = parse_player_stats(
            r#"[{"user":"x","spa_id":1,"realm":"moon","battles":1,"victories":0,"experience":0}]"#,
        )
        .unwrap_err();
        assert!(matches!(err, DbError::ParseError(_)));
    }

    #[test]
    fn test_invalid_row_rejected_at_import() {
        let err = parse_player_stats(
            r#"[{"user":"x","spa_id":1,"realm":"ru","battles":1,"victories":5,"experience":0}]"#,
        )
        .unwrap_err();
        assert!(matches!(err, DbError::InvalidRecord(_)));
    }
}
