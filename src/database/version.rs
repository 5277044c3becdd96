//! Store schema version checks

use rusqlite::Connection;
use crate::error::Result;

/// Current database version
pub const CURRENT_VERSION: &str = crate::SCHEMA_VERSION;

/// Check if a store written with `version` can be opened
///
/// Stores from a newer release are refused; unparseable versions count as 0.
pub fn is_version_compatible(version: &str) -> bool {
    let v: u32 = version.parse().unwrap_or(0);
    v <= CURRENT_VERSION.parse::<u32>().unwrap_or(1)
}

/// Get the database version from properties, `"1"` when none is recorded
pub fn get_database_version(conn: &Connection) -> Result<String> {
    let version: Option<String> = conn
        .query_row("SELECT version FROM mh_properties LIMIT 1", [], |row| row.get(0))
        .unwrap_or(None);
    Ok(version.unwrap_or_else(|| "1".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::schema;

    #[test]
    fn test_is_version_compatible() {
        assert!(is_version_compatible("1"));
        assert!(!is_version_compatible("2"));
        assert!(!is_version_compatible("999"));
        assert!(is_version_compatible("invalid"));
    }

    #[test]
    fn test_current_version() {
        assert_eq!(CURRENT_VERSION, "1");
    }

    #[test]
    fn test_get_database_version() {
        let conn = Connection::open_in_memory().unwrap();
        assert_eq!(get_database_version(&conn).unwrap(), "1");

        conn.execute(schema::CREATE_PROPERTIES_TABLE, []).unwrap();
        conn.execute("INSERT INTO mh_properties (store_id, version) VALUES ('a', NULL)", []).unwrap();
        assert_eq!(get_database_version(&conn).unwrap(), "1");

        conn.execute("UPDATE mh_properties SET version = '7'", []).unwrap();
        assert_eq!(get_database_version(&conn).unwrap(), "7");
    }
}
