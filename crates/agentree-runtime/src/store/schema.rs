//! Tenant database schema.
//!
//! Column names and types follow the legacy layout so existing tenant
//! databases open unchanged. `CREATE ... IF NOT EXISTS` makes provisioning
//! idempotent.

use rusqlite::Connection;

/// Agents, card types and the tenant catalog.
///
/// `Authority` is hex text, `CardTypeAuthName` and `FNode` are bracketed
/// lists. `Stat` 0 = enabled, 1 = disabled. `deltm` non-zero = soft-deleted.
/// `Parities` is the agent's own rate and `TatalParities` its effective rate.
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS Agents (
    User             NVARCHAR (100),
    Password         NVARCHAR (100),
    AccountBalance   REAL,
    AccountTime      INTEGER,
    Duration         NVARCHAR (20),
    Authority        NVARCHAR (50),
    CardTypeAuthName TEXT,
    CardsEnable      BOOLEAN,
    Remarks          NVARCHAR (400),
    FNode            TEXT,
    Stat             INTEGER DEFAULT 0,
    deltm            INTEGER DEFAULT 0,
    Duration_        INTEGER,
    Parities         DOUBLE DEFAULT (100.0),
    TatalParities    DOUBLE DEFAULT (100.0)
);

CREATE INDEX IF NOT EXISTS idx_agents_user ON Agents (User);

CREATE TABLE IF NOT EXISTS CardType (
    Name     NVARCHAR (200) UNIQUE NOT NULL,
    Prefix   NVARCHAR (50),
    Duration INTEGER,
    Price    REAL,
    Remarks  NVARCHAR (400)
);

CREATE TABLE IF NOT EXISTS MultiSoftware (
    SoftwareName NVARCHAR (200) PRIMARY KEY NOT NULL DEFAULT '',
    State        INTEGER DEFAULT 1,
    idc          NVARCHAR (200) DEFAULT ''
);
"#;

/// Applies [`SCHEMA_SQL`] to `conn`.
///
/// # Errors
///
/// Returns the engine error if any statement fails.
pub fn apply(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        apply(&conn).unwrap();
        apply(&conn).unwrap();

        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' \
                 AND name IN ('Agents', 'CardType', 'MultiSoftware')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 3);
    }

    #[test]
    fn legacy_defaults_apply() {
        let conn = Connection::open_in_memory().unwrap();
        apply(&conn).unwrap();
        conn.execute("INSERT INTO Agents (User) VALUES ('x')", [])
            .unwrap();

        let (stat, deltm, parities): (i64, i64, f64) = conn
            .query_row(
                "SELECT Stat, deltm, Parities FROM Agents WHERE User = 'x'",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .unwrap();
        assert_eq!((stat, deltm), (0, 0));
        assert!((parities - 100.0).abs() < f64::EPSILON);
    }
}
