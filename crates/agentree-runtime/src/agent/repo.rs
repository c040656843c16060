//! SQL access to the `Agents` table.
//!
//! Rows are read into [`AgentRow`] with legacy-tolerant column coercion and
//! decoded into [`Agent`] here, so services only ever see typed values.
//! Updates address rows by `rowid` and must touch exactly one row.

use super::model::{Agent, NewAgent, ROOT_EFFECTIVE_RATE};
use super::AgentError;
use crate::store::StoreError;
use agentree_auth::{Authority, AuthorityError, CardTypeGrants};
use agentree_types::AgentChain;
use chrono::DateTime;
use rusqlite::types::Value;
use rusqlite::{params, Connection, Row};

const SELECT_AGENT: &str = "SELECT rowid, User, Password, AccountBalance, AccountTime, Authority, \
     CardTypeAuthName, CardsEnable, Remarks, FNode, Stat, deltm, Duration_, Parities, TatalParities \
     FROM Agents";

/// One `Agents` row with encoded columns still as text.
#[derive(Debug, Clone)]
pub(crate) struct AgentRow {
    id: i64,
    username: String,
    password: String,
    balance: f64,
    time_stock: i64,
    authority: String,
    grants: String,
    cards_enabled: bool,
    remark: String,
    chain: String,
    stat: i64,
    deltm: i64,
    expires_at: i64,
    own_rate: f64,
    effective_rate: f64,
}

impl AgentRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            username: text_column(row, 1)?,
            password: text_column(row, 2)?,
            balance: real_column(row, 3, 0.0)?,
            time_stock: int_column(row, 4)?,
            authority: text_column(row, 5)?,
            grants: text_column(row, 6)?,
            cards_enabled: int_column(row, 7)? != 0,
            remark: text_column(row, 8)?,
            chain: text_column(row, 9)?,
            stat: int_column(row, 10)?,
            deltm: int_column(row, 11)?,
            expires_at: int_column(row, 12)?,
            own_rate: real_column(row, 13, 100.0)?,
            effective_rate: real_column(row, 14, 100.0)?,
        })
    }

    pub(crate) fn username(&self) -> &str {
        &self.username
    }

    pub(crate) fn is_deleted(&self) -> bool {
        self.deltm != 0
    }

    /// Enabled or disabled; other status codes are not listed.
    pub(crate) fn is_listable(&self) -> bool {
        !self.is_deleted() && matches!(self.stat, 0 | 1)
    }

    pub(crate) fn chain(&self) -> AgentChain {
        AgentChain::decode(&self.chain)
    }

    pub(crate) fn decode(self) -> Result<Agent, AuthorityError> {
        Ok(Agent {
            authority: Authority::decode_mask(self.authority.trim())?,
            card_type_grants: CardTypeGrants::decode(&self.grants),
            chain: AgentChain::decode(&self.chain),
            id: self.id,
            username: self.username,
            password: self.password,
            balance: self.balance,
            time_stock: self.time_stock,
            stat: self.stat,
            cards_enabled: self.cards_enabled,
            deleted: self.deltm != 0,
            expires_at: self.expires_at,
            own_rate: self.own_rate,
            effective_rate: self.effective_rate,
            remark: self.remark,
        })
    }
}

fn text_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<String> {
    Ok(match row.get::<_, Value>(idx)? {
        Value::Text(s) => s,
        Value::Integer(i) => i.to_string(),
        Value::Real(f) => f.to_string(),
        Value::Null | Value::Blob(_) => String::new(),
    })
}

fn int_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<i64> {
    Ok(match row.get::<_, Value>(idx)? {
        Value::Integer(i) => i,
        #[allow(clippy::cast_possible_truncation)]
        Value::Real(f) => f as i64,
        Value::Text(s) => s.trim().trim_matches('\'').parse().unwrap_or(0),
        Value::Null | Value::Blob(_) => 0,
    })
}

fn real_column(row: &Row<'_>, idx: usize, default: f64) -> rusqlite::Result<f64> {
    Ok(match row.get::<_, Value>(idx)? {
        Value::Real(f) => f,
        #[allow(clippy::cast_precision_loss)]
        Value::Integer(i) => i as f64,
        Value::Text(s) => s.trim().trim_matches('\'').parse().unwrap_or(default),
        Value::Null | Value::Blob(_) => default,
    })
}

/// Every row in insertion order.
pub(crate) fn all_rows(conn: &Connection) -> Result<Vec<AgentRow>, AgentError> {
    let mut stmt = conn.prepare(&format!("{SELECT_AGENT} ORDER BY rowid"))?;
    let rows = stmt.query_map([], AgentRow::from_row)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

/// Non-deleted rows with status enabled or disabled, in insertion order.
pub(crate) fn listable_rows(conn: &Connection) -> Result<Vec<AgentRow>, AgentError> {
    Ok(all_rows(conn)?
        .into_iter()
        .filter(AgentRow::is_listable)
        .collect())
}

/// Returns `true` if any row, deleted or not, has this username.
pub(crate) fn username_exists(conn: &Connection, username: &str) -> Result<bool, AgentError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM Agents WHERE User = ?1",
        [username],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// The first non-deleted row with this username, decoded.
pub(crate) fn find_live(conn: &Connection, username: &str) -> Result<Option<Agent>, AgentError> {
    let mut stmt = conn.prepare(&format!("{SELECT_AGENT} WHERE User = ?1 ORDER BY rowid"))?;
    let rows = stmt.query_map([username], AgentRow::from_row)?;
    for row in rows {
        let row = row?;
        if !row.is_deleted() {
            return Ok(Some(row.decode()?));
        }
    }
    Ok(None)
}

/// Returns `true` if a non-deleted agent other than `username` has it as an
/// ancestor.
pub(crate) fn has_live_descendant(conn: &Connection, username: &str) -> Result<bool, AgentError> {
    Ok(all_rows(conn)?.iter().any(|row| {
        !row.is_deleted() && row.username() != username && row.chain().has_strict_ancestor(username)
    }))
}

fn expiry_text(expires_at: i64) -> String {
    if expires_at == 0 {
        return String::new();
    }
    DateTime::from_timestamp(expires_at, 0)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_default()
}

/// Inserts a new agent with zero balance and time. Returns its row id.
pub(crate) fn insert(
    conn: &Connection,
    spec: &NewAgent,
    authority: Authority,
    chain: &AgentChain,
    effective_rate: f64,
) -> Result<i64, AgentError> {
    conn.execute(
        "INSERT INTO Agents (User, Password, AccountBalance, AccountTime, Duration, Authority, \
         CardTypeAuthName, CardsEnable, Remarks, FNode, Stat, deltm, Duration_, Parities, TatalParities) \
         VALUES (?1, ?2, 0, 0, ?3, ?4, ?5, 1, ?6, ?7, 0, 0, ?8, ?9, ?10)",
        params![
            spec.username,
            spec.password,
            expiry_text(spec.expires_at),
            authority.encode_mask(),
            spec.card_type_grants.encode(),
            spec.remark,
            chain.encode(),
            spec.expires_at,
            spec.own_rate,
            effective_rate,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

fn expect_one(affected: usize) -> Result<(), AgentError> {
    if affected == 1 {
        Ok(())
    } else {
        Err(StoreError::UnexpectedRowCount {
            expected: 1,
            actual: affected,
        }
        .into())
    }
}

/// Sets `Stat` and `CardsEnable` together.
pub(crate) fn set_enabled(conn: &Connection, id: i64, enabled: bool) -> Result<(), AgentError> {
    let stat: i64 = if enabled { 0 } else { 1 };
    expect_one(conn.execute(
        "UPDATE Agents SET Stat = ?1, CardsEnable = ?2 WHERE rowid = ?3",
        params![stat, enabled, id],
    )?)
}

pub(crate) fn set_remark(conn: &Connection, id: i64, remark: &str) -> Result<(), AgentError> {
    expect_one(conn.execute(
        "UPDATE Agents SET Remarks = ?1 WHERE rowid = ?2",
        params![remark, id],
    )?)
}

pub(crate) fn set_grants(
    conn: &Connection,
    id: i64,
    grants: &CardTypeGrants,
) -> Result<(), AgentError> {
    expect_one(conn.execute(
        "UPDATE Agents SET CardTypeAuthName = ?1 WHERE rowid = ?2",
        params![grants.encode(), id],
    )?)
}

pub(crate) fn set_authority(conn: &Connection, id: i64, mask: &str) -> Result<(), AgentError> {
    expect_one(conn.execute(
        "UPDATE Agents SET Authority = ?1 WHERE rowid = ?2",
        params![mask, id],
    )?)
}

pub(crate) fn set_password(conn: &Connection, id: i64, password: &str) -> Result<(), AgentError> {
    expect_one(conn.execute(
        "UPDATE Agents SET Password = ?1 WHERE rowid = ?2",
        params![password, id],
    )?)
}

pub(crate) fn mark_deleted(conn: &Connection, id: i64) -> Result<(), AgentError> {
    expect_one(conn.execute("UPDATE Agents SET deltm = 1 WHERE rowid = ?1", [id])?)
}

/// Adds the deltas to the stored balance and time (negative to debit).
pub(crate) fn adjust_funds(
    conn: &Connection,
    id: i64,
    balance_delta: f64,
    time_delta: i64,
) -> Result<(), AgentError> {
    expect_one(conn.execute(
        "UPDATE Agents SET AccountBalance = COALESCE(AccountBalance, 0) + ?1, \
         AccountTime = COALESCE(AccountTime, 0) + ?2 WHERE rowid = ?3",
        params![balance_delta, time_delta, id],
    )?)
}

/// Inserts a tenant root agent: chain of one, effective rate 100.
pub(crate) fn insert_root(
    conn: &Connection,
    spec: &NewAgent,
    balance: f64,
    time_stock: i64,
) -> Result<i64, AgentError> {
    let id = insert(
        conn,
        spec,
        spec.authority,
        &AgentChain::root(spec.username.as_str()),
        ROOT_EFFECTIVE_RATE,
    )?;
    adjust_funds(conn, id, balance, time_stock)?;
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::schema;
    use agentree_types::ErrorCode;

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        schema::apply(&conn).unwrap();
        conn
    }

    #[test]
    fn root_round_trip() {
        let conn = conn();
        let grants = CardTypeGrants::decode("[day],[week]");
        let spec = NewAgent::new("admin", "pw")
            .with_authority(Authority::ALL)
            .with_grants(["day", "week"]);
        insert_root(&conn, &spec, 50.0, 7200).unwrap();

        let admin = find_live(&conn, "admin").unwrap().unwrap();
        assert_eq!(admin.authority, Authority::ALL);
        assert_eq!(admin.card_type_grants, grants);
        assert_eq!(admin.chain.names(), ["admin"]);
        assert_eq!(admin.time_stock, 7200);
        assert!((admin.effective_rate - 100.0).abs() < f64::EPSILON);
        assert!(admin.cards_enabled);
    }

    #[test]
    fn legacy_text_and_null_columns_are_tolerated() {
        let conn = conn();
        conn.execute(
            "INSERT INTO Agents (User, Password, Authority, FNode, Stat, deltm, AccountBalance) \
             VALUES ('old', 'pw', '0x4', '[old]', '''0''', NULL, NULL)",
            [],
        )
        .unwrap();

        let old = find_live(&conn, "old").unwrap().unwrap();
        assert_eq!(old.stat, 0);
        assert!(!old.deleted);
        assert_eq!(old.authority, Authority::MANAGE_AGENT);
        assert!(old.balance.abs() < f64::EPSILON);
        assert!((old.own_rate - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn malformed_authority_surfaces() {
        let conn = conn();
        conn.execute(
            "INSERT INTO Agents (User, Authority, FNode) VALUES ('bad', 'nothex', '[bad]')",
            [],
        )
        .unwrap();

        let err = find_live(&conn, "bad").unwrap_err();
        assert!(matches!(err, AgentError::MalformedAuthority(_)));
    }

    #[test]
    fn deleted_rows_are_not_live() {
        let conn = conn();
        let id = insert_root(&conn, &NewAgent::new("a", "pw"), 0.0, 0).unwrap();
        mark_deleted(&conn, id).unwrap();

        assert!(find_live(&conn, "a").unwrap().is_none());
        assert!(username_exists(&conn, "a").unwrap());
        assert!(listable_rows(&conn).unwrap().is_empty());
    }

    #[test]
    fn update_of_missing_row_fails() {
        let conn = conn();
        let err = set_remark(&conn, 42, "x").unwrap_err();
        assert!(matches!(
            err,
            AgentError::StoreUnavailable(StoreError::UnexpectedRowCount {
                expected: 1,
                actual: 0
            })
        ));
        // A missing row is not a transient engine failure.
        assert!(!err.is_recoverable());
    }

    #[test]
    fn expiry_text_formats_utc() {
        assert_eq!(expiry_text(0), "");
        assert_eq!(expiry_text(86_400), "1970-01-02 00:00:00");
    }
}
