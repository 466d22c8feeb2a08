//! SQLite store utilities.
//!
//! Runtime defaults:
//! - `journal_mode = WAL` so readers never block the single writer
//! - `busy_timeout = 5s` to absorb short lock contention
//! - `foreign_keys = ON` so relation rows follow their staff endpoints

pub mod migrations;
pub mod schema;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use rusqlite::{Connection, Transaction, TransactionBehavior, types::Type};
use std::{path::Path, str::FromStr, time::Duration};
use tracing::warn;

use crate::error::OrgResult;

/// Busy timeout used when the config does not set one.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SAVEPOINT: &str = "orgchart_op";
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Open (or create) a store file, apply runtime pragmas, and migrate the
/// schema to the latest version.
///
/// # Errors
///
/// Returns an error if opening, configuring, or migrating the database fails.
pub fn open_store(path: &Path, busy_timeout: Duration) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create store directory {}", parent.display()))?;
    }

    let mut conn =
        Connection::open(path).with_context(|| format!("open store {}", path.display()))?;

    configure_connection(&conn, busy_timeout).context("configure sqlite pragmas")?;
    migrations::migrate(&mut conn).context("apply store migrations")?;

    Ok(conn)
}

/// Open a fresh, fully migrated in-memory store.
///
/// # Errors
///
/// Returns an error if SQLite cannot allocate the database or a migration
/// fails.
pub fn open_in_memory() -> Result<Connection> {
    let mut conn = Connection::open_in_memory().context("open in-memory store")?;
    conn.pragma_update(None, "foreign_keys", "ON")
        .context("enable foreign keys")?;
    migrations::migrate(&mut conn).context("apply store migrations")?;
    Ok(conn)
}

fn configure_connection(conn: &Connection, busy_timeout: Duration) -> rusqlite::Result<()> {
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    let _journal_mode: String =
        conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
    conn.busy_timeout(busy_timeout)?;
    Ok(())
}

/// Run `op` atomically.
///
/// On an autocommit connection this opens an immediate transaction. Inside a
/// caller-owned transaction it opens a savepoint instead, so operations
/// compose. Any `Err` from `op` rolls back everything `op` wrote.
///
/// # Errors
///
/// Returns the error from `op`, or a storage error if the transaction cannot
/// be opened or committed.
pub fn with_transaction<T>(
    conn: &Connection,
    op: impl FnOnce(&Connection) -> OrgResult<T>,
) -> OrgResult<T> {
    if conn.is_autocommit() {
        // Take the write lock up front so a concurrent writer waits on the
        // busy timeout instead of failing the read-to-write upgrade.
        let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
        let value = op(&tx)?;
        tx.commit()?;
        return Ok(value);
    }

    conn.execute_batch(&format!("SAVEPOINT {SAVEPOINT}"))?;
    match op(conn) {
        Ok(value) => {
            conn.execute_batch(&format!("RELEASE {SAVEPOINT}"))?;
            Ok(value)
        }
        Err(err) => {
            let rollback = format!("ROLLBACK TO {SAVEPOINT}; RELEASE {SAVEPOINT}");
            if let Err(rollback_err) = conn.execute_batch(&rollback) {
                warn!(error = %rollback_err, "savepoint rollback failed");
            }
            Err(err)
        }
    }
}

/// Current wall-clock time in microseconds since the Unix epoch.
#[must_use]
pub fn now_us() -> i64 {
    chrono::Utc::now().timestamp_micros()
}

pub(crate) fn date_to_sql(date: Option<NaiveDate>) -> Option<String> {
    date.map(|d| d.format(DATE_FORMAT).to_string())
}

pub(crate) fn date_column(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<Option<NaiveDate>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|text| {
        NaiveDate::parse_from_str(&text, DATE_FORMAT)
            .map_err(|err| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err)))
    })
    .transpose()
}

/// Parse a TEXT column into one of the model enums.
pub(crate) fn enum_column<T>(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    raw.parse::<T>()
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err)))
}

pub(crate) fn bool_column(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<bool> {
    Ok(row.get::<_, i64>(idx)? != 0)
}

/// Accumulates `WHERE` conditions with positional parameters for list
/// queries.
#[derive(Default)]
pub(crate) struct Conditions {
    clauses: Vec<String>,
    params: Vec<Box<dyn rusqlite::types::ToSql>>,
}

impl Conditions {
    /// Add `column = ?N`.
    pub(crate) fn eq(&mut self, column: &str, value: impl rusqlite::types::ToSql + 'static) {
        self.params.push(Box::new(value));
        self.clauses
            .push(format!("{column} = ?{}", self.params.len()));
    }

    /// Add a condition that takes no parameter.
    pub(crate) fn raw(&mut self, clause: &str) {
        self.clauses.push(clause.to_string());
    }

    /// Add a clause containing exactly one `{}` placeholder for the
    /// parameter index.
    pub(crate) fn with_param(
        &mut self,
        template: &str,
        value: impl rusqlite::types::ToSql + 'static,
    ) {
        self.params.push(Box::new(value));
        let placeholder = format!("?{}", self.params.len());
        self.clauses.push(template.replacen("{}", &placeholder, 1));
    }

    pub(crate) fn where_clause(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.clauses.join(" AND "))
        }
    }

    pub(crate) fn params(&self) -> Vec<&dyn rusqlite::types::ToSql> {
        self.params.iter().map(AsRef::as_ref).collect()
    }
}

pub(crate) fn limit_clause(limit: Option<u32>, offset: Option<u32>) -> String {
    match (limit, offset) {
        (Some(limit), Some(offset)) => format!(" LIMIT {limit} OFFSET {offset}"),
        (Some(limit), None) => format!(" LIMIT {limit}"),
        (None, Some(offset)) => format!(" LIMIT -1 OFFSET {offset}"),
        (None, None) => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::{
        Conditions, DEFAULT_BUSY_TIMEOUT, limit_clause, open_in_memory, open_store,
        with_transaction,
    };
    use crate::db::migrations;
    use crate::error::OrgError;
    use std::time::Duration;
    use tempfile::TempDir;

    fn temp_db_path() -> (TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join(".orgchart").join("orgchart.sqlite3");
        (dir, path)
    }

    fn count_positions(conn: &rusqlite::Connection) -> i64 {
        conn.query_row("SELECT COUNT(*) FROM positions", [], |row| row.get(0))
            .expect("count")
    }

    fn insert_position(conn: &rusqlite::Connection, name: &str) -> Result<(), OrgError> {
        conn.execute(
            "INSERT INTO positions (name, created_at_us, updated_at_us) VALUES (?1, 0, 0)",
            [name],
        )?;
        Ok(())
    }

    #[test]
    fn open_store_sets_wal_busy_timeout_and_fk() {
        let (_dir, path) = temp_db_path();
        let conn = open_store(&path, DEFAULT_BUSY_TIMEOUT).expect("open store");

        let journal_mode: String = conn
            .pragma_query_value(None, "journal_mode", |row| row.get(0))
            .expect("query journal_mode");
        assert_eq!(journal_mode.to_ascii_lowercase(), "wal");

        let busy_timeout_ms: u64 = conn
            .pragma_query_value(None, "busy_timeout", |row| row.get(0))
            .expect("query busy_timeout");
        assert_eq!(
            u128::from(busy_timeout_ms),
            DEFAULT_BUSY_TIMEOUT.as_millis()
        );

        let foreign_keys: i64 = conn
            .pragma_query_value(None, "foreign_keys", |row| row.get(0))
            .expect("query foreign_keys");
        assert_eq!(foreign_keys, 1);
    }

    #[test]
    fn open_store_creates_parent_dir_and_migrates() {
        let (_dir, path) = temp_db_path();
        let conn = open_store(&path, DEFAULT_BUSY_TIMEOUT).expect("open store");
        assert!(path.exists());

        let version = migrations::current_schema_version(&conn).expect("schema version query");
        assert_eq!(version, migrations::LATEST_SCHEMA_VERSION);
    }

    #[test]
    fn transaction_commits_on_ok() {
        let conn = open_in_memory().expect("store");
        with_transaction(&conn, |tx| insert_position(tx, "Engineer")).expect("commit");
        assert_eq!(count_positions(&conn), 1);
        assert!(conn.is_autocommit());
    }

    #[test]
    fn transaction_rolls_back_on_err() {
        let conn = open_in_memory().expect("store");
        let result: Result<(), OrgError> = with_transaction(&conn, |tx| {
            insert_position(tx, "Engineer")?;
            Err(OrgError::validation("name", "forced failure"))
        });
        assert!(result.is_err());
        assert_eq!(count_positions(&conn), 0);
    }

    #[test]
    fn nested_failure_rolls_back_only_the_savepoint() {
        let conn = open_in_memory().expect("store");
        with_transaction(&conn, |outer| {
            insert_position(outer, "Engineer")?;
            let inner: Result<(), OrgError> = with_transaction(outer, |tx| {
                insert_position(tx, "Analyst")?;
                Err(OrgError::validation("name", "forced failure"))
            });
            assert!(inner.is_err());
            Ok(())
        })
        .expect("outer commit");

        let names: Vec<String> = conn
            .prepare("SELECT name FROM positions")
            .expect("prepare")
            .query_map([], |row| row.get(0))
            .expect("query")
            .collect::<Result<_, _>>()
            .expect("rows");
        assert_eq!(names, vec!["Engineer".to_string()]);
    }

    #[test]
    fn transaction_holds_the_write_lock_from_the_start() {
        let (_dir, path) = temp_db_path();
        let first = open_store(&path, DEFAULT_BUSY_TIMEOUT).expect("open first");
        let second = open_store(&path, Duration::from_millis(50)).expect("open second");

        with_transaction(&first, |tx| {
            // Only a read so far, yet a second writer cannot start.
            assert_eq!(count_positions(tx), 0);
            let blocked = with_transaction(&second, |other| insert_position(other, "Analyst"));
            assert!(
                matches!(
                    blocked,
                    Err(OrgError::Db(rusqlite::Error::SqliteFailure(ref failure, _)))
                        if failure.code == rusqlite::ErrorCode::DatabaseBusy
                ),
                "expected busy, got {blocked:?}"
            );
            insert_position(tx, "Engineer")
        })
        .expect("first commit");

        with_transaction(&second, |tx| insert_position(tx, "Analyst")).expect("second commit");
        assert_eq!(count_positions(&first), 2);
    }

    #[test]
    fn concurrent_writer_waits_on_busy_timeout() {
        let (_dir, path) = temp_db_path();
        let first = open_store(&path, DEFAULT_BUSY_TIMEOUT).expect("open first");
        let second = open_store(&path, DEFAULT_BUSY_TIMEOUT).expect("open second");

        let (locked_tx, locked_rx) = std::sync::mpsc::channel();
        let waiter = std::thread::spawn(move || {
            locked_rx.recv().expect("lock signal");
            with_transaction(&second, |tx| {
                let seen = count_positions(tx);
                insert_position(tx, "Analyst")?;
                Ok(seen)
            })
        });

        with_transaction(&first, |tx| {
            insert_position(tx, "Engineer")?;
            locked_tx.send(()).expect("signal");
            std::thread::sleep(Duration::from_millis(200));
            Ok(())
        })
        .expect("first commit");

        // The waiter could only begin after the first commit, so it sees that row.
        let seen = waiter.join().expect("join").expect("second commit");
        assert_eq!(seen, 1);
        assert_eq!(count_positions(&first), 2);
    }

    #[test]
    fn conditions_number_params_in_order() {
        let mut conditions = Conditions::default();
        assert_eq!(conditions.where_clause(), "");
        conditions.eq("organization_id", 3_i64);
        conditions.raw("parent_id IS NULL");
        conditions.with_param("lower(name) LIKE {}", "%eng%".to_string());
        assert_eq!(
            conditions.where_clause(),
            " WHERE organization_id = ?1 AND parent_id IS NULL AND lower(name) LIKE ?2"
        );
        assert_eq!(conditions.params().len(), 2);
    }

    #[test]
    fn limit_clause_handles_offset_without_limit() {
        assert_eq!(limit_clause(None, None), "");
        assert_eq!(limit_clause(Some(10), None), " LIMIT 10");
        assert_eq!(limit_clause(None, Some(5)), " LIMIT -1 OFFSET 5");
        assert_eq!(limit_clause(Some(10), Some(20)), " LIMIT 10 OFFSET 20");
    }
}
