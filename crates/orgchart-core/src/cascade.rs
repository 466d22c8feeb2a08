//! Cascading activation state.
//!
//! Setting `is_active` on a node applies the same value to its whole subtree
//! in one transaction, so a subtree is never left half toggled.

use rusqlite::{Connection, params};
use tracing::info;

use crate::db::{now_us, with_transaction};
use crate::error::{OrgError, OrgResult};
use crate::tree::{self, TreeKind};

/// Set `is_active` on `id` and every descendant. Returns how many rows were
/// written (the node plus its descendants).
///
/// # Errors
///
/// Returns [`OrgError::NotFound`] if `id` does not exist,
/// [`OrgError::CorruptTree`] if the subtree walk trips the guard, or
/// [`OrgError::Db`] on storage failure. Nothing is written on error.
pub fn set_active(conn: &Connection, kind: TreeKind, id: i64, active: bool) -> OrgResult<usize> {
    with_transaction(conn, |tx| {
        if !tree::exists(tx, kind, id)? {
            return Err(OrgError::not_found(kind.entity(), id));
        }

        let mut nodes = tree::descendants(tx, kind, id)?;
        nodes.insert(0, id);

        let sql = format!(
            "UPDATE {} SET is_active = ?1, updated_at_us = ?2 WHERE id = ?3",
            kind.table()
        );
        let mut stmt = tx.prepare(&sql)?;
        let now = now_us();
        for node in &nodes {
            stmt.execute(params![i64::from(active), now, node])?;
        }

        info!(%kind, id, active, affected = nodes.len(), "activation cascaded");
        Ok(nodes.len())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    fn insert_division(conn: &Connection, parent: Option<i64>, name: &str) -> i64 {
        conn.execute(
            "INSERT INTO divisions (name, code, organization_id, parent_id, created_at_us, updated_at_us)
             VALUES (?1, ?1, 1, ?2, 0, 0)",
            params![name, parent],
        )
        .unwrap();
        conn.last_insert_rowid()
    }

    fn inactive_count(conn: &Connection) -> i64 {
        conn.query_row("SELECT COUNT(*) FROM divisions WHERE is_active = 0", [], |row| {
            row.get(0)
        })
        .unwrap()
    }

    fn store() -> Connection {
        let conn = db::open_in_memory().unwrap();
        conn.execute(
            "INSERT INTO organizations (name, code, org_type, created_at_us, updated_at_us)
             VALUES ('Acme', 'ACME', 'holding', 0, 0)",
            [],
        )
        .unwrap();
        conn
    }

    #[test]
    fn deactivation_covers_subtree_only() {
        let conn = store();
        let root = insert_division(&conn, None, "root");
        let left = insert_division(&conn, Some(root), "left");
        insert_division(&conn, Some(left), "left-leaf");
        let unrelated = insert_division(&conn, None, "unrelated");
        insert_division(&conn, Some(unrelated), "unrelated-leaf");

        let affected = set_active(&conn, TreeKind::Division, root, false).unwrap();
        assert_eq!(affected, 3);
        assert_eq!(inactive_count(&conn), 3);

        let affected = set_active(&conn, TreeKind::Division, left, true).unwrap();
        assert_eq!(affected, 2);
        assert_eq!(inactive_count(&conn), 1);
    }

    #[test]
    fn missing_node_is_not_found() {
        let conn = store();
        assert!(matches!(
            set_active(&conn, TreeKind::Division, 9, false),
            Err(OrgError::NotFound { id: 9, .. })
        ));
    }

    #[test]
    fn corrupt_subtree_writes_nothing() {
        let conn = store();
        let a = insert_division(&conn, None, "a");
        let b = insert_division(&conn, Some(a), "b");
        conn.execute("UPDATE divisions SET parent_id = ?1 WHERE id = ?2", [b, a])
            .unwrap();

        assert!(matches!(
            set_active(&conn, TreeKind::Division, a, false),
            Err(OrgError::CorruptTree { .. })
        ));
        assert_eq!(inactive_count(&conn), 0);
    }
}
