use rusqlite::{Connection, OptionalExtension, params, params_from_iter};
use tracing::info;

use super::{Changes, Repository, count_where, ensure_exists, require_text};
use crate::db::{Conditions, bool_column, limit_clause, now_us};
use crate::error::{OrgError, OrgResult};
use crate::model::{EntityKind, NewPosition, Position, PositionFilter, PositionUpdate};

const COLUMNS: &str = "id, name, description, is_active, created_at_us, updated_at_us";

fn row_to_position(row: &rusqlite::Row<'_>) -> rusqlite::Result<Position> {
    Ok(Position {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        is_active: bool_column(row, 3)?,
        created_at_us: row.get(4)?,
        updated_at_us: row.get(5)?,
    })
}

/// Repository for job titles.
pub struct Positions;

impl Repository for Positions {
    type Record = Position;
    type New = NewPosition;
    type Update = PositionUpdate;
    type Filter = PositionFilter;

    const KIND: EntityKind = EntityKind::Position;

    fn get(conn: &Connection, id: i64) -> OrgResult<Option<Position>> {
        let sql = format!("SELECT {COLUMNS} FROM positions WHERE id = ?1");
        Ok(conn.query_row(&sql, params![id], row_to_position).optional()?)
    }

    fn list(conn: &Connection, filter: &PositionFilter) -> OrgResult<Vec<Position>> {
        let mut conditions = Conditions::default();
        if let Some(needle) = &filter.name_contains {
            conditions.with_param(
                "lower(name) LIKE {}",
                format!("%{}%", needle.to_lowercase()),
            );
        }
        if let Some(active) = filter.is_active {
            conditions.eq("is_active", i64::from(active));
        }

        let sql = format!(
            "SELECT {COLUMNS} FROM positions{} ORDER BY id{}",
            conditions.where_clause(),
            limit_clause(filter.limit, filter.offset)
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(conditions.params()), row_to_position)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn create(conn: &Connection, new: &NewPosition) -> OrgResult<Position> {
        require_text("name", &new.name)?;
        let now = now_us();
        conn.execute(
            "INSERT INTO positions (name, description, is_active, created_at_us, updated_at_us)
             VALUES (?1, ?2, 1, ?3, ?3)",
            params![new.name.trim(), new.description, now],
        )?;
        let id = conn.last_insert_rowid();
        info!(id, name = %new.name, "position created");
        Self::require(conn, id)
    }

    fn update(conn: &Connection, id: i64, update: &PositionUpdate) -> OrgResult<Position> {
        if let Some(name) = &update.name {
            require_text("name", name)?;
        }
        ensure_exists(conn, Self::KIND, id)?;

        let mut changes = Changes::default();
        changes.set_trimmed("name", update.name.as_deref());
        changes.set_opt("description", update.description.as_ref());
        if let Some(active) = update.is_active {
            changes.set("is_active", i64::from(active));
        }
        changes.apply(conn, "positions", id)?;
        info!(id, "position updated");
        Self::require(conn, id)
    }

    fn delete(conn: &Connection, id: i64) -> OrgResult<()> {
        ensure_exists(conn, Self::KIND, id)?;
        let holders = count_where(conn, "staff", "position_id", id)?;
        if holders > 0 {
            return Err(OrgError::HasDependents {
                kind: Self::KIND,
                id,
                dependents: "staff",
                count: holders,
            });
        }
        conn.execute("DELETE FROM positions WHERE id = ?1", params![id])?;
        info!(id, "position deleted");
        Ok(())
    }
}
