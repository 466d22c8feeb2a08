use rusqlite::{Connection, OptionalExtension, params, params_from_iter};
use tracing::{debug, info};

use super::{Changes, Repository, count_where, ensure_exists, require_text};
use crate::cascade;
use crate::db::{Conditions, bool_column, limit_clause, now_us, with_transaction};
use crate::error::{OrgError, OrgResult};
use crate::hierarchy;
use crate::model::{Division, DivisionFilter, DivisionUpdate, EntityKind, NewDivision};
use crate::tree::{self, TreeKind};

const COLUMNS: &str = "id, name, code, description, ckp, organization_id, parent_id, level, \
     is_active, created_at_us, updated_at_us";

fn row_to_division(row: &rusqlite::Row<'_>) -> rusqlite::Result<Division> {
    Ok(Division {
        id: row.get(0)?,
        name: row.get(1)?,
        code: row.get(2)?,
        description: row.get(3)?,
        ckp: row.get(4)?,
        organization_id: row.get(5)?,
        parent_id: row.get(6)?,
        level: row.get(7)?,
        is_active: bool_column(row, 8)?,
        created_at_us: row.get(9)?,
        updated_at_us: row.get(10)?,
    })
}

/// Repository for per-organization division trees.
pub struct Divisions;

impl Repository for Divisions {
    type Record = Division;
    type New = NewDivision;
    type Update = DivisionUpdate;
    type Filter = DivisionFilter;

    const KIND: EntityKind = EntityKind::Division;

    fn get(conn: &Connection, id: i64) -> OrgResult<Option<Division>> {
        let sql = format!("SELECT {COLUMNS} FROM divisions WHERE id = ?1");
        Ok(conn.query_row(&sql, params![id], row_to_division).optional()?)
    }

    fn list(conn: &Connection, filter: &DivisionFilter) -> OrgResult<Vec<Division>> {
        let mut conditions = Conditions::default();
        if let Some(org) = filter.organization_id {
            conditions.eq("organization_id", org);
        }
        if let Some(parent_id) = filter.parent_id {
            conditions.eq("parent_id", parent_id);
        } else if filter.roots_only {
            conditions.raw("parent_id IS NULL");
        }
        if let Some(level) = filter.level {
            conditions.eq("level", level);
        }
        if let Some(active) = filter.is_active {
            conditions.eq("is_active", i64::from(active));
        }

        let sql = format!(
            "SELECT {COLUMNS} FROM divisions{} ORDER BY id{}",
            conditions.where_clause(),
            limit_clause(filter.limit, filter.offset)
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(conditions.params()), row_to_division)?
            .collect::<Result<Vec<_>, _>>()?;
        debug!(count = rows.len(), "listed divisions");
        Ok(rows)
    }

    fn create(conn: &Connection, new: &NewDivision) -> OrgResult<Division> {
        require_text("name", &new.name)?;

        with_transaction(conn, |tx| {
            let org_type = hierarchy::require_org_type(tx, new.organization_id)?;
            if !hierarchy::can_own_divisions(org_type) {
                return Err(OrgError::validation(
                    "organization_id",
                    format!("a {org_type} organization cannot own divisions"),
                ));
            }

            if let Some(parent_id) = new.parent_id {
                let parent_org = tree::division_org(tx, parent_id)?;
                if parent_org != new.organization_id {
                    return Err(OrgError::validation(
                        "parent_id",
                        format!(
                            "division {parent_id} belongs to organization {parent_org}, not {}",
                            new.organization_id
                        ),
                    ));
                }
            }
            let level = tree::level_under(tx, new.parent_id)?;

            tx.execute(
                "INSERT INTO divisions (
                    name, code, description, ckp, organization_id, parent_id, level,
                    is_active, created_at_us, updated_at_us
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 1, ?8, ?8)",
                params![
                    new.name.trim(),
                    new.code.trim(),
                    new.description,
                    new.ckp,
                    new.organization_id,
                    new.parent_id,
                    level,
                    now_us(),
                ],
            )?;
            let id = tx.last_insert_rowid();
            info!(id, name = %new.name, organization_id = new.organization_id, level, "division created");
            Self::require(tx, id)
        })
    }

    /// A change of `is_active` is applied to every descendant too.
    fn update(conn: &Connection, id: i64, update: &DivisionUpdate) -> OrgResult<Division> {
        if let Some(name) = &update.name {
            require_text("name", name)?;
        }

        with_transaction(conn, |tx| {
            let current = Self::require(tx, id)?;

            let mut changes = Changes::default();
            changes.set_trimmed("name", update.name.as_deref());
            changes.set_trimmed("code", update.code.as_deref());
            changes.set_opt("description", update.description.as_ref());
            changes.set_opt("ckp", update.ckp.as_ref());
            let fields = changes.columns().join(",");
            changes.apply(tx, "divisions", id)?;

            if let Some(active) = update.is_active
                && active != current.is_active
            {
                cascade::set_active(tx, TreeKind::Division, id, active)?;
            }

            info!(id, %fields, is_active = ?update.is_active, "division updated");
            Self::require(tx, id)
        })
    }

    fn delete(conn: &Connection, id: i64) -> OrgResult<()> {
        with_transaction(conn, |tx| {
            ensure_exists(tx, Self::KIND, id)?;

            let children = count_where(tx, "divisions", "parent_id", id)?;
            if children > 0 {
                return Err(OrgError::HasChildren {
                    kind: Self::KIND,
                    id,
                    count: children,
                });
            }
            let staff = count_where(tx, "staff", "division_id", id)?;
            if staff > 0 {
                return Err(OrgError::HasDependents {
                    kind: Self::KIND,
                    id,
                    dependents: "staff",
                    count: staff,
                });
            }

            tx.execute("DELETE FROM divisions WHERE id = ?1", params![id])?;
            info!(id, "division deleted");
            Ok(())
        })
    }
}

impl Divisions {
    /// Re-parent a division within its organization, recomputing levels.
    ///
    /// # Errors
    ///
    /// See [`tree::validate_move`].
    pub fn move_to(conn: &Connection, id: i64, parent_id: Option<i64>) -> OrgResult<Division> {
        tree::move_node(conn, TreeKind::Division, id, parent_id)?;
        Self::require(conn, id)
    }

    /// Direct child divisions.
    ///
    /// # Errors
    ///
    /// Returns [`OrgError::NotFound`] for an unknown id, or [`OrgError::Db`].
    pub fn children(conn: &Connection, id: i64) -> OrgResult<Vec<Division>> {
        ensure_exists(conn, Self::KIND, id)?;
        Self::list(
            conn,
            &DivisionFilter {
                parent_id: Some(id),
                ..DivisionFilter::default()
            },
        )
    }

    /// Every division below `id`, breadth-first.
    ///
    /// # Errors
    ///
    /// See [`tree::descendants`].
    pub fn descendants(conn: &Connection, id: i64) -> OrgResult<Vec<Division>> {
        ensure_exists(conn, Self::KIND, id)?;
        tree::descendants(conn, TreeKind::Division, id)?
            .into_iter()
            .map(|node| Self::require(conn, node))
            .collect()
    }
}
