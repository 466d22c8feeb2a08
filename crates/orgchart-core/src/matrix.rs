//! Matrix reporting: typed, many-to-many relations between staff.
//!
//! Functional relations sit on top of the primary manager chain. A staff
//! member may have any number of them, of any type, and they may run in
//! both directions between the same two people. No cycle check applies.
//!
//! Two relations conflict only when both are active, share the
//! `(manager, subordinate, type)` triple, and their date windows overlap.
//! Open-ended windows are unbounded on that side.

use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, params, params_from_iter};
use serde::Serialize;
use tracing::{debug, info};

use crate::db::{
    Conditions, bool_column, date_column, date_to_sql, enum_column, limit_clause, now_us,
    with_transaction,
};
use crate::error::{OrgError, OrgResult};
use crate::model::{
    EntityKind, FunctionalRelation, NewRelation, RelationFilter, RelationType, RelationUpdate,
    Staff, ranges_overlap,
};
use crate::store::{Changes, Repository, StaffMembers, ensure_exists};

const COLUMNS: &str = "id, manager_id, subordinate_id, relation_type, description, is_active, \
     start_date, end_date, created_at_us, updated_at_us";

fn row_to_relation(row: &rusqlite::Row<'_>) -> rusqlite::Result<FunctionalRelation> {
    Ok(FunctionalRelation {
        id: row.get(0)?,
        manager_id: row.get(1)?,
        subordinate_id: row.get(2)?,
        relation_type: enum_column(row, 3)?,
        description: row.get(4)?,
        is_active: bool_column(row, 5)?,
        start_date: date_column(row, 6)?,
        end_date: date_column(row, 7)?,
        created_at_us: row.get(8)?,
        updated_at_us: row.get(9)?,
    })
}

fn validate_window(start: Option<NaiveDate>, end: Option<NaiveDate>) -> OrgResult<()> {
    if let (Some(start), Some(end)) = (start, end)
        && end < start
    {
        return Err(OrgError::validation(
            "end_date",
            format!("{end} is before start date {start}"),
        ));
    }
    Ok(())
}

/// First active relation on the same triple whose window overlaps
/// `[start, end]`, ignoring `exclude`.
fn find_conflict(
    conn: &Connection,
    manager_id: i64,
    subordinate_id: i64,
    relation_type: RelationType,
    window: (Option<NaiveDate>, Option<NaiveDate>),
    exclude: Option<i64>,
) -> OrgResult<Option<i64>> {
    let sql = format!(
        "SELECT {COLUMNS} FROM functional_relations
         WHERE manager_id = ?1 AND subordinate_id = ?2 AND relation_type = ?3 AND is_active = 1
         ORDER BY id"
    );
    let mut stmt = conn.prepare(&sql)?;
    let candidates = stmt
        .query_map(
            params![manager_id, subordinate_id, relation_type.as_str()],
            row_to_relation,
        )?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(candidates
        .into_iter()
        .filter(|existing| Some(existing.id) != exclude)
        .find(|existing| ranges_overlap((existing.start_date, existing.end_date), window))
        .map(|existing| existing.id))
}

/// Create a functional relation.
///
/// Checks run in this order: self-relation, both staff exist, date window,
/// then duplicates.
///
/// # Errors
///
/// Returns [`OrgError::SelfRelation`], [`OrgError::NotFound`],
/// [`OrgError::Validation`], [`OrgError::DuplicateRelation`], or
/// [`OrgError::Db`].
pub fn create_relation(conn: &Connection, new: &NewRelation) -> OrgResult<FunctionalRelation> {
    if new.manager_id == new.subordinate_id {
        return Err(OrgError::SelfRelation {
            staff_id: new.manager_id,
        });
    }

    with_transaction(conn, |tx| {
        ensure_exists(tx, EntityKind::Staff, new.manager_id)?;
        ensure_exists(tx, EntityKind::Staff, new.subordinate_id)?;
        validate_window(new.start_date, new.end_date)?;

        if let Some(existing_id) = find_conflict(
            tx,
            new.manager_id,
            new.subordinate_id,
            new.relation_type,
            (new.start_date, new.end_date),
            None,
        )? {
            return Err(OrgError::DuplicateRelation {
                manager_id: new.manager_id,
                subordinate_id: new.subordinate_id,
                relation_type: new.relation_type,
                existing_id,
            });
        }

        tx.execute(
            "INSERT INTO functional_relations (
                manager_id, subordinate_id, relation_type, description, is_active,
                start_date, end_date, created_at_us, updated_at_us
             ) VALUES (?1, ?2, ?3, ?4, 1, ?5, ?6, ?7, ?7)",
            params![
                new.manager_id,
                new.subordinate_id,
                new.relation_type.as_str(),
                new.description,
                date_to_sql(new.start_date),
                date_to_sql(new.end_date),
                now_us(),
            ],
        )?;
        let id = tx.last_insert_rowid();
        info!(
            id,
            manager_id = new.manager_id,
            subordinate_id = new.subordinate_id,
            relation_type = %new.relation_type,
            "functional relation created"
        );
        Relations::require(tx, id)
    })
}

/// Relations where `manager_id` is the manager, optionally of one type.
///
/// # Errors
///
/// Returns [`OrgError::Db`] on storage failure.
pub fn relations_by_manager(
    conn: &Connection,
    manager_id: i64,
    relation_type: Option<RelationType>,
) -> OrgResult<Vec<FunctionalRelation>> {
    Relations::list(
        conn,
        &RelationFilter {
            manager_id: Some(manager_id),
            relation_type,
            ..RelationFilter::default()
        },
    )
}

/// Relations where `subordinate_id` is the subordinate.
///
/// # Errors
///
/// Returns [`OrgError::Db`] on storage failure.
pub fn relations_by_subordinate(
    conn: &Connection,
    subordinate_id: i64,
) -> OrgResult<Vec<FunctionalRelation>> {
    Relations::list(
        conn,
        &RelationFilter {
            subordinate_id: Some(subordinate_id),
            ..RelationFilter::default()
        },
    )
}

/// Every relation of one type.
///
/// # Errors
///
/// Returns [`OrgError::Db`] on storage failure.
pub fn relations_by_type(
    conn: &Connection,
    relation_type: RelationType,
) -> OrgResult<Vec<FunctionalRelation>> {
    Relations::list(
        conn,
        &RelationFilter {
            relation_type: Some(relation_type),
            ..RelationFilter::default()
        },
    )
}

/// Delete a relation.
///
/// # Errors
///
/// Returns [`OrgError::NotFound`] if no relation has this id.
pub fn remove_relation(conn: &Connection, id: i64) -> OrgResult<()> {
    Relations::delete(conn, id)
}

/// Mark a relation inactive. Inactive relations never block new ones.
///
/// # Errors
///
/// Returns [`OrgError::NotFound`] if no relation has this id.
pub fn deactivate_relation(conn: &Connection, id: i64) -> OrgResult<FunctionalRelation> {
    Relations::update(
        conn,
        id,
        &RelationUpdate {
            is_active: Some(false),
            ..RelationUpdate::default()
        },
    )
}

/// Everyone a staff member answers to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportingLines {
    pub staff_id: i64,
    /// The single primary manager, if any.
    pub primary_manager: Option<Staff>,
    /// Active matrix relations where the staff member is the subordinate.
    pub relations: Vec<FunctionalRelation>,
}

/// Primary manager plus every active functional relation above `staff_id`.
///
/// # Errors
///
/// Returns [`OrgError::NotFound`] if the staff member does not exist.
pub fn reporting_lines(conn: &Connection, staff_id: i64) -> OrgResult<ReportingLines> {
    let staff = StaffMembers::require(conn, staff_id)?;
    let primary_manager = staff
        .manager_id
        .map(|manager| StaffMembers::require(conn, manager))
        .transpose()?;
    let relations = Relations::list(
        conn,
        &RelationFilter {
            subordinate_id: Some(staff_id),
            active_only: true,
            ..RelationFilter::default()
        },
    )?;
    debug!(staff_id, lines = relations.len(), "resolved reporting lines");
    Ok(ReportingLines {
        staff_id,
        primary_manager,
        relations,
    })
}

/// Repository for functional relations.
pub struct Relations;

impl Repository for Relations {
    type Record = FunctionalRelation;
    type New = NewRelation;
    type Update = RelationUpdate;
    type Filter = RelationFilter;

    const KIND: EntityKind = EntityKind::FunctionalRelation;

    fn get(conn: &Connection, id: i64) -> OrgResult<Option<FunctionalRelation>> {
        let sql = format!("SELECT {COLUMNS} FROM functional_relations WHERE id = ?1");
        Ok(conn.query_row(&sql, params![id], row_to_relation).optional()?)
    }

    fn list(conn: &Connection, filter: &RelationFilter) -> OrgResult<Vec<FunctionalRelation>> {
        let mut conditions = Conditions::default();
        if let Some(manager) = filter.manager_id {
            conditions.eq("manager_id", manager);
        }
        if let Some(subordinate) = filter.subordinate_id {
            conditions.eq("subordinate_id", subordinate);
        }
        if let Some(relation_type) = filter.relation_type {
            conditions.eq("relation_type", relation_type.as_str());
        }
        if filter.active_only {
            conditions.raw("is_active = 1");
        }

        let sql = format!(
            "SELECT {COLUMNS} FROM functional_relations{} ORDER BY id{}",
            conditions.where_clause(),
            limit_clause(filter.limit, filter.offset)
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(conditions.params()), row_to_relation)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn create(conn: &Connection, new: &NewRelation) -> OrgResult<FunctionalRelation> {
        create_relation(conn, new)
    }

    /// Re-activating, or changing the window of an active relation, re-runs
    /// the duplicate check.
    fn update(
        conn: &Connection,
        id: i64,
        update: &RelationUpdate,
    ) -> OrgResult<FunctionalRelation> {
        with_transaction(conn, |tx| {
            let current = Self::require(tx, id)?;
            let start = update.start_date.unwrap_or(current.start_date);
            let end = update.end_date.unwrap_or(current.end_date);
            let active = update.is_active.unwrap_or(current.is_active);
            validate_window(start, end)?;

            if active
                && let Some(existing_id) = find_conflict(
                    tx,
                    current.manager_id,
                    current.subordinate_id,
                    current.relation_type,
                    (start, end),
                    Some(id),
                )?
            {
                return Err(OrgError::DuplicateRelation {
                    manager_id: current.manager_id,
                    subordinate_id: current.subordinate_id,
                    relation_type: current.relation_type,
                    existing_id,
                });
            }

            let mut changes = Changes::default();
            changes.set_opt("description", update.description.as_ref());
            if let Some(active) = update.is_active {
                changes.set("is_active", i64::from(active));
            }
            if update.start_date.is_some() {
                changes.set("start_date", date_to_sql(start));
            }
            if update.end_date.is_some() {
                changes.set("end_date", date_to_sql(end));
            }
            let fields = changes.columns().join(",");
            changes.apply(tx, "functional_relations", id)?;
            info!(id, %fields, "functional relation updated");
            Self::require(tx, id)
        })
    }

    fn delete(conn: &Connection, id: i64) -> OrgResult<()> {
        ensure_exists(conn, Self::KIND, id)?;
        conn.execute("DELETE FROM functional_relations WHERE id = ?1", params![id])?;
        info!(id, "functional relation removed");
        Ok(())
    }
}
