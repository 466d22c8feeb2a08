use rusqlite::{Connection, OptionalExtension, params, params_from_iter};
use tracing::{debug, info};

use super::{Changes, Repository, count_where, ensure_exists, require_text};
use crate::db::{Conditions, bool_column, limit_clause, now_us, with_transaction};
use crate::error::{OrgError, OrgResult};
use crate::hierarchy;
use crate::model::{EntityKind, NewStaff, OrgType, Staff, StaffFilter, StaffUpdate};
use crate::tree::{self, TreeKind};

const COLUMNS: &str = "id, email, first_name, last_name, middle_name, phone, description, \
     is_active, organization_id, division_id, location_id, position_id, manager_id, \
     created_at_us, updated_at_us";

fn row_to_staff(row: &rusqlite::Row<'_>) -> rusqlite::Result<Staff> {
    Ok(Staff {
        id: row.get(0)?,
        email: row.get(1)?,
        first_name: row.get(2)?,
        last_name: row.get(3)?,
        middle_name: row.get(4)?,
        phone: row.get(5)?,
        description: row.get(6)?,
        is_active: bool_column(row, 7)?,
        organization_id: row.get(8)?,
        division_id: row.get(9)?,
        location_id: row.get(10)?,
        position_id: row.get(11)?,
        manager_id: row.get(12)?,
        created_at_us: row.get(13)?,
        updated_at_us: row.get(14)?,
    })
}

/// Cross-references a staff record must satisfy.
struct Placement {
    organization_id: i64,
    division_id: Option<i64>,
    location_id: Option<i64>,
    position_id: Option<i64>,
}

impl Placement {
    fn validate(&self, conn: &Connection) -> OrgResult<()> {
        ensure_exists(conn, EntityKind::Organization, self.organization_id)?;

        if let Some(location_id) = self.location_id {
            let location_type = hierarchy::require_org_type(conn, location_id)?;
            if location_type != OrgType::Location {
                return Err(OrgError::validation(
                    "location_id",
                    format!("organization {location_id} is a {location_type}, not a location"),
                ));
            }
        }

        if let Some(division_id) = self.division_id {
            let division_org = tree::division_org(conn, division_id)?;
            if division_org != self.organization_id {
                return Err(OrgError::validation(
                    "division_id",
                    format!(
                        "division {division_id} belongs to organization {division_org}, not {}",
                        self.organization_id
                    ),
                ));
            }
        }

        if let Some(position_id) = self.position_id {
            ensure_exists(conn, EntityKind::Position, position_id)?;
        }

        Ok(())
    }
}

fn validate_email(email: &str) -> OrgResult<()> {
    require_text("email", email)?;
    if email.contains('@') {
        Ok(())
    } else {
        Err(OrgError::validation("email", format!("'{email}' is not an email address")))
    }
}

/// Repository for staff and their primary reporting chain.
pub struct StaffMembers;

impl Repository for StaffMembers {
    type Record = Staff;
    type New = NewStaff;
    type Update = StaffUpdate;
    type Filter = StaffFilter;

    const KIND: EntityKind = EntityKind::Staff;

    fn get(conn: &Connection, id: i64) -> OrgResult<Option<Staff>> {
        let sql = format!("SELECT {COLUMNS} FROM staff WHERE id = ?1");
        Ok(conn.query_row(&sql, params![id], row_to_staff).optional()?)
    }

    fn list(conn: &Connection, filter: &StaffFilter) -> OrgResult<Vec<Staff>> {
        let mut conditions = Conditions::default();
        if let Some(org) = filter.organization_id {
            conditions.eq("organization_id", org);
        }
        if let Some(division) = filter.division_id {
            conditions.eq("division_id", division);
        }
        if let Some(location) = filter.location_id {
            conditions.eq("location_id", location);
        }
        if let Some(manager) = filter.manager_id {
            conditions.eq("manager_id", manager);
        }
        if let Some(active) = filter.is_active {
            conditions.eq("is_active", i64::from(active));
        }

        let sql = format!(
            "SELECT {COLUMNS} FROM staff{} ORDER BY id{}",
            conditions.where_clause(),
            limit_clause(filter.limit, filter.offset)
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(conditions.params()), row_to_staff)?
            .collect::<Result<Vec<_>, _>>()?;
        debug!(count = rows.len(), "listed staff");
        Ok(rows)
    }

    fn create(conn: &Connection, new: &NewStaff) -> OrgResult<Staff> {
        validate_email(&new.email)?;
        require_text("first_name", &new.first_name)?;
        require_text("last_name", &new.last_name)?;

        with_transaction(conn, |tx| {
            Placement {
                organization_id: new.organization_id,
                division_id: new.division_id,
                location_id: new.location_id,
                position_id: new.position_id,
            }
            .validate(tx)?;
            if let Some(manager_id) = new.manager_id {
                ensure_exists(tx, Self::KIND, manager_id)?;
            }

            tx.execute(
                "INSERT INTO staff (
                    email, first_name, last_name, middle_name, phone, description,
                    is_active, organization_id, division_id, location_id, position_id,
                    manager_id, created_at_us, updated_at_us
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1, ?7, ?8, ?9, ?10, ?11, ?12, ?12)",
                params![
                    new.email.trim(),
                    new.first_name.trim(),
                    new.last_name.trim(),
                    new.middle_name,
                    new.phone,
                    new.description,
                    new.organization_id,
                    new.division_id,
                    new.location_id,
                    new.position_id,
                    new.manager_id,
                    now_us(),
                ],
            )?;
            let id = tx.last_insert_rowid();
            info!(id, email = %new.email, organization_id = new.organization_id, manager_id = ?new.manager_id, "staff created");
            Self::require(tx, id)
        })
    }

    fn update(conn: &Connection, id: i64, update: &StaffUpdate) -> OrgResult<Staff> {
        if let Some(email) = &update.email {
            validate_email(email)?;
        }
        if let Some(first) = &update.first_name {
            require_text("first_name", first)?;
        }
        if let Some(last) = &update.last_name {
            require_text("last_name", last)?;
        }

        with_transaction(conn, |tx| {
            let current = Self::require(tx, id)?;
            Placement {
                organization_id: update.organization_id.unwrap_or(current.organization_id),
                division_id: update.division_id.unwrap_or(current.division_id),
                location_id: update.location_id.unwrap_or(current.location_id),
                position_id: update.position_id.unwrap_or(current.position_id),
            }
            .validate(tx)?;

            let mut changes = Changes::default();
            changes.set_trimmed("email", update.email.as_deref());
            changes.set_trimmed("first_name", update.first_name.as_deref());
            changes.set_trimmed("last_name", update.last_name.as_deref());
            changes.set_opt("middle_name", update.middle_name.as_ref());
            changes.set_opt("phone", update.phone.as_ref());
            changes.set_opt("description", update.description.as_ref());
            if let Some(active) = update.is_active {
                changes.set("is_active", i64::from(active));
            }
            changes.set_opt("organization_id", update.organization_id.as_ref());
            changes.set_opt("division_id", update.division_id.as_ref());
            changes.set_opt("location_id", update.location_id.as_ref());
            changes.set_opt("position_id", update.position_id.as_ref());

            let fields = changes.columns().join(",");
            changes.apply(tx, "staff", id)?;
            info!(id, %fields, "staff updated");
            Self::require(tx, id)
        })
    }

    /// Functional relations of the deleted member go with it.
    fn delete(conn: &Connection, id: i64) -> OrgResult<()> {
        with_transaction(conn, |tx| {
            ensure_exists(tx, Self::KIND, id)?;
            let reports = count_where(tx, "staff", "manager_id", id)?;
            if reports > 0 {
                return Err(OrgError::HasChildren {
                    kind: Self::KIND,
                    id,
                    count: reports,
                });
            }
            tx.execute("DELETE FROM staff WHERE id = ?1", params![id])?;
            info!(id, "staff deleted");
            Ok(())
        })
    }
}

impl StaffMembers {
    /// Assign (or clear) the primary manager. This is the only way to
    /// change `manager_id` after creation.
    ///
    /// # Errors
    ///
    /// Returns [`OrgError::SelfParent`] or [`OrgError::Cycle`] for an
    /// illegal chain, or [`OrgError::NotFound`] for unknown ids.
    pub fn set_manager(conn: &Connection, id: i64, manager_id: Option<i64>) -> OrgResult<Staff> {
        tree::move_node(conn, TreeKind::StaffManager, id, manager_id)?;
        Self::require(conn, id)
    }

    /// Staff whose primary manager is `id`.
    ///
    /// # Errors
    ///
    /// Returns [`OrgError::NotFound`] for an unknown id, or [`OrgError::Db`].
    pub fn direct_reports(conn: &Connection, id: i64) -> OrgResult<Vec<Staff>> {
        ensure_exists(conn, Self::KIND, id)?;
        Self::list(
            conn,
            &StaffFilter {
                manager_id: Some(id),
                ..StaffFilter::default()
            },
        )
    }

    /// Everyone below `id` in the primary chain, breadth-first.
    ///
    /// # Errors
    ///
    /// See [`tree::descendants`].
    pub fn all_reports(conn: &Connection, id: i64) -> OrgResult<Vec<Staff>> {
        ensure_exists(conn, Self::KIND, id)?;
        tree::descendants(conn, TreeKind::StaffManager, id)?
            .into_iter()
            .map(|report| Self::require(conn, report))
            .collect()
    }

    /// Managers from the direct manager up to the top of the chain.
    ///
    /// # Errors
    ///
    /// See [`tree::ancestor_chain`].
    pub fn manager_chain(conn: &Connection, id: i64) -> OrgResult<Vec<Staff>> {
        tree::ancestor_chain(conn, TreeKind::StaffManager, id)?
            .into_iter()
            .map(|manager| Self::require(conn, manager))
            .collect()
    }
}
