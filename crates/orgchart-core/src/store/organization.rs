use rusqlite::{Connection, OptionalExtension, params, params_from_iter};
use tracing::{debug, info};

use super::{Changes, Repository, count_where, require_text};
use crate::db::{Conditions, bool_column, enum_column, limit_clause, now_us, with_transaction};
use crate::error::{OrgError, OrgResult};
use crate::hierarchy;
use crate::model::{
    EntityKind, NewOrganization, Organization, OrganizationFilter, OrganizationUpdate,
};
use crate::tree::{self, TreeKind};

const COLUMNS: &str = "id, name, code, description, org_type, is_active, parent_id, \
     legal_address, physical_address, inn, kpp, ckp, created_at_us, updated_at_us";

fn row_to_organization(row: &rusqlite::Row<'_>) -> rusqlite::Result<Organization> {
    Ok(Organization {
        id: row.get(0)?,
        name: row.get(1)?,
        code: row.get(2)?,
        description: row.get(3)?,
        org_type: enum_column(row, 4)?,
        is_active: bool_column(row, 5)?,
        parent_id: row.get(6)?,
        legal_address: row.get(7)?,
        physical_address: row.get(8)?,
        inn: row.get(9)?,
        kpp: row.get(10)?,
        ckp: row.get(11)?,
        created_at_us: row.get(12)?,
        updated_at_us: row.get(13)?,
    })
}

/// Repository for the organization tree.
pub struct Organizations;

impl Repository for Organizations {
    type Record = Organization;
    type New = NewOrganization;
    type Update = OrganizationUpdate;
    type Filter = OrganizationFilter;

    const KIND: EntityKind = EntityKind::Organization;

    fn get(conn: &Connection, id: i64) -> OrgResult<Option<Organization>> {
        let sql = format!("SELECT {COLUMNS} FROM organizations WHERE id = ?1");
        Ok(conn
            .query_row(&sql, params![id], row_to_organization)
            .optional()?)
    }

    fn list(conn: &Connection, filter: &OrganizationFilter) -> OrgResult<Vec<Organization>> {
        let mut conditions = Conditions::default();
        if let Some(org_type) = filter.org_type {
            conditions.eq("org_type", org_type.as_str());
        }
        if let Some(parent_id) = filter.parent_id {
            conditions.eq("parent_id", parent_id);
        } else if filter.roots_only {
            conditions.raw("parent_id IS NULL");
        }
        if let Some(active) = filter.is_active {
            conditions.eq("is_active", i64::from(active));
        }

        let sql = format!(
            "SELECT {COLUMNS} FROM organizations{} ORDER BY id{}",
            conditions.where_clause(),
            limit_clause(filter.limit, filter.offset)
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(conditions.params()), row_to_organization)?
            .collect::<Result<Vec<_>, _>>()?;
        debug!(count = rows.len(), "listed organizations");
        Ok(rows)
    }

    fn create(conn: &Connection, new: &NewOrganization) -> OrgResult<Organization> {
        require_text("name", &new.name)?;
        require_text("code", &new.code)?;

        with_transaction(conn, |tx| {
            if let Some(parent_id) = new.parent_id {
                let parent_type = hierarchy::require_org_type(tx, parent_id)?;
                hierarchy::validate_parent(new.org_type, parent_type)?;
            }

            let now = now_us();
            tx.execute(
                "INSERT INTO organizations (
                    name, code, description, org_type, is_active, parent_id,
                    legal_address, physical_address, inn, kpp, ckp,
                    created_at_us, updated_at_us
                 ) VALUES (?1, ?2, ?3, ?4, 1, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)",
                params![
                    new.name.trim(),
                    new.code.trim(),
                    new.description,
                    new.org_type.as_str(),
                    new.parent_id,
                    new.legal_address,
                    new.physical_address,
                    new.inn,
                    new.kpp,
                    new.ckp,
                    now,
                ],
            )?;
            let id = tx.last_insert_rowid();
            info!(id, name = %new.name, org_type = %new.org_type, parent_id = ?new.parent_id, "organization created");
            Self::require(tx, id)
        })
    }

    fn update(conn: &Connection, id: i64, update: &OrganizationUpdate) -> OrgResult<Organization> {
        if let Some(name) = &update.name {
            require_text("name", name)?;
        }
        if let Some(code) = &update.code {
            require_text("code", code)?;
        }

        with_transaction(conn, |tx| {
            let current = Self::require(tx, id)?;
            if let Some(org_type) = update.org_type
                && org_type != current.org_type
            {
                hierarchy::validate_retype(tx, id, org_type)?;
            }

            let mut changes = Changes::default();
            changes.set_trimmed("name", update.name.as_deref());
            changes.set_trimmed("code", update.code.as_deref());
            changes.set_opt("description", update.description.as_ref());
            if let Some(org_type) = update.org_type {
                changes.set("org_type", org_type.as_str());
            }
            if let Some(active) = update.is_active {
                changes.set("is_active", i64::from(active));
            }
            changes.set_opt("legal_address", update.legal_address.as_ref());
            changes.set_opt("physical_address", update.physical_address.as_ref());
            changes.set_opt("inn", update.inn.as_ref());
            changes.set_opt("kpp", update.kpp.as_ref());
            changes.set_opt("ckp", update.ckp.as_ref());

            let fields = changes.columns().join(",");
            changes.apply(tx, "organizations", id)?;
            info!(id, %fields, "organization updated");
            Self::require(tx, id)
        })
    }

    fn delete(conn: &Connection, id: i64) -> OrgResult<()> {
        with_transaction(conn, |tx| {
            Self::require(tx, id)?;

            let children = count_where(tx, "organizations", "parent_id", id)?;
            if children > 0 {
                return Err(OrgError::HasChildren {
                    kind: Self::KIND,
                    id,
                    count: children,
                });
            }
            let divisions = count_where(tx, "divisions", "organization_id", id)?;
            if divisions > 0 {
                return Err(OrgError::HasDependents {
                    kind: Self::KIND,
                    id,
                    dependents: "divisions",
                    count: divisions,
                });
            }
            let staff: i64 = tx.query_row(
                "SELECT COUNT(*) FROM staff WHERE organization_id = ?1 OR location_id = ?1",
                params![id],
                |row| row.get(0),
            )?;
            if staff > 0 {
                return Err(OrgError::HasDependents {
                    kind: Self::KIND,
                    id,
                    dependents: "staff",
                    count: usize::try_from(staff).unwrap_or_default(),
                });
            }

            tx.execute("DELETE FROM organizations WHERE id = ?1", params![id])?;
            info!(id, "organization deleted");
            Ok(())
        })
    }
}

impl Organizations {
    /// Re-parent an organization, or detach it with `None`.
    ///
    /// # Errors
    ///
    /// See [`tree::validate_move`]; the type rule is checked before the
    /// cycle check.
    pub fn move_to(conn: &Connection, id: i64, parent_id: Option<i64>) -> OrgResult<Organization> {
        tree::move_node(conn, TreeKind::Organization, id, parent_id)?;
        Self::require(conn, id)
    }

    /// Direct child organizations.
    ///
    /// # Errors
    ///
    /// Returns [`OrgError::NotFound`] for an unknown id, or [`OrgError::Db`].
    pub fn children(conn: &Connection, id: i64) -> OrgResult<Vec<Organization>> {
        Self::require(conn, id)?;
        Self::list(
            conn,
            &OrganizationFilter {
                parent_id: Some(id),
                ..OrganizationFilter::default()
            },
        )
    }

    /// Ancestors from the direct parent up to the root.
    ///
    /// # Errors
    ///
    /// See [`tree::ancestor_chain`].
    pub fn ancestors(conn: &Connection, id: i64) -> OrgResult<Vec<Organization>> {
        tree::ancestor_chain(conn, TreeKind::Organization, id)?
            .into_iter()
            .map(|ancestor| Self::require(conn, ancestor))
            .collect()
    }
}
