//! Organization type rules.
//!
//! The organization tree is layered: BOARD parents HOLDING, HOLDING parents
//! LEGAL_ENTITY, LEGAL_ENTITY parents LOCATION, and LOCATION is terminal.
//! Any type may also sit at the root.

use rusqlite::{Connection, OptionalExtension, params};
use tracing::debug;

use crate::error::{OrgError, OrgResult};
use crate::model::{EntityKind, OrgType};
use crate::store::count_where;

/// Types that may be placed directly under an organization of `org_type`.
#[must_use]
pub const fn allowed_child_types(org_type: OrgType) -> &'static [OrgType] {
    match org_type {
        OrgType::Board => &[OrgType::Holding],
        OrgType::Holding => &[OrgType::LegalEntity],
        OrgType::LegalEntity => &[OrgType::Location],
        OrgType::Location => &[],
    }
}

/// Check that `parent_type` may parent `child_type`.
///
/// # Errors
///
/// Returns [`OrgError::InvalidHierarchy`] when the pair is not allowed.
pub fn validate_parent(child_type: OrgType, parent_type: OrgType) -> OrgResult<()> {
    if allowed_child_types(parent_type).contains(&child_type) {
        Ok(())
    } else {
        Err(OrgError::InvalidHierarchy {
            child_type,
            parent_type,
        })
    }
}

/// Whether organizations of this type may own divisions.
#[must_use]
pub const fn can_own_divisions(org_type: OrgType) -> bool {
    matches!(org_type, OrgType::Holding | OrgType::LegalEntity)
}

/// Stored type of an organization, or `None` if it does not exist.
pub(crate) fn org_type_of(conn: &Connection, id: i64) -> OrgResult<Option<OrgType>> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT org_type FROM organizations WHERE id = ?1",
            params![id],
            |row| row.get(0),
        )
        .optional()?;
    raw.map(|text| {
        text.parse::<OrgType>()
            .map_err(|err| OrgError::validation("org_type", err.to_string()))
    })
    .transpose()
}

/// Like [`org_type_of`] but a missing row is [`OrgError::NotFound`].
pub(crate) fn require_org_type(conn: &Connection, id: i64) -> OrgResult<OrgType> {
    org_type_of(conn, id)?.ok_or_else(|| OrgError::not_found(EntityKind::Organization, id))
}

/// Check the type rule for placing organization `child_id` under
/// `parent_id`. Both must exist.
pub(crate) fn validate_placement(conn: &Connection, child_id: i64, parent_id: i64) -> OrgResult<()> {
    let child_type = require_org_type(conn, child_id)?;
    let parent_type = require_org_type(conn, parent_id)?;
    debug!(child_id, %child_type, parent_id, %parent_type, "checking organization type rule");
    validate_parent(child_type, parent_type)
}

/// Check that an organization may switch to `new_type` without breaking the
/// rule against its current parent or any current child, and without
/// stranding records that depend on its type: staff placed at it as a
/// location, and divisions it owns.
pub(crate) fn validate_retype(conn: &Connection, id: i64, new_type: OrgType) -> OrgResult<()> {
    let parent_id: Option<i64> = conn
        .query_row(
            "SELECT parent_id FROM organizations WHERE id = ?1",
            params![id],
            |row| row.get(0),
        )
        .optional()?
        .ok_or_else(|| OrgError::not_found(EntityKind::Organization, id))?;

    if let Some(parent_id) = parent_id {
        validate_parent(new_type, require_org_type(conn, parent_id)?)?;
    }

    let mut stmt = conn.prepare("SELECT org_type FROM organizations WHERE parent_id = ?1")?;
    let child_types = stmt
        .query_map(params![id], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    for raw in child_types {
        let child_type = raw
            .parse::<OrgType>()
            .map_err(|err| OrgError::validation("org_type", err.to_string()))?;
        validate_parent(child_type, new_type)?;
    }

    if new_type != OrgType::Location {
        let located = count_where(conn, "staff", "location_id", id)?;
        if located > 0 {
            return Err(OrgError::HasDependents {
                kind: EntityKind::Organization,
                id,
                dependents: "staff located here",
                count: located,
            });
        }
    }
    if !can_own_divisions(new_type) {
        let divisions = count_where(conn, "divisions", "organization_id", id)?;
        if divisions > 0 {
            return Err(OrgError::HasDependents {
                kind: EntityKind::Organization,
                id,
                dependents: "divisions",
                count: divisions,
            });
        }
    }

    Ok(())
}
