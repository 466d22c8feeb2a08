//! Generic tree integrity for every self-referencing entity.
//!
//! Organizations and divisions point at their parent through `parent_id`;
//! staff point at their primary manager through `manager_id`. All three are
//! adjacency-list trees and share the walks and checks in this module:
//!
//! - [`descendants`]: breadth-first subtree enumeration
//! - [`ancestor_chain`]: parent pointers from nearest to root
//! - [`validate_move`]: existence, self-parent, kind rules, then cycle check
//! - [`move_node`]: validated, transactional re-parent
//!
//! # Depth guard
//!
//! Stored data is not trusted to be acyclic. Every walk fails with
//! [`OrgError::CorruptTree`] when it revisits a node or goes deeper than
//! [`MAX_TREE_DEPTH`], instead of looping.

pub mod build;

use rusqlite::{Connection, OptionalExtension, params};
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use std::fmt;
use tracing::{debug, info, warn};

use crate::db::{now_us, with_transaction};
use crate::error::{OrgError, OrgResult};
use crate::hierarchy;
use crate::model::EntityKind;

pub use build::{TreeNode, build_tree, division_tree};

/// Deepest walk accepted before the data is declared corrupt.
pub const MAX_TREE_DEPTH: u32 = 1000;

/// The self-referencing trees in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TreeKind {
    Organization,
    Division,
    /// Staff linked through their primary manager.
    StaffManager,
}

impl TreeKind {
    pub const ALL: [Self; 3] = [Self::Organization, Self::Division, Self::StaffManager];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Organization => "organization",
            Self::Division => "division",
            Self::StaffManager => "staff",
        }
    }

    /// The entity stored in this tree.
    #[must_use]
    pub const fn entity(self) -> EntityKind {
        match self {
            Self::Organization => EntityKind::Organization,
            Self::Division => EntityKind::Division,
            Self::StaffManager => EntityKind::Staff,
        }
    }

    #[must_use]
    pub const fn table(self) -> &'static str {
        self.entity().table()
    }

    /// Column holding the parent pointer.
    #[must_use]
    pub const fn parent_column(self) -> &'static str {
        match self {
            Self::Organization | Self::Division => "parent_id",
            Self::StaffManager => "manager_id",
        }
    }
}

impl fmt::Display for TreeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Point reads
// ---------------------------------------------------------------------------

/// Parent pointer of `id`: `None` if the node does not exist, `Some(None)`
/// for a root.
///
/// # Errors
///
/// Returns [`OrgError::Db`] on storage failure.
pub fn parent_of(conn: &Connection, kind: TreeKind, id: i64) -> OrgResult<Option<Option<i64>>> {
    let sql = format!(
        "SELECT {} FROM {} WHERE id = ?1",
        kind.parent_column(),
        kind.table()
    );
    Ok(conn
        .query_row(&sql, params![id], |row| row.get::<_, Option<i64>>(0))
        .optional()?)
}

/// Whether a node with this id exists.
///
/// # Errors
///
/// Returns [`OrgError::Db`] on storage failure.
pub fn exists(conn: &Connection, kind: TreeKind, id: i64) -> OrgResult<bool> {
    Ok(parent_of(conn, kind, id)?.is_some())
}

fn require_parent_of(conn: &Connection, kind: TreeKind, id: i64) -> OrgResult<Option<i64>> {
    parent_of(conn, kind, id)?.ok_or_else(|| OrgError::not_found(kind.entity(), id))
}

/// Direct children of `id`, ascending by id.
///
/// # Errors
///
/// Returns [`OrgError::Db`] on storage failure.
pub fn children(conn: &Connection, kind: TreeKind, id: i64) -> OrgResult<Vec<i64>> {
    let sql = format!(
        "SELECT id FROM {} WHERE {} = ?1 ORDER BY id",
        kind.table(),
        kind.parent_column()
    );
    let mut stmt = conn.prepare(&sql)?;
    let ids = stmt
        .query_map(params![id], |row| row.get(0))?
        .collect::<Result<Vec<i64>, _>>()?;
    Ok(ids)
}

/// Parentless nodes, ascending by id.
///
/// # Errors
///
/// Returns [`OrgError::Db`] on storage failure.
pub fn get_roots(conn: &Connection, kind: TreeKind) -> OrgResult<Vec<i64>> {
    let sql = format!(
        "SELECT id FROM {} WHERE {} IS NULL ORDER BY id",
        kind.table(),
        kind.parent_column()
    );
    let mut stmt = conn.prepare(&sql)?;
    let ids = stmt
        .query_map([], |row| row.get(0))?
        .collect::<Result<Vec<i64>, _>>()?;
    Ok(ids)
}

// ---------------------------------------------------------------------------
// Walks
// ---------------------------------------------------------------------------

pub(crate) fn corrupt(kind: TreeKind, id: i64, reason: impl Into<String>) -> OrgError {
    let reason = reason.into();
    warn!(%kind, id, %reason, "tree depth guard tripped");
    OrgError::CorruptTree { kind, id, reason }
}

/// Every node below `id` with its distance from `id` (children are 1), in
/// breadth-first order.
fn descendants_with_depth(conn: &Connection, kind: TreeKind, id: i64) -> OrgResult<Vec<(i64, u32)>> {
    let mut visited: HashSet<i64> = HashSet::from([id]);
    let mut queue: VecDeque<(i64, u32)> = VecDeque::from([(id, 0)]);
    let mut result = Vec::new();

    while let Some((current, depth)) = queue.pop_front() {
        for child in children(conn, kind, current)? {
            if !visited.insert(child) {
                return Err(corrupt(kind, child, "node reached twice while walking descendants"));
            }
            let child_depth = depth + 1;
            if child_depth > MAX_TREE_DEPTH {
                return Err(corrupt(
                    kind,
                    child,
                    format!("subtree deeper than {MAX_TREE_DEPTH} levels"),
                ));
            }
            result.push((child, child_depth));
            queue.push_back((child, child_depth));
        }
    }

    Ok(result)
}

/// Every node below `id`, excluding `id`, in breadth-first order.
///
/// # Errors
///
/// Returns [`OrgError::CorruptTree`] if the walk revisits a node or exceeds
/// [`MAX_TREE_DEPTH`], or [`OrgError::Db`] on storage failure.
pub fn descendants(conn: &Connection, kind: TreeKind, id: i64) -> OrgResult<Vec<i64>> {
    Ok(descendants_with_depth(conn, kind, id)?
        .into_iter()
        .map(|(node, _)| node)
        .collect())
}

/// Parent pointers from the nearest parent up to the root. Empty for a root.
///
/// # Errors
///
/// Returns [`OrgError::NotFound`] if `id` does not exist,
/// [`OrgError::CorruptTree`] on a loop or an over-deep chain, or
/// [`OrgError::Db`] on storage failure.
pub fn ancestor_chain(conn: &Connection, kind: TreeKind, id: i64) -> OrgResult<Vec<i64>> {
    let mut chain = Vec::new();
    let mut visited: HashSet<i64> = HashSet::from([id]);
    let mut current = require_parent_of(conn, kind, id)?;

    while let Some(parent) = current {
        if !visited.insert(parent) {
            return Err(corrupt(kind, parent, "parent pointers form a loop"));
        }
        chain.push(parent);
        if chain.len() > MAX_TREE_DEPTH as usize {
            return Err(corrupt(
                kind,
                id,
                format!("ancestor chain longer than {MAX_TREE_DEPTH}"),
            ));
        }
        current = require_parent_of(conn, kind, parent)?;
    }

    Ok(chain)
}

/// Number of ancestors of `id` (0 for a root).
///
/// # Errors
///
/// Same as [`ancestor_chain`].
pub fn depth_of(conn: &Connection, kind: TreeKind, id: i64) -> OrgResult<usize> {
    Ok(ancestor_chain(conn, kind, id)?.len())
}

// ---------------------------------------------------------------------------
// Moves
// ---------------------------------------------------------------------------

/// Check that `id` may be placed under `new_parent`.
///
/// Checks run cheapest first:
/// 1. `id` exists.
/// 2. A `None` parent (detach to root) is always valid.
/// 3. The parent is not `id` itself.
/// 4. The parent exists.
/// 5. Kind rules: organization type rule, or same-organization divisions.
/// 6. The parent is not a descendant of `id`.
///
/// # Errors
///
/// Returns [`OrgError::NotFound`], [`OrgError::SelfParent`],
/// [`OrgError::InvalidHierarchy`], [`OrgError::Validation`],
/// [`OrgError::Cycle`], or [`OrgError::CorruptTree`] as described above.
pub fn validate_move(
    conn: &Connection,
    kind: TreeKind,
    id: i64,
    new_parent: Option<i64>,
) -> OrgResult<()> {
    require_parent_of(conn, kind, id)?;

    let Some(parent) = new_parent else {
        return Ok(());
    };

    if parent == id {
        return Err(OrgError::SelfParent { kind, id });
    }

    if !exists(conn, kind, parent)? {
        return Err(OrgError::not_found(kind.entity(), parent));
    }

    check_kind_rules(conn, kind, id, parent)?;

    if descendants(conn, kind, id)?.contains(&parent) {
        return Err(OrgError::Cycle {
            kind,
            id,
            proposed_parent: parent,
        });
    }

    debug!(%kind, id, parent, "move validated");
    Ok(())
}

fn check_kind_rules(conn: &Connection, kind: TreeKind, id: i64, parent: i64) -> OrgResult<()> {
    match kind {
        TreeKind::Organization => hierarchy::validate_placement(conn, id, parent),
        TreeKind::Division => {
            let node_org = division_org(conn, id)?;
            let parent_org = division_org(conn, parent)?;
            if node_org == parent_org {
                Ok(())
            } else {
                Err(OrgError::validation(
                    "parent_id",
                    format!(
                        "division {parent} belongs to organization {parent_org}, not {node_org}"
                    ),
                ))
            }
        }
        TreeKind::StaffManager => Ok(()),
    }
}

pub(crate) fn division_org(conn: &Connection, id: i64) -> OrgResult<i64> {
    conn.query_row(
        "SELECT organization_id FROM divisions WHERE id = ?1",
        params![id],
        |row| row.get(0),
    )
    .optional()?
    .ok_or_else(|| OrgError::not_found(EntityKind::Division, id))
}

/// Re-parent `id` under `new_parent` (or detach it to a root).
///
/// Moving a node to its current parent succeeds without writing. Division
/// moves also recompute `level` for the node and its whole subtree. Either
/// every write lands or none does.
///
/// # Errors
///
/// Returns any error from [`validate_move`], or [`OrgError::Db`] on storage
/// failure.
pub fn move_node(
    conn: &Connection,
    kind: TreeKind,
    id: i64,
    new_parent: Option<i64>,
) -> OrgResult<()> {
    with_transaction(conn, |tx| {
        let current = require_parent_of(tx, kind, id)?;
        if current == new_parent {
            debug!(%kind, id, "move to current parent, nothing to do");
            return Ok(());
        }

        validate_move(tx, kind, id, new_parent)?;

        let sql = format!(
            "UPDATE {} SET {} = ?1, updated_at_us = ?2 WHERE id = ?3",
            kind.table(),
            kind.parent_column()
        );
        tx.execute(&sql, params![new_parent, now_us(), id])?;

        if kind == TreeKind::Division {
            recompute_levels(tx, id, new_parent)?;
        }

        info!(%kind, id, from = ?current, to = ?new_parent, "node moved");
        Ok(())
    })
}

/// Level a division would have under `parent`.
pub(crate) fn level_under(conn: &Connection, parent: Option<i64>) -> OrgResult<u32> {
    match parent {
        None => Ok(0),
        Some(parent) => {
            let level: u32 = conn
                .query_row(
                    "SELECT level FROM divisions WHERE id = ?1",
                    params![parent],
                    |row| row.get(0),
                )
                .optional()?
                .ok_or_else(|| OrgError::not_found(EntityKind::Division, parent))?;
            Ok(level + 1)
        }
    }
}

fn recompute_levels(conn: &Connection, id: i64, parent: Option<i64>) -> OrgResult<()> {
    let base = level_under(conn, parent)?;
    let mut stmt = conn.prepare("UPDATE divisions SET level = ?1 WHERE id = ?2")?;
    stmt.execute(params![base, id])?;
    for (node, depth) in descendants_with_depth(conn, TreeKind::Division, id)? {
        stmt.execute(params![base + depth, node])?;
    }
    Ok(())
}
