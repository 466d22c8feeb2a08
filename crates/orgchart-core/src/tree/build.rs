//! Nested tree materialization for callers that render hierarchies.
//!
//! The adjacency map is loaded with a single query and assembled in memory,
//! so the cost is one scan regardless of depth.

use rusqlite::{Connection, params};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

use super::{MAX_TREE_DEPTH, TreeKind, corrupt};
use crate::error::{OrgError, OrgResult};
use crate::model::EntityKind;

/// One node of a materialized tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeNode {
    pub id: i64,
    pub parent_id: Option<i64>,
    pub label: String,
    pub is_active: bool,
    pub children: Vec<Self>,
}

impl TreeNode {
    /// Number of nodes in this subtree, including `self`.
    #[must_use]
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(Self::size).sum::<usize>()
    }
}

struct Row {
    parent_id: Option<i64>,
    label: String,
    is_active: bool,
}

struct Adjacency {
    kind: TreeKind,
    rows: HashMap<i64, Row>,
    children: HashMap<i64, Vec<i64>>,
    roots: Vec<i64>,
}

impl Adjacency {
    fn load(conn: &Connection, kind: TreeKind, organization_id: Option<i64>) -> OrgResult<Self> {
        let label = match kind {
            TreeKind::Organization | TreeKind::Division => "name",
            TreeKind::StaffManager => "last_name || ' ' || first_name",
        };
        let scope = if organization_id.is_some() {
            " WHERE organization_id = ?1"
        } else {
            ""
        };
        let sql = format!(
            "SELECT id, {parent}, {label}, is_active FROM {table}{scope} ORDER BY id",
            parent = kind.parent_column(),
            table = kind.table(),
        );

        let mut stmt = conn.prepare(&sql)?;
        let map_row = |row: &rusqlite::Row<'_>| {
            Ok((
                row.get::<_, i64>(0)?,
                Row {
                    parent_id: row.get(1)?,
                    label: row.get(2)?,
                    is_active: row.get::<_, i64>(3)? != 0,
                },
            ))
        };
        let loaded = match organization_id {
            Some(org) => stmt
                .query_map(params![org], map_row)?
                .collect::<Result<Vec<_>, _>>()?,
            None => stmt.query_map([], map_row)?.collect::<Result<Vec<_>, _>>()?,
        };

        let mut adjacency = Self {
            kind,
            rows: HashMap::with_capacity(loaded.len()),
            children: HashMap::new(),
            roots: Vec::new(),
        };
        for (id, row) in loaded {
            match row.parent_id {
                Some(parent) => adjacency.children.entry(parent).or_default().push(id),
                None => adjacency.roots.push(id),
            }
            adjacency.rows.insert(id, row);
        }
        Ok(adjacency)
    }

    fn assemble(
        &self,
        id: i64,
        depth: u32,
        include_inactive: bool,
        seen: &mut HashSet<i64>,
    ) -> OrgResult<Option<TreeNode>> {
        if !seen.insert(id) {
            return Err(corrupt(self.kind, id, "node reached twice while building tree"));
        }
        if depth > MAX_TREE_DEPTH {
            return Err(corrupt(
                self.kind,
                id,
                format!("tree deeper than {MAX_TREE_DEPTH} levels"),
            ));
        }
        let Some(row) = self.rows.get(&id) else {
            return Err(OrgError::not_found(self.kind.entity(), id));
        };
        if !row.is_active && !include_inactive {
            return Ok(None);
        }

        let mut children = Vec::new();
        for child in self.children.get(&id).map_or(&[][..], Vec::as_slice) {
            if let Some(node) = self.assemble(*child, depth + 1, include_inactive, seen)? {
                children.push(node);
            }
        }

        Ok(Some(TreeNode {
            id,
            parent_id: row.parent_id,
            label: row.label.clone(),
            is_active: row.is_active,
            children,
        }))
    }

    fn build(&self, roots: &[i64], include_inactive: bool) -> OrgResult<Vec<TreeNode>> {
        let mut seen = HashSet::new();
        let mut forest = Vec::new();
        for root in roots {
            if let Some(node) = self.assemble(*root, 0, include_inactive, &mut seen)? {
                forest.push(node);
            }
        }
        Ok(forest)
    }
}

/// Materialize a tree of `kind` as nested nodes.
///
/// `roots = None` starts from every parentless node. Inactive nodes and
/// their whole subtree are left out unless `include_inactive` is set.
///
/// # Errors
///
/// Returns [`OrgError::NotFound`] for an unknown root id,
/// [`OrgError::CorruptTree`] if the stored pointers loop or nest deeper than
/// the guard allows, or [`OrgError::Db`] on storage failure.
pub fn build_tree(
    conn: &Connection,
    kind: TreeKind,
    roots: Option<&[i64]>,
    include_inactive: bool,
) -> OrgResult<Vec<TreeNode>> {
    let adjacency = Adjacency::load(conn, kind, None)?;
    match roots {
        Some(roots) => adjacency.build(roots, include_inactive),
        None => adjacency.build(&adjacency.roots, include_inactive),
    }
}

/// Division tree of one organization, rooted at its parentless divisions.
///
/// # Errors
///
/// Returns [`OrgError::NotFound`] if the organization does not exist, plus
/// the errors of [`build_tree`].
pub fn division_tree(
    conn: &Connection,
    organization_id: i64,
    include_inactive: bool,
) -> OrgResult<Vec<TreeNode>> {
    if !super::exists(conn, TreeKind::Organization, organization_id)? {
        return Err(OrgError::not_found(EntityKind::Organization, organization_id));
    }
    let adjacency = Adjacency::load(conn, TreeKind::Division, Some(organization_id))?;
    adjacency.build(&adjacency.roots, include_inactive)
}
