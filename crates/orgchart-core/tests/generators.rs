//! Shared builders and proptest strategies for integration tests.

#![allow(dead_code)]

use orgchart_core::Repository;
use orgchart_core::db;
use orgchart_core::model::{NewDivision, NewOrganization, NewStaff, OrgType};
use orgchart_core::store::{Divisions, Organizations, StaffMembers};
use proptest::prelude::*;
use proptest::sample::Index;
use rusqlite::Connection;

/// Parent index for each node; node `i` may only point at `0..i`, so the
/// generated shape is always a forest.
pub fn arb_forest(max_nodes: usize) -> impl Strategy<Value = Vec<Option<usize>>> {
    prop::collection::vec((any::<bool>(), any::<Index>()), 1..max_nodes).prop_map(|slots| {
        slots
            .into_iter()
            .enumerate()
            .map(|(i, (root, pick))| {
                if i == 0 || root {
                    None
                } else {
                    Some(pick.index(i))
                }
            })
            .collect()
    })
}

/// Organization types by depth: a type-valid chain has at most four levels.
pub const ORG_LAYERS: [OrgType; 4] = [
    OrgType::Board,
    OrgType::Holding,
    OrgType::LegalEntity,
    OrgType::Location,
];

/// Like [`arb_forest`], but a node whose parent already sits on the last
/// layer becomes a root, so every chain fits [`ORG_LAYERS`].
pub fn arb_org_forest(max_nodes: usize) -> impl Strategy<Value = Vec<Option<usize>>> {
    arb_forest(max_nodes).prop_map(|parents| {
        let mut depths: Vec<usize> = Vec::with_capacity(parents.len());
        parents
            .into_iter()
            .map(|parent| {
                let parent = parent.filter(|&p| depths[p] + 1 < ORG_LAYERS.len());
                depths.push(parent.map_or(0, |p| depths[p] + 1));
                parent
            })
            .collect()
    })
}

pub fn fresh_store() -> Connection {
    db::open_in_memory().expect("open in-memory store")
}

pub fn holding(conn: &Connection, name: &str) -> i64 {
    Organizations::create(conn, &NewOrganization::new(name, name, OrgType::Holding))
        .expect("create holding")
        .id
}

/// Insert one staff member per slot, wiring managers by index. Returns ids in
/// slot order.
pub fn staff_forest(conn: &Connection, parents: &[Option<usize>]) -> Vec<i64> {
    let org = holding(conn, "Forest Holding");
    let mut ids: Vec<i64> = Vec::with_capacity(parents.len());
    for (i, parent) in parents.iter().enumerate() {
        let mut new = NewStaff::new(format!("p{i}@forest.test"), "Staff", format!("No{i}"), org);
        new.manager_id = parent.map(|p| ids[p]);
        ids.push(StaffMembers::create(conn, &new).expect("create staff").id);
    }
    ids
}

/// Same as [`staff_forest`] for divisions of one holding.
pub fn division_forest(conn: &Connection, parents: &[Option<usize>]) -> Vec<i64> {
    let org = holding(conn, "Division Holding");
    let mut ids: Vec<i64> = Vec::with_capacity(parents.len());
    for (i, parent) in parents.iter().enumerate() {
        let mut new = NewDivision::new(format!("Div {i}"), format!("D{i}"), org);
        new.parent_id = parent.map(|p| ids[p]);
        ids.push(Divisions::create(conn, &new).expect("create division").id);
    }
    ids
}

/// Insert one organization per slot, typed by its depth. Returns ids and
/// types in slot order.
pub fn org_forest(conn: &Connection, parents: &[Option<usize>]) -> Vec<(i64, OrgType)> {
    let mut nodes: Vec<(i64, OrgType)> = Vec::with_capacity(parents.len());
    let mut depths: Vec<usize> = Vec::with_capacity(parents.len());
    for (i, parent) in parents.iter().enumerate() {
        let depth = parent.map_or(0, |p| depths[p] + 1);
        let org_type = ORG_LAYERS[depth];
        let mut new = NewOrganization::new(format!("Org {i}"), format!("O{i}"), org_type);
        new.parent_id = parent.map(|p| nodes[p].0);
        let id = Organizations::create(conn, &new).expect("create organization").id;
        nodes.push((id, org_type));
        depths.push(depth);
    }
    nodes
}
