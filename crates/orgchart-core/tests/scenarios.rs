//! End-to-end scenarios through the public store, tree, and matrix APIs.
//!
//! Each test opens its own store; the last one uses a file on disk so the
//! migration and pragma path is exercised as well.

use orgchart_core::cascade;
use orgchart_core::db;
use orgchart_core::matrix;
use orgchart_core::model::{
    DivisionFilter, NewDivision, NewOrganization, NewRelation, NewStaff, OrgType, RelationType,
};
use orgchart_core::store::{Divisions, Organizations, StaffMembers};
use orgchart_core::tree::{self, TreeKind};
use orgchart_core::{OrgError, Repository};
use rusqlite::Connection;

fn test_db() -> Connection {
    db::open_in_memory().expect("open in-memory store")
}

fn org(conn: &Connection, name: &str, org_type: OrgType, parent: Option<i64>) -> i64 {
    let mut new = NewOrganization::new(name, name.to_uppercase(), org_type);
    new.parent_id = parent;
    Organizations::create(conn, &new).unwrap().id
}

fn division(conn: &Connection, owner: i64, name: &str, parent: Option<i64>) -> i64 {
    let mut new = NewDivision::new(name, name.to_uppercase(), owner);
    new.parent_id = parent;
    Divisions::create(conn, &new).unwrap().id
}

fn staff(conn: &Connection, owner: i64, last: &str, manager: Option<i64>) -> i64 {
    let mut new = NewStaff::new(format!("{}@acme.test", last.to_lowercase()), "Test", last, owner);
    new.manager_id = manager;
    StaffMembers::create(conn, &new).unwrap().id
}

// ---------------------------------------------------------------------------
// Organization hierarchy
// ---------------------------------------------------------------------------

#[test]
fn holding_cannot_move_under_its_own_location() {
    let conn = test_db();
    let holding = org(&conn, "Holding-1", OrgType::Holding, None);
    let entity = org(&conn, "LE-1", OrgType::LegalEntity, Some(holding));
    let location = org(&conn, "Loc-1", OrgType::Location, Some(entity));

    let err = Organizations::move_to(&conn, holding, Some(location)).unwrap_err();
    // A LOCATION may never parent a HOLDING; the type rule fires first.
    assert!(matches!(err, OrgError::InvalidHierarchy { .. }), "{err}");
    assert_eq!(Organizations::require(&conn, holding).unwrap().parent_id, None);

    let chain: Vec<i64> = Organizations::ancestors(&conn, location)
        .unwrap()
        .into_iter()
        .map(|o| o.id)
        .collect();
    assert_eq!(chain, vec![entity, holding]);
}

#[test]
fn placement_follows_type_rules() {
    let conn = test_db();
    let holding = org(&conn, "Holding-1", OrgType::Holding, None);
    let entity = org(&conn, "LE-1", OrgType::LegalEntity, None);
    let site_a = org(&conn, "Loc-A", OrgType::Location, None);
    let site_b = org(&conn, "Loc-B", OrgType::Location, None);

    let err = Organizations::move_to(&conn, site_a, Some(site_b)).unwrap_err();
    assert!(matches!(
        err,
        OrgError::InvalidHierarchy {
            child_type: OrgType::Location,
            parent_type: OrgType::Location,
        }
    ));

    let moved = Organizations::move_to(&conn, entity, Some(holding)).unwrap();
    assert_eq!(moved.parent_id, Some(holding));
}

#[test]
fn holding_with_children_cannot_be_deleted() {
    let conn = test_db();
    let holding = org(&conn, "Holding-1", OrgType::Holding, None);
    let entity = org(&conn, "LE-1", OrgType::LegalEntity, Some(holding));

    let err = Organizations::delete(&conn, holding).unwrap_err();
    assert!(matches!(err, OrgError::HasChildren { .. }), "{err}");

    Organizations::delete(&conn, entity).unwrap();
    Organizations::delete(&conn, holding).unwrap();
    assert!(Organizations::get(&conn, holding).unwrap().is_none());
}

// ---------------------------------------------------------------------------
// Division trees
// ---------------------------------------------------------------------------

#[test]
fn deactivating_a_division_reaches_every_descendant_only() {
    let conn = test_db();
    let acme = org(&conn, "Acme", OrgType::Holding, None);
    let root = division(&conn, acme, "Root", None);
    let mut children = Vec::new();
    let mut grandchildren = Vec::new();
    for c in 0..2 {
        let child = division(&conn, acme, &format!("Child {c}"), Some(root));
        children.push(child);
        for g in 0..2 {
            grandchildren.push(division(&conn, acme, &format!("Leaf {c}.{g}"), Some(child)));
        }
    }
    let sibling = division(&conn, acme, "Sibling", None);

    let affected = cascade::set_active(&conn, TreeKind::Division, root, false).unwrap();
    assert_eq!(affected, 7);

    let inactive = Divisions::list(
        &conn,
        &DivisionFilter {
            organization_id: Some(acme),
            is_active: Some(false),
            ..DivisionFilter::default()
        },
    )
    .unwrap();
    assert_eq!(inactive.len(), 7);
    assert!(Divisions::require(&conn, sibling).unwrap().is_active);

    // Children and grandchildren keep their levels through the toggle.
    for id in children {
        assert_eq!(Divisions::require(&conn, id).unwrap().level, 1);
    }
    for id in grandchildren {
        assert_eq!(Divisions::require(&conn, id).unwrap().level, 2);
    }
}

#[test]
fn division_delete_waits_for_children_to_move() {
    let conn = test_db();
    let acme = org(&conn, "Acme", OrgType::Holding, None);
    let old_parent = division(&conn, acme, "Old", None);
    let new_parent = division(&conn, acme, "New", None);
    let kids = [
        division(&conn, acme, "Kid A", Some(old_parent)),
        division(&conn, acme, "Kid B", Some(old_parent)),
    ];

    let err = Divisions::delete(&conn, old_parent).unwrap_err();
    assert!(matches!(err, OrgError::HasChildren { count: 2, .. }), "{err}");

    for kid in kids {
        Divisions::move_to(&conn, kid, Some(new_parent)).unwrap();
    }
    Divisions::delete(&conn, old_parent).unwrap();

    let moved: Vec<i64> = Divisions::children(&conn, new_parent)
        .unwrap()
        .into_iter()
        .map(|d| d.id)
        .collect();
    assert_eq!(moved, kids.to_vec());
}

#[test]
fn division_tree_nests_by_parent() {
    let conn = test_db();
    let acme = org(&conn, "Acme", OrgType::Holding, None);
    let root = division(&conn, acme, "Root", None);
    let child = division(&conn, acme, "Child", Some(root));
    division(&conn, acme, "Leaf", Some(child));

    let forest = tree::division_tree(&conn, acme, false).unwrap();
    assert_eq!(forest.len(), 1);
    assert_eq!(forest[0].id, root);
    assert_eq!(forest[0].size(), 3);
    assert_eq!(forest[0].children[0].id, child);
}

// ---------------------------------------------------------------------------
// Staff and matrix relations
// ---------------------------------------------------------------------------

#[test]
fn manager_cycle_is_rejected() {
    let conn = test_db();
    let acme = org(&conn, "Acme", OrgType::Holding, None);
    let a = staff(&conn, acme, "Alpha", None);
    let b = staff(&conn, acme, "Bravo", Some(a));
    let c = staff(&conn, acme, "Charlie", Some(b));

    let err = StaffMembers::set_manager(&conn, a, Some(c)).unwrap_err();
    assert!(
        matches!(err, OrgError::Cycle { id, proposed_parent, .. } if id == a && proposed_parent == c),
        "{err}"
    );
    assert_eq!(StaffMembers::require(&conn, a).unwrap().manager_id, None);

    let chain: Vec<i64> = StaffMembers::manager_chain(&conn, c)
        .unwrap()
        .into_iter()
        .map(|s| s.id)
        .collect();
    assert_eq!(chain, vec![b, a]);
}

#[test]
fn duplicate_relation_depends_on_type() {
    let conn = test_db();
    let acme = org(&conn, "Acme", OrgType::Holding, None);
    let boss = staff(&conn, acme, "Boss", None);
    let worker = staff(&conn, acme, "Worker", None);

    let first =
        matrix::create_relation(&conn, &NewRelation::new(boss, worker, RelationType::Functional))
            .unwrap();
    let err =
        matrix::create_relation(&conn, &NewRelation::new(boss, worker, RelationType::Functional))
            .unwrap_err();
    assert!(
        matches!(err, OrgError::DuplicateRelation { existing_id, .. } if existing_id == first.id),
        "{err}"
    );

    matrix::create_relation(
        &conn,
        &NewRelation::new(boss, worker, RelationType::Administrative),
    )
    .unwrap();

    let lines = matrix::reporting_lines(&conn, worker).unwrap();
    assert_eq!(lines.relations.len(), 2);
    assert!(lines.primary_manager.is_none());
}

#[test]
fn deleting_staff_drops_their_relations() {
    let conn = test_db();
    let acme = org(&conn, "Acme", OrgType::Holding, None);
    let boss = staff(&conn, acme, "Boss", None);
    let worker = staff(&conn, acme, "Worker", None);
    matrix::create_relation(&conn, &NewRelation::new(boss, worker, RelationType::Project)).unwrap();

    StaffMembers::delete(&conn, worker).unwrap();
    assert!(matrix::relations_by_manager(&conn, boss, None).unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// On-disk store
// ---------------------------------------------------------------------------

#[test]
fn file_store_persists_across_connections() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("org.sqlite3");

    let (holding, entity) = {
        let conn = db::open_store(&path, db::DEFAULT_BUSY_TIMEOUT).unwrap();
        let holding = org(&conn, "Holding-1", OrgType::Holding, None);
        let entity = org(&conn, "LE-1", OrgType::LegalEntity, Some(holding));
        (holding, entity)
    };

    let conn = db::open_store(&path, db::DEFAULT_BUSY_TIMEOUT).unwrap();
    assert_eq!(tree::get_roots(&conn, TreeKind::Organization).unwrap(), vec![holding]);
    assert_eq!(tree::children(&conn, TreeKind::Organization, holding).unwrap(), vec![entity]);
}
