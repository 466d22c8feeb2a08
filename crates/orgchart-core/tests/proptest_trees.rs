use orgchart_core::hierarchy;
use orgchart_core::matrix;
use orgchart_core::model::{NewRelation, RelationType};
use orgchart_core::store::Divisions;
use orgchart_core::tree::{self, TreeKind};
use orgchart_core::{OrgError, Repository};
use proptest::prelude::*;
use proptest::sample::Index;

#[path = "generators.rs"]
mod generators;
use generators::*;

proptest! {
    // Each case builds a fresh SQLite store; keep the count modest.
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn parent_chains_terminate_at_a_root(parents in arb_forest(40)) {
        let conn = fresh_store();
        let ids = staff_forest(&conn, &parents);

        for id in &ids {
            let chain = tree::ancestor_chain(&conn, TreeKind::StaffManager, *id).unwrap();
            prop_assert!(chain.len() < ids.len());
            let top = chain.last().copied().unwrap_or(*id);
            prop_assert_eq!(tree::parent_of(&conn, TreeKind::StaffManager, top).unwrap(), Some(None));
        }
    }

    #[test]
    fn organization_chains_terminate_at_a_root(parents in arb_org_forest(40)) {
        let conn = fresh_store();
        let nodes = org_forest(&conn, &parents);

        for (id, _) in &nodes {
            let chain = tree::ancestor_chain(&conn, TreeKind::Organization, *id).unwrap();
            prop_assert!(chain.len() < nodes.len());
            prop_assert!(chain.len() < ORG_LAYERS.len());
            let top = chain.last().copied().unwrap_or(*id);
            prop_assert_eq!(tree::parent_of(&conn, TreeKind::Organization, top).unwrap(), Some(None));
        }
    }

    #[test]
    fn organization_moves_under_descendants_are_rejected(
        parents in arb_org_forest(30),
        a in any::<Index>(),
    ) {
        let conn = fresh_store();
        let nodes = org_forest(&conn, &parents);
        let (node, node_type) = nodes[a.index(nodes.len())];
        let below = tree::descendants(&conn, TreeKind::Organization, node).unwrap();

        for &(target, target_type) in &nodes {
            let result = tree::validate_move(&conn, TreeKind::Organization, node, Some(target));
            if target == node {
                let is_self_parent = matches!(result, Err(OrgError::SelfParent { .. }));
                prop_assert!(is_self_parent);
            } else if below.contains(&target) {
                let rejected = matches!(
                    result,
                    Err(OrgError::Cycle { .. } | OrgError::InvalidHierarchy { .. })
                );
                prop_assert!(rejected, "{} under descendant {} was allowed", node, target);
            } else {
                prop_assert_eq!(
                    result.is_ok(),
                    hierarchy::validate_parent(node_type, target_type).is_ok()
                );
            }
        }
    }

    #[test]
    fn moving_under_a_descendant_is_always_a_cycle(
        parents in arb_forest(30),
        a in any::<Index>(),
        b in any::<Index>(),
    ) {
        let conn = fresh_store();
        let ids = staff_forest(&conn, &parents);
        let node = ids[a.index(ids.len())];
        let target = ids[b.index(ids.len())];

        let below = tree::descendants(&conn, TreeKind::StaffManager, node).unwrap();
        let result = tree::validate_move(&conn, TreeKind::StaffManager, node, Some(target));

        if node == target {
            let is_self_parent = matches!(result, Err(OrgError::SelfParent { .. }));
            prop_assert!(is_self_parent);
        } else if below.contains(&target) {
            let is_cycle = matches!(result, Err(OrgError::Cycle { .. }));
            prop_assert!(is_cycle);
        } else {
            prop_assert!(result.is_ok());
        }
    }

    #[test]
    fn division_levels_track_depth_after_moves(
        parents in arb_forest(25),
        moves in prop::collection::vec((any::<Index>(), any::<Option<Index>>()), 0..15),
    ) {
        let conn = fresh_store();
        let ids = division_forest(&conn, &parents);

        for (node, target) in moves {
            let node = ids[node.index(ids.len())];
            let target = target.map(|t| ids[t.index(ids.len())]);
            let before = tree::parent_of(&conn, TreeKind::Division, node).unwrap();
            if Divisions::move_to(&conn, node, target).is_err() {
                prop_assert_eq!(tree::parent_of(&conn, TreeKind::Division, node).unwrap(), before);
            }
        }

        for id in &ids {
            let depth = tree::depth_of(&conn, TreeKind::Division, *id).unwrap();
            let level = Divisions::require(&conn, *id).unwrap().level;
            prop_assert_eq!(usize::try_from(level).unwrap(), depth);
        }
    }

    #[test]
    fn self_relation_is_rejected_for_every_id(staff in any::<i64>(), kind in 0..RelationType::ALL.len()) {
        let conn = fresh_store();
        let result = matrix::create_relation(
            &conn,
            &NewRelation::new(staff, staff, RelationType::ALL[kind]),
        );
        let is_self_relation = matches!(result, Err(OrgError::SelfRelation { staff_id }) if staff_id == staff);
        prop_assert!(is_self_relation);
    }
}
