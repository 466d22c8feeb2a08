//! Canonical SQLite schema for an orgchart store.
//!
//! - `organizations`, `divisions`, and `staff` each carry one parent pointer
//!   (`parent_id` / `manager_id`) forming an adjacency-list tree
//! - `functional_relations` holds the matrix edges between staff and is
//!   removed together with either endpoint
//! - `store_meta` is a single row recording the applied schema version

/// Migration v1: entity tables plus store metadata.
pub const MIGRATION_V1_SQL: &str = r"
CREATE TABLE IF NOT EXISTS organizations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE CHECK (length(trim(name)) > 0),
    code TEXT NOT NULL UNIQUE CHECK (length(trim(code)) > 0),
    description TEXT,
    org_type TEXT NOT NULL
        CHECK (org_type IN ('board', 'holding', 'legal_entity', 'location')),
    is_active INTEGER NOT NULL DEFAULT 1 CHECK (is_active IN (0, 1)),
    parent_id INTEGER REFERENCES organizations(id),
    legal_address TEXT,
    physical_address TEXT,
    inn TEXT,
    kpp TEXT,
    ckp TEXT,
    created_at_us INTEGER NOT NULL,
    updated_at_us INTEGER NOT NULL,
    CHECK (parent_id IS NULL OR parent_id <> id)
);

CREATE TABLE IF NOT EXISTS divisions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL CHECK (length(trim(name)) > 0),
    code TEXT NOT NULL,
    description TEXT,
    ckp TEXT,
    organization_id INTEGER NOT NULL REFERENCES organizations(id),
    parent_id INTEGER REFERENCES divisions(id),
    level INTEGER NOT NULL DEFAULT 0 CHECK (level >= 0),
    is_active INTEGER NOT NULL DEFAULT 1 CHECK (is_active IN (0, 1)),
    created_at_us INTEGER NOT NULL,
    updated_at_us INTEGER NOT NULL,
    UNIQUE (organization_id, name),
    CHECK (parent_id IS NULL OR parent_id <> id)
);

CREATE TABLE IF NOT EXISTS positions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE CHECK (length(trim(name)) > 0),
    description TEXT,
    is_active INTEGER NOT NULL DEFAULT 1 CHECK (is_active IN (0, 1)),
    created_at_us INTEGER NOT NULL,
    updated_at_us INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS staff (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    email TEXT NOT NULL UNIQUE CHECK (length(trim(email)) > 0),
    first_name TEXT NOT NULL,
    last_name TEXT NOT NULL,
    middle_name TEXT,
    phone TEXT,
    description TEXT,
    is_active INTEGER NOT NULL DEFAULT 1 CHECK (is_active IN (0, 1)),
    organization_id INTEGER NOT NULL REFERENCES organizations(id),
    division_id INTEGER REFERENCES divisions(id),
    location_id INTEGER REFERENCES organizations(id),
    position_id INTEGER REFERENCES positions(id),
    manager_id INTEGER REFERENCES staff(id),
    created_at_us INTEGER NOT NULL,
    updated_at_us INTEGER NOT NULL,
    CHECK (manager_id IS NULL OR manager_id <> id)
);

CREATE TABLE IF NOT EXISTS functional_relations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    manager_id INTEGER NOT NULL REFERENCES staff(id) ON DELETE CASCADE,
    subordinate_id INTEGER NOT NULL REFERENCES staff(id) ON DELETE CASCADE,
    relation_type TEXT NOT NULL DEFAULT 'functional' CHECK (relation_type IN (
        'functional', 'administrative', 'project', 'territorial', 'mentoring',
        'strategic', 'governance', 'advisory', 'supervisory'
    )),
    description TEXT,
    is_active INTEGER NOT NULL DEFAULT 1 CHECK (is_active IN (0, 1)),
    start_date TEXT,
    end_date TEXT,
    created_at_us INTEGER NOT NULL,
    updated_at_us INTEGER NOT NULL,
    CHECK (manager_id <> subordinate_id),
    CHECK (start_date IS NULL OR end_date IS NULL OR end_date >= start_date)
);

CREATE TABLE IF NOT EXISTS store_meta (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    schema_version INTEGER NOT NULL,
    created_at_us INTEGER NOT NULL DEFAULT 0
);

INSERT OR IGNORE INTO store_meta (id, schema_version, created_at_us)
VALUES (1, 1, CAST((julianday('now') - 2440587.5) * 86400000000 AS INTEGER));
";

/// Migration v2: indexes for tree walks and relation lookups.
pub const MIGRATION_V2_SQL: &str = r"
CREATE INDEX IF NOT EXISTS idx_organizations_parent
    ON organizations(parent_id);

CREATE INDEX IF NOT EXISTS idx_organizations_type_active
    ON organizations(org_type, is_active);

CREATE INDEX IF NOT EXISTS idx_divisions_parent
    ON divisions(parent_id);

CREATE INDEX IF NOT EXISTS idx_divisions_org_parent
    ON divisions(organization_id, parent_id);

CREATE INDEX IF NOT EXISTS idx_staff_manager
    ON staff(manager_id);

CREATE INDEX IF NOT EXISTS idx_staff_organization
    ON staff(organization_id, is_active);

CREATE INDEX IF NOT EXISTS idx_staff_division
    ON staff(division_id);

CREATE INDEX IF NOT EXISTS idx_staff_location
    ON staff(location_id);

CREATE INDEX IF NOT EXISTS idx_staff_position
    ON staff(position_id);

CREATE INDEX IF NOT EXISTS idx_relations_manager_type
    ON functional_relations(manager_id, relation_type, is_active);

CREATE INDEX IF NOT EXISTS idx_relations_subordinate_type
    ON functional_relations(subordinate_id, relation_type, is_active);

UPDATE store_meta
SET schema_version = 2
WHERE id = 1;
";

/// Indexes expected by tree traversal and list paths.
pub const REQUIRED_INDEXES: &[&str] = &[
    "idx_organizations_parent",
    "idx_organizations_type_active",
    "idx_divisions_parent",
    "idx_divisions_org_parent",
    "idx_staff_manager",
    "idx_staff_organization",
    "idx_staff_division",
    "idx_staff_location",
    "idx_staff_position",
    "idx_relations_manager_type",
    "idx_relations_subordinate_type",
];

#[cfg(test)]
mod tests {
    use crate::db::migrations;
    use rusqlite::{Connection, params};

    fn seeded_conn() -> rusqlite::Result<Connection> {
        let mut conn = Connection::open_in_memory()?;
        migrations::migrate(&mut conn)?;

        conn.execute(
            "INSERT INTO organizations (name, code, org_type, created_at_us, updated_at_us)
             VALUES ('Acme Holding', 'ACME', 'holding', 1, 1)",
            [],
        )?;

        for idx in 0..24_i64 {
            let manager = if idx == 0 { None } else { Some((idx - 1) / 3 + 1) };
            conn.execute(
                "INSERT INTO staff (
                    email, first_name, last_name, organization_id, manager_id,
                    created_at_us, updated_at_us
                 ) VALUES (?1, 'First', 'Last', 1, ?2, ?3, ?3)",
                params![format!("s{idx}@acme.test"), manager, idx],
            )?;
        }

        Ok(conn)
    }

    fn query_plan_details(conn: &Connection, sql: &str) -> rusqlite::Result<Vec<String>> {
        let mut stmt = conn.prepare(&format!("EXPLAIN QUERY PLAN {sql}"))?;
        stmt.query_map([], |row| row.get::<_, String>(3))?
            .collect::<Result<Vec<_>, _>>()
    }

    #[test]
    fn query_plan_uses_manager_index_for_children() -> rusqlite::Result<()> {
        let conn = seeded_conn()?;
        let details = query_plan_details(&conn, "SELECT id FROM staff WHERE manager_id = 1")?;

        assert!(
            details
                .iter()
                .any(|detail| detail.contains("idx_staff_manager")),
            "expected manager index in plan, got: {details:?}"
        );

        Ok(())
    }

    #[test]
    fn relation_self_edge_is_rejected_by_schema() -> rusqlite::Result<()> {
        let conn = seeded_conn()?;
        let result = conn.execute(
            "INSERT INTO functional_relations (
                manager_id, subordinate_id, created_at_us, updated_at_us
             ) VALUES (2, 2, 0, 0)",
            [],
        );
        assert!(result.is_err(), "self relation must violate CHECK");
        Ok(())
    }

    #[test]
    fn deleting_staff_cascades_their_relations() -> rusqlite::Result<()> {
        let conn = seeded_conn()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.execute(
            "INSERT INTO functional_relations (
                manager_id, subordinate_id, created_at_us, updated_at_us
             ) VALUES (2, 24, 0, 0)",
            [],
        )?;
        conn.execute("DELETE FROM staff WHERE id = 24", [])?;

        let remaining: i64 =
            conn.query_row("SELECT COUNT(*) FROM functional_relations", [], |row| {
                row.get(0)
            })?;
        assert_eq!(remaining, 0);
        Ok(())
    }
}
