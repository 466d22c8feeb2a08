//! Entity store: one repository per record type.
//!
//! Every repository implements [`Repository`], so callers get the same
//! `get` / `require` / `list` / `create` / `update` / `delete` surface for
//! organizations, divisions, positions, staff, and functional relations.
//! Tree pointers are not part of any update payload; re-parenting goes
//! through each repository's move operation, which routes through
//! [`crate::tree::move_node`].

mod division;
mod organization;
mod position;
mod staff;

pub use division::Divisions;
pub use organization::Organizations;
pub use position::Positions;
pub use staff::StaffMembers;

use rusqlite::{Connection, params, params_from_iter};

use crate::db::now_us;
use crate::error::{OrgError, OrgResult};
use crate::model::EntityKind;

/// CRUD contract shared by every entity type.
pub trait Repository {
    type Record;
    type New;
    type Update;
    type Filter;

    const KIND: EntityKind;

    /// Fetch a record, `None` if the id is unknown.
    ///
    /// # Errors
    ///
    /// Returns [`OrgError::Db`] on storage failure.
    fn get(conn: &Connection, id: i64) -> OrgResult<Option<Self::Record>>;

    /// Fetch a record that must exist.
    ///
    /// # Errors
    ///
    /// Returns [`OrgError::NotFound`] if the id is unknown.
    fn require(conn: &Connection, id: i64) -> OrgResult<Self::Record> {
        Self::get(conn, id)?.ok_or_else(|| OrgError::not_found(Self::KIND, id))
    }

    /// Records matching `filter`, ascending by id.
    ///
    /// # Errors
    ///
    /// Returns [`OrgError::Db`] on storage failure.
    fn list(conn: &Connection, filter: &Self::Filter) -> OrgResult<Vec<Self::Record>>;

    /// Validate and insert a new record.
    ///
    /// # Errors
    ///
    /// Returns the entity's validation errors, [`OrgError::IntegrityConflict`]
    /// on a uniqueness violation, or [`OrgError::Db`].
    fn create(conn: &Connection, new: &Self::New) -> OrgResult<Self::Record>;

    /// Apply a partial update and return the stored result.
    ///
    /// # Errors
    ///
    /// Returns [`OrgError::NotFound`], the entity's validation errors,
    /// [`OrgError::IntegrityConflict`], or [`OrgError::Db`].
    fn update(conn: &Connection, id: i64, update: &Self::Update) -> OrgResult<Self::Record>;

    /// Delete a record once nothing depends on it.
    ///
    /// # Errors
    ///
    /// Returns [`OrgError::NotFound`], [`OrgError::HasChildren`],
    /// [`OrgError::HasDependents`], or [`OrgError::Db`].
    fn delete(conn: &Connection, id: i64) -> OrgResult<()>;
}

/// Column assignments for a partial `UPDATE`.
#[derive(Default)]
pub(crate) struct Changes {
    sets: Vec<String>,
    params: Vec<Box<dyn rusqlite::types::ToSql>>,
}

impl Changes {
    pub(crate) fn set(&mut self, column: &str, value: impl rusqlite::types::ToSql + 'static) {
        self.params.push(Box::new(value));
        self.sets.push(format!("{column} = ?{}", self.params.len()));
    }

    pub(crate) fn set_opt<T>(&mut self, column: &str, value: Option<&T>)
    where
        T: rusqlite::types::ToSql + Clone + 'static,
    {
        if let Some(value) = value {
            self.set(column, value.clone());
        }
    }

    /// Like [`Changes::set_opt`] for required text, stored trimmed as on
    /// insert.
    pub(crate) fn set_trimmed(&mut self, column: &str, value: Option<&str>) {
        if let Some(value) = value {
            self.set(column, value.trim().to_string());
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    pub(crate) fn columns(&self) -> Vec<&str> {
        self.sets
            .iter()
            .filter_map(|set| set.split(' ').next())
            .collect()
    }

    /// Write the assignments plus `updated_at_us`. Does nothing when empty.
    pub(crate) fn apply(mut self, conn: &Connection, table: &str, id: i64) -> OrgResult<()> {
        if self.is_empty() {
            return Ok(());
        }
        self.set("updated_at_us", now_us());
        self.params.push(Box::new(id));
        let sql = format!(
            "UPDATE {table} SET {} WHERE id = ?{}",
            self.sets.join(", "),
            self.params.len()
        );
        let params: Vec<&dyn rusqlite::types::ToSql> =
            self.params.iter().map(AsRef::as_ref).collect();
        conn.execute(&sql, params_from_iter(params))?;
        Ok(())
    }
}

/// Count rows of `table` where `column = id`.
pub(crate) fn count_where(conn: &Connection, table: &str, column: &str, id: i64) -> OrgResult<usize> {
    let sql = format!("SELECT COUNT(*) FROM {table} WHERE {column} = ?1");
    let count: i64 = conn.query_row(&sql, params![id], |row| row.get(0))?;
    Ok(usize::try_from(count).unwrap_or_default())
}

/// Reject blank required text fields before touching storage.
pub(crate) fn require_text(field: &'static str, value: &str) -> OrgResult<()> {
    if value.trim().is_empty() {
        Err(OrgError::validation(field, "must not be empty"))
    } else {
        Ok(())
    }
}

pub(crate) fn ensure_exists(conn: &Connection, kind: EntityKind, id: i64) -> OrgResult<()> {
    let sql = format!("SELECT EXISTS(SELECT 1 FROM {} WHERE id = ?1)", kind.table());
    let found: bool = conn.query_row(&sql, params![id], |row| row.get(0))?;
    if found {
        Ok(())
    } else {
        Err(OrgError::not_found(kind, id))
    }
}
