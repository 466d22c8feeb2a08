//! Error taxonomy for the hierarchy engine.
//!
//! Every failure a core operation can report is an [`OrgError`]. Each variant
//! maps to a stable [`ErrorCode`] so callers (the CLI, an API layer) can branch
//! on the kind without parsing messages.

use std::fmt;

use rusqlite::ffi;

use crate::model::{EntityKind, OrgType, RelationType};
use crate::tree::TreeKind;

/// Machine-readable error codes for agent-friendly decision making.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    NotFound,
    SelfParent,
    CycleDetected,
    SelfRelation,
    InvalidHierarchy,
    DuplicateRelation,
    HasChildren,
    HasDependents,
    IntegrityConflict,
    ValidationFailed,
    CorruptTree,
    StorageFailure,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::NotFound => "E2001",
            Self::SelfParent => "E2002",
            Self::CycleDetected => "E2003",
            Self::SelfRelation => "E2004",
            Self::InvalidHierarchy => "E2005",
            Self::DuplicateRelation => "E2006",
            Self::HasChildren => "E2007",
            Self::HasDependents => "E2008",
            Self::IntegrityConflict => "E2009",
            Self::ValidationFailed => "E2010",
            Self::CorruptTree => "E3001",
            Self::StorageFailure => "E5001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::NotFound => "Entity not found",
            Self::SelfParent => "Node cannot be its own parent",
            Self::CycleDetected => "Cycle would be created",
            Self::SelfRelation => "Staff member cannot relate to themselves",
            Self::InvalidHierarchy => "Organization type cannot parent this type",
            Self::DuplicateRelation => "Functional relation already exists",
            Self::HasChildren => "Node still has children",
            Self::HasDependents => "Entity still has dependents",
            Self::IntegrityConflict => "Uniqueness constraint violated",
            Self::ValidationFailed => "Invalid input",
            Self::CorruptTree => "Stored hierarchy is corrupt",
            Self::StorageFailure => "Storage failure",
        }
    }

    /// Optional remediation hint that can be surfaced to operators and agents.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::NotFound => Some("Check the id with a `list` command."),
            Self::SelfParent | Self::CycleDetected => {
                Some("Pick a parent outside the subtree of the node being moved.")
            }
            Self::SelfRelation => Some("Use two different staff ids."),
            Self::InvalidHierarchy => Some(
                "Allowed parents: BOARD -> HOLDING -> LEGAL_ENTITY -> LOCATION.",
            ),
            Self::DuplicateRelation => {
                Some("Deactivate the existing relation or choose another type or date range.")
            }
            Self::HasChildren => Some("Move or delete the children first."),
            Self::HasDependents => Some("Reassign or delete the dependent records first."),
            Self::IntegrityConflict => Some("Use a unique name, code, or email."),
            Self::ValidationFailed => None,
            Self::CorruptTree => Some("Inspect parent pointers for a loop and repair them."),
            Self::StorageFailure => Some("Retry once. If persistent, report a bug with logs."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// A failed core operation.
#[derive(Debug, thiserror::Error)]
pub enum OrgError {
    /// Referenced entity id does not exist.
    #[error("{kind} {id} not found")]
    NotFound { kind: EntityKind, id: i64 },

    /// A node was proposed as its own parent.
    #[error("{kind} {id} cannot be its own parent")]
    SelfParent { kind: TreeKind, id: i64 },

    /// The proposed parent lies inside the subtree of the node being moved.
    #[error("moving {kind} {id} under {proposed_parent} would create a cycle")]
    Cycle {
        kind: TreeKind,
        id: i64,
        proposed_parent: i64,
    },

    /// A functional relation from a staff member to themselves.
    #[error("staff {staff_id} cannot be related to themselves")]
    SelfRelation { staff_id: i64 },

    /// Organization parent/child type mismatch.
    #[error("{parent_type} cannot be the parent of {child_type}")]
    InvalidHierarchy {
        child_type: OrgType,
        parent_type: OrgType,
    },

    /// An overlapping active relation with the same triple already exists.
    #[error(
        "active {relation_type} relation {manager_id} -> {subordinate_id} already exists (id {existing_id})"
    )]
    DuplicateRelation {
        manager_id: i64,
        subordinate_id: i64,
        relation_type: RelationType,
        existing_id: i64,
    },

    /// Delete blocked because the node has children in its tree.
    #[error("{kind} {id} still has {count} child node(s)")]
    HasChildren { kind: EntityKind, id: i64, count: usize },

    /// Delete blocked because other records still reference the entity.
    #[error("{kind} {id} is still referenced by {count} {dependents}")]
    HasDependents {
        kind: EntityKind,
        id: i64,
        dependents: &'static str,
        count: usize,
    },

    /// Uniqueness violation reported by storage.
    #[error("integrity conflict: {0}")]
    IntegrityConflict(String),

    /// Input rejected before touching storage.
    #[error("invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    /// A traversal met a loop or exceeded the depth guard.
    #[error("corrupt {kind} tree at node {id}: {reason}")]
    CorruptTree {
        kind: TreeKind,
        id: i64,
        reason: String,
    },

    /// Any other storage error.
    #[error("storage error: {0}")]
    Db(rusqlite::Error),
}

impl OrgError {
    /// Machine-readable code associated with this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::NotFound { .. } => ErrorCode::NotFound,
            Self::SelfParent { .. } => ErrorCode::SelfParent,
            Self::Cycle { .. } => ErrorCode::CycleDetected,
            Self::SelfRelation { .. } => ErrorCode::SelfRelation,
            Self::InvalidHierarchy { .. } => ErrorCode::InvalidHierarchy,
            Self::DuplicateRelation { .. } => ErrorCode::DuplicateRelation,
            Self::HasChildren { .. } => ErrorCode::HasChildren,
            Self::HasDependents { .. } => ErrorCode::HasDependents,
            Self::IntegrityConflict(_) => ErrorCode::IntegrityConflict,
            Self::Validation { .. } => ErrorCode::ValidationFailed,
            Self::CorruptTree { .. } => ErrorCode::CorruptTree,
            Self::Db(_) => ErrorCode::StorageFailure,
        }
    }

    /// Optional remediation hint for operators and agents.
    #[must_use]
    pub const fn hint(&self) -> Option<&'static str> {
        self.code().hint()
    }

    pub(crate) const fn not_found(kind: EntityKind, id: i64) -> Self {
        Self::NotFound { kind, id }
    }

    pub(crate) fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field,
            reason: reason.into(),
        }
    }
}

impl From<rusqlite::Error> for OrgError {
    fn from(err: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(ref failure, ref detail) = err {
            let unique = failure.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
                || failure.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY;
            if unique {
                let message = detail
                    .clone()
                    .unwrap_or_else(|| "unique constraint failed".to_string());
                return Self::IntegrityConflict(message);
            }
        }
        Self::Db(err)
    }
}

/// Result alias used across the core.
pub type OrgResult<T> = Result<T, OrgError>;

#[cfg(test)]
mod tests {
    use super::{ErrorCode, OrgError};
    use crate::model::EntityKind;
    use rusqlite::Connection;
    use std::collections::HashSet;

    #[test]
    fn all_codes_are_unique() {
        let all = [
            ErrorCode::NotFound,
            ErrorCode::SelfParent,
            ErrorCode::CycleDetected,
            ErrorCode::SelfRelation,
            ErrorCode::InvalidHierarchy,
            ErrorCode::DuplicateRelation,
            ErrorCode::HasChildren,
            ErrorCode::HasDependents,
            ErrorCode::IntegrityConflict,
            ErrorCode::ValidationFailed,
            ErrorCode::CorruptTree,
            ErrorCode::StorageFailure,
        ];

        let mut seen = HashSet::new();
        for code in all {
            assert!(seen.insert(code.code()), "duplicate code {}", code.code());
        }
    }

    #[test]
    fn code_format_is_machine_friendly() {
        let code = ErrorCode::CycleDetected.code();
        assert_eq!(code.len(), 5);
        assert!(code.starts_with('E'));
        assert!(code.chars().skip(1).all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn not_found_display_names_kind_and_id() {
        let err = OrgError::not_found(EntityKind::Division, 42);
        assert_eq!(err.to_string(), "division 42 not found");
        assert_eq!(err.code(), ErrorCode::NotFound);
    }

    #[test]
    fn unique_violation_maps_to_integrity_conflict() {
        let conn = Connection::open_in_memory().expect("open");
        conn.execute_batch("CREATE TABLE t (name TEXT UNIQUE); INSERT INTO t VALUES ('a');")
            .expect("setup");
        let err: OrgError = conn
            .execute("INSERT INTO t VALUES ('a')", [])
            .expect_err("duplicate insert must fail")
            .into();
        assert!(matches!(err, OrgError::IntegrityConflict(_)), "{err:?}");
    }

    #[test]
    fn other_sqlite_errors_stay_storage_failures() {
        let conn = Connection::open_in_memory().expect("open");
        let err: OrgError = conn
            .execute("INSERT INTO missing_table VALUES (1)", [])
            .expect_err("missing table")
            .into();
        assert_eq!(err.code(), ErrorCode::StorageFailure);
    }
}
