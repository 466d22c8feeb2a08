//! orgchart-core library.
//!
//! Organizational hierarchy and matrix-relations engine over SQLite:
//!
//! - [`store`]: repositories for organizations, divisions, positions, and staff
//! - [`tree`]: cycle-safe walks and moves shared by every self-referencing tree
//! - [`hierarchy`]: which organization types may parent which
//! - [`cascade`]: subtree-wide activation changes
//! - [`matrix`]: typed functional relations between staff
//!
//! Every operation takes a `&rusqlite::Connection` and runs inside one
//! transaction (or a savepoint when the caller already holds one).

#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]

pub mod cascade;
pub mod config;
pub mod db;
pub mod error;
pub mod hierarchy;
pub mod matrix;
pub mod model;
pub mod store;
pub mod tree;

pub use error::{ErrorCode, OrgError, OrgResult};
pub use store::Repository;
pub use tree::{MAX_TREE_DEPTH, TreeKind};
