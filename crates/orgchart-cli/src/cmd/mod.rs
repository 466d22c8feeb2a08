//! Subcommand handlers. Each module owns its clap args and a `run_*` entry
//! point that receives an open [`Context`].

pub mod completions;
pub mod division;
pub mod init;
pub mod org;
pub mod position;
pub mod relation;
pub mod staff;

use crate::output::{OutputMode, render};
use anyhow::{Context as _, Result, bail};
use orgchart_core::cascade;
use orgchart_core::config::EffectiveConfig;
use orgchart_core::db;
use orgchart_core::model::EntityKind;
use orgchart_core::tree::TreeKind;
use rusqlite::Connection;
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;

/// An open store plus the settings every handler needs.
pub struct Context {
    pub conn: Connection,
    pub output: OutputMode,
    pub default_limit: u32,
}

impl Context {
    /// Open the configured store. The store must already exist; `init`
    /// is the only command that creates one.
    pub fn open(config: &EffectiveConfig, output: OutputMode) -> Result<Self> {
        let path = &config.store_path;
        if !path.exists() {
            bail!(
                "no store at {}.\n  Run `orgchart init` first, or point {} at an existing store.",
                path.display(),
                orgchart_core::config::DB_ENV
            );
        }
        let conn = open_at(path, config)?;
        Ok(Self {
            conn,
            output,
            default_limit: config.project.lists.default_limit,
        })
    }

    /// Limit to use when a list command was given none.
    pub fn limit(&self, requested: Option<u32>) -> Option<u32> {
        Some(requested.unwrap_or(self.default_limit))
    }
}

pub(crate) fn open_at(path: &Path, config: &EffectiveConfig) -> Result<Connection> {
    db::open_store(path, config.busy_timeout)
        .with_context(|| format!("Failed to open store at {}", path.display()))
}

#[derive(Debug, Serialize)]
struct Activation {
    kind: TreeKind,
    id: i64,
    is_active: bool,
    affected: usize,
}

/// Shared body of the `activate` / `deactivate` subcommands.
pub(crate) fn run_set_active(ctx: &Context, kind: TreeKind, id: i64, active: bool) -> Result<()> {
    let affected = cascade::set_active(&ctx.conn, kind, id, active)?;
    let report = Activation {
        kind,
        id,
        is_active: active,
        affected,
    };
    render(ctx.output, &report, |r, w| {
        let verb = if r.is_active { "Activated" } else { "Deactivated" };
        writeln!(w, "{verb} {} {} ({} node(s))", r.kind, r.id, r.affected)
    })
}

#[derive(Debug, Serialize)]
struct Deleted {
    deleted: EntityKind,
    id: i64,
}

pub(crate) fn render_deleted(ctx: &Context, kind: EntityKind, id: i64) -> Result<()> {
    render(ctx.output, &Deleted { deleted: kind, id }, |d, w| {
        writeln!(w, "Deleted {} {}", d.deleted, d.id)
    })
}

/// A `--parent` value: an id, or `none` for a root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParentArg(pub Option<i64>);

impl FromStr for ParentArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("none") {
            return Ok(Self(None));
        }
        s.parse::<i64>()
            .map(|id| Self(Some(id)))
            .map_err(|_| format!("expected an id or 'none', got '{s}'"))
    }
}

#[cfg(test)]
mod tests {
    use super::ParentArg;

    #[test]
    fn parent_arg_accepts_ids_and_none() {
        assert_eq!("12".parse::<ParentArg>().unwrap(), ParentArg(Some(12)));
        assert_eq!("None".parse::<ParentArg>().unwrap(), ParentArg(None));
        assert!("twelve".parse::<ParentArg>().is_err());
    }
}
