use crate::cmd::open_at;
use crate::output::{OutputMode, pretty_kv, render};
use anyhow::{Context as _, Result};
use clap::Args;
use orgchart_core::config::{self, EffectiveConfig};
use orgchart_core::db::migrations;
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use tracing::info;

#[derive(Args, Debug)]
pub struct InitArgs {}

#[derive(Debug, Serialize)]
struct InitReport {
    store: String,
    config: String,
    schema_version: u32,
    created: bool,
}

/// Execute `orgchart init`. Creates the project skeleton:
///
/// ```text
/// .orgchart/
///   config.toml         (default project config)
///   orgchart.sqlite3    (store, migrated to the latest schema)
/// ```
///
/// Re-running on an existing project only applies pending migrations.
///
/// # Errors
///
/// Returns an error if a directory cannot be created or the store cannot be
/// opened or migrated.
pub fn run_init(
    _args: &InitArgs,
    project_root: &Path,
    effective: &EffectiveConfig,
    output: OutputMode,
) -> Result<()> {
    let config_path = config::write_default_config(project_root)?;

    let store_path = &effective.store_path;
    let created = !store_path.exists();
    if let Some(parent) = store_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let conn = open_at(store_path, effective)?;
    let schema_version = migrations::current_schema_version(&conn)?;
    info!(store = %store_path.display(), schema_version, created, "project initialized");

    let report = InitReport {
        store: store_path.display().to_string(),
        config: config_path.display().to_string(),
        schema_version,
        created,
    };
    render(output, &report, |r, w| {
        if r.created {
            writeln!(w, "Initialized orgchart store")?;
        } else {
            writeln!(w, "Store already initialized")?;
        }
        pretty_kv(w, "store", &r.store)?;
        pretty_kv(w, "config", &r.config)?;
        pretty_kv(w, "schema", r.schema_version.to_string())
    })
}
