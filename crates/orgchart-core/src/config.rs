use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::env;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Directory holding the store and its config, relative to the project root.
pub const STORE_DIR: &str = ".orgchart";
/// Store file name used when the config does not name one.
pub const DEFAULT_DB_FILE: &str = "orgchart.sqlite3";
/// Environment variable overriding the store path.
pub const DB_ENV: &str = "ORGCHART_DB";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub lists: ListConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Store file; relative paths resolve against the project root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: None,
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListConfig {
    #[serde(default = "default_list_limit")]
    pub default_limit: u32,
}

impl Default for ListConfig {
    fn default() -> Self {
        Self {
            default_limit: default_list_limit(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EffectiveConfig {
    pub project: ProjectConfig,
    pub store_path: PathBuf,
    pub busy_timeout: Duration,
    pub resolved_output: String,
}

fn config_path(project_root: &Path) -> PathBuf {
    project_root.join(STORE_DIR).join("config.toml")
}

pub fn load_project_config(project_root: &Path) -> Result<ProjectConfig> {
    let path = config_path(project_root);
    if !path.exists() {
        return Ok(ProjectConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<ProjectConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Write a default config unless one already exists. Returns its path.
pub fn write_default_config(project_root: &Path) -> Result<PathBuf> {
    let path = config_path(project_root);
    if path.exists() {
        return Ok(path);
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let content =
        toml::to_string_pretty(&ProjectConfig::default()).context("Failed to render config")?;
    std::fs::write(&path, content)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

pub fn resolve_config(
    project_root: &Path,
    cli_json: bool,
    cli_format: Option<&str>,
) -> Result<EffectiveConfig> {
    let project = load_project_config(project_root)?;

    let env_db = env::var_os(DB_ENV).map(PathBuf::from);
    let store_path = resolve_store_path(project_root, project.store.path.as_deref(), env_db);

    let env_format = env::var("FORMAT").ok();
    let resolved_output = resolve_output(
        cli_json,
        cli_format,
        env_format,
        project.output.format.clone(),
    )?;

    Ok(EffectiveConfig {
        busy_timeout: Duration::from_millis(project.store.busy_timeout_ms),
        project,
        store_path,
        resolved_output,
    })
}

fn resolve_store_path(
    project_root: &Path,
    configured: Option<&Path>,
    env_db: Option<PathBuf>,
) -> PathBuf {
    let chosen = env_db
        .filter(|path| !path.as_os_str().is_empty())
        .or_else(|| configured.map(Path::to_path_buf))
        .unwrap_or_else(|| Path::new(STORE_DIR).join(DEFAULT_DB_FILE));

    if chosen.is_absolute() {
        chosen
    } else {
        project_root.join(chosen)
    }
}

fn normalize_output_mode(raw: &str) -> Option<&'static str> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "pretty" | "human" => Some("pretty"),
        "text" | "table" => Some("text"),
        "json" => Some("json"),
        _ => None,
    }
}

fn resolve_output(
    cli_json: bool,
    cli_format: Option<&str>,
    env_format: Option<String>,
    config_format: Option<String>,
) -> Result<String> {
    if cli_json {
        return Ok("json".to_string());
    }

    if let Some(raw) = cli_format {
        let Some(mode) = normalize_output_mode(raw) else {
            bail!("unknown output format '{raw}' (expected pretty, text, or json)");
        };
        return Ok(mode.to_string());
    }

    if let Some(mode) = env_format.as_deref().and_then(normalize_output_mode) {
        return Ok(mode.to_string());
    }

    if let Some(mode) = config_format.as_deref().and_then(normalize_output_mode) {
        return Ok(mode.to_string());
    }

    if std::io::stdout().is_terminal() {
        Ok("pretty".to_string())
    } else {
        Ok("text".to_string())
    }
}

const fn default_busy_timeout_ms() -> u64 {
    5_000
}

const fn default_list_limit() -> u32 {
    100
}
