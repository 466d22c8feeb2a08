//! Shared output layer for pretty/text/JSON parity across all CLI commands.
//!
//! Every command handler receives an [`OutputMode`] and formats its output
//! accordingly: pretty output for humans, compact rows for scripts, or
//! stable JSON.
//!
//! The mode itself is resolved by `orgchart_core::config::resolve_config`
//! (`--json`, then `--format`, then `FORMAT`, then `[output] format`, then
//! TTY detection); this module only maps the resolved name.

use orgchart_core::OrgError;
use orgchart_core::tree::TreeNode;
use serde::Serialize;
use std::io::{self, Write};

/// Shared width for human pretty separators.
pub const PRETTY_RULE_WIDTH: usize = 72;

/// Write a horizontal separator used by pretty human output.
pub fn pretty_rule(w: &mut dyn Write) -> io::Result<()> {
    writeln!(w, "{:-<width$}", "", width = PRETTY_RULE_WIDTH)
}

/// Write a section heading followed by a separator.
pub fn pretty_section(w: &mut dyn Write, heading: &str) -> io::Result<()> {
    writeln!(w, "{heading}")?;
    pretty_rule(w)
}

/// Render a left-aligned key/value line in human output.
pub fn pretty_kv(w: &mut dyn Write, key: &str, value: impl AsRef<str>) -> io::Result<()> {
    writeln!(w, "{:<12} {}", format!("{key}:"), value.as_ref())
}

/// `-` for a missing value, otherwise its display form.
pub fn or_dash<T: ToString>(value: Option<T>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

pub const fn yes_no(flag: bool) -> &'static str {
    if flag { "yes" } else { "no" }
}

/// The three output modes supported by the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-optimized output (sections, visual framing).
    Pretty,
    /// Plain rows for pipes and scripts.
    Text,
    /// Machine-readable JSON.
    Json,
}

impl OutputMode {
    /// Map a mode name produced by config resolution. Unknown names fall
    /// back to text.
    pub fn from_resolved(name: &str) -> Self {
        match name {
            "pretty" => Self::Pretty,
            "json" => Self::Json,
            _ => Self::Text,
        }
    }

    /// Returns `true` if JSON output was requested.
    pub const fn is_json(self) -> bool {
        matches!(self, Self::Json)
    }
}

/// A record the CLI can print in every mode.
///
/// JSON comes from `Serialize`; pretty and text are hand-written so the
/// column order stays stable for scripts.
pub trait Renderable: Serialize {
    /// Multi-line block for humans.
    fn render_pretty(&self, w: &mut dyn Write) -> io::Result<()>;

    /// One row, fields in [`Renderable::headers`] order.
    fn render_row(&self, w: &mut dyn Write) -> io::Result<()>;

    fn headers() -> &'static [&'static str]
    where
        Self: Sized;
}

/// Render a single item to stdout.
pub fn render_item<R: Renderable>(item: &R, mode: OutputMode) -> anyhow::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match mode {
        OutputMode::Pretty => item.render_pretty(&mut out)?,
        OutputMode::Text => item.render_row(&mut out)?,
        OutputMode::Json => {
            serde_json::to_writer_pretty(&mut out, item)?;
            writeln!(out)?;
        }
    }
    Ok(())
}

/// Render a list of items to stdout.
///
/// - JSON: one array.
/// - Text: a header row, then one row per item.
/// - Pretty: one block per item, separated by blank lines.
pub fn render_list<R: Renderable>(items: &[R], mode: OutputMode) -> anyhow::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match mode {
        OutputMode::Json => {
            serde_json::to_writer_pretty(&mut out, items)?;
            writeln!(out)?;
        }
        OutputMode::Text => {
            if !items.is_empty() {
                writeln!(out, "{}", R::headers().join("  "))?;
            }
            for item in items {
                item.render_row(&mut out)?;
            }
        }
        OutputMode::Pretty => {
            if items.is_empty() {
                writeln!(out, "(none)")?;
            }
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    writeln!(out)?;
                }
                item.render_pretty(&mut out)?;
            }
        }
    }
    Ok(())
}

/// Render a serializable value to stdout in the requested format.
///
/// In JSON mode, the value is serialized with `serde_json`. In pretty/text
/// mode, `human_fn` produces the output.
pub fn render<T: Serialize>(
    mode: OutputMode,
    value: &T,
    human_fn: impl FnOnce(&T, &mut dyn Write) -> io::Result<()>,
) -> anyhow::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match mode {
        OutputMode::Json => {
            serde_json::to_writer_pretty(&mut out, value)?;
            writeln!(out)?;
        }
        OutputMode::Pretty | OutputMode::Text => {
            human_fn(value, &mut out)?;
        }
    }
    Ok(())
}

/// Render a forest as nested JSON or as an indented outline.
pub fn render_forest(forest: &[TreeNode], mode: OutputMode) -> anyhow::Result<()> {
    render(mode, &forest, |nodes, w| {
        if nodes.is_empty() {
            writeln!(w, "(empty)")?;
        }
        for node in *nodes {
            write_outline(w, node, 0, mode)?;
        }
        Ok(())
    })
}

fn write_outline(w: &mut dyn Write, node: &TreeNode, depth: usize, mode: OutputMode) -> io::Result<()> {
    let marker = if node.is_active { "" } else { " (inactive)" };
    match mode {
        OutputMode::Pretty => {
            let branch = if depth == 0 { "" } else { "└─ " };
            writeln!(
                w,
                "{:indent$}{branch}{} #{}{marker}",
                "",
                node.label,
                node.id,
                indent = depth.saturating_sub(1) * 3
            )?;
        }
        _ => writeln!(w, "{:indent$}{}\t{}{marker}", "", node.id, node.label, indent = depth * 2)?,
    }
    for child in &node.children {
        write_outline(w, child, depth + 1, mode)?;
    }
    Ok(())
}

/// A structured error with optional suggestion and error code.
#[derive(Debug, Serialize)]
pub struct CliError {
    /// Human-readable error message.
    pub message: String,
    /// Optional suggestion for how to fix the error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    /// Machine-readable error code (`E####`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
}

impl CliError {
    /// Create a simple error with just a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            suggestion: None,
            error_code: None,
        }
    }

    /// Domain errors keep their code and hint; anything else carries the
    /// full context chain as its message.
    pub fn from_anyhow(err: &anyhow::Error) -> Self {
        err.downcast_ref::<OrgError>()
            .map_or_else(|| Self::new(format!("{err:#}")), Self::from)
    }
}

impl From<&OrgError> for CliError {
    fn from(err: &OrgError) -> Self {
        Self {
            message: err.to_string(),
            suggestion: err.hint().map(str::to_string),
            error_code: Some(err.code().code().to_string()),
        }
    }
}

/// Render an error to stderr in the requested format.
pub fn render_error(mode: OutputMode, error: &CliError) -> anyhow::Result<()> {
    let stderr = io::stderr();
    let mut out = stderr.lock();
    match mode {
        OutputMode::Json => {
            let wrapper = serde_json::json!({
                "error": error,
            });
            serde_json::to_writer_pretty(&mut out, &wrapper)?;
            writeln!(out)?;
        }
        OutputMode::Pretty | OutputMode::Text => {
            match error.error_code {
                Some(ref code) => writeln!(out, "error[{code}]: {}", error.message)?,
                None => writeln!(out, "error: {}", error.message)?,
            }
            if let Some(ref suggestion) = error.suggestion {
                writeln!(out, "  suggestion: {suggestion}")?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use orgchart_core::model::EntityKind;

    #[test]
    fn resolved_names_map_to_modes() {
        assert_eq!(OutputMode::from_resolved("pretty"), OutputMode::Pretty);
        assert_eq!(OutputMode::from_resolved("json"), OutputMode::Json);
        assert_eq!(OutputMode::from_resolved("text"), OutputMode::Text);
        assert_eq!(OutputMode::from_resolved("weird"), OutputMode::Text);
        assert!(OutputMode::Json.is_json());
        assert!(!OutputMode::Pretty.is_json());
    }

    #[test]
    fn org_error_keeps_code_and_hint() {
        let err = OrgError::NotFound {
            kind: EntityKind::Staff,
            id: 9,
        };
        let cli = CliError::from(&err);
        assert_eq!(cli.message, "staff 9 not found");
        assert_eq!(cli.error_code.as_deref(), Some("E2001"));
        assert!(cli.suggestion.is_some());
    }

    #[test]
    fn anyhow_wrapped_org_error_is_recognized() {
        let err = anyhow::Error::new(OrgError::SelfRelation { staff_id: 4 });
        let cli = CliError::from_anyhow(&err);
        assert_eq!(cli.error_code.as_deref(), Some("E2004"));

        let plain = anyhow::anyhow!("disk on fire");
        let cli = CliError::from_anyhow(&plain);
        assert_eq!(cli.message, "disk on fire");
        assert!(cli.error_code.is_none());
    }

    #[test]
    fn cli_error_json_skips_missing_fields() {
        let json = serde_json::to_value(CliError::new("boom")).unwrap();
        assert_eq!(json, serde_json::json!({ "message": "boom" }));
    }

    #[test]
    fn outline_indents_children() {
        let tree = TreeNode {
            id: 1,
            parent_id: None,
            label: "Root".into(),
            is_active: true,
            children: vec![TreeNode {
                id: 2,
                parent_id: Some(1),
                label: "Leaf".into(),
                is_active: false,
                children: vec![],
            }],
        };
        let mut buf = Vec::new();
        write_outline(&mut buf, &tree, 0, OutputMode::Text).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "1\tRoot\n  2\tLeaf (inactive)\n");

        let mut buf = Vec::new();
        write_outline(&mut buf, &tree, 0, OutputMode::Pretty).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "Root #1\n└─ Leaf #2 (inactive)\n");
    }
}
