//! `orgchart relation`: typed matrix reporting lines between staff.

use crate::cmd::{Context, render_deleted};
use crate::output::{
    OutputMode, Renderable, or_dash, pretty_kv, pretty_section, render, render_item,
    render_list, yes_no,
};
use anyhow::Result;
use chrono::NaiveDate;
use clap::{Args, Subcommand};
use orgchart_core::Repository;
use orgchart_core::matrix::{self, Relations, ReportingLines};
use orgchart_core::model::{
    EntityKind, FunctionalRelation, NewRelation, RelationFilter, RelationType,
};
use std::io::{self, Write};

#[derive(Subcommand, Debug)]
pub enum RelationCommand {
    /// Add a relation from a manager to a subordinate.
    Create(CreateArgs),
    /// List relations.
    List(ListArgs),
    /// Delete a relation.
    Remove { id: i64 },
    /// Mark a relation inactive, keeping it on record.
    Deactivate { id: i64 },
    /// Primary manager plus every active relation above a staff member.
    Lines { staff_id: i64 },
}

#[derive(Args, Debug)]
pub struct CreateArgs {
    #[arg(long)]
    pub manager: i64,
    #[arg(long)]
    pub subordinate: i64,
    #[arg(long = "type", default_value = "functional")]
    pub relation_type: RelationType,
    #[arg(long)]
    pub description: Option<String>,
    /// First day of validity (YYYY-MM-DD).
    #[arg(long)]
    pub start: Option<NaiveDate>,
    /// Last day of validity (YYYY-MM-DD).
    #[arg(long)]
    pub end: Option<NaiveDate>,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    #[arg(long)]
    pub manager: Option<i64>,
    #[arg(long)]
    pub subordinate: Option<i64>,
    #[arg(long = "type")]
    pub relation_type: Option<RelationType>,
    /// Skip inactive relations.
    #[arg(long)]
    pub active_only: bool,
    #[arg(long)]
    pub limit: Option<u32>,
    #[arg(long)]
    pub offset: Option<u32>,
}

pub fn run_relation(command: &RelationCommand, ctx: &Context) -> Result<()> {
    let conn = &ctx.conn;
    match command {
        RelationCommand::Create(args) => {
            let new = NewRelation {
                manager_id: args.manager,
                subordinate_id: args.subordinate,
                relation_type: args.relation_type,
                description: args.description.clone(),
                start_date: args.start,
                end_date: args.end,
            };
            render_item(&matrix::create_relation(conn, &new)?, ctx.output)
        }
        RelationCommand::List(args) => {
            let filter = RelationFilter {
                manager_id: args.manager,
                subordinate_id: args.subordinate,
                relation_type: args.relation_type,
                active_only: args.active_only,
                limit: ctx.limit(args.limit),
                offset: args.offset,
            };
            render_list(&Relations::list(conn, &filter)?, ctx.output)
        }
        RelationCommand::Remove { id } => {
            matrix::remove_relation(conn, *id)?;
            render_deleted(ctx, EntityKind::FunctionalRelation, *id)
        }
        RelationCommand::Deactivate { id } => {
            render_item(&matrix::deactivate_relation(conn, *id)?, ctx.output)
        }
        RelationCommand::Lines { staff_id } => {
            render_lines(&matrix::reporting_lines(conn, *staff_id)?, ctx.output)
        }
    }
}

fn render_lines(lines: &ReportingLines, mode: OutputMode) -> Result<()> {
    render(mode, lines, |l, w| {
        if mode == OutputMode::Pretty {
            pretty_section(w, &format!("Reporting lines of staff #{}", l.staff_id))?;
        }
        let primary = l
            .primary_manager
            .as_ref()
            .map(|m| format!("{} #{}", m.full_name(), m.id));
        pretty_kv(w, "primary", or_dash(primary))?;
        for relation in &l.relations {
            pretty_kv(
                w,
                relation.relation_type.as_str(),
                format!("#{} (relation {})", relation.manager_id, relation.id),
            )?;
        }
        Ok(())
    })
}

fn window(relation: &FunctionalRelation) -> String {
    match (relation.start_date, relation.end_date) {
        (None, None) => "always".to_string(),
        (start, end) => format!("{}..{}", or_dash(start), or_dash(end)),
    }
}

impl Renderable for FunctionalRelation {
    fn render_pretty(&self, w: &mut dyn Write) -> io::Result<()> {
        pretty_section(
            w,
            &format!(
                "Relation #{}: {} -> {} [{}]",
                self.id, self.manager_id, self.subordinate_id, self.relation_type
            ),
        )?;
        pretty_kv(w, "active", yes_no(self.is_active))?;
        pretty_kv(w, "valid", window(self))?;
        if let Some(ref description) = self.description {
            pretty_kv(w, "description", description)?;
        }
        Ok(())
    }

    fn render_row(&self, w: &mut dyn Write) -> io::Result<()> {
        writeln!(
            w,
            "{}  {}  {}  {}  {}  {}",
            self.id,
            self.manager_id,
            self.subordinate_id,
            self.relation_type,
            yes_no(self.is_active),
            window(self)
        )
    }

    fn headers() -> &'static [&'static str] {
        &["id", "manager", "subordinate", "type", "active", "valid"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn relation(start: Option<NaiveDate>, end: Option<NaiveDate>) -> FunctionalRelation {
        FunctionalRelation {
            id: 1,
            manager_id: 2,
            subordinate_id: 3,
            relation_type: RelationType::Project,
            description: None,
            is_active: true,
            start_date: start,
            end_date: end,
            created_at_us: 0,
            updated_at_us: 0,
        }
    }

    #[test]
    fn window_formats_open_bounds() {
        let day = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(window(&relation(None, None)), "always");
        assert_eq!(window(&relation(Some(day), None)), "2024-03-01..-");
        assert_eq!(window(&relation(None, Some(day))), "-..2024-03-01");
    }

    #[test]
    fn row_follows_header_order() {
        let mut buf = Vec::new();
        relation(None, None).render_row(&mut buf).unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "1  2  3  project  yes  always\n"
        );
        assert_eq!(FunctionalRelation::headers().len(), 6);
    }
}
