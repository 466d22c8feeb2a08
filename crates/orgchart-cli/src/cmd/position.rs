use crate::cmd::{Context, render_deleted};
use crate::output::{Renderable, pretty_kv, pretty_section, render_item, render_list, yes_no};
use anyhow::Result;
use clap::Subcommand;
use orgchart_core::Repository;
use orgchart_core::model::{EntityKind, NewPosition, Position, PositionFilter};
use orgchart_core::store::Positions;
use std::io::{self, Write};

#[derive(Subcommand, Debug)]
pub enum PositionCommand {
    /// Create a job title.
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: Option<String>,
    },
    /// List job titles.
    List {
        /// Case-insensitive substring of the name.
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        active: Option<bool>,
        #[arg(long)]
        limit: Option<u32>,
        #[arg(long)]
        offset: Option<u32>,
    },
    /// Delete a job title nobody holds.
    Delete { id: i64 },
}

pub fn run_position(command: &PositionCommand, ctx: &Context) -> Result<()> {
    let conn = &ctx.conn;
    match command {
        PositionCommand::Create { name, description } => {
            let new = NewPosition {
                name: name.clone(),
                description: description.clone(),
            };
            render_item(&Positions::create(conn, &new)?, ctx.output)
        }
        PositionCommand::List {
            name,
            active,
            limit,
            offset,
        } => {
            let filter = PositionFilter {
                name_contains: name.clone(),
                is_active: *active,
                limit: ctx.limit(*limit),
                offset: *offset,
            };
            render_list(&Positions::list(conn, &filter)?, ctx.output)
        }
        PositionCommand::Delete { id } => {
            Positions::delete(conn, *id)?;
            render_deleted(ctx, EntityKind::Position, *id)
        }
    }
}

impl Renderable for Position {
    fn render_pretty(&self, w: &mut dyn Write) -> io::Result<()> {
        pretty_section(w, &format!("{} #{}", self.name, self.id))?;
        pretty_kv(w, "active", yes_no(self.is_active))?;
        if let Some(ref description) = self.description {
            pretty_kv(w, "description", description)?;
        }
        Ok(())
    }

    fn render_row(&self, w: &mut dyn Write) -> io::Result<()> {
        writeln!(w, "{}  {}  {}", self.id, self.name, yes_no(self.is_active))
    }

    fn headers() -> &'static [&'static str] {
        &["id", "name", "active"]
    }
}
