use crate::cmd::{Context, ParentArg, render_deleted, run_set_active};
use crate::output::{
    Renderable, or_dash, pretty_kv, pretty_section, render_forest, render_item, render_list,
    yes_no,
};
use anyhow::Result;
use clap::{Args, Subcommand};
use orgchart_core::Repository;
use orgchart_core::model::{Division, DivisionFilter, EntityKind, NewDivision};
use orgchart_core::store::Divisions;
use orgchart_core::tree::{self, TreeKind};
use std::io::{self, Write};

#[derive(Subcommand, Debug)]
pub enum DivisionCommand {
    /// Create a division inside a holding or legal entity.
    Create(CreateArgs),
    /// List divisions.
    List(ListArgs),
    /// Show one division.
    Show { id: i64 },
    /// Re-parent a division within its organization.
    Move {
        id: i64,
        #[arg(long)]
        parent: ParentArg,
    },
    /// Delete a division with no children or staff.
    Delete { id: i64 },
    /// Activate a division and every division below it.
    Activate { id: i64 },
    /// Deactivate a division and every division below it.
    Deactivate { id: i64 },
    /// Print the division tree of one organization.
    Tree {
        #[arg(long = "org")]
        organization: i64,
        /// Include inactive divisions.
        #[arg(long)]
        all: bool,
    },
}

#[derive(Args, Debug)]
pub struct CreateArgs {
    #[arg(long)]
    pub name: String,
    #[arg(long)]
    pub code: String,
    /// Owning organization id.
    #[arg(long = "org")]
    pub organization: i64,
    #[arg(long)]
    pub parent: Option<i64>,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long)]
    pub ckp: Option<String>,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    #[arg(long = "org")]
    pub organization: Option<i64>,
    #[arg(long)]
    pub parent: Option<i64>,
    #[arg(long)]
    pub roots: bool,
    #[arg(long)]
    pub level: Option<u32>,
    #[arg(long)]
    pub active: Option<bool>,
    #[arg(long)]
    pub limit: Option<u32>,
    #[arg(long)]
    pub offset: Option<u32>,
}

pub fn run_division(command: &DivisionCommand, ctx: &Context) -> Result<()> {
    let conn = &ctx.conn;
    match command {
        DivisionCommand::Create(args) => {
            let new = NewDivision {
                name: args.name.clone(),
                code: args.code.clone(),
                organization_id: args.organization,
                parent_id: args.parent,
                description: args.description.clone(),
                ckp: args.ckp.clone(),
            };
            render_item(&Divisions::create(conn, &new)?, ctx.output)
        }
        DivisionCommand::List(args) => {
            let filter = DivisionFilter {
                organization_id: args.organization,
                parent_id: args.parent,
                roots_only: args.roots,
                level: args.level,
                is_active: args.active,
                limit: ctx.limit(args.limit),
                offset: args.offset,
            };
            render_list(&Divisions::list(conn, &filter)?, ctx.output)
        }
        DivisionCommand::Show { id } => render_item(&Divisions::require(conn, *id)?, ctx.output),
        DivisionCommand::Move { id, parent } => {
            render_item(&Divisions::move_to(conn, *id, parent.0)?, ctx.output)
        }
        DivisionCommand::Delete { id } => {
            Divisions::delete(conn, *id)?;
            render_deleted(ctx, EntityKind::Division, *id)
        }
        DivisionCommand::Activate { id } => run_set_active(ctx, TreeKind::Division, *id, true),
        DivisionCommand::Deactivate { id } => run_set_active(ctx, TreeKind::Division, *id, false),
        DivisionCommand::Tree { organization, all } => {
            render_forest(&tree::division_tree(conn, *organization, *all)?, ctx.output)
        }
    }
}

impl Renderable for Division {
    fn render_pretty(&self, w: &mut dyn Write) -> io::Result<()> {
        pretty_section(w, &format!("{} #{}", self.name, self.id))?;
        pretty_kv(w, "code", &self.code)?;
        pretty_kv(w, "org", self.organization_id.to_string())?;
        pretty_kv(w, "parent", or_dash(self.parent_id))?;
        pretty_kv(w, "level", self.level.to_string())?;
        pretty_kv(w, "active", yes_no(self.is_active))?;
        if let Some(ref description) = self.description {
            pretty_kv(w, "description", description)?;
        }
        Ok(())
    }

    fn render_row(&self, w: &mut dyn Write) -> io::Result<()> {
        writeln!(
            w,
            "{}  {}  {}  {}  {}  {}  {}",
            self.id,
            self.organization_id,
            or_dash(self.parent_id),
            self.level,
            self.code,
            self.name,
            yes_no(self.is_active)
        )
    }

    fn headers() -> &'static [&'static str] {
        &["id", "org", "parent", "level", "code", "name", "active"]
    }
}
