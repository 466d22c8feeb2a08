//! `orgchart org`: organizations and their BOARD → LOCATION hierarchy.

use crate::cmd::{Context, ParentArg, render_deleted, run_set_active};
use crate::output::{
    Renderable, or_dash, pretty_kv, pretty_section, render_forest, render_item, render_list,
    yes_no,
};
use anyhow::Result;
use clap::{Args, Subcommand};
use orgchart_core::Repository;
use orgchart_core::model::{
    EntityKind, NewOrganization, OrgType, Organization, OrganizationFilter, OrganizationUpdate,
};
use orgchart_core::store::Organizations;
use orgchart_core::tree::{self, TreeKind};
use std::io::{self, Write};

#[derive(Subcommand, Debug)]
pub enum OrgCommand {
    /// Create an organization.
    Create(CreateArgs),
    /// List organizations.
    List(ListArgs),
    /// Show one organization.
    Show { id: i64 },
    /// Change fields of an organization.
    Update(UpdateArgs),
    /// Re-parent an organization. Use `--parent none` to make it a root.
    Move {
        id: i64,
        #[arg(long)]
        parent: ParentArg,
    },
    /// Delete an organization with no children or dependents.
    Delete { id: i64 },
    /// Activate an organization and its whole subtree.
    Activate { id: i64 },
    /// Deactivate an organization and its whole subtree.
    Deactivate { id: i64 },
    /// Parent chain, nearest first.
    Ancestors { id: i64 },
    /// Print the organization tree.
    Tree(TreeArgs),
}

#[derive(Args, Debug)]
pub struct CreateArgs {
    #[arg(long)]
    pub name: String,
    #[arg(long)]
    pub code: String,
    /// board, holding, legal_entity, or location.
    #[arg(long = "type")]
    pub org_type: OrgType,
    #[arg(long)]
    pub parent: Option<i64>,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long)]
    pub legal_address: Option<String>,
    #[arg(long)]
    pub physical_address: Option<String>,
    #[arg(long)]
    pub inn: Option<String>,
    #[arg(long)]
    pub kpp: Option<String>,
    #[arg(long)]
    pub ckp: Option<String>,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    #[arg(long = "type")]
    pub org_type: Option<OrgType>,
    #[arg(long)]
    pub parent: Option<i64>,
    /// Only organizations without a parent.
    #[arg(long)]
    pub roots: bool,
    /// Only active (`true`) or inactive (`false`) organizations.
    #[arg(long)]
    pub active: Option<bool>,
    #[arg(long)]
    pub limit: Option<u32>,
    #[arg(long)]
    pub offset: Option<u32>,
}

#[derive(Args, Debug)]
pub struct UpdateArgs {
    pub id: i64,
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub code: Option<String>,
    #[arg(long = "type")]
    pub org_type: Option<OrgType>,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long)]
    pub legal_address: Option<String>,
    #[arg(long)]
    pub physical_address: Option<String>,
    #[arg(long)]
    pub inn: Option<String>,
    #[arg(long)]
    pub kpp: Option<String>,
    #[arg(long)]
    pub ckp: Option<String>,
}

#[derive(Args, Debug)]
pub struct TreeArgs {
    /// Start from these organizations instead of every root.
    #[arg(long = "root")]
    pub roots: Vec<i64>,
    /// Include inactive nodes.
    #[arg(long)]
    pub all: bool,
}

pub fn run_org(command: &OrgCommand, ctx: &Context) -> Result<()> {
    let conn = &ctx.conn;
    match command {
        OrgCommand::Create(args) => {
            let new = NewOrganization {
                name: args.name.clone(),
                code: args.code.clone(),
                org_type: args.org_type,
                parent_id: args.parent,
                description: args.description.clone(),
                legal_address: args.legal_address.clone(),
                physical_address: args.physical_address.clone(),
                inn: args.inn.clone(),
                kpp: args.kpp.clone(),
                ckp: args.ckp.clone(),
            };
            render_item(&Organizations::create(conn, &new)?, ctx.output)
        }
        OrgCommand::List(args) => {
            let filter = OrganizationFilter {
                org_type: args.org_type,
                parent_id: args.parent,
                roots_only: args.roots,
                is_active: args.active,
                limit: ctx.limit(args.limit),
                offset: args.offset,
            };
            render_list(&Organizations::list(conn, &filter)?, ctx.output)
        }
        OrgCommand::Show { id } => render_item(&Organizations::require(conn, *id)?, ctx.output),
        OrgCommand::Update(args) => {
            let update = OrganizationUpdate {
                name: args.name.clone(),
                code: args.code.clone(),
                description: args.description.clone(),
                org_type: args.org_type,
                is_active: None,
                legal_address: args.legal_address.clone(),
                physical_address: args.physical_address.clone(),
                inn: args.inn.clone(),
                kpp: args.kpp.clone(),
                ckp: args.ckp.clone(),
            };
            render_item(&Organizations::update(conn, args.id, &update)?, ctx.output)
        }
        OrgCommand::Move { id, parent } => {
            render_item(&Organizations::move_to(conn, *id, parent.0)?, ctx.output)
        }
        OrgCommand::Delete { id } => {
            Organizations::delete(conn, *id)?;
            render_deleted(ctx, EntityKind::Organization, *id)
        }
        OrgCommand::Activate { id } => run_set_active(ctx, TreeKind::Organization, *id, true),
        OrgCommand::Deactivate { id } => run_set_active(ctx, TreeKind::Organization, *id, false),
        OrgCommand::Ancestors { id } => {
            render_list(&Organizations::ancestors(conn, *id)?, ctx.output)
        }
        OrgCommand::Tree(args) => {
            let roots = (!args.roots.is_empty()).then_some(args.roots.as_slice());
            let forest = tree::build_tree(conn, TreeKind::Organization, roots, args.all)?;
            render_forest(&forest, ctx.output)
        }
    }
}

impl Renderable for Organization {
    fn render_pretty(&self, w: &mut dyn Write) -> io::Result<()> {
        pretty_section(w, &format!("{} #{} [{}]", self.name, self.id, self.org_type))?;
        pretty_kv(w, "code", &self.code)?;
        pretty_kv(w, "parent", or_dash(self.parent_id))?;
        pretty_kv(w, "active", yes_no(self.is_active))?;
        for (key, value) in [
            ("description", &self.description),
            ("legal addr", &self.legal_address),
            ("site addr", &self.physical_address),
            ("inn", &self.inn),
            ("kpp", &self.kpp),
            ("ckp", &self.ckp),
        ] {
            if let Some(value) = value {
                pretty_kv(w, key, value)?;
            }
        }
        Ok(())
    }

    fn render_row(&self, w: &mut dyn Write) -> io::Result<()> {
        writeln!(
            w,
            "{}  {}  {}  {}  {}  {}",
            self.id,
            self.org_type,
            self.code,
            self.name,
            or_dash(self.parent_id),
            yes_no(self.is_active)
        )
    }

    fn headers() -> &'static [&'static str] {
        &["id", "type", "code", "name", "parent", "active"]
    }
}
