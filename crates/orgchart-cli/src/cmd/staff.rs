//! `orgchart staff`: people and the primary manager tree.

use crate::cmd::{Context, ParentArg, render_deleted};
use crate::output::{
    Renderable, or_dash, pretty_kv, pretty_section, render_item, render_list, yes_no,
};
use anyhow::Result;
use clap::{Args, Subcommand};
use orgchart_core::Repository;
use orgchart_core::model::{EntityKind, NewStaff, Staff, StaffFilter};
use orgchart_core::store::StaffMembers;
use std::io::{self, Write};

#[derive(Subcommand, Debug)]
pub enum StaffCommand {
    /// Hire a staff member.
    Create(CreateArgs),
    /// List staff.
    List(ListArgs),
    /// Show one staff member.
    Show { id: i64 },
    /// Assign the primary manager. Use `--manager none` to clear it.
    SetManager {
        id: i64,
        #[arg(long)]
        manager: ParentArg,
    },
    /// Delete a staff member with no direct reports.
    Delete { id: i64 },
    /// Primary manager chain, nearest first.
    Chain { id: i64 },
    /// Direct reports, or everyone below with `--all`.
    Reports {
        id: i64,
        #[arg(long)]
        all: bool,
    },
}

#[derive(Args, Debug)]
pub struct CreateArgs {
    #[arg(long)]
    pub email: String,
    #[arg(long)]
    pub first_name: String,
    #[arg(long)]
    pub last_name: String,
    #[arg(long)]
    pub middle_name: Option<String>,
    #[arg(long = "org")]
    pub organization: i64,
    #[arg(long)]
    pub division: Option<i64>,
    /// A LOCATION organization id.
    #[arg(long)]
    pub location: Option<i64>,
    #[arg(long)]
    pub position: Option<i64>,
    #[arg(long)]
    pub manager: Option<i64>,
    #[arg(long)]
    pub phone: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    #[arg(long = "org")]
    pub organization: Option<i64>,
    #[arg(long)]
    pub division: Option<i64>,
    #[arg(long)]
    pub location: Option<i64>,
    #[arg(long)]
    pub manager: Option<i64>,
    #[arg(long)]
    pub active: Option<bool>,
    #[arg(long)]
    pub limit: Option<u32>,
    #[arg(long)]
    pub offset: Option<u32>,
}

pub fn run_staff(command: &StaffCommand, ctx: &Context) -> Result<()> {
    let conn = &ctx.conn;
    match command {
        StaffCommand::Create(args) => {
            let new = NewStaff {
                email: args.email.clone(),
                first_name: args.first_name.clone(),
                last_name: args.last_name.clone(),
                organization_id: args.organization,
                middle_name: args.middle_name.clone(),
                phone: args.phone.clone(),
                description: args.description.clone(),
                division_id: args.division,
                location_id: args.location,
                position_id: args.position,
                manager_id: args.manager,
            };
            render_item(&StaffMembers::create(conn, &new)?, ctx.output)
        }
        StaffCommand::List(args) => {
            let filter = StaffFilter {
                organization_id: args.organization,
                division_id: args.division,
                location_id: args.location,
                manager_id: args.manager,
                is_active: args.active,
                limit: ctx.limit(args.limit),
                offset: args.offset,
            };
            render_list(&StaffMembers::list(conn, &filter)?, ctx.output)
        }
        StaffCommand::Show { id } => render_item(&StaffMembers::require(conn, *id)?, ctx.output),
        StaffCommand::SetManager { id, manager } => {
            render_item(&StaffMembers::set_manager(conn, *id, manager.0)?, ctx.output)
        }
        StaffCommand::Delete { id } => {
            StaffMembers::delete(conn, *id)?;
            render_deleted(ctx, EntityKind::Staff, *id)
        }
        StaffCommand::Chain { id } => {
            render_list(&StaffMembers::manager_chain(conn, *id)?, ctx.output)
        }
        StaffCommand::Reports { id, all } => {
            let reports = if *all {
                StaffMembers::all_reports(conn, *id)?
            } else {
                StaffMembers::direct_reports(conn, *id)?
            };
            render_list(&reports, ctx.output)
        }
    }
}

impl Renderable for Staff {
    fn render_pretty(&self, w: &mut dyn Write) -> io::Result<()> {
        pretty_section(w, &format!("{} #{}", self.full_name(), self.id))?;
        pretty_kv(w, "email", &self.email)?;
        pretty_kv(w, "org", self.organization_id.to_string())?;
        pretty_kv(w, "division", or_dash(self.division_id))?;
        pretty_kv(w, "location", or_dash(self.location_id))?;
        pretty_kv(w, "position", or_dash(self.position_id))?;
        pretty_kv(w, "manager", or_dash(self.manager_id))?;
        pretty_kv(w, "active", yes_no(self.is_active))?;
        if let Some(ref phone) = self.phone {
            pretty_kv(w, "phone", phone)?;
        }
        Ok(())
    }

    fn render_row(&self, w: &mut dyn Write) -> io::Result<()> {
        writeln!(
            w,
            "{}  {}  {}  {}  {}",
            self.id,
            self.short_name(),
            self.email,
            or_dash(self.manager_id),
            yes_no(self.is_active)
        )
    }

    fn headers() -> &'static [&'static str] {
        &["id", "name", "email", "manager", "active"]
    }
}
