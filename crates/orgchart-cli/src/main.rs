#![forbid(unsafe_code)]

mod cmd;
mod output;

use clap::{CommandFactory, Parser, Subcommand};
use cmd::Context;
use orgchart_core::config;
use output::{CliError, OutputMode, render_error};
use std::env;
use std::path::Path;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "orgchart: organizational hierarchy and matrix relations",
    long_about = None
)]
struct Cli {
    /// Enable debug logging (unless ORGCHART_LOG is set).
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    /// Output format: pretty, text, or json.
    #[arg(long, global = true)]
    format: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Project",
        about = "Initialize an orgchart store",
        long_about = "Create .orgchart/ with a default config and a migrated store.",
        after_help = "EXAMPLES:\n    # Initialize in the current directory\n    orgchart init\n\n    # Use a store elsewhere\n    ORGCHART_DB=/srv/org.sqlite3 orgchart init"
    )]
    Init(cmd::init::InitArgs),

    #[command(
        next_help_heading = "Hierarchy",
        about = "Manage organizations",
        after_help = "EXAMPLES:\n    # Build a small hierarchy\n    orgchart org create --name Acme --code ACME --type holding\n    orgchart org create --name \"Acme LLC\" --code LLC --type legal_entity --parent 1\n\n    # Print it\n    orgchart org tree"
    )]
    Org {
        #[command(subcommand)]
        command: cmd::org::OrgCommand,
    },

    #[command(
        next_help_heading = "Hierarchy",
        about = "Manage divisions",
        after_help = "EXAMPLES:\n    # Create a department and a team under it\n    orgchart division create --name Sales --code S --org 1\n    orgchart division create --name Inside --code SI --org 1 --parent 1\n\n    # Deactivate the department and everything below\n    orgchart division deactivate 1"
    )]
    Division {
        #[command(subcommand)]
        command: cmd::division::DivisionCommand,
    },

    #[command(next_help_heading = "People", about = "Manage job titles")]
    Position {
        #[command(subcommand)]
        command: cmd::position::PositionCommand,
    },

    #[command(
        next_help_heading = "People",
        about = "Manage staff and primary managers",
        after_help = "EXAMPLES:\n    # Hire and assign a manager\n    orgchart staff create --email a@acme.test --first-name Ann --last-name Lee --org 1\n    orgchart staff set-manager 2 --manager 1\n\n    # Walk up the chain\n    orgchart staff chain 2"
    )]
    Staff {
        #[command(subcommand)]
        command: cmd::staff::StaffCommand,
    },

    #[command(
        next_help_heading = "People",
        about = "Manage functional (matrix) relations",
        after_help = "EXAMPLES:\n    # Add a project line for Q1\n    orgchart relation create --manager 1 --subordinate 2 --type project --start 2024-01-01 --end 2024-03-31\n\n    # Everyone staff 2 answers to\n    orgchart relation lines 2"
    )]
    Relation {
        #[command(subcommand)]
        command: cmd::relation::RelationCommand,
    },

    #[command(
        next_help_heading = "Project",
        about = "Generate shell completion scripts",
        after_help = "EXAMPLES:\n    # Generate bash completions\n    orgchart completions bash"
    )]
    Completions(cmd::completions::CompletionsArgs),
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("ORGCHART_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose || env::var("DEBUG").is_ok() {
            "orgchart=debug,info"
        } else {
            "orgchart=info,warn"
        })
    });

    let format = env::var("ORGCHART_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn run(
    cli: Cli,
    project_root: &Path,
    effective: &config::EffectiveConfig,
    output: OutputMode,
) -> anyhow::Result<()> {
    match cli.command {
        Commands::Init(args) => cmd::init::run_init(&args, project_root, effective, output),
        Commands::Completions(args) => {
            let mut command = Cli::command();
            cmd::completions::run_completions(args.shell, &mut command)
        }
        Commands::Org { command } => {
            cmd::org::run_org(&command, &Context::open(effective, output)?)
        }
        Commands::Division { command } => {
            cmd::division::run_division(&command, &Context::open(effective, output)?)
        }
        Commands::Position { command } => {
            cmd::position::run_position(&command, &Context::open(effective, output)?)
        }
        Commands::Staff { command } => {
            cmd::staff::run_staff(&command, &Context::open(effective, output)?)
        }
        Commands::Relation { command } => {
            cmd::relation::run_relation(&command, &Context::open(effective, output)?)
        }
    }
}

fn report(output: OutputMode, err: &anyhow::Error) -> ExitCode {
    debug!(error = %format!("{err:#}"), "command failed");
    if let Err(render_err) = render_error(output, &CliError::from_anyhow(err)) {
        eprintln!("error: {err:#} (and failed to render it: {render_err})");
    }
    ExitCode::FAILURE
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let fallback = if cli.json { OutputMode::Json } else { OutputMode::Text };
    let project_root = match env::current_dir() {
        Ok(root) => root,
        Err(err) => return report(fallback, &err.into()),
    };
    let effective = match config::resolve_config(&project_root, cli.json, cli.format.as_deref()) {
        Ok(effective) => effective,
        Err(err) => return report(fallback, &err),
    };
    let output = OutputMode::from_resolved(&effective.resolved_output);
    debug!(store = %effective.store_path.display(), ?output, "resolved config");

    match run(cli, &project_root, &effective, output) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => report(output, &err),
    }
}
