//! `onboard` command-line interface

mod commands;
mod error;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use commands::GlobalArgs;
use commands::maintenance::{InitArgs, ReconcileArgs, handle_init, handle_reconcile};
use commands::query::{
    ExecutionsArgs, ListArgs, StatsArgs, StatusArgs, handle_executions, handle_list,
    handle_stats, handle_status,
};
use commands::workflow::{RunArgs, handle_run};
use error::CliError;

#[derive(Parser)]
#[command(name = "onboard", version, about = "Run and inspect data onboarding workflows")]
struct Cli {
    /// Configuration file (TOML)
    #[arg(long, global = true, env = "ONBOARD_CONFIG")]
    config: Option<PathBuf>,

    /// Workflow database path
    #[arg(long, global = true, env = "ONBOARD_DATABASE")]
    database: Option<PathBuf>,

    /// Print JSON output
    #[arg(long, global = true)]
    json: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the workflow database schema
    Init {
        /// Drop and recreate existing tables
        #[arg(long)]
        force: bool,
    },
    /// Run a workflow for a staged file
    Run {
        /// Stage path of the source file
        source: String,
        /// Schema the mapping step writes into
        #[arg(long)]
        target_schema: Option<String>,
        /// Table the mapping step writes into
        #[arg(long)]
        target_table: Option<String>,
        /// Workflow type (ONBOARDING, PROFILING_ONLY)
        #[arg(long, default_value = "ONBOARDING")]
        workflow_type: String,
        /// Rows sampled by the profiling step
        #[arg(long)]
        sample_size: Option<u64>,
        /// File format passed to the profiling step
        #[arg(long)]
        file_format: Option<String>,
        /// Database the dictionary step writes into
        #[arg(long)]
        target_database: Option<String>,
    },
    /// Show a workflow record
    Status {
        workflow_id: String,
    },
    /// List recent workflows
    List {
        #[arg(long, default_value_t = 20)]
        limit: usize,
        /// Filter by status (repeatable or comma separated)
        #[arg(long = "status", value_delimiter = ',')]
        statuses: Vec<String>,
        /// Only workflows started within this many days
        #[arg(long)]
        days: Option<u32>,
    },
    /// Show the step execution log of a workflow
    Executions {
        workflow_id: String,
    },
    /// Show aggregate workflow statistics
    Stats {
        #[arg(long)]
        days: Option<u32>,
    },
    /// Mark workflows stuck in a non-terminal status as FAILED
    Reconcile {
        #[arg(long)]
        older_than_minutes: Option<u64>,
    },
}

fn init_logging(verbose: u8, json: bool) -> anyhow::Result<()> {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(format!("onboarding_orchestrator={default_level},onboard={default_level}")))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| {
            fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(true)
                .with_writer(std::io::stderr)
        }))
        .with((!json).then(|| fmt::layer().with_target(false).with_writer(std::io::stderr)))
        .try_init()?;
    Ok(())
}

fn dispatch(global: &GlobalArgs, command: Commands) -> Result<(), CliError> {
    match command {
        Commands::Init { force } => handle_init(global, &InitArgs { force }),
        Commands::Run {
            source,
            target_schema,
            target_table,
            workflow_type,
            sample_size,
            file_format,
            target_database,
        } => handle_run(
            global,
            &RunArgs {
                source,
                target_schema,
                target_table,
                workflow_type,
                sample_size,
                file_format,
                target_database,
            },
        ),
        Commands::Status { workflow_id } => handle_status(global, &StatusArgs { workflow_id }),
        Commands::List {
            limit,
            statuses,
            days,
        } => handle_list(
            global,
            &ListArgs {
                limit,
                statuses,
                days,
            },
        ),
        Commands::Executions { workflow_id } => {
            handle_executions(global, &ExecutionsArgs { workflow_id })
        }
        Commands::Stats { days } => handle_stats(global, &StatsArgs { days }),
        Commands::Reconcile { older_than_minutes } => {
            handle_reconcile(global, &ReconcileArgs { older_than_minutes })
        }
    }
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.log_json)?;

    let global = GlobalArgs {
        config: cli.config,
        database: cli.database,
        json: cli.json,
    };

    match dispatch(&global, cli.command) {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(e) => {
            eprintln!("Error: {}", e.user_message());
            Ok(ExitCode::FAILURE)
        }
    }
}
