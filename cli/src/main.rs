//! # council-cli
//!
//! Command-line client for the committee administration backend.
//!
//! ## Commands
//!
//! - `cq auth login --token <TOKEN>` - Store a bearer token
//! - `cq resources` - List the resources the client knows about
//! - `cq list committees -f DepartmentId=3` - List records
//! - `cq get committees 42` - Show one record
//! - `cq create tasks --data '{"title": "Draft minutes"}'` - Mutate a resource
//!
//! See `cq --help` for the full command reference.

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use colored::Colorize;
use council_sdk::Operation;
use std::io;
use std::path::PathBuf;
use std::process;

mod commands;
mod config;
mod credentials;
mod telemetry;
mod ui;

use commands::Session;

#[derive(Parser)]
#[command(name = "cq")]
#[command(about = "Council CLI - Query and manage committee administration data", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to council.toml configuration file
    #[arg(short, long, global = true, default_value = config::DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// API base URL (overrides base_url in the config file)
    #[arg(long, global = true, env = "COUNCIL_API_URL")]
    base_url: Option<String>,

    /// Output as JSON (machine-readable format)
    #[arg(long, global = true)]
    json: bool,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    json_logs: bool,

    /// Enable verbose output
    #[arg(long, global = true)]
    verbose: bool,

    /// Generate shell completions
    #[arg(long, value_name = "SHELL")]
    completions: Option<Shell>,
}

#[derive(Subcommand)]
enum Commands {
    /// Authentication commands
    #[command(subcommand)]
    Auth(AuthCommands),

    /// List known resources and their endpoints
    Resources,

    /// List records of a resource
    List {
        /// Resource name, e.g. committees
        resource: String,

        /// Filter as key=value (repeatable; key= leaves it unset)
        #[arg(short, long = "filter", value_name = "KEY=VALUE")]
        filters: Vec<String>,
    },

    /// Show a single record
    Get {
        resource: String,
        id: String,
    },

    /// Create a record
    Create {
        resource: String,

        /// JSON payload, or @path to a JSON file
        #[arg(short, long)]
        data: String,
    },

    /// Update a record
    Update {
        resource: String,

        /// JSON payload, or @path to a JSON file
        #[arg(short, long)]
        data: String,
    },

    /// Delete a record
    Delete {
        resource: String,

        /// JSON payload identifying the record, or @path to a JSON file
        #[arg(short, long)]
        data: String,
    },
}

#[derive(Subcommand)]
enum AuthCommands {
    /// Store a bearer token for later requests
    Login {
        #[arg(long, env = "COUNCIL_TOKEN", hide_env_values = true)]
        token: String,
    },

    /// Logout (remove stored credentials)
    Logout,

    /// Check authentication status (local only)
    Status,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Some(shell) = cli.completions {
        let mut cmd = Cli::command();
        generate(shell, &mut cmd, "cq", &mut io::stdout());
        return;
    }

    if let Err(e) = telemetry::init(cli.json_logs, cli.verbose) {
        eprintln!("{} {}", "Warning:".yellow().bold(), e);
    }

    if let Err(e) = run(cli).await {
        eprintln!("{} {}", "Error:".red().bold(), e);
        process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    let open = || Session::open(&cli.config, cli.base_url.clone(), cli.json);

    match command {
        Commands::Auth(auth_cmd) => match auth_cmd {
            AuthCommands::Login { token } => commands::auth::login(&token),
            AuthCommands::Logout => commands::auth::logout(),
            AuthCommands::Status => commands::auth::status(cli.json),
        },
        Commands::Resources => {
            let config = config::CouncilConfig::resolve(&cli.config, cli.base_url.clone())?;
            commands::query::resources(&config, cli.json)
        }
        Commands::List { resource, filters } => {
            commands::query::list(&open()?, &resource, &filters).await
        }
        Commands::Get { resource, id } => commands::query::get(&open()?, &resource, &id).await,
        Commands::Create { resource, data } => {
            commands::mutate::run(&open()?, &resource, Operation::Create, &data).await
        }
        Commands::Update { resource, data } => {
            commands::mutate::run(&open()?, &resource, Operation::Update, &data).await
        }
        Commands::Delete { resource, data } => {
            commands::mutate::run(&open()?, &resource, Operation::Delete, &data).await
        }
    }
}
