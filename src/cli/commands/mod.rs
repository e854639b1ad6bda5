mod subcommands;


use crate::api::types::LeadStatus;
use crate::auth::AuthManager;
use crate::client::ApiClient;
use crate::config::{Config, load_config};
use crate::events::AuthEvent;
use crate::storage::FileStore;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::debug;

#[derive(Parser)]
#[command(name = "crm")]
#[command(about = "Command-line client for the CRM backend", version)]
pub struct Cli {
    /// Config file (default: ~/.crm/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and store the session
    Login {
        #[arg(short, long)]
        username: String,
        #[arg(short, long, env = "CRM_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Revoke the refresh token and forget the session
    Logout,
    /// Show the logged-in user (validated against the server)
    Whoami,
    /// Show configuration and local session state
    Status,
    /// Work with leads
    Leads {
        #[command(subcommand)]
        cmd: LeadCommands,
    },
    /// Manage users (superadmin)
    Users {
        #[command(subcommand)]
        cmd: UserCommands,
    },
    /// List or seed provinces
    Provinces {
        #[command(subcommand)]
        cmd: ProvinceCommands,
    },
    /// Generate and browse proposals
    Proposals {
        #[command(subcommand)]
        cmd: ProposalCommands,
    },
    /// Reporting
    Analytics {
        #[command(subcommand)]
        cmd: AnalyticsCommands,
    },
}

#[derive(Subcommand)]
enum LeadCommands {
    /// List leads with optional filters
    List {
        #[arg(long)]
        page: Option<u32>,
        #[arg(long)]
        limit: Option<u32>,
        #[arg(long, short = 's')]
        search: Option<String>,
        #[arg(long)]
        city: Option<String>,
        #[arg(long)]
        category: Option<String>,
        /// Repeatable: --status New --status Deal
        #[arg(long)]
        status: Vec<LeadStatus>,
    },
    /// Show one lead
    Get { id: String },
    /// Pipeline counters
    Stats,
    /// Known cities and categories
    Meta,
    /// Move a lead through the pipeline
    SetStatus { id: String, status: LeadStatus },
    /// Delete a lead
    Delete { id: String },
}

#[derive(Subcommand)]
enum UserCommands {
    /// List users
    List,
    /// Assign a user to a province
    AssignProvince { user_id: String, province_id: String },
}

#[derive(Subcommand)]
enum ProvinceCommands {
    /// List provinces
    List,
    /// Load the built-in province list
    Seed,
}

#[derive(Subcommand)]
enum ProposalCommands {
    /// List proposals, optionally for one lead
    List {
        #[arg(long)]
        lead: Option<String>,
    },
    /// Generate a proposal for a lead
    Generate {
        #[arg(long)]
        lead: String,
        #[arg(long)]
        template: Option<String>,
    },
    /// List proposal templates
    Templates,
}

#[derive(Subcommand)]
enum AnalyticsCommands {
    /// Leads per city
    Cities,
    /// Leads per category
    Categories,
    /// Leads per status
    Status,
    /// Conversion funnel
    Funnel,
    /// Per-category breakdown with top cities
    Detailed,
    /// Daily totals and deals
    Trends {
        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,
        /// End date (YYYY-MM-DD)
        #[arg(long)]
        to: Option<String>,
        #[arg(long)]
        category: Option<String>,
    },
    /// Conversion speed per business type
    Insights,
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    let client = build_client(&config)?;
    let mut login_events = client.subscribe();

    let result = dispatch(cli.command, &config, &client).await;
    if login_required(&mut login_events) {
        eprintln!("Session expired or missing. Run `crm login --username <name>` to sign in.");
    }
    result
}

fn build_client(config: &Config) -> Result<ApiClient> {
    let session_path = config.storage.resolved_path()?;
    debug!("session file: {}", session_path.display());
    let store = Arc::new(FileStore::new(session_path));
    ApiClient::from_config(&config.api, store).context("Failed to create API client")
}

async fn dispatch(command: Commands, config: &Config, client: &ApiClient) -> Result<()> {
    let auth = AuthManager::new(client.clone());
    match command {
        Commands::Login { username, password } => {
            let password = password
                .filter(|p| !p.is_empty())
                .context("password required: pass --password or set CRM_PASSWORD")?;
            let user = auth.login(&username, &password).await?;
            print_json(&user)?;
        }
        Commands::Logout => {
            auth.logout().await;
            println!("Logged out");
        }
        Commands::Whoami => match auth.restore().await? {
            Some(user) => print_json(&user)?,
            None => println!("Not logged in"),
        },
        Commands::Status => subcommands::status(config, &auth)?,
        Commands::Leads { cmd } => subcommands::leads(client, cmd).await?,
        Commands::Users { cmd } => subcommands::users(client, cmd).await?,
        Commands::Provinces { cmd } => subcommands::provinces(client, cmd).await?,
        Commands::Proposals { cmd } => subcommands::proposals(client, cmd).await?,
        Commands::Analytics { cmd } => subcommands::analytics(client, cmd).await?,
    }
    Ok(())
}

/// Drain pending auth events; true if any asked for a new login.
fn login_required(rx: &mut broadcast::Receiver<AuthEvent>) -> bool {
    let mut required = false;
    loop {
        match rx.try_recv() {
            Ok(AuthEvent::LoginRequired) => required = true,
            Err(broadcast::error::TryRecvError::Lagged(_)) => required = true,
            Err(_) => return required,
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", to_pretty_json(value)?);
    Ok(())
}

fn to_pretty_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).context("Failed to format output as JSON")
}
