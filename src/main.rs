//! BizFlow command-line client
//!
//! Talks to the BizFlow API through the resilient gateway: credentials are
//! persisted between invocations, cold starts are waited out and expired
//! access credentials are renewed transparently.
//!
//! # Architecture Overview
//!
//! ```text
//!   bizflow <command>
//!        │
//!        ▼
//!   ┌──────────┐    ┌──────────────┐    ┌──────────────────────────────┐
//!   │  config  │───▶│ AuthSession  │───▶│           Gateway            │───▶ BizFlow API
//!   │ TOML+env │    │  api::*Api   │    │ bearer · retry · refresh     │
//!   └──────────┘    └──────────────┘    └──────┬───────────────┬───────┘
//!                                              │               │
//!                                     FileStore (tokens)   EventBus ──▶ stderr
//! ```

use clap::{Args, Parser, Subcommand};
use serde_json::{json, Map, Value};
use std::path::PathBuf;
use std::sync::Arc;

use bizflow_gateway::api::{ClientsApi, ReportsApi, SalesApi};
use bizflow_gateway::config::{config_from_env, load_config, GatewayConfig};
use bizflow_gateway::events::{EventBus, GatewayEvent};
use bizflow_gateway::observability::init_logging;
use bizflow_gateway::{AuthSession, Gateway, GatewayError};

/// Credential file used when the config names none.
const DEFAULT_CREDENTIALS_PATH: &str = ".bizflow/credentials.json";

#[derive(Parser)]
#[command(name = "bizflow")]
#[command(about = "Command-line client for the BizFlow API", long_about = None)]
struct Cli {
    /// TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// API base URL (overrides config and BIZFLOW_API_URL)
    #[arg(long)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and store the session
    Login { email: String, password: String },
    /// Create an account and store the session
    Register {
        name: String,
        email: String,
        password: String,
    },
    /// Sign out and forget the stored session
    Logout,
    /// Show the signed-in user
    Me,
    /// Manage clients
    #[command(subcommand)]
    Clients(ResourceCommand),
    /// Manage sales
    #[command(subcommand)]
    Sales(ResourceCommand),
    /// Sales reports
    #[command(subcommand)]
    Reports(ReportCommand),
}

#[derive(Subcommand)]
enum ResourceCommand {
    /// List records
    List(ListArgs),
    /// Show one record
    Get { id: String },
    /// Create a record from a JSON document
    Create { json: String },
    /// Update a record from a JSON document
    Update { id: String, json: String },
    /// Delete a record
    Delete { id: String },
}

#[derive(Args)]
struct ListArgs {
    #[arg(long)]
    search: Option<String>,
    #[arg(long)]
    page: Option<u32>,
    #[arg(long)]
    limit: Option<u32>,
}

#[derive(Args)]
struct PeriodArgs {
    /// Start date (YYYY-MM-DD)
    #[arg(long)]
    start: Option<String>,
    /// End date (YYYY-MM-DD)
    #[arg(long)]
    end: Option<String>,
}

#[derive(Subcommand)]
enum ReportCommand {
    /// Totals for a period
    Summary(PeriodArgs),
    /// Best clients by revenue
    TopClients {
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Monthly trends
    Trends,
    /// Revenue by industry
    ByIndustry,
    /// Download an export file
    Export {
        #[command(flatten)]
        period: PeriodArgs,
        #[arg(long, default_value = "csv")]
        format: String,
        /// Output file
        #[arg(short, long)]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => config_from_env()?,
    };
    if let Some(url) = &cli.api_url {
        config.api.base_url = url.clone();
    }
    if config.storage.credentials_path.is_none() {
        config.storage.credentials_path = Some(DEFAULT_CREDENTIALS_PATH.to_string());
    }

    init_logging(&config.observability)?;
    tracing::debug!(base_url = %config.api.base_url, "bizflow starting");

    let events = EventBus::new();
    let gateway = build_gateway(config, &events)?;
    let session = AuthSession::new(gateway.clone());
    let _expiry = session.listen_for_expiry(events.subscribe());
    let _notices = tokio::spawn(print_notices(events.subscribe()));

    if let Err(e) = run(cli.command, &gateway, &session).await {
        eprintln!("Error: {}", e.user_message(&e.to_string()));
        std::process::exit(1);
    }
    Ok(())
}

fn build_gateway(config: GatewayConfig, events: &EventBus) -> Result<Gateway, GatewayError> {
    Gateway::builder(config)
        .notifier(Arc::new(events.clone()))
        .build()
}

async fn run(command: Commands, gateway: &Gateway, session: &AuthSession) -> Result<(), GatewayError> {
    match command {
        Commands::Login { email, password } => {
            let payload = session.login(&email, &password).await?;
            let name = payload.user.map(|u| u.name).unwrap_or(email);
            println!("Signed in as {name}");
        }
        Commands::Register {
            name,
            email,
            password,
        } => {
            session.register(&name, &email, &password).await?;
            println!("Account created for {email}");
        }
        Commands::Logout => {
            session.logout().await;
            println!("Signed out");
        }
        Commands::Me => match session.restore().await {
            Some(user) => print_json(&serde_json::to_value(user)?)?,
            None => eprintln!("Not signed in"),
        },
        Commands::Clients(command) => {
            let api = ClientsApi::new(gateway.clone());
            let value = match command {
                ResourceCommand::List(args) => api.list(&args.params()).await?,
                ResourceCommand::Get { id } => api.get(&id).await?,
                ResourceCommand::Create { json } => api.create(&parse_document(&json)?).await?,
                ResourceCommand::Update { id, json } => api.update(&id, &parse_document(&json)?).await?,
                ResourceCommand::Delete { id } => api.delete(&id).await?,
            };
            print_json(&value)?;
        }
        Commands::Sales(command) => {
            let api = SalesApi::new(gateway.clone());
            let value = match command {
                ResourceCommand::List(args) => api.list(&args.params()).await?,
                ResourceCommand::Get { id } => api.get(&id).await?,
                ResourceCommand::Create { json } => api.create(&parse_document(&json)?).await?,
                ResourceCommand::Update { id, json } => api.update(&id, &parse_document(&json)?).await?,
                ResourceCommand::Delete { id } => api.delete(&id).await?,
            };
            print_json(&value)?;
        }
        Commands::Reports(command) => {
            let api = ReportsApi::new(gateway.clone());
            let value = match command {
                ReportCommand::Summary(period) => api.summary(&period.params()).await?,
                ReportCommand::TopClients { limit } => {
                    let mut params = Map::new();
                    if let Some(limit) = limit {
                        params.insert("limit".into(), json!(limit));
                    }
                    api.top_clients(&Value::Object(params)).await?
                }
                ReportCommand::Trends => api.trends().await?,
                ReportCommand::ByIndustry => api.by_industry().await?,
                ReportCommand::Export {
                    period,
                    format,
                    output,
                } => {
                    let mut params = period.params();
                    if let Value::Object(map) = &mut params {
                        map.insert("format".into(), json!(format));
                    }
                    let bytes = api.export(&params).await?;
                    std::fs::write(&output, &bytes)
                        .map_err(|e| GatewayError::InvalidRequest(format!("{}: {e}", output.display())))?;
                    println!("Wrote {} bytes to {}", bytes.len(), output.display());
                    return Ok(());
                }
            };
            print_json(&value)?;
        }
    }
    Ok(())
}

impl ListArgs {
    fn params(&self) -> Value {
        let mut params = Map::new();
        if let Some(search) = &self.search {
            params.insert("search".into(), json!(search));
        }
        if let Some(page) = self.page {
            params.insert("page".into(), json!(page));
        }
        if let Some(limit) = self.limit {
            params.insert("limit".into(), json!(limit));
        }
        Value::Object(params)
    }
}

impl PeriodArgs {
    fn params(&self) -> Value {
        let mut params = Map::new();
        if let Some(start) = &self.start {
            params.insert("startDate".into(), json!(start));
        }
        if let Some(end) = &self.end {
            params.insert("endDate".into(), json!(end));
        }
        Value::Object(params)
    }
}

fn parse_document(raw: &str) -> Result<Value, GatewayError> {
    serde_json::from_str(raw).map_err(|e| GatewayError::InvalidRequest(format!("invalid JSON document: {e}")))
}

fn print_json(value: &Value) -> Result<(), GatewayError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn print_notices(mut events: tokio::sync::broadcast::Receiver<GatewayEvent>) {
    while let Ok(event) = events.recv().await {
        eprintln!("[{}] {}", event.name(), event.detail());
    }
}
