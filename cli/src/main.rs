//! ThreatStream CLI
//!
//! Command-line host for the Anomali ThreatStream integration. It plays the
//! part of the dashboard: it supplies per-user options, submits entities for
//! lookup and forwards analyst actions.
//!
//! # Usage
//!
//! ```bash
//! tsctl config set api_url https://api.threatstream.com
//! tsctl lookup 8.8.8.8 evil.example 44d88612fea8a8f36de82e1278abb02f
//! tsctl lookup evil.example --details --format json
//! tsctl tags search apt --exclude ransomware
//! tsctl tags add 123456 phishing --tlp red
//! tsctl observable update 123456 --status inactive --confidence 80
//! tsctl message '{"action":"SEARCH_TAGS","term":"*"}'
//! ```

use clap::{ArgAction, Args, Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};
use threatstream_intel::{Integration, IntegrationConfig, IntegrationError, LogLevel, Severity};
use tracing::warn;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;
mod config;
mod output;

#[derive(Parser)]
#[command(name = "tsctl")]
#[command(author = "ThreatStream Integration Team")]
#[command(version)]
#[command(about = "Anomali ThreatStream lookups from the command line", long_about = None)]
struct Cli {
    #[command(flatten)]
    connection: ConnectionArgs,

    #[command(flatten)]
    filters: FilterArgs,

    /// Output format
    #[arg(long, short, global = true)]
    format: Option<output::OutputFormat>,

    /// Profile name from config file
    #[arg(long, short, global = true)]
    profile: Option<String>,

    /// Integration configuration file
    #[arg(
        long,
        env = "THREATSTREAM_INTEGRATION_CONFIG",
        default_value = "config/integration.toml",
        global = true
    )]
    integration_config: PathBuf,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(long, short, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ConnectionArgs {
    /// ThreatStream API URL
    #[arg(long, env = "THREATSTREAM_API_URL", global = true)]
    pub api_url: Option<String>,

    /// ThreatStream username
    #[arg(long, env = "THREATSTREAM_USERNAME", global = true)]
    pub username: Option<String>,

    /// ThreatStream API key
    #[arg(long, env = "THREATSTREAM_API_KEY", hide_env_values = true, global = true)]
    pub api_key: Option<String>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// Minimum severity (low, medium, high, very-high)
    #[arg(long, global = true)]
    pub min_severity: Option<Severity>,

    /// Minimum confidence (0-100)
    #[arg(long, global = true, value_parser = clap::value_parser!(u8).range(0..=100))]
    pub min_confidence: Option<u8>,

    /// Include inactive indicators
    #[arg(long, global = true)]
    pub include_inactive: bool,

    /// Look up private and reserved addresses too
    #[arg(long, global = true)]
    pub include_private: bool,

    /// Only search indicators owned by my organization
    #[arg(long, global = true)]
    pub my_org: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Look up indicators
    Lookup {
        /// IPs, domains, URLs, hashes or email addresses
        #[arg(required = true)]
        values: Vec<String>,
        /// Also fetch analyst comments for every result
        #[arg(long)]
        details: bool,
    },
    /// Search and manage tags
    Tags {
        #[command(subcommand)]
        action: TagCommands,
    },
    /// View and update observables
    Observable {
        #[command(subcommand)]
        action: ObservableCommands,
    },
    /// View and add comments
    Comments {
        #[command(subcommand)]
        action: CommentCommands,
    },
    /// Send a raw action message as the host would
    Message {
        /// JSON message with an `action` field
        payload: String,
    },
    /// Validate connection and filter options
    Validate {
        /// Host-shaped options JSON file, defaults to the effective options
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Configure CLI
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum TagCommands {
    /// Tag suggestions for a term, `*` for preferred tags only
    Search {
        term: String,
        /// Tags to leave out, comma separated
        #[arg(long, value_delimiter = ',')]
        exclude: Vec<String>,
    },
    /// Tag an observable
    Add {
        observable_id: String,
        tag: String,
        /// Tag visibility, white or red
        #[arg(long, default_value = "white")]
        tlp: String,
    },
    /// Remove a tag from an observable
    Delete { observable_id: String, tag_id: String },
    /// Reload and list the preferred tags
    Preferred,
}

#[derive(Subcommand)]
pub enum ObservableCommands {
    /// Get observable details
    Get { observable_id: String },
    /// Update status, confidence or TLP
    Update {
        observable_id: String,
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        confidence: Option<String>,
        #[arg(long)]
        tlp: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum CommentCommands {
    /// List comments on a value
    List { value: String },
    /// Comment on a value
    Add {
        value: String,
        comment: String,
        #[arg(long, default_value = "white")]
        tlp: String,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Set configuration value
    Set { key: String, value: String },
    /// Get configuration value
    Get { key: String },
    /// List all configuration
    List,
    /// Initialize configuration
    Init {
        /// Overwrite an existing profile
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("{} {}", "Error:".red().bold(), e);
        if let Some(err) = e.downcast_ref::<IntegrationError>() {
            if let Ok(payload) = serde_json::to_string_pretty(&err.to_payload()) {
                eprintln!("{}", payload.dimmed());
            }
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let profile_name = cli.profile.as_deref();

    let command = match cli.command {
        Commands::Config { action } => return commands::config::handle(action, profile_name),
        command => command,
    };

    let profile = config::Config::load(profile_name).unwrap_or_default();

    let (integration_config, found) = load_integration_config(&cli.integration_config)?;
    init_tracing(integration_config.logging.level, cli.verbose);
    if !found {
        warn!(
            path = %cli.integration_config.display(),
            "Integration config not found, using defaults"
        );
    }

    let format = cli
        .format
        .or_else(|| profile.default_format.as_deref().and_then(output::OutputFormat::from_name))
        .unwrap_or(output::OutputFormat::Table);

    let command = match command {
        Commands::Validate { file } => {
            return commands::validate::handle(file, &cli.connection, &cli.filters, &profile, format)
        }
        command => command,
    };

    let ctx = commands::Context {
        options: commands::build_options(&cli.connection, &cli.filters, &profile)?,
        integration: Integration::new(integration_config)?,
        format,
    };

    match command {
        Commands::Lookup { values, details } => commands::lookup::handle(values, details, &ctx).await,
        Commands::Tags { action } => commands::tags::handle(action, &ctx).await,
        Commands::Observable { action } => commands::observable::handle(action, &ctx).await,
        Commands::Comments { action } => commands::comments::handle(action, &ctx).await,
        Commands::Message { payload } => commands::message::handle(&payload, &ctx).await,
        Commands::Validate { .. } | Commands::Config { .. } => Ok(()),
    }
}

/// Integration config plus whether the file existed; logging is not up yet
fn load_integration_config(path: &Path) -> anyhow::Result<(IntegrationConfig, bool)> {
    let found = path.exists();
    Ok((IntegrationConfig::load(path)?, found))
}

fn init_tracing(level: LogLevel, verbose: u8) {
    let level = match verbose {
        0 => level.as_str(),
        1 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| level.into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
