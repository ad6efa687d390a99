pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::config::AppConfig;

#[derive(Parser)]
#[command(name = "propman-api")]
#[command(about = "Property management API server and maintenance commands")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Run the HTTP server (default)")]
    Serve {
        #[arg(long, help = "Port to listen on, overrides PORT")]
        port: Option<u16>,
    },

    #[command(about = "Apply database migrations and exit")]
    Migrate,

    #[command(about = "Move leases to Expiring Soon or Expired according to their end dates")]
    RefreshLeases {
        #[arg(long, help = "Evaluate as of this date (YYYY-MM-DD) instead of today")]
        date: Option<chrono::NaiveDate>,
    },

    #[command(about = "Create the administrator account if it does not exist")]
    CreateAdmin {
        #[arg(long, help = "Administrator email, defaults to ADMIN_EMAIL")]
        email: Option<String>,
        #[arg(long, help = "Administrator password, defaults to ADMIN_PASSWORD")]
        password: Option<String>,
        #[arg(long, help = "Display name, defaults to ADMIN_NAME")]
        name: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli, config: AppConfig) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);

    match cli.command.unwrap_or(Commands::Serve { port: None }) {
        Commands::Serve { port } => commands::serve::handle(config, port).await,
        Commands::Migrate => commands::maintenance::migrate(config, output_format).await,
        Commands::RefreshLeases { date } => commands::maintenance::refresh_leases(config, date, output_format).await,
        Commands::CreateAdmin { email, password, name } => {
            commands::maintenance::create_admin(config, email, password, name, output_format).await
        }
    }
}
