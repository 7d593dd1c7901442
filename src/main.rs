use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use abcxyz::cli;

#[derive(Debug, Parser)]
#[command(name = "abcxyz")]
#[command(about = "Client and dashboard for ABC/XYZ inventory analysis")]
struct App {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Upload an Excel workbook for analysis and show the results
    Upload {
        /// Path to the .xls / .xlsx file
        file: PathBuf,
    },
    /// Delete every item listed in an Excel workbook from the analysis
    Delete {
        /// Path to the .xls / .xlsx file listing items to delete
        file: PathBuf,
    },
    /// Show the current analysis table, summary and charts
    Results {
        /// Output format: table (default), json, csv
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Show server statistics and category distribution
    Stats {
        /// Output format: table (default), json, csv
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Check backend reachability, stored data and configuration
    Check,
    /// Show the ABC-XYZ matrix
    Matrix {
        /// Visualization session to show
        #[arg(long)]
        session: Option<String>,
        /// Output format: table (default), json, csv
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Show results and reload them when the server reports new data
    Watch {
        /// Polling interval in milliseconds (default from config)
        #[arg(long)]
        interval: Option<u64>,
    },
    /// Chat with the analysis assistant
    Chat {
        /// Start with an empty history
        #[arg(long)]
        fresh: bool,
    },
    /// Start the local dashboard
    Serve {
        /// Address to bind (default from config)
        #[arg(long)]
        addr: Option<String>,
    },
    /// Show recent activity
    Log {
        /// Number of entries to show
        #[arg(long, default_value = "20")]
        limit: usize,
        /// Output format: table (default), json, csv
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Debug, Subcommand)]
enum ConfigAction {
    /// Show the effective configuration
    Show,
    /// Write a default config file to ~/.abcxyz/config.toml
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Set a value, e.g. `abcxyz config set api.timeout_ms 5000`
    Set { key: String, value: String },
    /// Reset the global config to defaults
    Reset,
}

fn main() -> Result<()> {
    let app = App::parse();

    match app.command {
        Commands::Upload { file } => cli::run_upload(&file),
        Commands::Delete { file } => cli::run_delete(&file),
        Commands::Results { format } => {
            let fmt = cli::OutputFormat::from_str_opt(Some(&format));
            cli::run_results(fmt)
        }
        Commands::Stats { format } => {
            let fmt = cli::OutputFormat::from_str_opt(Some(&format));
            cli::run_stats(fmt)
        }
        Commands::Check => cli::run_check(),
        Commands::Matrix { session, format } => {
            let fmt = cli::OutputFormat::from_str_opt(Some(&format));
            cli::run_matrix(session.as_deref(), fmt)
        }
        Commands::Watch { interval } => cli::run_watch(interval),
        Commands::Chat { fresh } => cli::run_chat(fresh),
        Commands::Serve { addr } => cli::run_serve(addr.as_deref()),
        Commands::Log { limit, format } => {
            let fmt = cli::OutputFormat::from_str_opt(Some(&format));
            cli::run_log(limit, fmt)
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => cli::run_config_show(),
            ConfigAction::Init { force } => cli::run_config_init(force),
            ConfigAction::Set { key, value } => cli::run_config_set(&key, &value),
            ConfigAction::Reset => cli::run_config_reset(),
        },
    }
}
