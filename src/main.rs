use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod auth;
mod config;
mod csv_export;
mod device;
mod error;
mod export;
mod ingest;
mod storage;
mod store;
mod types;

use crate::auth::AdminAuth;
use crate::config::Config;
use crate::error::ExportError;
use crate::export::export_csv;
use crate::ingest::{submit_user_data, SubmissionForm};
use crate::storage::FileBlobStorage;
use crate::store::UserStore;

#[derive(Parser)]
#[command(name = "device-collector", version, about = "Collects device signals from registrations and exports them as CSV")]
struct Cli {
    /// Config file (default: ~/.device-collector/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write a default configuration file
    Init,

    /// Submit a registration
    Submit {
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        consent: Option<String>,
        #[arg(long)]
        screen_width: Option<String>,
        #[arg(long)]
        screen_height: Option<String>,
        /// Client-side device signals as a JSON object
        #[arg(long)]
        device_data: Option<String>,
        #[arg(long, default_value = "")]
        user_agent: String,
    },

    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },

    Logout,

    /// Show stored submissions
    List,

    /// Write all submissions as CSV
    Export {
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Delete every stored submission
    Clear,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("device_collector=debug,info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;

    let store = UserStore::new(
        FileBlobStorage::new(&config.storage.data_dir, &config.storage.users_key),
        config.users_max_age()?,
    );
    let auth = AdminAuth::new(
        &config.admin,
        FileBlobStorage::new(&config.storage.data_dir, &config.admin.session_key),
    )?;

    match cli.command {
        Command::Init => {
            let path = cli.config.unwrap_or_else(Config::config_path);
            if path.exists() {
                anyhow::bail!("Configuration already exists at {:?}", path);
            }
            config.save(&path)?;
        }

        Command::Submit {
            first_name,
            last_name,
            email,
            consent,
            screen_width,
            screen_height,
            device_data,
            user_agent,
        } => {
            let form = SubmissionForm {
                first_name,
                last_name,
                email,
                consent,
                screen_width,
                screen_height,
                device_data,
            };

            let (outcome, user) = submit_user_data(&store, &form, &user_agent);
            println!("{}", outcome.message);
            if let Some(user) = user {
                info!("Submission id: {}", user.id);
            }
            if !outcome.success {
                std::process::exit(1);
            }
        }

        Command::Login { email, password } => {
            auth.login(&email, &password)?;
            println!("Logged in");
        }

        Command::Logout => {
            auth.logout()?;
            println!("Logged out");
        }

        Command::List => {
            auth.require_session()?;

            let users = store.list_all();
            if users.is_empty() {
                println!("No data collected yet.");
            }
            for user in &users {
                let d = &user.device_data;
                println!(
                    "{} {} <{}> | {}x{} | {} {} | {} {} | cameras: {} | {}",
                    user.first_name,
                    user.last_name,
                    user.email,
                    d.screen_pixels_width,
                    d.screen_pixels_height,
                    d.platform_name,
                    d.platform_version,
                    d.browser_name,
                    d.browser_version,
                    d.cameras.len(),
                    user.timestamp.format("%Y-%m-%d %H:%M:%S"),
                );
            }
        }

        Command::Export { output } => {
            auth.require_session()?;

            match export_csv(&store, &config.export.file_name) {
                Ok(export) => {
                    let path = output.unwrap_or_else(|| PathBuf::from(&export.file_name));
                    fs::write(&path, export.body.as_bytes())
                        .with_context(|| format!("Failed to write {:?}", path))?;
                    info!("Content-Type: {}", export.content_type());
                    info!("Content-Disposition: {}", export.content_disposition());
                    println!("Exported to {:?}", path);
                }
                Err(ExportError::NoData) => {
                    warn!("Export requested with no stored submissions");
                    println!("No data available");
                }
            }
        }

        Command::Clear => {
            auth.require_session()?;
            store.clear()?;
            println!("All submissions cleared");
        }
    }

    Ok(())
}
