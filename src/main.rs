use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use piholedns::config::{RecordConfig, Settings};
use piholedns::dns::{create_provider, DnsProvider};
use piholedns::pihole::PiholeClient;
use piholedns::zone::Zone;
use piholedns::{secrets, sync};

#[derive(Parser)]
#[command(name = "piholedns")]
#[command(about = "DNS-as-code for Pi-hole local A/AAAA/CNAME records")]
#[command(version)]
struct Cli {
    /// Path to the configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile Pi-hole local DNS with the configured zones
    Sync {
        /// Show the changes without applying them
        #[arg(long)]
        dry_run: bool,
    },

    /// Print the records Pi-hole currently serves for a zone
    Dump {
        /// Zone name, e.g. home.lan.
        zone: String,
    },

    /// Store the API password for a Pi-hole
    SetPassword {
        /// Pi-hole id from the configuration (e.g., pihole)
        id: String,
    },

    /// Delete the stored API password for a Pi-hole
    DeletePassword {
        /// Pi-hole id from the configuration (e.g., pihole)
        id: String,
    },

    /// Show configuration file location and contents
    Config,
}

#[derive(Serialize)]
struct DumpedZone {
    records: Vec<RecordConfig>,
}

fn init_logging(log_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(Settings::config_path);
    let settings = Settings::load_from(&config_path);

    let log_level = settings
        .as_ref()
        .map(|s| s.general.log_level.as_str())
        .ok()
        .unwrap_or("info");
    init_logging(log_level);

    match cli.command {
        Commands::Sync { dry_run } => {
            let settings = require_settings(settings)?;
            let password = resolve_password(&settings)?;
            let provider = create_provider(&settings.pihole, &password).await?;

            let result = sync::run(&settings, &*provider, dry_run).await;
            logout(provider.client()).await;
            let summary = result?;

            info!(
                "Sync finished: {} zones, {} changed, {} changes applied",
                summary.zones, summary.zones_changed, summary.changes
            );
        }

        Commands::Dump { zone } => {
            let settings = require_settings(settings)?;
            let password = resolve_password(&settings)?;
            let provider = create_provider(&settings.pihole, &password).await?;

            let mut current = Zone::new(zone)?;
            let result = provider
                .populate(&mut current, false, settings.general.lenient)
                .await;
            logout(provider.client()).await;
            result?;

            let dumped = DumpedZone {
                records: current.records().map(RecordConfig::from).collect(),
            };
            println!("{}", toml::to_string_pretty(&dumped)?);
        }

        Commands::SetPassword { id } => {
            let password = rpassword::prompt_password("Pi-hole password: ")?;
            secrets::store_password(&id, &password)?;
            println!("Password stored for Pi-hole: {}", id);
        }

        Commands::DeletePassword { id } => {
            secrets::delete_password(&id)?;
            println!("Password deleted for Pi-hole: {}", id);
        }

        Commands::Config => {
            show_config(settings.as_ref().ok(), &config_path)?;
        }
    }

    Ok(())
}

fn require_settings(settings: Result<Settings>) -> Result<Settings> {
    settings.context(
        "Configuration not loaded. Run 'piholedns config' to see the expected location.",
    )
}

fn resolve_password(settings: &Settings) -> Result<String> {
    match &settings.pihole.password {
        Some(password) => Ok(password.clone()),
        None => secrets::get_password(&settings.pihole.id)
            .with_context(|| format!("No password configured for Pi-hole {}", settings.pihole.id)),
    }
}

async fn logout(client: &PiholeClient) {
    if let Err(e) = client.logout().await {
        warn!("Failed to close Pi-hole session: {}", e);
    }
}

fn show_config(settings: Option<&Settings>, config_path: &Path) -> Result<()> {
    println!("Configuration file location: {}\n", config_path.display());

    match settings {
        Some(s) => {
            println!("Current configuration:\n");
            println!("{}", toml::to_string_pretty(s)?);
        }
        None => {
            println!("Configuration file not found.");
            println!("\nCreate a configuration file at the location above.");
            println!("Example configuration:\n");
            println!(
                r#"[general]
log_level = "info"

[pihole]
id = "pihole"
url = "http://pi.hole"

[[zones]]
name = "home.lan."

[[zones.records]]
name = "nas"
type = "A"
values = ["192.168.1.10"]

[[zones.records]]
name = "files"
type = "CNAME"
value = "nas.home.lan."
ttl = 300
"#
            );
        }
    }

    Ok(())
}
