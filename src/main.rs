use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pterodactyl_panel::api::{PanelApi, PanelClient};
use pterodactyl_panel::config::Config;
use pterodactyl_panel::coordinator::ServerCoordinator;
use pterodactyl_panel::error::PanelErrorTrait;
use pterodactyl_panel::models::PowerAction;
use pterodactyl_panel::setup::{collect_servers, validate_credentials, Integration};

#[derive(Parser)]
#[command(
    name = "pterodactyl-panel",
    version,
    about = "Poll a Pterodactyl panel and control its game servers",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json); overrides the configured format
    #[arg(long, global = true)]
    log_format: Option<String>,

    /// TOML config file; environment variables are used when omitted
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll every server and print changes until interrupted
    Watch,

    /// List the servers visible to the API key
    Servers,

    /// Fetch and print one server's snapshot
    Status {
        /// Server identifier
        server_id: String,
    },

    /// Send a power action to a server
    Power {
        /// Server identifier
        server_id: String,

        /// Action to send (start, stop, restart)
        action: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::from_env()?,
    };
    config.validate().context("Invalid configuration")?;

    let log_format = cli.log_format.as_deref().unwrap_or(&config.logging.format);
    setup_tracing(log_format, &config.logging.level, cli.verbose)?;

    tracing::info!(host = %config.panel.host, "Pterodactyl panel adapter starting");

    match cli.command {
        Commands::Watch => {
            tracing::info!(
                interval_secs = config.polling.scan_interval_secs,
                "Starting watch command"
            );
            watch(&config).await?;
        }

        Commands::Servers => {
            tracing::info!("Starting servers command");
            servers(&config).await?;
        }

        Commands::Status { server_id } => {
            tracing::info!(server_id = %server_id, "Starting status command");
            status(&config, server_id).await?;
        }

        Commands::Power { server_id, action } => {
            tracing::info!(server_id = %server_id, action = %action, "Starting power command");
            power(&config, server_id, action).await?;
        }
    }

    Ok(())
}

fn setup_tracing(format: &str, level: &str, verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("pterodactyl_panel=debug,info")
    } else {
        tracing_subscriber::EnvFilter::try_new(format!("pterodactyl_panel={level},warn"))
            .context("Invalid log level")?
    };

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }

    Ok(())
}

fn client(config: &Config) -> Result<Arc<dyn PanelApi>> {
    let client = PanelClient::new(config.client_config()).context("Failed to build panel client")?;
    Ok(Arc::new(client))
}

async fn watch(config: &Config) -> Result<()> {
    let mut integration =
        Integration::connect(config.entry(), config.coordinator_config()).await?;
    let mut reauth = integration
        .take_reauth_requests()
        .context("Re-authentication channel already taken")?;

    let entities = integration.entities();
    let mut subscriptions = Vec::with_capacity(integration.coordinators().len());

    for coordinator in integration.coordinators() {
        let server_id = coordinator.server_id().to_string();
        subscriptions.push(coordinator.subscribe(move |data| {
            let summary = data
                .snapshot
                .as_ref()
                .map(|s| {
                    s.iter()
                        .map(|(k, v)| format!("{k}={v}"))
                        .collect::<Vec<_>>()
                        .join(" ")
                })
                .unwrap_or_default();
            println!("[{server_id}] {} {summary}", data.state.as_str());
        }));
    }

    println!(
        "Watching {} servers ({} entities), press Ctrl-C to stop",
        integration.coordinators().len(),
        entities.len()
    );

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result.context("Failed to listen for Ctrl-C")?;
            tracing::info!("Interrupted, shutting down");
        }
        Some(request) = reauth.recv() => {
            tracing::error!(
                server_id = %request.server_id,
                reason = %request.reason,
                "Credentials rejected, update the API key and restart"
            );
        }
    }

    drop(subscriptions);
    integration.unload().await;
    Ok(())
}

async fn servers(config: &Config) -> Result<()> {
    let api = client(config)?;
    let account = validate_credentials(api.as_ref()).await?;
    let servers = collect_servers(api.as_ref()).await?;

    if let Some(username) = account.username {
        println!("Account: {username}");
    }
    println!("{} servers", servers.len());
    for server in servers {
        let node = server.node.as_deref().unwrap_or("-");
        println!("  {:<12} {:<32} node={node}", server.identifier, server.name);
    }
    Ok(())
}

async fn find_coordinator(config: &Config, server_id: &str) -> Result<ServerCoordinator> {
    let api = client(config)?;
    validate_credentials(api.as_ref()).await?;

    let server = collect_servers(api.as_ref())
        .await?
        .into_iter()
        .find(|s| s.identifier == server_id)
        .with_context(|| format!("No server with identifier {server_id}"))?;

    Ok(ServerCoordinator::new(server, api, config.coordinator_config()))
}

async fn status(config: &Config, server_id: String) -> Result<()> {
    let coordinator = find_coordinator(config, &server_id).await?;

    match coordinator.refresh().await {
        Ok(snapshot) => {
            println!("Server {} ({server_id})", coordinator.server().name);
            for (key, value) in snapshot.iter() {
                println!("  {key:<28} {value}");
            }
            Ok(())
        }
        Err(e) => {
            tracing::error!(category = e.category().as_str(), error = %e, "Refresh failed");
            Err(e.into())
        }
    }
}

async fn power(config: &Config, server_id: String, action: String) -> Result<()> {
    let action: PowerAction = action.parse()?;
    let coordinator = find_coordinator(config, &server_id).await?;

    coordinator.send_power_action(action).await?;
    println!("Sent {action} to {server_id}");
    Ok(())
}
