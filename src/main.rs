use clap::{Parser, Subcommand};
use color_eyre::eyre::{eyre, WrapErr};
use color_eyre::Result;
use env_logger::Env;
use log::info;
use std::path::PathBuf;
use std::sync::Arc;

use optisim::config::SimulatorConfig;
use optisim::config_loader::{self, CliOverrides};
use optisim::management::ManagementApi;
use optisim::netconf::{Dispatcher, NetconfServer};
use optisim::topology::Topology;

/// Optical network element simulator
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the simulator configuration YAML file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address for management sessions, e.g. 127.0.0.1:8830
    #[arg(short, long)]
    listen: Option<String>,

    /// Topology preset (point-to-point, long-haul, mesh, ring, complex)
    #[arg(short, long)]
    preset: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Commands {
    /// Build the topology and accept management sessions until interrupted
    Serve,
    /// Print the topology as JSON
    Snapshot,
    /// Print one network element and its ports as JSON
    Element {
        /// Network element identifier
        id: String,
    },
}

impl Cli {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            listen: self.listen.clone(),
            preset: self.preset.clone(),
            log_level: self.log_level.clone(),
        }
    }
}

/// Build the configured preset and switch it to the configured connect policy
fn build_topology(config: &SimulatorConfig) -> Result<Topology> {
    let topology = config
        .topology
        .preset
        .build()
        .wrap_err_with(|| format!("Failed to build the {} topology", config.topology.preset))?;
    topology.set_connect_policy(config.topology.connect_policy);
    Ok(topology)
}

async fn serve(config: &SimulatorConfig, topology: Arc<Topology>) -> Result<()> {
    let health = ManagementApi::new(Arc::clone(&topology)).health();
    info!(
        "Topology '{}' ready: {} elements, {} links",
        config.topology.preset, health.element_count, health.link_count
    );

    let dispatcher = Arc::new(Dispatcher::new(topology));
    let server = NetconfServer::bind(
        config.netconf.listen_addr()?,
        dispatcher,
        config.netconf.session_settings(),
    )
    .await
    .wrap_err_with(|| format!("Failed to listen on {}", config.netconf.listen))?;

    tokio::select! {
        result = server.run() => result.wrap_err("Management listener failed")?,
        _ = tokio::signal::ctrl_c() => info!("Interrupt received, shutting down"),
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize error handling
    color_eyre::install()?;

    let cli = Cli::parse();

    let mut config = config_loader::load_or_default(cli.config.as_deref())?;
    config_loader::apply_cli_overrides(&mut config, &cli.overrides())?;

    let filter = config.general.log_level.clone().unwrap_or_else(|| "info".to_string());
    env_logger::Builder::from_env(Env::default().default_filter_or(filter)).init();

    info!("Starting OptiSim v{}", env!("CARGO_PKG_VERSION"));
    if let Some(path) = &cli.config {
        info!("Configuration file: {:?}", path);
    }

    let topology = Arc::new(build_topology(&config)?);

    match &cli.command {
        Commands::Serve => serve(&config, topology).await?,
        Commands::Snapshot => {
            let view = ManagementApi::new(topology).topology();
            println!("{}", serde_json::to_string_pretty(&view)?);
        }
        Commands::Element { id } => {
            let detail = ManagementApi::new(topology)
                .element(id)
                .map_err(|e| eyre!("{}", e))?;
            println!("{}", serde_json::to_string_pretty(&detail)?);
        }
    }

    Ok(())
}
