//! Coordinator binary

use clap::{Parser, Subcommand};
use replkv::common::{logging::init_logging, parse_duration_ms, Config, CoordinatorConfig, NodeRole};
use replkv::coordinator::CoordinatorServer;
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "replkv-coord")]
#[command(about = "replkv two-phase commit coordinator")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start coordinator server
    Serve {
        /// Node ID (defaults to the config file's node_id)
        #[arg(long)]
        id: Option<String>,

        /// Bind address for the coordinator API
        #[arg(long)]
        bind: Option<SocketAddr>,

        /// Participants to connect to at startup (comma-separated host:port)
        #[arg(long, value_delimiter = ',')]
        participants: Vec<String>,

        /// Service name the participants are bound under
        #[arg(long)]
        service_name: Option<String>,

        /// Deadline for a single prepare call (e.g. "500ms", "2s")
        #[arg(long)]
        prepare_timeout: Option<String>,

        /// Append logs to this file as well as stdout
        #[arg(long)]
        log_file: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            id,
            bind,
            participants,
            service_name,
            prepare_timeout,
            log_file,
        } => {
            // File config first, CLI arguments win
            let (config, load_error) = Config::load();
            let log_file = log_file.or(config.log_file.clone());
            init_logging(&config.log_level, log_file.as_deref());
            if let Some(e) = load_error {
                tracing::warn!("Ignoring config, using defaults: {}", e);
            }
            config.check_role(NodeRole::Coordinator);
            let id = id.unwrap_or_else(|| config.node_id.clone());

            let mut coord_config: CoordinatorConfig = config.coordinator.unwrap_or_default();
            if let Some(bind) = bind {
                coord_config.bind_addr = bind;
            }
            if !participants.is_empty() {
                coord_config.participants = participants;
            }
            if let Some(service_name) = service_name {
                coord_config.service_name = service_name;
            }
            if let Some(timeout) = prepare_timeout {
                coord_config.prepare_timeout_ms = Some(parse_duration_ms(&timeout)?);
            }

            CoordinatorServer::new(coord_config, id).serve().await?;
        }
    }

    Ok(())
}
