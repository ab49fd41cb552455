//! Participant binary

use clap::{Parser, Subcommand};
use replkv::common::{logging::init_logging, parse_duration_ms, Config, NodeRole, ParticipantConfig};
use replkv::participant::ParticipantServer;
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "replkv-participant")]
#[command(about = "replkv replica")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start participant server
    Serve {
        /// Node ID (defaults to the config file's node_id)
        #[arg(long)]
        id: Option<String>,

        /// Bind address for the RPC and client API
        #[arg(long)]
        bind: Option<SocketAddr>,

        /// Coordinator URL
        #[arg(long)]
        coordinator: Option<String>,

        /// Service name to answer lookups for
        #[arg(long)]
        service_name: Option<String>,

        /// Deadline for calls to the coordinator (e.g. "5s")
        #[arg(long)]
        rpc_timeout: Option<String>,

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
            coordinator,
            service_name,
            rpc_timeout,
            log_file,
        } => {
            let (config, load_error) = Config::load();
            let log_file = log_file.or(config.log_file.clone());
            init_logging(&config.log_level, log_file.as_deref());
            if let Some(e) = load_error {
                tracing::warn!("Ignoring config, using defaults: {}", e);
            }
            config.check_role(NodeRole::Participant);
            let id = id.unwrap_or_else(|| config.node_id.clone());

            let mut participant_config: ParticipantConfig = config.participant.unwrap_or_default();
            if let Some(bind) = bind {
                participant_config.bind_addr = bind;
            }
            if let Some(coordinator) = coordinator {
                participant_config.coordinator_url = coordinator;
            }
            if let Some(service_name) = service_name {
                participant_config.service_name = service_name;
            }
            if let Some(timeout) = rpc_timeout {
                participant_config.rpc_timeout_ms = Some(parse_duration_ms(&timeout)?);
            }

            ParticipantServer::new(participant_config, id).serve().await?;
        }
    }

    Ok(())
}
