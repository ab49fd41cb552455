//! Runs a coordinator and its participants in one process until Ctrl-C

use clap::Parser;
use replkv::common::utils::shutdown_signal;
use replkv::common::{logging::init_logging, parse_duration_ms, ClusterConfig, Config};
use replkv::LocalCluster;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "replkv-cluster")]
#[command(about = "Start a replkv coordinator and N participants locally")]
#[command(version)]
struct Cli {
    /// Host every server binds to
    #[arg(long)]
    host: Option<String>,

    /// Coordinator port; participant i listens on base-port + i
    #[arg(long)]
    base_port: Option<u16>,

    /// Number of participants
    #[arg(long)]
    participants: Option<usize>,

    /// Service name the participants are bound under
    #[arg(long)]
    service_name: Option<String>,

    /// Deadline for a single prepare call (e.g. "500ms")
    #[arg(long)]
    prepare_timeout: Option<String>,

    /// Append logs to this file as well as stdout
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let (config, load_error) = Config::load();
    let log_file = cli.log_file.or(config.log_file.clone());
    init_logging(&config.log_level, log_file.as_deref());
    if let Some(e) = load_error {
        tracing::warn!("Ignoring config, using defaults: {}", e);
    }

    let mut cluster_config: ClusterConfig = config.cluster.unwrap_or_default();
    if let Some(host) = cli.host {
        cluster_config.host = host;
    }
    if let Some(base_port) = cli.base_port {
        cluster_config.base_port = base_port;
    }
    if let Some(participants) = cli.participants {
        cluster_config.participants = participants;
    }
    if let Some(service_name) = cli.service_name {
        cluster_config.service_name = service_name;
    }
    if let Some(timeout) = cli.prepare_timeout {
        cluster_config.prepare_timeout_ms = Some(parse_duration_ms(&timeout)?);
    }

    let cluster = LocalCluster::start(&cluster_config).await?;
    println!("Coordinator: http://{}", cluster.coordinator_addr);
    for (i, addr) in cluster.participant_addrs().iter().enumerate() {
        println!("Participant {}: http://{}", i + 1, addr);
    }

    shutdown_signal().await;
    cluster.shutdown().await?;
    Ok(())
}
