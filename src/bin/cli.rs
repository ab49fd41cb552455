//! Client CLI: reads and writes through any participant

use clap::{Parser, Subcommand};
use replkv::common::config::DEFAULT_SERVICE_NAME;
use replkv::common::utils::retry_with_backoff;
use replkv::common::{parse_duration, split_addrs, Error};
use replkv::transport::{HttpCoordinatorClient, HttpParticipantClient, ParticipantRpc};
use std::time::Duration;

/// First pause between attempts when `--retries` is set; doubles after each
const RETRY_BACKOFF: Duration = Duration::from_millis(200);

#[derive(Parser)]
#[command(name = "replkv")]
#[command(about = "replkv replicated key-value store CLI")]
#[command(version)]
struct Cli {
    /// Participant URL to send reads and writes to
    #[arg(long, default_value = "http://localhost:5001")]
    participant: String,

    /// Coordinator URL, for membership commands
    #[arg(long, default_value = "http://localhost:5000")]
    coordinator: String,

    /// Client name shown in the participant's log
    #[arg(long, default_value = "cli")]
    client: String,

    /// Request timeout (e.g. "5s")
    #[arg(long)]
    timeout: Option<String>,

    /// Extra attempts when a participant or coordinator cannot be reached
    #[arg(long, default_value_t = 0)]
    retries: u32,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Read a key from the participant's local copy
    Get {
        /// Key
        key: String,
    },

    /// Store a value on every replica
    Put {
        /// Key
        key: String,

        /// Value
        value: String,
    },

    /// Remove a key from every replica
    Delete {
        /// Key
        key: String,
    },

    /// Add participants to the coordinator's replica set
    Connect {
        /// Participants (comma-separated host:port)
        #[arg(value_delimiter = ',', required = true)]
        participants: Vec<String>,

        /// Service name the participants are bound under
        #[arg(long, default_value = DEFAULT_SERVICE_NAME)]
        service_name: String,
    },

    /// Show the coordinator's replica set
    Health,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let timeout = cli.timeout.as_deref().map(parse_duration).transpose()?;
    let retries = cli.retries;
    let client = cli.client.as_str();

    match cli.command {
        Commands::Get { key } => {
            let participant = HttpParticipantClient::new(&cli.participant, timeout)?;
            let (participant, key) = (&participant, key.as_str());
            let outcome = retry_with_backoff(
                || async move { participant.get(key, client).await.map_err(Error::from) },
                retries,
                RETRY_BACKOFF,
            );
            match outcome.await {
                Ok(outcome) => println!("{}", outcome),
                Err(e) => println!("FAIL: {}", e),
            }
        }
        Commands::Put { key, value } => {
            let participant = HttpParticipantClient::new(&cli.participant, timeout)?;
            let (participant, key, value) = (&participant, key.as_str(), value.as_str());
            let outcome = retry_with_backoff(
                || async move { participant.put(key, value, client).await.map_err(Error::from) },
                retries,
                RETRY_BACKOFF,
            );
            match outcome.await {
                Ok(outcome) => println!("{}", outcome),
                Err(e) => println!("FAIL: {}", e),
            }
        }
        Commands::Delete { key } => {
            let participant = HttpParticipantClient::new(&cli.participant, timeout)?;
            let (participant, key) = (&participant, key.as_str());
            let outcome = retry_with_backoff(
                || async move { participant.delete(key, client).await.map_err(Error::from) },
                retries,
                RETRY_BACKOFF,
            );
            match outcome.await {
                Ok(outcome) => println!("{}", outcome),
                Err(e) => println!("FAIL: {}", e),
            }
        }
        Commands::Connect {
            participants,
            service_name,
        } => {
            let (hosts, ports) = split_addrs(&participants)?;
            let coordinator = HttpCoordinatorClient::new(&cli.coordinator, timeout)?;
            let (coordinator, service_name) = (&coordinator, service_name.as_str());
            let response = retry_with_backoff(
                || {
                    let (hosts, ports) = (hosts.clone(), ports.clone());
                    async move {
                        coordinator
                            .connect(hosts, ports, service_name)
                            .await
                            .map_err(Error::from)
                    }
                },
                retries,
                RETRY_BACKOFF,
            )
            .await?;
            println!(
                "✓ Connected {} participant(s); replica set: {}",
                response.connected,
                response.replicas.join(", ")
            );
        }
        Commands::Health => {
            let coordinator = HttpCoordinatorClient::new(&cli.coordinator, timeout)?;
            let coordinator = &coordinator;
            let health = retry_with_backoff(
                || async move { coordinator.health().await.map_err(Error::from) },
                retries,
                RETRY_BACKOFF,
            )
            .await?;
            println!("Status: {} (v{})", health.status, health.version);
            for replica in health.replicas {
                println!("  {}", replica);
            }
        }
    }

    Ok(())
}
