//! ace - run one layer of the Autonomous Cognitive Entity
//!
//! Usage:
//!   ace --layer aspirational --config ace.toml
//!   ace --establish-queues
//!   ace --request aspirational --payload '{...}'
//!
//! The layer follows `current_active` in the agent config file and restarts
//! its actor whenever the active agent changes.

use ace_bus::{BusClient, CancellationToken};
use ace_core::{LayerType, Queue};
use ace_layer::{BusLauncher, ConfigSupervisor, ConfigWatcher, ModelProviderClient, RuntimeConfig};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "ace", about = "Layer actor for the ACE cognitive stack")]
struct Cli {
    /// Layer to run: aspirational, global_strategy, agent_model,
    /// executive_function, cognitive_control or task_prosecution
    #[arg(long)]
    layer: Option<LayerType>,

    /// Path to runtime config file (TOML)
    #[arg(long, default_value = "ace.toml")]
    config: PathBuf,

    /// Override the active agent config path from the runtime config
    #[arg(long)]
    agents: Option<PathBuf>,

    /// Delete and recreate every layer queue, then exit. Destroys pending messages.
    #[arg(long)]
    establish_queues: bool,

    /// Send one request to a queue, print the reply, then exit.
    #[arg(long, value_name = "QUEUE")]
    request: Option<Queue>,

    /// Payload for --request.
    #[arg(long, default_value = "", requires = "request")]
    payload: String,

    /// Dump default config as TOML and exit.
    #[arg(long)]
    dump_config: bool,

    /// Log as JSON lines
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    if cli.dump_config {
        println!("{}", RuntimeConfig::default().to_toml());
        return Ok(());
    }

    let config = RuntimeConfig::load(&cli.config);

    if cli.establish_queues {
        let client = BusClient::connect(&config.bus.address, &config.bus.backoff()).await?;
        let queues: Vec<Queue> = LayerType::ALL.iter().map(LayerType::queue).collect();
        client.establish_queues(&queues).await?;
        client.close().await;
        return Ok(());
    }

    if let Some(queue) = cli.request {
        let client = BusClient::connect(&config.bus.address, &config.bus.backoff()).await?;
        let reply = client
            .request(queue, cli.payload.into_bytes(), config.bus.request_timeout())
            .await;
        client.close().await;
        match reply {
            Some(reply) => println!("{}", String::from_utf8_lossy(&reply)),
            None => anyhow::bail!("no reply from {}", queue),
        }
        return Ok(());
    }

    let layer = cli
        .layer
        .ok_or_else(|| anyhow::anyhow!("--layer is required unless --establish-queues, --request or --dump-config is given"))?;
    let agents_path = cli
        .agents
        .unwrap_or_else(|| config.layer.agent_config.clone());

    info!("Starting {} layer (agents: {})", layer, agents_path.display());

    let generator = Arc::new(ModelProviderClient::new(&config.model_provider.url));
    let launcher = Arc::new(BusLauncher::new(config, layer, generator));
    let mut supervisor = ConfigSupervisor::new(&agents_path, launcher);
    supervisor.start().await?;

    let (_watcher, events) = ConfigWatcher::spawn(&agents_path)?;

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("Interrupted, shutting down");
                    shutdown.cancel();
                }
                Err(e) => warn!("Failed to listen for ctrl-c: {}", e),
            }
        }
    });

    // A running actor dying surfaces here and exits non-zero.
    supervisor.run(events, shutdown).await?;
    Ok(())
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "ace=info,ace_layer=info,ace_bus=info".into());
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}
