// SPDX-FileCopyrightText: © 2024 Christopher Woods <Christopher.Woods@bristol.ac.uk>
// SPDX-License-Identifier: MIT

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use qmesh_adapter::AdapterConfig;
use qmesh_overlay::OverlayConfig;
use qmesh_worker::{Worker, WorkerConfig};
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::signal;

#[derive(Parser)]
#[command(name = "qmesh-worker", about = "A qmesh inference worker", long_about = None)]
struct Args {
    #[arg(long, short = 'c', help = "Path to the worker's configuration file")]
    config_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialise the worker: write its config and persist a fresh identity.
    Init {
        #[arg(long, help = "Path to the inference engine's executable")]
        engine_command: PathBuf,

        #[arg(long, help = "Path to the model file the engine should load")]
        model_path: PathBuf,

        #[arg(long, default_value_t = 8420, help = "Loopback port the engine listens on")]
        engine_port: u16,

        #[arg(long, help = "Address this worker listens on for the inference overlay")]
        inference_listen: Option<SocketAddr>,

        #[arg(long, help = "Address this worker listens on for the score overlay")]
        score_listen: Option<SocketAddr>,

        #[arg(long, default_value_t = 10, help = "Base admission queue capacity")]
        queue_capacity: usize,

        #[arg(long, help = "Overwrite an existing config file")]
        force: bool,
    },

    /// Add, remove, or list bootstrap peers for discovery.
    Peer {
        #[arg(long, help = "Bootstrap address to add")]
        add: Option<SocketAddr>,

        #[arg(long, help = "Bootstrap address to remove")]
        remove: Option<SocketAddr>,

        #[arg(long, help = "List configured bootstrap peers")]
        list: bool,

        #[arg(long, help = "Operate on the score overlay instead of the inference overlay")]
        score: bool,
    },

    /// Run the worker: join both overlays and start serving requests.
    Run {},
}

fn default_config_file() -> PathBuf {
    qmesh_overlay::default_config_dir("worker").join("worker.toml")
}

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();
    let config_file = args.config_file.unwrap_or_else(default_config_file);

    match args.command {
        Some(Commands::Init {
            engine_command,
            model_path,
            engine_port,
            inference_listen,
            score_listen,
            queue_capacity,
            force,
        }) => {
            if config_file.try_exists()? && !force {
                anyhow::bail!(
                    "config file already exists at {}; pass --force to overwrite",
                    config_file.display()
                );
            }

            let identity_dir = config_file.parent().unwrap_or(&config_file).to_path_buf();

            let config = WorkerConfig {
                identity_path: identity_dir.join("identity.toml"),
                store_path: Some(identity_dir.join("scores.jsonl")),
                inference_overlay: OverlayConfig::new(inference_listen, vec![]),
                score_overlay: OverlayConfig::new(score_listen, vec![]),
                adapter: AdapterConfig {
                    engine_command,
                    model_path,
                    port: engine_port,
                    extra_args: vec![],
                    startup_timeout_secs: 60,
                    health_poll_interval_ms: 250,
                    max_restarts: 3,
                    request_timeout_secs: 120,
                    stop_grace_period_secs: 10,
                },
                base_queue_capacity: queue_capacity,
                score_broadcast_secs: 30,
            };

            config.save(&config_file).context("failed to write worker config")?;
            tracing::info!("worker initialised, config written to {}", config_file.display());
            Ok(())
        }

        Some(Commands::Peer { add, remove, list, score }) => {
            let mut config = WorkerConfig::load(&config_file).context("failed to load worker config")?;
            let overlay = if score {
                &mut config.score_overlay
            } else {
                &mut config.inference_overlay
            };

            if list {
                for peer in &overlay.bootstrap {
                    println!("{}", peer);
                }
                return Ok(());
            }

            if let Some(addr) = add {
                overlay.add_peer(addr);
                config.save(&config_file)?;
                tracing::info!(%addr, "bootstrap peer added");
            }

            if let Some(addr) = remove {
                overlay.remove_peer(&addr);
                config.save(&config_file)?;
                tracing::info!(%addr, "bootstrap peer removed");
            }

            Ok(())
        }

        Some(Commands::Run {}) | None => {
            let config = WorkerConfig::load(&config_file)
                .with_context(|| format!("no config at {}; run `qmesh-worker init` first", config_file.display()))?;

            let worker = Worker::start(config).await.context("failed to start worker")?;
            tracing::info!(worker_id = %worker.identity(), "worker running, press Ctrl+C to stop");

            signal::ctrl_c().await.context("failed to listen for ctrl-c")?;
            tracing::info!("shutting down");
            worker.shutdown().await;

            Ok(())
        }
    }
}
