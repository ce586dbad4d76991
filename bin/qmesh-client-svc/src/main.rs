// SPDX-FileCopyrightText: © 2024 Christopher Woods <Christopher.Woods@bristol.ac.uk>
// SPDX-License-Identifier: MIT

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use qmesh_client::{ClientConfig, Error as ClientError, RequestOptions, Router};
use qmesh_overlay::OverlayConfig;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::signal;

#[derive(Parser)]
#[command(name = "qmesh-client", about = "A qmesh inference client", long_about = None)]
struct Args {
    #[arg(long, short = 'c', help = "Path to the client's configuration file")]
    config_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialise the client: write its config and persist a fresh identity.
    Init {
        #[arg(long, help = "Address this client listens on for the inference overlay (usually omitted)")]
        inference_listen: Option<SocketAddr>,

        #[arg(long, help = "Address this client listens on for the score overlay (usually omitted)")]
        score_listen: Option<SocketAddr>,

        #[arg(long, default_value_t = 0, help = "This client's self-claimed contribution score")]
        claimed_score: i64,

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

    /// Send one prompt and print the worker's response.
    Prompt {
        prompt: String,

        #[arg(long, help = "Maximum tokens to generate")]
        max_tokens: Option<u32>,

        #[arg(long, help = "Sampling temperature")]
        temperature: Option<f32>,
    },

    /// Send every line of `file` as a prompt, up to the configured
    /// concurrency, and print each result alongside its line number.
    Batch { file: PathBuf },

    /// Run as a long-lived router process (for embedding behind another
    /// front end that talks to this process some other way).
    Run {},
}

fn default_config_file() -> PathBuf {
    qmesh_overlay::default_config_dir("client").join("client.toml")
}

async fn wait_until_discovered(router: &Router, timeout: Duration) -> Result<(), ClientError> {
    let deadline = tokio::time::Instant::now() + timeout;
    while router.ready_worker_count().await == 0 {
        if tokio::time::Instant::now() >= deadline {
            return Err(ClientError::NoWorkersFound);
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    Ok(())
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
        Commands::Init {
            inference_listen,
            score_listen,
            claimed_score,
            force,
        } => {
            if config_file.try_exists()? && !force {
                anyhow::bail!(
                    "config file already exists at {}; pass --force to overwrite",
                    config_file.display()
                );
            }

            let identity_dir = config_file.parent().unwrap_or(&config_file).to_path_buf();

            let config = ClientConfig {
                identity_path: identity_dir.join("identity.toml"),
                inference_overlay: OverlayConfig::new(inference_listen, vec![]),
                score_overlay: OverlayConfig::new(score_listen, vec![]),
                claimed_score,
                smart_routing: true,
                request_timeout_secs: 30,
                discovery_timeout_secs: 30,
                health_refresh_secs: 30,
                max_batch_concurrency: 5,
            };

            config.save(&config_file).context("failed to write client config")?;
            tracing::info!("client initialised, config written to {}", config_file.display());
            Ok(())
        }

        Commands::Peer { add, remove, list, score } => {
            let mut config = ClientConfig::load(&config_file).context("failed to load client config")?;
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

        Commands::Prompt { prompt, max_tokens, temperature } => {
            let config = ClientConfig::load(&config_file)
                .with_context(|| format!("no config at {}; run `qmesh-client init` first", config_file.display()))?;
            let discovery_timeout = Duration::from_secs(config.discovery_timeout_secs);

            let router = Router::connect(config).await?;
            wait_until_discovered(&router, discovery_timeout).await?;

            let result = router
                .send_prompt(
                    &prompt,
                    RequestOptions {
                        max_tokens,
                        temperature,
                        timeout: None,
                    },
                )
                .await?;

            println!("{}", result);
            router.shutdown().await;
            Ok(())
        }

        Commands::Batch { file } => {
            let config = ClientConfig::load(&config_file)
                .with_context(|| format!("no config at {}; run `qmesh-client init` first", config_file.display()))?;
            let discovery_timeout = Duration::from_secs(config.discovery_timeout_secs);

            let prompts = read_prompt_lines(&file)?;
            let router = Router::connect(config).await?;
            wait_until_discovered(&router, discovery_timeout).await?;

            let mut results = router.send_batch(&prompts).await;
            results.sort_by_key(|r| r.index);

            for result in results {
                match result.outcome {
                    Ok(text) => println!("{}\t{}", result.index, text),
                    Err(e) => println!("{}\tERROR: {}", result.index, e),
                }
            }

            router.shutdown().await;
            Ok(())
        }

        Commands::Run {} => {
            let config = ClientConfig::load(&config_file)
                .with_context(|| format!("no config at {}; run `qmesh-client init` first", config_file.display()))?;

            let router = Router::connect(config).await?;
            tracing::info!(client_id = %router.identity(), "client running, press Ctrl+C to stop");

            signal::ctrl_c().await.context("failed to listen for ctrl-c")?;
            tracing::info!("shutting down");
            router.shutdown().await;
            Ok(())
        }
    }
}

fn read_prompt_lines(path: &Path) -> Result<Vec<String>> {
    let data = std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    Ok(data.lines().filter(|l| !l.trim().is_empty()).map(|l| l.to_string()).collect())
}
