//! dex-tx - command line front end for the submission pipeline
//!
//! Requests an unsigned transaction from the trade backend (or reads a
//! previously captured envelope), then signs, broadcasts, and confirms
//! it with a local keypair.

#![deny(unused_imports)]
#![deny(unused_mut)]
#![warn(unused_must_use)]

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dex_tx_client::backend::{BackendClient, MarketOrderRequest, SwapSide};
use dex_tx_client::broadcast::RpcBroadcaster;
use dex_tx_client::config::Config;
use dex_tx_client::envelope::TxEnvelope;
use dex_tx_client::wallet::{KeypairSigner, SigningCapability};
use dex_tx_client::{ActionKind, Pubkey, SubmitOutcome, SubmitPipeline};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Buy a token through a market order
    Buy {
        /// Token mint address
        token: String,
        /// Amount to spend, in the quote currency
        amount: String,
    },
    /// Sell a token through a market order
    Sell {
        /// Token mint address
        token: String,
        /// Amount to sell
        amount: String,
    },
    /// Submit a previously captured backend envelope
    Submit {
        /// Path to the envelope JSON file, or `-` for stdin
        path: String,
        /// Action label for logs and duplicate detection
        #[arg(long, default_value = "buy")]
        action: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose)?;

    info!("Starting dex-tx {}", env!("CARGO_PKG_VERSION"));
    let config = load_config(&args.config)?;

    let signer = KeypairSigner::from_file(
        &config.wallet.keypair_path,
        config.wallet.supports_versioned,
    )
    .context("Failed to load wallet keypair")?;
    info!("Wallet address: {}", signer.pubkey());

    let expected_program = config
        .pipeline
        .expected_program
        .as_deref()
        .map(Pubkey::from_str)
        .transpose()
        .context("Invalid expected_program in config")?;

    let network = Arc::new(RpcBroadcaster::new(
        config.rpc.url.clone(),
        config.rpc.skip_preflight,
        config.rpc.max_retries,
        Duration::from_secs(config.pipeline.confirm_timeout_secs),
    ));
    let pipeline = SubmitPipeline::new(
        network,
        expected_program,
        config.pipeline.explorer_cluster.clone(),
    );

    let (action, envelope) = match &args.command {
        Command::Buy { token, amount } => {
            let envelope =
                request_market_order(&config, &signer, token, amount, SwapSide::Buy).await?;
            (ActionKind::Buy, envelope)
        }
        Command::Sell { token, amount } => {
            let envelope =
                request_market_order(&config, &signer, token, amount, SwapSide::Sell).await?;
            (ActionKind::Sell, envelope)
        }
        Command::Submit { path, action } => {
            let text = if path == "-" {
                std::io::read_to_string(std::io::stdin())?
            } else {
                std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read envelope from {path}"))?
            };
            let envelope = TxEnvelope::from_json(&text).context("Malformed envelope")?;
            (parse_action(action)?, envelope)
        }
    };

    let outcome = pipeline
        .submit(action, &envelope, &signer)
        .await
        .context("Submission failed")?;

    match &outcome {
        SubmitOutcome::Confirmed(signature) => {
            println!("confirmed: {signature}");
            if let Some(url) = outcome.explorer_url(pipeline.explorer_cluster()) {
                println!("explorer:  {url}");
            }
        }
        SubmitOutcome::LikelySuccess { reference } => {
            println!("likely succeeded (submitted earlier): {reference}");
            println!("note: reference may not be an on-chain signature");
        }
    }

    Ok(())
}

async fn request_market_order(
    config: &Config,
    signer: &KeypairSigner,
    token: &str,
    amount: &str,
    side: SwapSide,
) -> Result<TxEnvelope> {
    let client = BackendClient::new(
        config.backend.base_url.clone(),
        Duration::from_secs(config.backend.request_timeout_secs),
    )?;
    let request = MarketOrderRequest::new(
        token.to_string(),
        side,
        amount.to_string(),
        signer.address().to_string(),
    );
    Ok(client.create_market_order(&request).await?)
}

fn parse_action(name: &str) -> Result<ActionKind> {
    match name {
        "buy" => Ok(ActionKind::Buy),
        "sell" => Ok(ActionKind::Sell),
        "add_liquidity" => Ok(ActionKind::AddLiquidity),
        "create_pool" => Ok(ActionKind::CreatePool),
        "create_token" => Ok(ActionKind::CreateToken),
        other => anyhow::bail!("unknown action '{other}'"),
    }
}

/// Initialize logging subsystem
fn init_logging(verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        "dex_tx_client=debug,info"
    } else {
        "dex_tx_client=info,warn,error"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();

    Ok(())
}

/// Load configuration from file with fallback to defaults
fn load_config(path: &str) -> Result<Config> {
    if std::path::Path::new(path).exists() {
        Config::from_file_with_env(path)
            .with_context(|| format!("Failed to load config from {}", path))
    } else {
        warn!("Config file '{}' not found, using defaults", path);
        Ok(Config::default())
    }
}
