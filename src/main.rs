//! Bootcamp account attestor
//!
//! Proves, through the zkPass TransGate widget, that the user holds an account
//! on the coding-practice site, checks the returned proof locally and records
//! it on Morph through the user's wallet.

mod config;
mod error;
mod orchestrator;
mod signature;
mod submitter;
mod types;
mod validator;
mod wallet;
mod widget;

#[cfg(test)]
mod testutil;

use alloy_primitives::Address;
use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::Config;
use crate::orchestrator::{ConsoleNotifier, Orchestrator};
use crate::submitter::AttestationSubmitter;
use crate::types::{AttestationRequest, Session};
use crate::validator::ResultValidator;
use crate::wallet::{JsonRpcWallet, WalletGateway, WalletProvider};
use crate::widget::TransgateBridge;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "attestor.toml")]
    config: String,

    /// Schema to attest to (overrides configuration)
    #[arg(long)]
    schema_id: Option<String>,

    /// zkPass application id (overrides configuration)
    #[arg(long)]
    app_id: Option<String>,

    /// Wallet JSON-RPC endpoint (overrides configuration)
    #[arg(long)]
    wallet_rpc: Option<String>,

    /// Wallet account the proof is bound to (overrides configuration)
    #[arg(long)]
    recipient: Option<Address>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let args = Args::parse();

    // Initialize logging
    let filter = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .init();

    info!("Starting bootcamp attestor");

    // Load configuration
    let mut config = match Config::load(&args.config) {
        Ok(config) => config,
        Err(e) => {
            warn!("Failed to load config file {}: {}. Using environment variables.", args.config, e);
            Config::from_env().context("Failed to load configuration from environment variables")?
        }
    };

    if let Some(schema_id) = args.schema_id {
        config.schema_id = schema_id;
    }
    if let Some(app_id) = args.app_id {
        config.app_id = app_id;
    }
    if let Some(endpoint) = args.wallet_rpc {
        config.wallet_endpoint = Some(endpoint);
    }
    if let Some(recipient) = args.recipient {
        config.recipient_hint = Some(recipient);
    }
    config.validate()?;
    let recipient = config.recipient()?;
    info!("Configuration loaded successfully");

    // Initialize components
    let widget = Arc::new(TransgateBridge::new(&config.widget_endpoint, config.status_timeout())?);

    let provider: Option<Arc<dyn WalletProvider>> = match &config.wallet_endpoint {
        Some(endpoint) => Some(Arc::new(JsonRpcWallet::new(endpoint, config.status_timeout())?)),
        None => {
            warn!("No wallet endpoint configured");
            None
        }
    };

    let orchestrator = Orchestrator::new(
        widget,
        ResultValidator::new(config.allocator_address),
        WalletGateway::new(provider),
        AttestationSubmitter::default(),
        Arc::new(ConsoleNotifier),
    )
    .with_recipient_hint(Some(recipient));

    // Run one verification
    let request = AttestationRequest::new(config.schema_id.clone(), config.app_id.clone());
    let mut session = Session::new();

    let report = orchestrator.run(&request, &mut session).await;

    print!("{}", session.render(&config.explorer_tx_url));

    info!("Verification finished in {:?}", report.final_state());
    let aborted_from = report.aborted_from();
    match report.outcome {
        Ok(handle) => info!("Attestation recorded in {}", handle),
        Err(e) => info!("Verification aborted from {:?}: {}", aborted_from, e.kind()),
    }

    Ok(())
}
