//! Configuration management for the attestor

use alloy_primitives::Address;
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::str::FromStr;
use std::time::Duration;

use crate::validator::DEFAULT_ALLOCATOR;

pub const DEFAULT_SCHEMA_ID: &str = "ccaea2479b0440a797a2334475f456f8";
pub const DEFAULT_APP_ID: &str = "c5168e8d-16ed-4301-aaea-25058673130d";
pub const DEFAULT_EXPLORER_TX_URL: &str = "https://explorer-holesky.morphl2.io/tx/";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// zkPass application the schema belongs to
    pub app_id: String,

    /// Schema the widget is asked to attest to
    pub schema_id: String,

    /// JSON-RPC endpoint of the wallet; unset means no wallet is available
    pub wallet_endpoint: Option<String>,

    /// Local bridge to the TransGate widget
    pub widget_endpoint: String,

    /// Address expected to have signed the allocator signature
    pub allocator_address: Address,

    /// Account the proof is bound to; must be the wallet account that submits
    pub recipient_hint: Option<Address>,

    /// Prefix for transaction links
    pub explorer_tx_url: String,

    /// Timeout in seconds for the widget status and chain id checks.
    /// Calls that wait on the user are not timed out.
    pub status_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_id: DEFAULT_APP_ID.to_string(),
            schema_id: DEFAULT_SCHEMA_ID.to_string(),
            wallet_endpoint: None,
            widget_endpoint: "http://localhost:7788".to_string(),
            allocator_address: DEFAULT_ALLOCATOR,
            recipient_hint: None,
            explorer_tx_url: DEFAULT_EXPLORER_TX_URL.to_string(),
            status_timeout_secs: 10,
        }
    }
}

impl Config {
    /// Load configuration from file (if present) and environment
    pub fn load(path: &str) -> Result<Self> {
        let mut config = if std::path::Path::new(path).exists() {
            let contents = fs::read_to_string(path)?;
            toml::from_str(&contents)?
        } else {
            Config::default()
        };

        config.apply_env()?;
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Result<Self> {
        let mut config = Config::default();
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(app_id) = env::var("APP_ID") {
            self.app_id = app_id;
        }

        if let Ok(schema_id) = env::var("SCHEMA_ID") {
            self.schema_id = schema_id;
        }

        if let Ok(endpoint) = env::var("WALLET_RPC_URL") {
            self.wallet_endpoint = Some(endpoint).filter(|e| !e.trim().is_empty());
        }

        if let Ok(endpoint) = env::var("TRANSGATE_ENDPOINT") {
            self.widget_endpoint = endpoint;
        }

        if let Ok(address) = env::var("ALLOCATOR_ADDRESS") {
            self.allocator_address = Address::from_str(&address)
                .map_err(|e| anyhow!("Invalid ALLOCATOR_ADDRESS {}: {}", address, e))?;
        }

        if let Ok(address) = env::var("RECIPIENT_HINT") {
            self.recipient_hint = Some(
                Address::from_str(&address)
                    .map_err(|e| anyhow!("Invalid RECIPIENT_HINT {}: {}", address, e))?,
            );
        }

        if let Ok(url) = env::var("EXPLORER_TX_URL") {
            self.explorer_tx_url = url;
        }

        if let Ok(timeout) = env::var("STATUS_TIMEOUT_SECS") {
            if let Ok(secs) = timeout.parse() {
                self.status_timeout_secs = secs;
            }
        }

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.schema_id.trim().is_empty() {
            return Err(anyhow!("Schema ID is required"));
        }

        if self.app_id.trim().is_empty() {
            return Err(anyhow!("App ID is required"));
        }

        if self.widget_endpoint.trim().is_empty() {
            return Err(anyhow!("TransGate endpoint is required"));
        }

        if self.status_timeout_secs == 0 {
            return Err(anyhow!("Status timeout must be positive"));
        }

        Ok(())
    }

    /// Bound for the status and chain id checks
    pub fn status_timeout(&self) -> Duration {
        Duration::from_secs(self.status_timeout_secs)
    }

    /// The recipient the proof must be bound to
    pub fn recipient(&self) -> Result<Address> {
        self.recipient_hint
            .ok_or_else(|| anyhow!("A recipient is required (set recipient_hint, RECIPIENT_HINT or --recipient)"))
    }
}
