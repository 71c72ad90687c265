//! Wallet access: provider abstraction, JSON-RPC provider and the gateway

use alloy_primitives::{Address, Bytes, B256};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{FlowError, ProviderError, Result};
use crate::types::TransactionHandle;

/// Morph Holesky
pub const MORPH_CHAIN_ID: u64 = 2810;

/// A transaction the wallet signs and broadcasts on our behalf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionRequest {
    pub from: Address,
    pub to: Address,
    pub data: Bytes,
}

/// The injected wallet, in EIP-1193 terms.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Chain the wallet is currently connected to.
    async fn chain_id(&self) -> std::result::Result<u64, ProviderError>;

    /// Ask the user to expose accounts; may prompt in the wallet UI.
    async fn request_accounts(&self) -> std::result::Result<Vec<Address>, ProviderError>;

    /// Sign and broadcast `tx`; may prompt in the wallet UI.
    async fn send_transaction(
        &self,
        tx: &TransactionRequest,
    ) -> std::result::Result<B256, ProviderError>;
}

#[derive(Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: serde_json::Value,
}

#[derive(Deserialize)]
struct RpcResponse {
    result: Option<serde_json::Value>,
    error: Option<RpcErrorObject>,
}

#[derive(Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

/// Wallet reached over JSON-RPC (a wallet bridge or a node with unlocked accounts).
///
/// `eth_chainId` is bounded by `status_timeout`. Account and transaction
/// requests wait on the user and are never timed out.
pub struct JsonRpcWallet {
    endpoint: String,
    client: Client,
    status_timeout: Duration,
    next_id: AtomicU64,
}

impl JsonRpcWallet {
    /// Create a client for the wallet at `endpoint`
    pub fn new(endpoint: &str, status_timeout: Duration) -> std::result::Result<Self, ProviderError> {
        Ok(Self {
            endpoint: endpoint.to_string(),
            client: Client::builder().build()?,
            status_timeout,
            next_id: AtomicU64::new(1),
        })
    }

    async fn call<T>(
        &self,
        method: &str,
        params: serde_json::Value,
        timeout: Option<Duration>,
    ) -> std::result::Result<T, ProviderError>
    where
        T: for<'de> Deserialize<'de>,
    {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };

        debug!("JSON-RPC {} -> {}", method, self.endpoint);

        let mut builder = self.client.post(&self.endpoint).json(&request);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let response = builder.send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ProviderError::Http { status, body });
        }

        let rpc_response: RpcResponse = response.json().await?;

        if let Some(error) = rpc_response.error {
            return Err(ProviderError::Rpc {
                code: error.code,
                message: error.message,
            });
        }

        let result = rpc_response
            .result
            .ok_or_else(|| ProviderError::Malformed(format!("No result for {}", method)))?;

        serde_json::from_value(result)
            .map_err(|e| ProviderError::Malformed(format!("Unexpected {} result: {}", method, e)))
    }
}

#[async_trait]
impl WalletProvider for JsonRpcWallet {
    async fn chain_id(&self) -> std::result::Result<u64, ProviderError> {
        let hex_id: String = self
            .call("eth_chainId", serde_json::json!([]), Some(self.status_timeout))
            .await?;
        parse_quantity(&hex_id)
    }

    async fn request_accounts(&self) -> std::result::Result<Vec<Address>, ProviderError> {
        let accounts: Vec<String> = self.call("eth_requestAccounts", serde_json::json!([]), None).await?;
        accounts
            .iter()
            .map(|a| {
                Address::from_str(a).map_err(|e| ProviderError::Malformed(format!("Bad account {}: {}", a, e)))
            })
            .collect()
    }

    async fn send_transaction(
        &self,
        tx: &TransactionRequest,
    ) -> std::result::Result<B256, ProviderError> {
        let hash: String = self.call("eth_sendTransaction", serde_json::json!([tx]), None).await?;
        B256::from_str(&hash).map_err(|e| ProviderError::Malformed(format!("Bad transaction hash {}: {}", hash, e)))
    }
}

fn parse_quantity(value: &str) -> std::result::Result<u64, ProviderError> {
    let digits = value
        .strip_prefix("0x")
        .ok_or_else(|| ProviderError::Malformed(format!("Quantity without 0x prefix: {}", value)))?;
    u64::from_str_radix(digits, 16).map_err(|e| ProviderError::Malformed(format!("Bad quantity {}: {}", value, e)))
}

/// An authorized account on the supported network.
#[derive(Clone)]
pub struct Signer {
    provider: Arc<dyn WalletProvider>,
    address: Address,
}

impl Signer {
    /// The bound account; also the attestation recipient.
    pub fn address(&self) -> Address {
        self.address
    }

    /// Send a call from this account to `to`.
    pub async fn send(&self, to: Address, data: Bytes) -> std::result::Result<TransactionHandle, ProviderError> {
        let tx = TransactionRequest {
            from: self.address,
            to,
            data,
        };
        let hash = self.provider.send_transaction(&tx).await?;
        Ok(TransactionHandle { hash })
    }
}

/// Connects to the wallet and hands out a signer on the supported network.
pub struct WalletGateway {
    provider: Option<Arc<dyn WalletProvider>>,
    chain_id: u64,
}

impl WalletGateway {
    /// Gateway over the injected provider, if any, for Morph Holesky.
    pub fn new(provider: Option<Arc<dyn WalletProvider>>) -> Self {
        Self {
            provider,
            chain_id: MORPH_CHAIN_ID,
        }
    }

    /// Check presence and network, then bind the first exposed account.
    pub async fn connect(&self) -> Result<Signer> {
        let provider = self
            .provider
            .clone()
            .ok_or_else(|| FlowError::WalletUnavailable("no wallet provider injected".to_string()))?;

        let actual = provider.chain_id().await.map_err(unavailable)?;
        if actual != self.chain_id {
            warn!("Wallet is on chain {}, expected {}", actual, self.chain_id);
            return Err(FlowError::WrongNetwork {
                expected: self.chain_id,
                actual,
            });
        }

        let accounts = provider.request_accounts().await.map_err(unavailable)?;
        let address = *accounts
            .first()
            .ok_or_else(|| FlowError::WalletUnavailable("wallet exposed no accounts".to_string()))?;

        info!("Wallet connected: account {} on chain {}", address, actual);
        Ok(Signer { provider, address })
    }
}

// A reply we cannot read is a bug on one side, not a missing wallet.
fn unavailable(err: ProviderError) -> FlowError {
    match err {
        ProviderError::Malformed(msg) => FlowError::Unexpected(msg),
        other => FlowError::WalletUnavailable(other.to_string()),
    }
}
