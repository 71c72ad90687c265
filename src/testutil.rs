//! Shared fixtures for unit tests

use alloy_primitives::{Address, B256};
use async_trait::async_trait;
use k256::ecdsa::SigningKey;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::{ProviderError, WidgetError};
use crate::signature::{address_of, keccak256, sign_message_digest};
use crate::types::{AttestationRequest, AttestationResult};
use crate::validator::{allocator_digest, utf8_to_bytes32, validator_digest, ResultValidator};
use crate::wallet::{TransactionRequest, WalletGateway, WalletProvider};
use crate::widget::ProofWidget;

pub const SCHEMA_ID: &str = "ccaea2479b0440a797a2334475f456f8";
pub const APP_ID: &str = "c5168e8d-16ed-4301-aaea-25058673130d";
pub const TASK_ID: &str = "4bd2b3cfa1a2465a9b1cba1d4f1e6c77";

fn key_from_seed(seed: &[u8]) -> SigningKey {
    SigningKey::from_slice(keccak256(seed).as_slice()).unwrap()
}

/// Deterministic allocator/validator keys plus a wallet account.
pub struct Fixture {
    allocator_key: SigningKey,
    validator_key: SigningKey,
    pub account: Address,
}

impl Fixture {
    pub fn new() -> Self {
        let account_key = key_from_seed(b"test_seed_for_wallet_account");
        Self {
            allocator_key: key_from_seed(b"test_seed_for_allocator"),
            validator_key: key_from_seed(b"test_seed_for_validator"),
            account: address_of(account_key.verifying_key()),
        }
    }

    pub fn allocator(&self) -> Address {
        address_of(self.allocator_key.verifying_key())
    }

    pub fn validator(&self) -> ResultValidator {
        ResultValidator::new(self.allocator())
    }

    pub fn result(&self, schema_id: &str) -> AttestationResult {
        self.result_for(schema_id, None)
    }

    /// A result bound to the wallet account.
    pub fn bound_result(&self, schema_id: &str) -> AttestationResult {
        self.result_for(schema_id, Some(self.account))
    }

    /// A correctly signed result for `schema_id`.
    pub fn result_for(&self, schema_id: &str, recipient: Option<Address>) -> AttestationResult {
        let validator = address_of(self.validator_key.verifying_key());
        let task = utf8_to_bytes32(TASK_ID).unwrap();
        let schema = utf8_to_bytes32(schema_id).unwrap();
        let u_hash = keccak256(b"private account handle");
        let public_fields_hash = keccak256(b"public fields");

        let allocator_signature =
            sign_message_digest(&self.allocator_key, &allocator_digest(task, schema, validator));
        let validator_signature = sign_message_digest(
            &self.validator_key,
            &validator_digest(task, schema, u_hash, public_fields_hash, recipient),
        );

        AttestationResult {
            task_id: TASK_ID.to_string(),
            schema_id: schema_id.to_string(),
            u_hash: hex_word(u_hash),
            validator_address: validator.to_string(),
            allocator_signature,
            validator_signature,
            public_fields_hash: hex_word(public_fields_hash),
            recipient: recipient.map(|r| r.to_string()),
        }
    }
}

fn hex_word(word: B256) -> String {
    format!("0x{}", hex::encode(word))
}

/// In-memory wallet that counts every call it receives.
pub struct MockWallet {
    pub chain_id: u64,
    pub accounts: Vec<Address>,
    reject: Option<(i64, String)>,
    pub chain_calls: AtomicUsize,
    pub account_calls: AtomicUsize,
    pub send_calls: AtomicUsize,
    pub last_tx: Mutex<Option<TransactionRequest>>,
}

impl MockWallet {
    pub const TX_HASH: B256 = B256::repeat_byte(0x5a);

    pub fn on_chain(chain_id: u64) -> Self {
        Self {
            chain_id,
            accounts: vec![Fixture::new().account],
            reject: None,
            chain_calls: AtomicUsize::new(0),
            account_calls: AtomicUsize::new(0),
            send_calls: AtomicUsize::new(0),
            last_tx: Mutex::new(None),
        }
    }

    /// Fail every `eth_sendTransaction` with the given RPC error.
    pub fn rejecting(mut self, code: i64, message: &str) -> Self {
        self.reject = Some((code, message.to_string()));
        self
    }

    /// Gateway backed by this wallet
    pub fn gateway(wallet: &Arc<Self>) -> WalletGateway {
        let provider: Arc<dyn WalletProvider> = wallet.clone();
        WalletGateway::new(Some(provider))
    }

    /// Calls that reached the gateway side of the wallet
    pub fn gateway_calls(&self) -> usize {
        self.chain_calls.load(Ordering::SeqCst) + self.account_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WalletProvider for MockWallet {
    async fn chain_id(&self) -> Result<u64, ProviderError> {
        self.chain_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.chain_id)
    }

    async fn request_accounts(&self) -> Result<Vec<Address>, ProviderError> {
        self.account_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.accounts.clone())
    }

    async fn send_transaction(&self, tx: &TransactionRequest) -> Result<B256, ProviderError> {
        self.send_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_tx.lock().unwrap() = Some(tx.clone());
        match &self.reject {
            Some((code, message)) => Err(ProviderError::Rpc {
                code: *code,
                message: message.clone(),
            }),
            None => Ok(Self::TX_HASH),
        }
    }
}

/// Widget that returns a canned result.
pub struct MockWidget {
    available: bool,
    result: Option<AttestationResult>,
    pub launch_calls: AtomicUsize,
    pub last_recipient: Mutex<Option<Address>>,
}

impl MockWidget {
    pub fn returning(result: AttestationResult) -> Self {
        Self {
            available: true,
            result: Some(result),
            launch_calls: AtomicUsize::new(0),
            last_recipient: Mutex::new(None),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            available: false,
            result: None,
            launch_calls: AtomicUsize::new(0),
            last_recipient: Mutex::new(None),
        }
    }

    /// Installed, but every launch fails.
    pub fn failing() -> Self {
        Self {
            available: true,
            result: None,
            launch_calls: AtomicUsize::new(0),
            last_recipient: Mutex::new(None),
        }
    }
}

#[async_trait]
impl ProofWidget for MockWidget {
    async fn is_available(&self) -> bool {
        self.available
    }

    async fn launch(
        &self,
        _request: &AttestationRequest,
        recipient: Option<Address>,
    ) -> Result<AttestationResult, WidgetError> {
        self.launch_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_recipient.lock().unwrap() = recipient;
        self.result
            .clone()
            .ok_or_else(|| WidgetError::Launch("task was cancelled".to_string()))
    }
}
