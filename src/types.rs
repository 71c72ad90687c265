//! Type definitions for the attestation workflow

use alloy_primitives::B256;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// What the user asked the proof widget to attest to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttestationRequest {
    pub schema_id: String,
    pub app_id: String,
}

impl AttestationRequest {
    pub fn new(schema_id: impl Into<String>, app_id: impl Into<String>) -> Self {
        Self {
            schema_id: schema_id.into(),
            app_id: app_id.into(),
        }
    }
}

/// Result returned by the proof widget.
///
/// All fields are kept as the raw strings the widget produced; nothing here
/// is trusted until the validator has accepted it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttestationResult {
    pub task_id: String,

    pub schema_id: String,

    /// Hash of the private identifying data
    pub u_hash: String,

    /// Address of the node that ran the verification task
    pub validator_address: String,

    pub allocator_signature: String,

    pub validator_signature: String,

    pub public_fields_hash: String,

    /// Recipient the task was bound to, when the launch named one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient: Option<String>,
}

/// Handle for a transaction accepted by the wallet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionHandle {
    pub hash: B256,
}

impl fmt::Display for TransactionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.hash))
    }
}

/// What the user sees after verification attempts.
///
/// Values persist across attempts and are only overwritten when an attempt
/// reaches `Done`.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub last_result: Option<AttestationResult>,
    pub last_transaction_hash: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the outcome of a run that reached `Done`
    pub fn record_success(&mut self, result: AttestationResult, tx: &TransactionHandle) {
        self.last_result = Some(result);
        self.last_transaction_hash = Some(tx.to_string());
        self.completed_at = Some(Utc::now());
    }

    /// Explorer link for the last transaction
    pub fn transaction_link(&self, explorer_tx_url: &str) -> Option<String> {
        self.last_transaction_hash
            .as_ref()
            .map(|hash| format!("{}{}", explorer_tx_url, hash))
    }

    /// Render the results panel as text.
    pub fn render(&self, explorer_tx_url: &str) -> String {
        let mut out = String::new();

        if let (Some(hash), Some(link)) = (
            self.last_transaction_hash.as_ref(),
            self.transaction_link(explorer_tx_url),
        ) {
            out.push_str(&format!("AttestationTx: {}\n  {}\n", hash, link));
        }

        if let Some(result) = &self.last_result {
            let pretty = serde_json::to_string_pretty(result)
                .unwrap_or_else(|e| format!("<unrenderable result: {}>", e));
            out.push_str("Result:\n");
            out.push_str(&pretty);
            out.push('\n');
        }

        out
    }
}
