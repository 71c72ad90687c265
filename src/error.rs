//! Error types for the attestation workflow

use serde::Serialize;
use thiserror::Error;

/// Failures surfaced by a verification attempt.
///
/// Every step of the workflow reports one of these; the orchestrator turns
/// them into a user notice and an `Aborted` state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FlowError {
    #[error("{0}")]
    ProofWidgetUnavailable(String),

    #[error("Invalid result: {0}")]
    InvalidResult(String),

    #[error("Wallet not available: {0}")]
    WalletUnavailable(String),

    #[error("Please switch to Morph network (expected chain id {expected}, got {actual})")]
    WrongNetwork { expected: u64, actual: u64 },

    #[error("Transaction rejected: {0}")]
    SubmissionRejected(String),

    #[error("{}", serialize_raw(.0))]
    Unexpected(String),
}

impl FlowError {
    /// Short machine-readable name of the variant, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            FlowError::ProofWidgetUnavailable(_) => "ProofWidgetUnavailable",
            FlowError::InvalidResult(_) => "InvalidResult",
            FlowError::WalletUnavailable(_) => "WalletUnavailable",
            FlowError::WrongNetwork { .. } => "WrongNetwork",
            FlowError::SubmissionRejected(_) => "SubmissionRejected",
            FlowError::Unexpected(_) => "UnexpectedError",
        }
    }
}

#[derive(Serialize)]
struct RawError<'a> {
    error: &'a str,
}

fn serialize_raw(raw: &str) -> String {
    serde_json::to_string(&RawError { error: raw }).unwrap_or_else(|_| raw.to_string())
}

/// Errors reported by a wallet provider.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("HTTP error ({status}): {body}")]
    Http { status: u16, body: String },

    #[error("Malformed response: {0}")]
    Malformed(String),
}

impl ProviderError {
    /// EIP-1193 code for a request the user declined in the wallet.
    pub const USER_REJECTED: i64 = 4001;

    /// Whether the user declined the request in the wallet UI
    pub fn is_user_rejection(&self) -> bool {
        matches!(self, ProviderError::Rpc { code, .. } if *code == Self::USER_REJECTED)
    }
}

/// Errors reported by the proof widget.
#[derive(Error, Debug)]
pub enum WidgetError {
    #[error("Please install zkPass TransGate")]
    NotInstalled,

    #[error("TransGate request failed: {0}")]
    Launch(String),

    #[error("TransGate not reachable: {0}")]
    Network(#[from] reqwest::Error),
}

impl From<WidgetError> for FlowError {
    fn from(err: WidgetError) -> Self {
        FlowError::ProofWidgetUnavailable(err.to_string())
    }
}

/// Result type for workflow steps
pub type Result<T> = std::result::Result<T, FlowError>;
