//! Local re-validation of attestation results

use alloy_primitives::{address, Address, B256};
use alloy_sol_types::SolValue;
use std::str::FromStr;
use thiserror::Error;
use tracing::{info, warn};

use crate::signature::{keccak256, recover_message_signer, SignatureError};
use crate::types::AttestationResult;

/// Task allocator of the zkPass network
pub const DEFAULT_ALLOCATOR: Address = address!("19a567b3b212a5b35bA0E3B600FbEd5c2eE9083d");

/// Why a result was rejected
#[derive(Error, Debug, PartialEq, Eq)]
pub enum Rejection {
    #[error("schema mismatch: requested {requested}, got {actual}")]
    SchemaMismatch { requested: String, actual: String },

    #[error("{field} does not fit in bytes32")]
    NotBytes32 { field: &'static str },

    #[error("{field} is not a 32-byte hex word")]
    BadHash { field: &'static str },

    #[error("{field} is not an address")]
    BadAddress { field: &'static str },

    #[error("{field}: {source}")]
    BadSignature {
        field: &'static str,
        source: SignatureError,
    },

    #[error("{field} was signed by {actual}, expected {expected}")]
    WrongSigner {
        field: &'static str,
        expected: Address,
        actual: Address,
    },
}

/// Encode UTF-8 text as a right-padded `bytes32`.
///
/// Empty text and text longer than 32 bytes have no encoding.
pub fn utf8_to_bytes32(text: &str) -> Option<B256> {
    let bytes = text.as_bytes();
    if bytes.is_empty() || bytes.len() > 32 {
        return None;
    }
    let mut word = B256::ZERO;
    word[..bytes.len()].copy_from_slice(bytes);
    Some(word)
}

/// Digest the allocator signs when assigning a task to a validator.
pub fn allocator_digest(task_id: B256, schema_id: B256, validator: Address) -> B256 {
    keccak256(&(task_id, schema_id, validator).abi_encode())
}

/// Digest the validator signs over the task outcome.
pub fn validator_digest(
    task_id: B256,
    schema_id: B256,
    u_hash: B256,
    public_fields_hash: B256,
    recipient: Option<Address>,
) -> B256 {
    let encoded = match recipient {
        Some(recipient) => (task_id, schema_id, u_hash, public_fields_hash, recipient).abi_encode(),
        None => (task_id, schema_id, u_hash, public_fields_hash).abi_encode(),
    };
    keccak256(&encoded)
}

/// Checks a widget result against the schema the user asked for.
#[derive(Debug, Clone)]
pub struct ResultValidator {
    allocator: Address,
}

impl Default for ResultValidator {
    fn default() -> Self {
        Self::new(DEFAULT_ALLOCATOR)
    }
}

impl ResultValidator {
    /// Validator that trusts `allocator` to assign tasks
    pub fn new(allocator: Address) -> Self {
        info!("Initialized result validator with allocator {}", allocator);
        Self { allocator }
    }

    /// Returns `true` only if every binding in the result checks out.
    pub fn validate(&self, result: &AttestationResult, requested_schema_id: &str) -> bool {
        match self.check(result, requested_schema_id) {
            Ok(()) => true,
            Err(rejection) => {
                warn!("Rejected result for task {}: {}", result.task_id, rejection);
                false
            }
        }
    }

    /// Same as [`validate`](Self::validate), but reports the first failed check.
    pub fn check(&self, result: &AttestationResult, requested_schema_id: &str) -> Result<(), Rejection> {
        if result.schema_id != requested_schema_id {
            return Err(Rejection::SchemaMismatch {
                requested: requested_schema_id.to_string(),
                actual: result.schema_id.clone(),
            });
        }

        let task_id = utf8_to_bytes32(&result.task_id)
            .ok_or(Rejection::NotBytes32 { field: "taskId" })?;
        let schema_id = utf8_to_bytes32(&result.schema_id)
            .ok_or(Rejection::NotBytes32 { field: "schemaId" })?;
        let u_hash = parse_hash(&result.u_hash, "uHash")?;
        let public_fields_hash = parse_hash(&result.public_fields_hash, "publicFieldsHash")?;
        let validator = parse_address(&result.validator_address, "validatorAddress")?;
        let recipient = result
            .recipient
            .as_deref()
            .map(|r| parse_address(r, "recipient"))
            .transpose()?;

        expect_signer(
            "allocatorSignature",
            &allocator_digest(task_id, schema_id, validator),
            &result.allocator_signature,
            self.allocator,
        )?;

        expect_signer(
            "validatorSignature",
            &validator_digest(task_id, schema_id, u_hash, public_fields_hash, recipient),
            &result.validator_signature,
            validator,
        )?;

        Ok(())
    }
}

fn parse_hash(value: &str, field: &'static str) -> Result<B256, Rejection> {
    B256::from_str(value).map_err(|_| Rejection::BadHash { field })
}

fn parse_address(value: &str, field: &'static str) -> Result<Address, Rejection> {
    Address::from_str(value).map_err(|_| Rejection::BadAddress { field })
}

fn expect_signer(
    field: &'static str,
    digest: &B256,
    signature: &str,
    expected: Address,
) -> Result<(), Rejection> {
    let actual = recover_message_signer(digest, signature)
        .map_err(|source| Rejection::BadSignature { field, source })?;
    if actual != expected {
        return Err(Rejection::WrongSigner { field, expected, actual });
    }
    Ok(())
}
