//! Builds and sends the on-chain attestation call

use alloy_primitives::{address, Address, Bytes, B256};
use alloy_sol_types::{sol, SolCall};
use std::str::FromStr;
use tracing::{debug, info, warn};

use crate::error::{FlowError, ProviderError, Result};
use crate::signature::decode_hex;
use crate::types::{AttestationResult, TransactionHandle};
use crate::validator::utf8_to_bytes32;
use crate::wallet::Signer;

/// Attestation contract on Morph Holesky
pub const ATTESTATION_CONTRACT: Address = address!("79208010a972D0C0a978a9073bd0dcb659152072");

sol! {
    #[derive(Debug, PartialEq, Eq)]
    struct AttestParams {
        bytes32 taskId;
        bytes32 schemaId;
        bytes32 uHash;
        address recipient;
        bytes32 publicFieldsHash;
        address validator;
        bytes allocatorSignature;
        bytes validatorSignature;
    }

    interface IAttestation {
        function attest(AttestParams calldata params) external returns (bool);
    }
}

/// Map a result onto the contract's parameter struct.
pub fn build_params(result: &AttestationResult, recipient: Address) -> Result<AttestParams> {
    let invalid = |what: &str| FlowError::InvalidResult(format!("cannot encode {}", what));

    Ok(AttestParams {
        taskId: utf8_to_bytes32(&result.task_id).ok_or_else(|| invalid("taskId"))?,
        schemaId: utf8_to_bytes32(&result.schema_id).ok_or_else(|| invalid("schemaId"))?,
        uHash: B256::from_str(&result.u_hash).map_err(|_| invalid("uHash"))?,
        recipient,
        publicFieldsHash: B256::from_str(&result.public_fields_hash)
            .map_err(|_| invalid("publicFieldsHash"))?,
        validator: Address::from_str(&result.validator_address).map_err(|_| invalid("validatorAddress"))?,
        allocatorSignature: decode_hex(&result.allocator_signature)
            .map(Bytes::from)
            .map_err(|_| invalid("allocatorSignature"))?,
        validatorSignature: decode_hex(&result.validator_signature)
            .map(Bytes::from)
            .map_err(|_| invalid("validatorSignature"))?,
    })
}

/// Calldata for `attest(params)`
pub fn encode_attest_call(params: AttestParams) -> Bytes {
    Bytes::from(IAttestation::attestCall { params }.abi_encode())
}

pub struct AttestationSubmitter {
    contract: Address,
}

impl Default for AttestationSubmitter {
    fn default() -> Self {
        Self::new(ATTESTATION_CONTRACT)
    }
}

impl AttestationSubmitter {
    /// Submitter targeting `contract`
    pub fn new(contract: Address) -> Self {
        Self { contract }
    }

    /// Submit the result with the signer's account as recipient. Not retried.
    pub async fn submit(&self, result: &AttestationResult, signer: &Signer) -> Result<TransactionHandle> {
        let params = build_params(result, signer.address())?;
        let calldata = encode_attest_call(params);

        debug!("Submitting attest() to {} ({} bytes of calldata)", self.contract, calldata.len());

        let handle = signer.send(self.contract, calldata).await.map_err(|e| {
            warn!("Attestation submission failed: {}", e);
            rejected(e)
        })?;

        info!("Attestation transaction sent: {}", handle);
        Ok(handle)
    }
}

fn rejected(err: ProviderError) -> FlowError {
    if err.is_user_rejection() {
        FlowError::SubmissionRejected("user rejected the transaction".to_string())
    } else {
        FlowError::SubmissionRejected(err.to_string())
    }
}
