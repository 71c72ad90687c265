//! Ethereum signed-message recovery

use alloy_primitives::{Address, B256};
use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use sha3::{Digest, Keccak256};
use thiserror::Error;

const MESSAGE_PREFIX: &[u8] = b"\x19Ethereum Signed Message:\n32";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SignatureError {
    #[error("signature is not valid hex: {0}")]
    Hex(String),

    #[error("signature must be 65 bytes, got {0}")]
    Length(usize),

    #[error("invalid recovery byte {0}")]
    RecoveryByte(u8),

    #[error("invalid signature: {0}")]
    Malformed(String),
}

/// Keccak-256 of `data`
pub fn keccak256(data: &[u8]) -> B256 {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    B256::from_slice(&hasher.finalize())
}

/// Hash of a 32-byte digest under the `personal_sign` prefix
pub fn eth_message_hash(digest: &B256) -> B256 {
    let mut hasher = Keccak256::new();
    hasher.update(MESSAGE_PREFIX);
    hasher.update(digest.as_slice());
    B256::from_slice(&hasher.finalize())
}

/// Derive the Ethereum address of a public key.
pub fn address_of(key: &VerifyingKey) -> Address {
    let point = key.to_encoded_point(false);
    // Skip the 0x04 prefix
    let hash = keccak256(&point.as_bytes()[1..]);
    Address::from_slice(&hash[12..])
}

/// Decode a `0x`-hex string into bytes.
pub fn decode_hex(value: &str) -> Result<Vec<u8>, hex::FromHexError> {
    hex::decode(value.strip_prefix("0x").unwrap_or(value))
}

fn parse_signature(signature_hex: &str) -> Result<(Signature, RecoveryId), SignatureError> {
    let bytes = decode_hex(signature_hex).map_err(|e| SignatureError::Hex(e.to_string()))?;
    if bytes.len() != 65 {
        return Err(SignatureError::Length(bytes.len()));
    }

    let v = bytes[64];
    let recovery_byte = match v {
        0 | 1 => v,
        27 | 28 => v - 27,
        other => return Err(SignatureError::RecoveryByte(other)),
    };
    let recovery_id =
        RecoveryId::from_byte(recovery_byte).ok_or(SignatureError::RecoveryByte(v))?;

    let signature = Signature::from_slice(&bytes[..64])
        .map_err(|e| SignatureError::Malformed(e.to_string()))?;

    // Recovery rejects high-s; flip to the low-s twin and its parity.
    match signature.normalize_s() {
        Some(normalized) => {
            let flipped = RecoveryId::new(!recovery_id.is_y_odd(), recovery_id.is_x_reduced());
            Ok((normalized, flipped))
        }
        None => Ok((signature, recovery_id)),
    }
}

/// Recover the address that `personal_sign`ed `digest`.
pub fn recover_message_signer(digest: &B256, signature_hex: &str) -> Result<Address, SignatureError> {
    let (signature, recovery_id) = parse_signature(signature_hex)?;
    let prehash = eth_message_hash(digest);

    let key = VerifyingKey::recover_from_prehash(prehash.as_slice(), &signature, recovery_id)
        .map_err(|e| SignatureError::Malformed(e.to_string()))?;

    Ok(address_of(&key))
}

/// Sign `digest` the way a wallet's `personal_sign` does, as 0x-hex `r || s || v`.
#[cfg(test)]
pub fn sign_message_digest(key: &k256::ecdsa::SigningKey, digest: &B256) -> String {
    let prehash = eth_message_hash(digest);
    let (signature, recovery_id) = key
        .sign_prehash_recoverable(prehash.as_slice())
        .expect("prehash signing");

    let mut eth_sig = vec![0u8; 65];
    eth_sig[..64].copy_from_slice(&signature.to_bytes());
    eth_sig[64] = 27 + recovery_id.to_byte();

    format!("0x{}", hex::encode(eth_sig))
}
